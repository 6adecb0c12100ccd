use chrono::{DateTime, TimeDelta, Utc};
use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::alert::AlertDispatcher;
use super::lifecycle::{self, MonitorError, Phase};
use crate::config::Config;
use crate::decision;
use crate::history::{ADJUSTMENT_HISTORY_CAP, HistoryBuffer, READING_HISTORY_CAP};
use crate::messages;
use crate::state::{AdjustmentState, ErrorState, NotificationState};
use crate::store::{PersistedState, StateRepository};
use crate::telemetry::{
    ErrorRecord, EventPayload, EventSink, LifecycleRecord, LogEvent, NotificationRecord, Severity,
    TracingSink,
};
use crate::types::{
    AdjustmentEvent, HealthLevel, HealthStatus, ReadinessStatus, TemperatureReading,
};
use thermoguard_client::port::{AdjustmentOutcome, NotifierPort, ThermostatPort};

/// Everything concurrent readers can observe, published as one value.
#[derive(Debug, Clone)]
pub struct MonitorState {
    pub phase: Phase,
    pub started_at: Option<DateTime<Utc>>,
    pub cycle_count: u64,
    pub adjustment: AdjustmentState,
    pub notification: NotificationState,
    pub errors: ErrorState,
    /// Bumped by every operator reset. Alerts only latch within their own episode.
    pub error_episode: u64,
    pub readings: HistoryBuffer<TemperatureReading>,
    pub adjustments: HistoryBuffer<AdjustmentEvent>,
    /// Thermostat whose persisted records have been folded in.
    pub restored_for: Option<String>,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            started_at: None,
            cycle_count: 0,
            adjustment: AdjustmentState::default(),
            notification: NotificationState::default(),
            errors: ErrorState::default(),
            error_episode: 0,
            readings: HistoryBuffer::with_cap(READING_HISTORY_CAP),
            adjustments: HistoryBuffer::with_cap(ADJUSTMENT_HISTORY_CAP),
            restored_for: None,
        }
    }
}

impl MonitorState {
    fn persisted(&self) -> PersistedState {
        PersistedState {
            adjustment: self.adjustment.clone(),
            notification: self.notification.clone(),
            errors: self.errors.clone(),
        }
    }

    fn uptime_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.started_at
            .map(|t| u64::try_from((now - t).num_seconds()).unwrap_or(0))
            .unwrap_or(0)
    }
}

/// What a single monitoring cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// No thermostat is wired.
    Skipped,
    ReadFailed,
    /// Differential at or above the threshold.
    Steady,
    /// The rule would adjust but the cooldown is still running.
    CoolingDown { remaining_seconds: u64 },
    Adjusted { previous: f64, new_target: f64 },
    AdjustFailed,
    /// Persisted state could not be loaded; adjustments wait until it is.
    StateUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NotifyPlan {
    Send,
    Suppress,
    Skip,
}

/// Tokens for one `start()` run. Replaced on every start.
#[derive(Debug, Clone, Default)]
struct RunTokens {
    /// Ends the loop after the in-flight cycle.
    stop: CancellationToken,
    /// Aborts the in-flight cycle.
    abort: CancellationToken,
}

struct Inner {
    cfg: Arc<Config>,
    thermostat: Option<Arc<dyn ThermostatPort>>,
    notifier: Option<Arc<dyn NotifierPort>>,
    sink: Arc<dyn EventSink>,
    store: Option<Arc<dyn StateRepository>>,
    /// Single writer of the published snapshot.
    state: watch::Sender<MonitorState>,
    run: Mutex<RunTokens>,
    /// Last records written to the store.
    saved: Mutex<Option<PersistedState>>,
    alerts: AlertDispatcher,
    /// Held for the whole of a cycle.
    cycle: tokio::sync::Mutex<()>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct MonitorBuilder {
    cfg: Config,
    thermostat: Option<Arc<dyn ThermostatPort>>,
    notifier: Option<Arc<dyn NotifierPort>>,
    sink: Option<Arc<dyn EventSink>>,
    store: Option<Arc<dyn StateRepository>>,
}

impl MonitorBuilder {
    pub fn thermostat(mut self, thermostat: Arc<dyn ThermostatPort>) -> Self {
        self.thermostat = Some(thermostat);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn NotifierPort>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Defaults to [`TracingSink`].
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn store(mut self, store: Arc<dyn StateRepository>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Monitor {
        let alert_timeout = self.cfg.alert_timeout();
        let (state, _) = watch::channel(MonitorState::default());
        Monitor {
            inner: Arc::new(Inner {
                cfg: Arc::new(self.cfg),
                thermostat: self.thermostat,
                notifier: self.notifier,
                sink: self.sink.unwrap_or_else(|| Arc::new(TracingSink)),
                store: self.store,
                state,
                run: Mutex::new(RunTokens::default()),
                saved: Mutex::new(None),
                alerts: AlertDispatcher::new(alert_timeout),
                cycle: tokio::sync::Mutex::new(()),
            }),
        }
    }
}

/// The monitoring loop and its query surface. Cheap to clone.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<Inner>,
}

impl Monitor {
    pub fn builder(cfg: Config) -> MonitorBuilder {
        MonitorBuilder { cfg, thermostat: None, notifier: None, sink: None, store: None }
    }

    pub fn config(&self) -> &Config {
        &self.inner.cfg
    }

    fn read<R>(&self, f: impl FnOnce(&MonitorState) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    pub fn phase(&self) -> Phase {
        self.read(|s| s.phase)
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<MonitorState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> MonitorState {
        self.read(MonitorState::clone)
    }

    // ── Lifecycle ──

    /// Run the monitoring loop until `stop()` is called.
    pub async fn start(&self) -> Result<(), MonitorError> {
        let tokens = RunTokens::default();
        let now = Utc::now();
        let mut result = Ok(());
        self.inner.state.send_if_modified(|s| match lifecycle::on_start(s.phase) {
            Ok(next) => {
                s.phase = next;
                s.started_at = Some(now);
                *lock(&self.inner.run) = tokens.clone();
                true
            }
            Err(e) => {
                result = Err(e);
                false
            }
        });
        result?;

        let cfg = Arc::clone(&self.inner.cfg);
        tracing::info!(
            thermostat = self.inner.thermostat.as_deref().map_or("none", |t| t.name()),
            polling_interval_secs = cfg.polling_interval_secs,
            cooldown_period_secs = cfg.cooldown_period_secs,
            temperature_threshold = cfg.temperature_threshold,
            "monitoring loop started"
        );
        self.emit(
            LogEvent::new(Severity::Info, EventPayload::AgentStarted(self.lifecycle_record(now)))
                .with_message("thermoguard monitor started"),
        )
        .await;

        let interval = cfg.polling_interval();
        loop {
            if tokens.stop.is_cancelled() {
                break;
            }
            self.run_supervised_cycle(&tokens.abort).await;

            tokio::select! {
                _ = tokens.stop.cancelled() => {
                    tracing::info!(cycles = self.read(|s| s.cycle_count), "stop requested, exiting monitoring loop");
                    break;
                },
                _ = tokio::time::sleep(interval) => {},
            }
        }

        let now = Utc::now();
        self.emit(
            LogEvent::new(Severity::Info, EventPayload::AgentStopped(self.lifecycle_record(now)))
                .with_message("thermoguard monitor stopped"),
        )
        .await;
        if let Err(e) = self.inner.sink.flush().await {
            tracing::warn!(error = %e, "failed to flush event sink");
        }
        self.inner.state.send_modify(|s| s.phase = Phase::Stopped);
        tracing::info!("monitoring loop stopped");
        Ok(())
    }

    /// Request shutdown and wait for the loop to finish. No-op unless running.
    pub async fn stop(&self) {
        let requested = self.inner.state.send_if_modified(|s| match lifecycle::on_stop(s.phase) {
            Some(next) => {
                s.phase = next;
                true
            }
            None => false,
        });
        if !requested {
            tracing::debug!(phase = self.phase().as_str(), "stop ignored");
            return;
        }

        let tokens = lock(&self.inner.run).clone();
        let grace = self.inner.cfg.shutdown_timeout();
        tracing::info!(grace_secs = grace.as_secs(), "stopping monitor");
        tokens.stop.cancel();

        if !self.wait_for_phase(Phase::Stopped, grace).await {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "in-flight cycle exceeded shutdown grace period, cancelling"
            );
            tokens.abort.cancel();
            if !self.wait_for_phase(Phase::Stopped, grace).await {
                tracing::error!("monitoring loop did not stop after cancellation");
            }
        }

        self.inner.alerts.wait(self.inner.cfg.alert_timeout()).await;
    }

    async fn wait_for_phase(&self, phase: Phase, limit: Duration) -> bool {
        let mut rx = self.inner.state.subscribe();
        let reached = async move { rx.wait_for(|s| s.phase == phase).await.is_ok() };
        tokio::time::timeout(limit, reached).await.unwrap_or(false)
    }

    /// Run one cycle in its own task so a panicking collaborator cannot end the loop.
    async fn run_supervised_cycle(&self, abort: &CancellationToken) {
        let monitor = self.clone();
        let mut handle = tokio::spawn(async move { monitor.run_cycle_at(Utc::now()).await });

        tokio::select! {
            joined = &mut handle => match joined {
                Ok(outcome) => tracing::debug!(?outcome, "cycle finished"),
                Err(e) if e.is_panic() => {
                    let reason = panic_reason(e.into_panic());
                    self.record_failure("monitor_cycle", format!("monitoring cycle panicked: {reason}"), Utc::now())
                        .await;
                }
                Err(e) => tracing::warn!(error = %e, "monitoring cycle task ended unexpectedly"),
            },
            _ = abort.cancelled() => {
                handle.abort();
                tracing::warn!("in-flight monitoring cycle cancelled");
            }
        }
    }

    // ── Cycle ──

    /// Execute one monitoring cycle as of `now`.
    ///
    /// Cycles never overlap: a call made while the loop's own cycle is in
    /// flight waits for it to finish.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleOutcome {
        let _running = self.inner.cycle.lock().await;
        let mut cycle = 0;
        self.inner.state.send_modify(|s| {
            s.cycle_count += 1;
            cycle = s.cycle_count;
        });

        let outcome = self.cycle(now).instrument(tracing::info_span!("cycle", n = cycle)).await;
        self.persist().await;
        outcome
    }

    async fn cycle(&self, now: DateTime<Utc>) -> CycleOutcome {
        let Some(thermostat) = self.inner.thermostat.clone() else {
            tracing::warn!("no thermostat configured, skipping cycle");
            return CycleOutcome::Skipped;
        };

        let reading = match thermostat.get_reading().await {
            Ok(reading) => reading,
            Err(e) => {
                self.record_failure("get_reading", format!("failed to read thermostat: {e}"), now)
                    .await;
                return CycleOutcome::ReadFailed;
            }
        };

        let restored = self.restore_once(&reading.thermostat_id).await;
        self.inner.state.send_modify(|s| {
            s.errors = s.errors.record_success();
            s.readings.push(reading.clone());
        });
        tracing::info!(
            ambient = reading.ambient_temperature,
            target = reading.target_temperature,
            differential = reading.differential(),
            "temperature reading"
        );
        self.emit(
            LogEvent::new(Severity::Info, EventPayload::TemperatureReading(reading.clone())).at(now),
        )
        .await;

        if !restored {
            tracing::warn!(thermostat_id = %reading.thermostat_id, "persisted state unavailable, holding adjustments");
            return CycleOutcome::StateUnavailable;
        }

        let cfg = Arc::clone(&self.inner.cfg);
        let adjustment = self.read(|s| s.adjustment.clone());
        let (ambient, target) = (reading.ambient_temperature, reading.target_temperature);

        if !decision::should_adjust_with_cooldown(
            ambient,
            target,
            &adjustment,
            now,
            cfg.temperature_threshold,
            cfg.cooldown_period_secs,
        ) {
            if decision::should_adjust(ambient, target, cfg.temperature_threshold) {
                let remaining = decision::cooldown_remaining(&adjustment, now, cfg.cooldown_period_secs);
                tracing::info!(remaining_seconds = remaining, "adjustment needed but cooldown active");
                return CycleOutcome::CoolingDown { remaining_seconds: remaining };
            }
            tracing::debug!("differential at or above threshold, no adjustment");
            return CycleOutcome::Steady;
        }

        let new_target = decision::calculate_new_target(
            ambient,
            target,
            cfg.temperature_threshold,
            cfg.temperature_adjustment,
        );
        tracing::info!(current = target, new_target, "adjusting target temperature");

        match thermostat.set_temperature(new_target).await {
            Ok(outcome) if outcome.success => self.apply_adjustment(&reading, outcome, now).await,
            Ok(outcome) => {
                let reason = outcome
                    .error_message
                    .unwrap_or_else(|| "adjustment rejected".to_owned());
                self.record_failure("set_temperature", format!("temperature adjustment failed: {reason}"), now)
                    .await;
                CycleOutcome::AdjustFailed
            }
            Err(e) => {
                self.record_failure("set_temperature", format!("temperature adjustment failed: {e}"), now)
                    .await;
                CycleOutcome::AdjustFailed
            }
        }
    }

    async fn apply_adjustment(
        &self,
        reading: &TemperatureReading,
        outcome: AdjustmentOutcome,
        now: DateTime<Utc>,
    ) -> CycleOutcome {
        let cfg = Arc::clone(&self.inner.cfg);
        let plan = self.notify_plan(now);
        let event = AdjustmentEvent::new(
            outcome.previous_target,
            outcome.new_target,
            reading,
            cfg.temperature_threshold,
            now,
            plan == NotifyPlan::Send,
        );

        self.inner.state.send_modify(|s| {
            s.adjustment = s.adjustment.record_adjustment(reading.ambient_temperature, outcome.new_target, now);
            s.adjustments.push(event.clone());
            if plan == NotifyPlan::Suppress {
                s.notification = s.notification.record_suppressed();
            }
        });
        tracing::info!(
            previous = outcome.previous_target,
            new_target = outcome.new_target,
            ambient = reading.ambient_temperature,
            "temperature adjusted"
        );
        let message = format!(
            "Temperature adjusted from {:.1}°F to {:.1}°F",
            outcome.previous_target, outcome.new_target
        );
        self.emit(
            LogEvent::new(Severity::Info, EventPayload::TemperatureAdjustment(event))
                .at(now)
                .with_message(message),
        )
        .await;

        match plan {
            NotifyPlan::Send => self.send_notification(reading, &outcome, now).await,
            NotifyPlan::Suppress => {
                let remaining = self.read(|s| {
                    decision::rate_limit_remaining(&s.notification, now, cfg.notification_rate_limit_secs)
                });
                tracing::info!(remaining_seconds = remaining, "notification suppressed by rate limit");
            }
            NotifyPlan::Skip => {}
        }

        CycleOutcome::Adjusted { previous: outcome.previous_target, new_target: outcome.new_target }
    }

    fn notify_plan(&self, now: DateTime<Utc>) -> NotifyPlan {
        let cfg = &self.inner.cfg;
        if self.inner.notifier.is_none() {
            return NotifyPlan::Skip;
        }
        if !cfg.notification_rate_limit_enabled {
            return NotifyPlan::Send;
        }
        let limited = self.read(|s| {
            decision::is_rate_limited(&s.notification, now, cfg.notification_rate_limit_secs)
        });
        if limited { NotifyPlan::Suppress } else { NotifyPlan::Send }
    }

    async fn send_notification(
        &self,
        reading: &TemperatureReading,
        outcome: &AdjustmentOutcome,
        now: DateTime<Utc>,
    ) {
        let Some(notifier) = self.inner.notifier.clone() else {
            return;
        };
        let text = messages::adjustment_notification(
            outcome.previous_target,
            outcome.new_target,
            reading.ambient_temperature,
        );
        let sent = notifier.send(text).await;

        let record = NotificationRecord {
            recipient: notifier.recipient_masked(),
            message_summary: messages::adjustment_summary(outcome.previous_target, outcome.new_target),
            success: sent.success,
            error_message: sent.error_message.clone(),
            previous_setting: outcome.previous_target,
            new_setting: outcome.new_target,
            ambient_temperature: reading.ambient_temperature,
        };

        if sent.success {
            self.inner.state.send_modify(|s| s.notification = s.notification.record_sent(now));
            tracing::info!(recipient = %record.recipient, "adjustment notification sent");
            self.emit(LogEvent::new(Severity::Info, EventPayload::NotificationSent(record)).at(now))
                .await;
        } else {
            tracing::warn!(
                recipient = %record.recipient,
                error = record.error_message.as_deref().unwrap_or("unknown"),
                "adjustment notification failed"
            );
            self.emit(LogEvent::new(Severity::Warning, EventPayload::NotificationFailed(record)).at(now))
                .await;
        }
    }

    // ── Errors & alerts ──

    async fn record_failure(&self, operation: &str, message: String, now: DateTime<Utc>) {
        let mut errors = ErrorState::default();
        let mut episode = 0;
        self.inner.state.send_modify(|s| {
            s.errors = s.errors.record_error(message.clone(), now);
            errors = s.errors.clone();
            episode = s.error_episode;
        });
        tracing::error!(
            operation,
            error = %message,
            error_count = errors.error_count,
            consecutive_errors = errors.consecutive_errors,
            "monitoring cycle error"
        );

        let record = ErrorRecord {
            operation: operation.to_owned(),
            error: message.clone(),
            error_count: errors.error_count,
            consecutive_errors: errors.consecutive_errors,
        };
        self.emit(
            LogEvent::new(Severity::Error, EventPayload::ApiError(record))
                .at(now)
                .with_message(message),
        )
        .await;

        if errors.should_send_alert(self.inner.cfg.error_threshold) {
            self.dispatch_alert(&errors, episode);
        }
    }

    fn dispatch_alert(&self, errors: &ErrorState, episode: u64) {
        let threshold = self.inner.cfg.error_threshold;
        let Some(notifier) = self.inner.notifier.clone() else {
            tracing::warn!(error_count = errors.error_count, threshold, "error threshold reached, no notifier configured");
            return;
        };
        let text = messages::error_alert(
            errors.error_count,
            threshold,
            errors.last_error.as_deref().unwrap_or("unknown"),
        );
        let inner = Arc::clone(&self.inner);
        let dispatched = self.inner.alerts.dispatch(notifier, text, move || {
            let latched = inner.state.send_if_modified(|s| {
                if s.error_episode != episode {
                    return false;
                }
                s.errors = s.errors.mark_alert_sent();
                true
            });
            if !latched {
                tracing::info!(episode, "error state was reset while the alert was in flight, latch left open");
            }
        });
        if dispatched {
            tracing::warn!(error_count = errors.error_count, threshold, "error threshold reached, alert dispatched");
        }
    }

    /// Whether an error alert is currently being sent.
    pub fn alert_in_flight(&self) -> bool {
        self.inner.alerts.in_flight()
    }

    /// Wait up to `limit` for in-flight alerts. Returns true if none remain.
    pub async fn wait_for_alerts(&self, limit: Duration) -> bool {
        self.inner.alerts.wait(limit).await
    }

    /// Operator reset of the error counters and alert latch.
    pub fn reset_errors(&self) {
        self.inner.state.send_modify(|s| {
            s.errors = ErrorState::reset();
            s.error_episode += 1;
        });
        tracing::info!("error state reset");
    }

    // ── Persistence ──

    /// Fold persisted records into the live state on first contact with a
    /// thermostat. Returns false while the load keeps failing; the next cycle retries.
    async fn restore_once(&self, thermostat_id: &str) -> bool {
        if self.read(|s| s.restored_for.as_deref() == Some(thermostat_id)) {
            return true;
        }
        let loaded = match &self.inner.store {
            None => None,
            Some(store) => match store.load(thermostat_id).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(error = %e, thermostat_id, "failed to load persisted state, will retry");
                    return false;
                }
            },
        };

        let id = thermostat_id.to_owned();
        self.inner.state.send_modify(|s| {
            if let Some(p) = &loaded {
                s.adjustment = p.adjustment.clone();
                s.notification = p.notification.clone();
                s.errors = s.errors.merged_with(&p.errors);
            }
            s.restored_for = Some(id);
        });
        if let Some(p) = loaded {
            tracing::info!(
                thermostat_id,
                adjustment_count = p.adjustment.adjustment_count,
                error_count = p.errors.error_count,
                "restored persisted monitor state"
            );
        }
        true
    }

    async fn persist(&self) {
        let Some(store) = self.inner.store.clone() else {
            return;
        };
        let (id, current) = self.read(|s| (s.restored_for.clone(), s.persisted()));
        let Some(id) = id else {
            return;
        };
        let unchanged = lock(&self.inner.saved).as_ref() == Some(&current);
        if unchanged {
            return;
        }
        match store.save(&id, &current).await {
            Ok(()) => *lock(&self.inner.saved) = Some(current),
            Err(e) => tracing::warn!(error = %e, thermostat_id = %id, "failed to persist monitor state"),
        }
    }

    // ── Queries ──

    pub fn health_status(&self) -> HealthStatus {
        self.health_status_at(Utc::now())
    }

    pub fn health_status_at(&self, now: DateTime<Utc>) -> HealthStatus {
        let cfg = &self.inner.cfg;
        self.read(|s| {
            let running = s.phase == Phase::Running;
            let healthy = running && s.errors.consecutive_errors < cfg.error_threshold;
            HealthStatus {
                status: if healthy { HealthLevel::Healthy } else { HealthLevel::Degraded },
                running,
                uptime_seconds: s.uptime_seconds(now),
                error_count: s.errors.error_count,
                consecutive_errors: s.errors.consecutive_errors,
                last_error: s.errors.last_error.clone(),
                adjustment_count: s.adjustment.adjustment_count,
                notification_count: s.notification.notification_count,
                notifications_suppressed: s.notification.notifications_suppressed,
                in_cooldown: decision::is_in_cooldown(&s.adjustment, now, cfg.cooldown_period_secs),
                cooldown_remaining_seconds: decision::cooldown_remaining(
                    &s.adjustment,
                    now,
                    cfg.cooldown_period_secs,
                ),
            }
        })
    }

    /// Ready once a thermostat is wired; does not wait for the first cycle.
    pub fn readiness_status(&self) -> ReadinessStatus {
        let thermostat_configured = self.inner.thermostat.is_some();
        ReadinessStatus {
            ready: thermostat_configured,
            thermostat_configured,
            logging_configured: true,
            config_loaded: true,
        }
    }

    pub fn latest_reading(&self) -> Option<TemperatureReading> {
        self.read(|s| s.readings.last().cloned())
    }

    pub fn reading_history(&self, hours: u32) -> Vec<TemperatureReading> {
        self.reading_history_at(hours, Utc::now())
    }

    pub fn reading_history_at(&self, hours: u32, now: DateTime<Utc>) -> Vec<TemperatureReading> {
        let cutoff = now
            .checked_sub_signed(TimeDelta::hours(i64::from(hours)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.read(|s| s.readings.since(cutoff))
    }

    /// Most recent first.
    pub fn adjustment_history(&self, limit: usize) -> Vec<AdjustmentEvent> {
        self.read(|s| s.adjustments.latest(limit))
    }

    fn lifecycle_record(&self, now: DateTime<Utc>) -> LifecycleRecord {
        let polling_interval_secs = self.inner.cfg.polling_interval_secs;
        self.read(|s| LifecycleRecord {
            uptime_seconds: s.uptime_seconds(now),
            polling_interval_secs,
            adjustment_count: s.adjustment.adjustment_count,
            notification_count: s.notification.notification_count,
            error_count: s.errors.error_count,
        })
    }

    async fn emit(&self, event: LogEvent) {
        let kind = event.kind();
        if let Err(e) = self.inner.sink.record(event).await {
            tracing::warn!(event_type = kind.as_str(), error = %e, "failed to record event");
        }
    }
}

fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
