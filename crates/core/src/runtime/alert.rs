use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::task::TaskTracker;

use thermoguard_client::port::NotifierPort;

/// Sends error alerts off the cycle's critical path.
///
/// At most one alert is in flight. Each send is bounded by `timeout`, and the
/// tracker lets shutdown wait for whatever is still pending.
#[derive(Debug)]
pub(crate) struct AlertDispatcher {
    tracker: TaskTracker,
    in_flight: Arc<AtomicBool>,
    timeout: Duration,
}

/// Clears the in-flight flag when the alert task ends, panics included.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AlertDispatcher {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            tracker: TaskTracker::new(),
            in_flight: Arc::new(AtomicBool::new(false)),
            timeout,
        }
    }

    pub(crate) fn in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Spawn a send. `on_sent` runs only after a confirmed delivery.
    /// Returns false when another alert is still pending.
    pub(crate) fn dispatch<F>(&self, notifier: Arc<dyn NotifierPort>, message: String, on_sent: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!("error alert already in flight, skipping");
            return false;
        }
        let guard = InFlight(Arc::clone(&self.in_flight));
        let limit = self.timeout;

        self.tracker.spawn(async move {
            let _guard = guard;
            let recipient = notifier.recipient_masked();
            match tokio::time::timeout(limit, notifier.send(message)).await {
                Ok(outcome) if outcome.success => {
                    tracing::info!(recipient = %recipient, "error alert sent");
                    on_sent();
                }
                Ok(outcome) => {
                    tracing::warn!(
                        recipient = %recipient,
                        error = outcome.error_message.as_deref().unwrap_or("unknown"),
                        "error alert failed"
                    );
                }
                Err(_) => {
                    tracing::warn!(recipient = %recipient, timeout_secs = limit.as_secs(), "error alert timed out");
                }
            }
        });
        true
    }

    /// Wait up to `limit` for pending alerts. Returns true if all finished.
    pub(crate) async fn wait(&self, limit: Duration) -> bool {
        self.tracker.close();
        let finished = tokio::time::timeout(limit, self.tracker.wait()).await.is_ok();
        self.tracker.reopen();
        if !finished {
            tracing::warn!(pending = self.tracker.len(), "alerts still pending after wait");
        }
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use thermoguard_client::port::MockNotifier;

    #[tokio::test]
    async fn confirmed_send_runs_callback() {
        let dispatcher = AlertDispatcher::new(Duration::from_secs(5));
        let notifier = Arc::new(MockNotifier::new());
        let confirmed = Arc::new(AtomicU32::new(0));

        let c = Arc::clone(&confirmed);
        assert!(dispatcher.dispatch(notifier.clone(), "alert".into(), move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(dispatcher.wait(Duration::from_secs(5)).await);

        assert_eq!(confirmed.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.messages(), vec!["alert".to_owned()]);
        assert!(!dispatcher.in_flight());
    }

    #[tokio::test]
    async fn failed_send_skips_callback() {
        let dispatcher = AlertDispatcher::new(Duration::from_secs(5));
        let notifier = Arc::new(MockNotifier::new());
        notifier.set_succeed(false);
        let confirmed = Arc::new(AtomicU32::new(0));

        let c = Arc::clone(&confirmed);
        dispatcher.dispatch(notifier, "alert".into(), move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        dispatcher.wait(Duration::from_secs(5)).await;
        assert_eq!(confirmed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn only_one_alert_in_flight() {
        let dispatcher = AlertDispatcher::new(Duration::from_secs(5));
        let notifier = Arc::new(MockNotifier::with_delay(Duration::from_millis(100)));

        assert!(dispatcher.dispatch(notifier.clone(), "first".into(), || {}));
        assert!(!dispatcher.dispatch(notifier.clone(), "second".into(), || {}));
        dispatcher.wait(Duration::from_secs(5)).await;

        assert_eq!(notifier.messages(), vec!["first".to_owned()]);
        // slot is free again
        assert!(dispatcher.dispatch(notifier, "third".into(), || {}));
    }

    #[tokio::test]
    async fn slow_send_is_cut_off_by_timeout() {
        let dispatcher = AlertDispatcher::new(Duration::from_millis(20));
        let notifier = Arc::new(MockNotifier::with_delay(Duration::from_secs(30)));
        let confirmed = Arc::new(AtomicU32::new(0));

        let c = Arc::clone(&confirmed);
        dispatcher.dispatch(notifier, "late".into(), move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert!(dispatcher.wait(Duration::from_secs(5)).await);
        assert_eq!(confirmed.load(Ordering::SeqCst), 0);
        assert!(!dispatcher.in_flight());
    }
}
