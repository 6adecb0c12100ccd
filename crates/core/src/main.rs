use std::sync::Arc;
use std::time::Duration;

use thermoguard_client::port::{NotifierPort, ThermostatPort};
use thermoguard_core::config::Config;
use thermoguard_core::runtime::{Monitor, ShutdownGuard};
use thermoguard_core::store::{StateRepository, StateStore};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DB_CONNECT_TIMEOUT_SECS: u64 = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cfg = match Config::from_env().and_then(|cfg| cfg.validate().map(|()| cfg)) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };
    cfg.log_summary();

    let thermostat: Option<Arc<dyn ThermostatPort>> =
        thermoguard_client::nest::from_env().map(|c| Arc::new(c) as _);
    match &thermostat {
        Some(t) => tracing::info!(thermostat = t.name(), "thermostat configured"),
        None => tracing::warn!("NEST_PROJECT_ID / NEST_ACCESS_TOKEN not set, thermostat unavailable"),
    }
    let notifier: Option<Arc<dyn NotifierPort>> =
        thermoguard_client::sms::from_env().map(|c| Arc::new(c) as _);
    if let Some(n) = &notifier {
        tracing::info!(recipient = %n.recipient_masked(), "sms notifications enabled");
    }

    let store = connect_store().await;

    let mut builder = Monitor::builder(cfg.clone());
    if let Some(t) = thermostat {
        builder = builder.thermostat(t);
    }
    if let Some(n) = notifier {
        builder = builder.notifier(n);
    }
    if let Some(s) = store {
        builder = builder.store(s);
    }
    let monitor = builder.build();

    let shutdown = ShutdownGuard::new();
    shutdown.spawn_signal_listener();
    let token = shutdown.token();

    let server = tokio::spawn(thermoguard_core::server::serve(
        monitor.clone(),
        cfg.http_port,
        token.clone(),
    ));

    let loop_monitor = monitor.clone();
    let mut monitor_loop = tokio::spawn(async move { loop_monitor.start().await });

    tokio::select! {
        _ = token.cancelled() => {}
        finished = &mut monitor_loop => {
            // the loop only returns on its own if it could not start
            tracing::error!(result = ?finished, "monitoring loop exited unexpectedly");
            token.cancel();
        }
    }

    monitor.stop().await;
    if !monitor_loop.is_finished() {
        let _ = tokio::time::timeout(cfg.shutdown_timeout(), &mut monitor_loop).await;
    }
    token.cancel();
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "http server failed"),
        Err(e) => tracing::error!(error = %e, "http server task panicked"),
    }

    tracing::info!("thermoguard stopped");
    Ok(())
}

/// JSON output when `LOG_FORMAT=json`, filter from `RUST_LOG` (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }
}

/// DATABASE_URL is optional; without a reachable database the process runs ephemeral.
async fn connect_store() -> Option<Arc<dyn StateRepository>> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        tracing::info!("DATABASE_URL not set, running in ephemeral mode");
        return None;
    };

    let connect_result = tokio::time::timeout(
        Duration::from_secs(DB_CONNECT_TIMEOUT_SECS),
        sqlx::postgres::PgPoolOptions::new()
            .max_connections(4)
            .connect(&url),
    )
    .await;

    match connect_result {
        Ok(Ok(pool)) => match sqlx::migrate!("../../migrations").run(&pool).await {
            Ok(()) => {
                tracing::info!("database connected and migrations applied");
                Some(Arc::new(StateStore::new(pool)) as Arc<dyn StateRepository>)
            }
            Err(e) => {
                tracing::warn!(error = %e, "database migration failed, falling back to ephemeral mode");
                None
            }
        },
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "cannot connect to DATABASE_URL, falling back to ephemeral mode");
            None
        }
        Err(_) => {
            tracing::warn!(
                timeout_secs = DB_CONNECT_TIMEOUT_SECS,
                "database connection timed out, falling back to ephemeral mode"
            );
            None
        }
    }
}
