//! Toolroom scheduling core - main entry point.
//!
//! Hosts the daily scan: once per day at the configured UTC hour the
//! service processes every due schedule. Storage is the embedded in-memory
//! store; deployments embedding the library plug their own repositories in.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use toolroom_api::config::AppConfig;
use toolroom_api::consumers::{CatalogResolver, MaintenanceStrategy, PpeDeliveryStrategy};
use toolroom_api::domain::Actor;
use toolroom_api::events::TracingEventSink;
use toolroom_api::scheduler::{SchedulerService, StrategyRegistry};
use toolroom_api::store::memory::MemoryStore;
use toolroom_api::store::{ScheduleRepository, UnitOfWorkFactory, WorkOrderRepository};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "toolroom-api")]
#[command(about = "Toolroom scheduling core - recurring maintenance and PPE delivery engine")]
#[command(version)]
struct Args {
    /// Log level.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,

    /// Override the configured daily scan hour (UTC, 0-23).
    #[arg(long, env = "TOOLROOM_SCAN_HOUR")]
    scan_hour: Option<u32>,

    /// Run a single scan pass immediately and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level);

    tracing::info!(
        "Starting Toolroom scheduling core v{}",
        env!("CARGO_PKG_VERSION")
    );

    let mut config = AppConfig::load()?;
    if let Some(hour) = args.scan_hour {
        config.scan.hour_utc = hour;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("{e}"))?;
    }
    tracing::info!(scan_hour_utc = config.scan.hour_utc, "Configuration loaded");

    let service = build_service(&config);
    let actor = Actor::system();

    if args.once {
        let summary = service.process_due_schedules(Utc::now(), &actor).await;
        tracing::info!(
            materialized = summary.materialized,
            orders_created = summary.orders_created,
            failed = summary.failed,
            "single pass finished"
        );
        return Ok(());
    }

    loop {
        let wait = until_next_scan(config.scan.hour_utc);
        tracing::info!(
            next_scan_in_secs = wait.as_secs(),
            "waiting for next daily scan"
        );

        tokio::select! {
            () = tokio::time::sleep(wait) => {
                let summary = service.process_due_schedules(Utc::now(), &actor).await;
                if summary.failed > 0 {
                    tracing::warn!(
                        failed = summary.failed,
                        errors = summary.errors.len(),
                        "scan pass finished with failures"
                    );
                }
            }
            () = shutdown_signal() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Wire the service over the embedded in-memory store.
fn build_service(config: &AppConfig) -> SchedulerService {
    let store = Arc::new(MemoryStore::new());

    let mut registry = StrategyRegistry::new();
    registry.register(Arc::new(MaintenanceStrategy::new(
        config.maintenance.custom_policy,
        config.maintenance.reschedule_mode,
    )));
    registry.register(Arc::new(
        PpeDeliveryStrategy::new(Arc::new(CatalogResolver::new())).with_policies(
            config.ppe_delivery.custom_policy,
            config.ppe_delivery.reschedule_mode,
        ),
    ));

    let schedules: Arc<dyn ScheduleRepository> = Arc::clone(&store) as Arc<dyn ScheduleRepository>;
    let orders: Arc<dyn WorkOrderRepository> = Arc::clone(&store) as Arc<dyn WorkOrderRepository>;
    let factory: Arc<dyn UnitOfWorkFactory> = store as Arc<dyn UnitOfWorkFactory>;

    SchedulerService::new(
        schedules,
        orders,
        factory,
        Arc::new(registry),
        Arc::new(TracingEventSink),
    )
}

/// Duration until the next occurrence of the configured UTC hour.
fn until_next_scan(hour_utc: u32) -> Duration {
    let now = Utc::now();
    let today = now
        .date_naive()
        .and_hms_opt(hour_utc, 0, 0)
        .map(|naive| naive.and_utc());
    let next = match today {
        Some(at) if at > now => at,
        Some(at) => at + chrono::Duration::days(1),
        None => now + chrono::Duration::hours(24),
    };
    (next - now).to_std().unwrap_or(Duration::from_secs(60))
}

/// Initialize tracing/logging.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_until_next_scan_is_within_a_day() {
        let wait = until_next_scan(6);
        assert!(wait <= Duration::from_secs(24 * 60 * 60));
    }

    #[test]
    fn test_until_next_scan_is_nonzero_for_current_hour() {
        let hour = Utc::now().hour();
        let wait = until_next_scan(hour);
        assert!(wait > Duration::ZERO);
    }
}
