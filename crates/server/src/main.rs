mod health;
mod routes;

use std::sync::Arc;

use anyhow::Result;

use opsdesk_core::audit::InMemoryAuditSink;
use opsdesk_core::clock::SystemClock;
use opsdesk_core::config::{AppConfig, LoadOptions};
use opsdesk_core::gate::StaticAuthorizer;
use opsdesk_core::service::ProcurementService;
use opsdesk_db::{
    seed_demo_orders, DeviceRegistryMaterializer, InMemoryDeviceRepository, InMemoryOrderRepository,
};

use routes::AppState;

fn init_logging(config: &AppConfig) {
    use opsdesk_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

fn build_state(config: &AppConfig) -> AppState {
    let clock = Arc::new(SystemClock);
    let service = ProcurementService::new(
        Arc::new(InMemoryOrderRepository::new()),
        Arc::new(StaticAuthorizer::new(
            config.audit.inbound_roles.clone(),
            config.audit.outbound_roles.clone(),
        )),
        Arc::new(DeviceRegistryMaterializer::new(
            Arc::new(InMemoryDeviceRepository::new()),
            clock.clone(),
        )),
        clock,
        Arc::new(InMemoryAuditSink::default()),
    );
    AppState { service: Arc::new(service) }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let state = build_state(&config);

    if config.server.seed_demo {
        let summary = seed_demo_orders(&state.service).await?;
        tracing::info!(
            event_name = "system.fixtures.seeded",
            correlation_id = "bootstrap",
            fresh = %summary.fresh,
            in_progress = %summary.in_progress,
            awaiting_audit = %summary.awaiting_audit,
            "demo orders seeded"
        );
    }

    let app = routes::router(state.clone()).merge(health::router(state));

    let address = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "opsdesk-server listening"
    );

    axum::serve(listener, app).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "opsdesk-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
