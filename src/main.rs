use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use iot_telemetry_dashboard::{
    api::{self, AppState},
    broker::{topics::Topics, BrokerLink},
    config::Config,
    control::ControlService,
    db::{
        self,
        repository::{PgSensorRepository, SensorRepository},
    },
    fusion::FusionState,
    persistence::PersistenceService,
    sensors::SensorService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present; env vars may also be set externally
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    // Connect to DB, run migrations, and probe the schema once
    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    let schema = db::probe_schema(&pool).await?;
    if !schema.has_humidity {
        warn!("sensor_records has no humidity column; humidity will not be stored");
    }
    info!(has_humidity = schema.has_humidity, "Database ready");

    let repo: Arc<dyn SensorRepository> = Arc::new(PgSensorRepository::new(pool, schema));

    // Process-wide fused reading shared by the broker loop, the timer and viewers
    let fusion = FusionState::new();
    if config.seed_from_latest {
        match repo.latest().await.context("Failed to load latest record for seeding")? {
            Some(record) => {
                fusion.seed(&record).await;
                info!(id = record.id, "Fused reading seeded from latest stored record");
            }
            None => info!("No stored record to seed from"),
        }
    }

    // Broker link: inbound loop feeds the fusion state
    let topics = Topics::with_prefix(&config.broker.topic_prefix);
    let (broker, eventloop) = BrokerLink::new(&config.broker, topics.clone());
    info!(
        host = %config.broker.host,
        port = config.broker.port,
        client_id = %config.broker.client_id,
        "Connecting to MQTT broker"
    );
    tokio::spawn(
        broker
            .clone()
            .run(eventloop, SensorService::new(topics.clone(), fusion.clone())),
    );

    // Persistence timer
    {
        let persistence =
            PersistenceService::new(repo.clone(), fusion.clone(), config.storage_interval_secs);
        tokio::spawn(persistence.run());
    }

    let state = AppState {
        repo,
        fusion,
        control: ControlService::new(Arc::new(broker), topics.led_command),
    };

    // Start HTTP server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
