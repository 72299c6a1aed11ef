mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use scanner_api::{AppStateInner, PageWindower, ReadService};
use scanner_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scanner=debug,scanner_ingest=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        page_size = config.page_size,
        refresh_policy = ?config.refresh_policy,
        store_retries = config.store_retries,
        "configuration loaded"
    );

    let db = Arc::new(Database::open(&config.db_path)?);

    let state = Arc::new(AppStateInner {
        db: db.clone(),
        service: ReadService::new(db.clone(), PageWindower::new(config.page_size)),
        jwt_secret: config.jwt_secret.clone(),
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumers = start_ingestion(&config, db, shutdown_rx);

    let app = scanner_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("scanner listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    for handle in consumers {
        if let Err(e) = handle.await {
            warn!("consumer task panicked: {}", e);
        }
    }
    info!("shutdown complete");

    Ok(())
}

#[cfg(feature = "kafka")]
fn start_ingestion(
    config: &Config,
    db: Arc<Database>,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    use scanner_ingest::kafka::KafkaConnector;
    use scanner_ingest::{Consumer, Ingestor, RetryPolicy};
    use scanner_types::events::Topic;

    let Some(brokers) = config.kafka_addr.as_deref() else {
        warn!("SCANNER_KAFKA_ADDR is unset, ingestion disabled");
        return Vec::new();
    };

    let connector = Arc::new(KafkaConnector::new(brokers, config.kafka_group.as_str()));
    let retry = RetryPolicy {
        attempts: config.store_retries.max(1),
        ..RetryPolicy::default()
    };
    let ingestor = Arc::new(Ingestor::new(db, config.refresh_policy, retry));

    info!(brokers, group = %config.kafka_group, "starting consumers");
    Topic::ALL
        .into_iter()
        .map(|topic| Consumer::new(connector.clone(), topic, ingestor.clone()).start(shutdown.clone()))
        .collect()
}

#[cfg(not(feature = "kafka"))]
fn start_ingestion(
    config: &Config,
    _db: Arc<Database>,
    _shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    warn!(
        kafka_addr = ?config.kafka_addr,
        group = %config.kafka_group,
        "built without the kafka feature, serving the read API only"
    );
    Vec::new()
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    warn!("failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("received Ctrl+C, shutting down");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("received Ctrl+C, shutting down"),
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("received Ctrl+C, shutting down");
    }
}
