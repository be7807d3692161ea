use dotenv::dotenv;
use paynow_core::api::{self, AppState};
use paynow_core::config::AppConfig;
use paynow_core::gateway::GatewayClient;
use paynow_core::logging;
use paynow_core::notify::{NotificationVerifier, StatusMap};
use paynow_core::reconcile::ReconcileEngine;
use paynow_core::signature::SignatureScheme;
use paynow_core::store::{MemoryStore, TransactionStore};
use paynow_core::workers::PollWorker;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logging::init_tracing();

    let config = AppConfig::load()?;
    info!("starting payment reconciliation service");

    // Built-in in-memory adapter; deployments wire their own store.
    let store: Arc<dyn TransactionStore> = Arc::new(MemoryStore::new());
    let engine = Arc::new(ReconcileEngine::new(store.clone()));
    let client = Arc::new(GatewayClient::new(config.gateway.clone())?);
    let verifier = Arc::new(NotificationVerifier::new(
        SignatureScheme::new(config.gateway.integration_key.clone()),
        StatusMap::paynow(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let poller_handle = if config.poller.enabled {
        let worker = PollWorker::new(
            config.poller.clone(),
            store.clone(),
            client.clone(),
            verifier.clone(),
            engine.clone(),
        );
        Some(tokio::spawn(async move {
            worker.run(shutdown_rx).await;
        }))
    } else {
        info!("poll fallback worker disabled by configuration");
        None
    };

    let state = AppState {
        engine,
        client,
        verifier,
        store,
        gateway: config.gateway.clone(),
    };
    let app = api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = poller_handle {
        let _ = handle.await;
    }

    Ok(())
}
