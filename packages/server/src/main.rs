use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use exec_client::ExecutionClient;
use mq::{BroccoliTaskQueue, init_mq};
use server::config::AppConfig;
use server::judging::{ReconcileSettings, Reconciler, run_reconciler};
use server::state::AppState;
use store::{JudgeStore, SeaOrmStore, init_db};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = init_db(&config.database)
        .await
        .context("Failed to connect to database")?;
    let store: Arc<dyn JudgeStore> = Arc::new(SeaOrmStore::new(db));

    let mq = init_mq(&config.mq).await.context("Failed to initialize MQ")?;
    let queue = Arc::new(
        BroccoliTaskQueue::connect(mq, &config.mq.url, &config.mq.queue_name)
            .await
            .context("Failed to connect task queue")?,
    );
    info!(queue_name = %config.mq.queue_name, "MQ connected");

    let backend = Arc::new(
        ExecutionClient::new(&config.executor).context("Failed to build execution client")?,
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    let reconcile = ReconcileSettings::from(&config.judge);

    let state = AppState::new(config, store.clone(), queue);
    let reconciler = Arc::new(Reconciler::new(
        store,
        backend,
        state.aggregator.clone(),
        reconcile,
    ));
    tokio::spawn(run_reconciler(reconciler));

    let app = server::build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
