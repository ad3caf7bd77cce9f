use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::retry::{RetryPolicy, RetryTracker, spawn_cleanup_task};
use common::worker::Task;
use exec_client::ExecutionClient;
use mq::{BroccoliError, BrokerMessage, init_mq};
use store::{JudgeStore, SeaOrmStore, init_db};
use tokio::sync::Mutex;
use tracing::{error, info};
use worker::{DispatchSettings, Orchestrator, TaskConsumer, WorkerAppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = WorkerAppConfig::load().context("Failed to load config")?;
    info!("Worker starting: {}", config.worker.id);

    let db = init_db(&config.database)
        .await
        .context("Failed to connect to database")?;
    let store: Arc<dyn JudgeStore> = Arc::new(SeaOrmStore::new(db));

    let backend = Arc::new(
        ExecutionClient::new(&config.executor).context("Failed to build execution client")?,
    );
    info!(base_url = %config.executor.base_url, "Execution backend configured");

    let mq = init_mq(&config.mq).await.context("Failed to initialize MQ")?;
    info!(
        queue_name = %config.mq.queue_name,
        concurrency = config.worker.concurrency,
        max_retries = config.mq.max_retries,
        "MQ connected"
    );

    let retries = Arc::new(Mutex::new(RetryTracker::new(RetryPolicy {
        max_retries: config.mq.max_retries,
        base_delay_ms: config.mq.retry_base_delay_ms,
        max_delay_ms: config.mq.retry_max_delay_ms,
    })));
    let _cleanup_handle = spawn_cleanup_task(
        retries.clone(),
        Duration::from_secs(config.worker.retry_cleanup_interval_secs),
        config.mq.task_timeout() * 4,
    );

    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        backend,
        DispatchSettings::from(&config.judge),
    ));
    let consumer = Arc::new(TaskConsumer::new(
        orchestrator,
        store,
        retries,
        config.mq.task_timeout(),
    ));

    let result = mq
        .process_messages(
            &config.mq.queue_name,
            Some(config.worker.concurrency),
            None,
            move |message: BrokerMessage<Task>| {
                let consumer = Arc::clone(&consumer);
                async move {
                    consumer.handle(message.payload).await;
                    Ok::<(), BroccoliError>(())
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Worker stopped unexpectedly");
    }

    Ok(())
}
