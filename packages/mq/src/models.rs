pub use broccoli_queue::{
    brokers::broker::BrokerMessage, error::BroccoliError, queue::BroccoliQueue,
};
use common::config::MqAppConfig;

use crate::error::MqError;

pub type MqQueue = BroccoliQueue;

pub async fn init_mq(config: &MqAppConfig) -> Result<MqQueue, MqError> {
    BroccoliQueue::builder(&config.url)
        .pool_connections(config.pool_size)
        .build()
        .await
        .map_err(MqError::from)
}
