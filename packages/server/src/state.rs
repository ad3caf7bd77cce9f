use std::sync::Arc;

use mq::TaskQueue;
use store::JudgeStore;

use crate::config::AppConfig;
use crate::judging::Aggregator;
use crate::services::{AdminService, SubmissionService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn JudgeStore>,
    pub submissions: Arc<SubmissionService>,
    pub admin: Arc<AdminService>,
    pub aggregator: Arc<Aggregator>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn JudgeStore>, queue: Arc<dyn TaskQueue>) -> Self {
        let submissions = Arc::new(SubmissionService::new(
            store.clone(),
            queue,
            config.submission.clone(),
            config.mq.clone(),
        ));
        let admin = Arc::new(AdminService::new(submissions.clone(), store.clone()));
        let aggregator = Arc::new(Aggregator::new(store.clone()));
        Self {
            config: Arc::new(config),
            store,
            submissions,
            admin,
            aggregator,
        }
    }
}
