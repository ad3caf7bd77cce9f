pub mod aggregator;
pub mod reconciler;

pub use aggregator::{Aggregator, Completion, classify};
pub use reconciler::{ReconcileReport, ReconcileSettings, Reconciler, run_reconciler};
