pub mod reconcile;
pub mod task;
