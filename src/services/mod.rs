//! Synchronization services built on the domain ports.

pub mod drift_corrector;
pub mod reconciler;
pub mod schedule_executor;
pub mod task_sync_service;

pub use drift_corrector::{DriftCorrector, DriftFailure, DriftRepair, DriftReport};
pub use reconciler::{reconcile, CurrentScheduleState, DesiredScheduleState, ScheduleAction};
pub use schedule_executor::{ScheduleExecutor, ScheduleOutcome};
pub use task_sync_service::TaskSyncService;
