/// Monitoring engine module - runs health checks and tracks alert state
///
/// This module is responsible for:
/// - Probing targets over HTTP
/// - Classifying and recording each observation
/// - Opening and resolving alerts on health transitions
/// - Scheduling periodic checks per target
pub mod checker;
pub mod engine;
pub mod scheduler;

pub use checker::{Checker, HttpChecker, ProbeResponse};
pub use engine::{CheckOutcome, MonitorEngine, Repositories};
pub use scheduler::MonitorScheduler;
