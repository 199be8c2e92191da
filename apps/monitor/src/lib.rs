//! Uppe Monitor - HTTP uptime checks with edge-triggered alerting
//!
//! The heart of the crate is [`MonitorEngine::check_target`]: probe a target,
//! classify and persist the observation, then open or resolve alerts based on
//! the previous observation. Storage and probing sit behind traits so the
//! in-memory store, the LibSQL store or a test double can be plugged in.

pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod id;
pub mod monitoring;
pub mod repository;
pub mod storage;

pub use domain::{Alert, CheckResult, ResultStatus, Target};
pub use error::{Error, Result};
pub use id::{IdGenerator, UuidGenerator};
pub use monitoring::{
    CheckOutcome, Checker, HttpChecker, MonitorEngine, MonitorScheduler, Repositories,
};
pub use repository::{AlertRepository, ResultRepository, TargetRepository};
