//! Storage contracts the monitor engine depends on.
//!
//! Implementations must keep per-target results and alerts in append order:
//! "last result" means the most recently appended one, not the one with the
//! latest timestamp.

use async_trait::async_trait;

use crate::domain::{Alert, CheckResult, Target};
use crate::error::Result;

#[async_trait]
pub trait TargetRepository: Send + Sync {
    /// Insert or replace a target
    async fn save(&self, target: &Target) -> Result<()>;

    /// Fails with `NotFound` if the target does not exist
    async fn find_by_id(&self, id: &str) -> Result<Target>;

    /// All targets, in no particular order
    async fn get_all(&self) -> Result<Vec<Target>>;

    /// Fails with `NotFound` if the target does not exist
    async fn delete(&self, id: &str) -> Result<()>;

    /// Replace an existing target. Unlike `save` this never inserts and fails
    /// with `NotFound` if the target does not exist.
    async fn update(&self, target: &Target) -> Result<()>;
}

#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Append a result to its target's history
    async fn save(&self, result: &CheckResult) -> Result<()>;

    /// Full history in append order. Fails with `NotFound` when the target has
    /// no results yet.
    async fn find_by_target_id(&self, target_id: &str) -> Result<Vec<CheckResult>>;

    /// Most recently appended result. Fails with `NotFound` if there is none.
    async fn get_last_by_target_id(&self, target_id: &str) -> Result<CheckResult>;
}

#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Append a new alert
    async fn save(&self, alert: &Alert) -> Result<()>;

    /// Every alert, open and resolved, in creation order. Fails with
    /// `NotFound` when the target never had an alert.
    async fn find_by_target_id(&self, target_id: &str) -> Result<Vec<Alert>>;

    /// Open alerts only; empty when nothing is open
    async fn get_unresolved_by_target_id(&self, target_id: &str) -> Result<Vec<Alert>>;

    /// Replace the alert with the same id within `alert.target_id`'s list.
    /// Fails with `NotFound` if no such alert exists.
    async fn update(&self, alert: &Alert) -> Result<()>;
}
