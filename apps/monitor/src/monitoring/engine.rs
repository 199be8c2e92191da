use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::checker::Checker;
use crate::domain::{Alert, CheckResult, ResultStatus, Target};
use crate::error::{Error, Result};
use crate::id::IdGenerator;
use crate::repository::{AlertRepository, ResultRepository, TargetRepository};
use crate::storage::{MemoryAlertRepository, MemoryResultRepository, MemoryTargetRepository};

/// Default probe deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Repository handles shared by the engine, scheduler and CLI
#[derive(Clone)]
pub struct Repositories {
    pub targets: Arc<dyn TargetRepository>,
    pub results: Arc<dyn ResultRepository>,
    pub alerts: Arc<dyn AlertRepository>,
}

impl Repositories {
    pub fn new(
        targets: Arc<dyn TargetRepository>,
        results: Arc<dyn ResultRepository>,
        alerts: Arc<dyn AlertRepository>,
    ) -> Self {
        Self { targets, results, alerts }
    }

    /// Fresh, empty in-memory repositories
    pub fn in_memory() -> Self {
        Self {
            targets: Arc::new(MemoryTargetRepository::new()),
            results: Arc::new(MemoryResultRepository::new()),
            alerts: Arc::new(MemoryAlertRepository::new()),
        }
    }
}

/// Everything one check cycle produced
#[derive(Debug)]
pub struct CheckOutcome {
    /// The persisted result
    pub result: CheckResult,
    /// Alert opened by a healthy -> unhealthy transition
    pub opened_alert: Option<Alert>,
    /// Alerts closed by an unhealthy -> healthy transition
    pub resolved_alerts: Vec<Alert>,
    /// Alert bookkeeping failures. These never undo the saved result.
    pub warnings: Vec<Error>,
}

impl CheckOutcome {
    fn new(result: CheckResult) -> Self {
        Self { result, opened_alert: None, resolved_alerts: Vec::new(), warnings: Vec::new() }
    }
}

/// Runs one check cycle per call: probe, classify, persist, then open or
/// resolve alerts based on the previous result.
///
/// Alerts are edge-triggered on an exact 200 status: an alert opens only when
/// the previous result was 200 and the new one is not, and every open alert is
/// resolved when a 200 comes back. A target whose very first check fails gets
/// a result but no alert.
pub struct MonitorEngine {
    repos: Repositories,
    checker: Arc<dyn Checker>,
    ids: Arc<dyn IdGenerator>,
    timeout: Duration,
    record_transport_failures: bool,
    /// Serializes steps that read the previous result and write the new one.
    /// Entries live only while a check holds or waits on them.
    target_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MonitorEngine {
    pub fn new(repos: Repositories, checker: Arc<dyn Checker>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            repos,
            checker,
            ids,
            timeout: DEFAULT_TIMEOUT,
            record_transport_failures: false,
            target_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// When enabled, a probe that fails at the transport level is recorded as
    /// an `ERROR` result with status code 0 instead of aborting the cycle.
    pub fn with_transport_failure_recording(mut self, enabled: bool) -> Self {
        self.record_transport_failures = enabled;
        self
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    /// Check one target and update its result history and alerts.
    ///
    /// Fails if the target does not exist, if the probe fails (unless
    /// transport failures are being recorded) or if the result cannot be
    /// saved. Alert failures are returned in `CheckOutcome::warnings`.
    pub async fn check_target(&self, target_id: &str) -> Result<CheckOutcome> {
        let target = self.repos.targets.find_by_id(target_id).await?;

        let result = self.probe(&target).await?;

        let lock = self.target_lock(&target.id).await;
        let outcome = {
            let _guard = lock.lock().await;
            self.record(&target, result).await
        };
        self.release_target_lock(&target.id, lock).await;

        outcome
    }

    /// Persist a probe result and evaluate alerts. Callers hold the target's
    /// lock.
    async fn record(&self, target: &Target, result: CheckResult) -> Result<CheckOutcome> {
        // must be read before the new result is appended
        let previous = match self.repos.results.get_last_by_target_id(&target.id).await {
            Ok(previous) => Some(previous),
            Err(err) if err.is_not_found() => None,
            Err(err) => {
                warn!("Could not read previous result for {}, assuming none: {}", target.id, err);
                None
            }
        };

        self.repos.results.save(&result).await?;
        debug!(
            "Recorded {} ({}) for {} in {:?}",
            result.status, result.status_code, target.id, result.response_time
        );

        let mut outcome = CheckOutcome::new(result);

        let was_healthy = previous.as_ref().is_some_and(CheckResult::is_healthy);
        if was_healthy && !outcome.result.is_healthy() {
            self.open_alert(target, &mut outcome).await;
        }

        if outcome.result.is_healthy() {
            self.resolve_alerts(target, &mut outcome).await;
        }

        Ok(outcome)
    }

    async fn probe(&self, target: &Target) -> Result<CheckResult> {
        let start = Instant::now();

        // enforce the deadline even if the checker ignores it
        let response =
            match tokio::time::timeout(self.timeout, self.checker.check(&target.url, self.timeout))
                .await
            {
                Ok(response) => response,
                Err(_) => Err(Error::Transport(format!("deadline of {:?} exceeded", self.timeout))),
            };

        match response {
            Ok(response) => Ok(CheckResult::new(
                self.ids.generate(),
                &target.id,
                ResultStatus::from_status_code(response.status_code),
                response.status_code,
                response.response_time,
            )),
            Err(err) if self.record_transport_failures => {
                warn!("Probe of {} failed, recording as error: {}", target.url, err);
                Ok(CheckResult::new(
                    self.ids.generate(),
                    &target.id,
                    ResultStatus::Error,
                    0,
                    start.elapsed(),
                )
                .with_error(err.to_string()))
            }
            Err(err) => {
                warn!("Probe of {} failed: {}", target.url, err);
                Err(err)
            }
        }
    }

    async fn open_alert(&self, target: &Target, outcome: &mut CheckOutcome) {
        let status = outcome.result.status;
        let alert = Alert::new(
            self.ids.generate(),
            &target.id,
            status,
            format!("Target {} is {}", target.url, status),
        );

        match self.repos.alerts.save(&alert).await {
            Ok(()) => {
                info!("Opened alert {} for {}: {}", alert.id, target.id, alert.message);
                outcome.opened_alert = Some(alert);
            }
            Err(err) => {
                warn!("Failed to open alert for {}: {}", target.id, err);
                outcome.warnings.push(err);
            }
        }
    }

    async fn resolve_alerts(&self, target: &Target, outcome: &mut CheckOutcome) {
        let open = match self.repos.alerts.get_unresolved_by_target_id(&target.id).await {
            Ok(open) => open,
            Err(err) if err.is_not_found() => Vec::new(),
            Err(err) => {
                warn!("Failed to load open alerts for {}: {}", target.id, err);
                outcome.warnings.push(err);
                return;
            }
        };

        for mut alert in open {
            alert.resolve();
            match self.repos.alerts.update(&alert).await {
                Ok(()) => {
                    info!("Resolved alert {} for {}", alert.id, target.id);
                    outcome.resolved_alerts.push(alert);
                }
                Err(err) => {
                    warn!("Failed to resolve alert {} for {}: {}", alert.id, target.id, err);
                    outcome.warnings.push(err);
                }
            }
        }
    }

    async fn target_lock(&self, target_id: &str) -> Arc<Mutex<()>> {
        self.target_locks.lock().await.entry(target_id.to_string()).or_default().clone()
    }

    /// Drop the map entry once no other check holds or waits on it
    async fn release_target_lock(&self, target_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.target_locks.lock().await;
        drop(lock);

        if locks.get(target_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(target_id);
        }
    }
}
