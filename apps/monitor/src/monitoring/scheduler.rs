use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use super::engine::MonitorEngine;
use crate::domain::Target;
use crate::error::{Error, Result};

/// Monitoring scheduler - drives periodic checks through the engine
pub struct MonitorScheduler {
    engine: Arc<MonitorEngine>,
}

impl MonitorScheduler {
    pub fn new(engine: Arc<MonitorEngine>) -> Self {
        Self { engine }
    }

    /// Schedule a single target for periodic checking.
    ///
    /// The task re-reads the target on every tick: it skips the check while
    /// the target is paused and exits once the target is deleted. Targets
    /// with an empty URL or a zero interval are refused.
    pub fn schedule_target(&self, target: Target) -> Result<JoinHandle<()>> {
        if !target.is_valid() {
            return Err(Error::Validation(format!(
                "target {} needs a non-empty url and an interval above zero",
                target.id
            )));
        }

        let engine = self.engine.clone();

        Ok(tokio::spawn(async move {
            let mut timer = interval(target.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;

                match engine.repositories().targets.find_by_id(&target.id).await {
                    Ok(current) if !current.is_active => {
                        debug!("Skipping paused target {}", target.id);
                        continue;
                    }
                    Ok(_) => {}
                    Err(err) if err.is_not_found() => {
                        info!("Target {} was removed, stopping its schedule", target.id);
                        break;
                    }
                    Err(err) => {
                        warn!("Failed to load target {}: {}", target.id, err);
                        continue;
                    }
                }

                match engine.check_target(&target.id).await {
                    Ok(outcome) => {
                        debug!(
                            "Checked {}: {} in {:?}",
                            target.id, outcome.result.status, outcome.result.response_time
                        );
                    }
                    Err(err) => warn!("Check of {} failed: {}", target.id, err),
                }
            }
        }))
    }

    /// Check every active target once, concurrently, and return how many
    /// checks succeeded
    pub async fn run_once(&self) -> Result<usize> {
        let targets = self.engine.repositories().targets.get_all().await?;
        let active: Vec<_> = targets.into_iter().filter(|t| t.is_active).collect();

        let outcomes =
            join_all(active.iter().map(|target| self.engine.check_target(&target.id))).await;

        let mut succeeded = 0;
        for (target, outcome) in active.iter().zip(outcomes) {
            match outcome {
                Ok(outcome) => {
                    succeeded += 1;
                    info!("{} ({}): {}", target.name, target.url, outcome.result.status);
                }
                Err(err) => warn!("Check of {} failed: {}", target.id, err),
            }
        }

        Ok(succeeded)
    }

    /// Schedule every active target in the store
    pub async fn schedule_all(&self) -> Result<Vec<JoinHandle<()>>> {
        let targets = self.engine.repositories().targets.get_all().await?;

        let mut handles = Vec::new();
        for target in targets {
            if !target.is_active {
                debug!("Not scheduling inactive target {}", target.id);
                continue;
            }

            match self.schedule_target(target) {
                Ok(handle) => handles.push(handle),
                Err(err) => warn!("Not scheduling target: {}", err),
            }
        }

        info!("Scheduled {} targets", handles.len());
        Ok(handles)
    }
}
