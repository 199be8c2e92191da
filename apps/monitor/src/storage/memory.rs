//! In-memory repositories.
//!
//! Each repository guards its map with a `tokio::sync::RwLock`: writers take
//! the lock exclusively, so readers never see a half-appended list.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::{Alert, CheckResult, Target};
use crate::error::{Error, Result};
use crate::repository::{AlertRepository, ResultRepository, TargetRepository};

#[derive(Debug, Default)]
pub struct MemoryTargetRepository {
    targets: RwLock<HashMap<String, Target>>,
}

impl MemoryTargetRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TargetRepository for MemoryTargetRepository {
    async fn save(&self, target: &Target) -> Result<()> {
        self.targets.write().await.insert(target.id.clone(), target.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Target> {
        self.targets
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("target", id))
    }

    async fn get_all(&self) -> Result<Vec<Target>> {
        Ok(self.targets.read().await.values().cloned().collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.targets
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found("target", id))
    }

    async fn update(&self, target: &Target) -> Result<()> {
        let mut targets = self.targets.write().await;
        match targets.get_mut(&target.id) {
            Some(existing) => {
                *existing = target.clone();
                Ok(())
            }
            None => Err(Error::not_found("target", &target.id)),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryResultRepository {
    results: RwLock<HashMap<String, Vec<CheckResult>>>,
}

impl MemoryResultRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultRepository for MemoryResultRepository {
    async fn save(&self, result: &CheckResult) -> Result<()> {
        self.results
            .write()
            .await
            .entry(result.target_id.clone())
            .or_default()
            .push(result.clone());
        Ok(())
    }

    async fn find_by_target_id(&self, target_id: &str) -> Result<Vec<CheckResult>> {
        match self.results.read().await.get(target_id) {
            Some(results) if !results.is_empty() => Ok(results.clone()),
            _ => Err(Error::not_found("results for target", target_id)),
        }
    }

    async fn get_last_by_target_id(&self, target_id: &str) -> Result<CheckResult> {
        self.results
            .read()
            .await
            .get(target_id)
            .and_then(|results| results.last())
            .cloned()
            .ok_or_else(|| Error::not_found("last result for target", target_id))
    }
}

#[derive(Debug, Default)]
pub struct MemoryAlertRepository {
    alerts: RwLock<HashMap<String, Vec<Alert>>>,
}

impl MemoryAlertRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertRepository for MemoryAlertRepository {
    async fn save(&self, alert: &Alert) -> Result<()> {
        self.alerts
            .write()
            .await
            .entry(alert.target_id.clone())
            .or_default()
            .push(alert.clone());
        Ok(())
    }

    async fn find_by_target_id(&self, target_id: &str) -> Result<Vec<Alert>> {
        match self.alerts.read().await.get(target_id) {
            Some(alerts) if !alerts.is_empty() => Ok(alerts.clone()),
            _ => Err(Error::not_found("alerts for target", target_id)),
        }
    }

    async fn get_unresolved_by_target_id(&self, target_id: &str) -> Result<Vec<Alert>> {
        Ok(self
            .alerts
            .read()
            .await
            .get(target_id)
            .map(|alerts| alerts.iter().filter(|a| !a.is_resolved).cloned().collect())
            .unwrap_or_default())
    }

    async fn update(&self, alert: &Alert) -> Result<()> {
        let mut alerts = self.alerts.write().await;
        let existing = alerts
            .get_mut(&alert.target_id)
            .and_then(|list| list.iter_mut().find(|a| a.id == alert.id))
            .ok_or_else(|| Error::not_found("alert", &alert.id))?;

        *existing = alert.clone();
        Ok(())
    }
}
