use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Row, params};
use std::path::Path;
use std::time::Duration;

use super::pool::{LibsqlManager, LibsqlPool};
use crate::domain::{Alert, CheckResult, ResultStatus, Target};
use crate::error::{Error, Result};
use crate::repository::{AlertRepository, ResultRepository, TargetRepository};

const TARGET_COLUMNS: &str = "id, url, name, interval_ms, is_active, created_at";
const RESULT_COLUMNS: &str =
    "id, target_id, status, status_code, response_time_ns, checked_at, error";
const ALERT_COLUMNS: &str =
    "id, target_id, alert_type, message, created_at, resolved_at, is_resolved";

/// LibSQL-backed implementation of all three repositories
pub struct LibsqlStore {
    pool: LibsqlPool,
}

impl LibsqlStore {
    /// Open (or create) a database file and bring its schema up to date
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_string_lossy().to_string();
        let database = libsql::Builder::new_local(&path).build().await?;
        let pool = deadpool::managed::Pool::builder(LibsqlManager::new(database))
            .build()
            .map_err(|e| Error::Storage(format!("failed to build connection pool: {e}")))?;

        let store = Self::new_from_pool(pool);
        let conn = store.get_conn().await?;
        // readers don't block the single writer
        conn.query("PRAGMA journal_mode = WAL", ()).await?.next().await?;
        super::initialize_database(&conn).await?;

        tracing::info!("Opened database at {}", path);
        Ok(store)
    }

    /// Wrap an existing pool. The schema must already be initialized.
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>> {
        Ok(self.pool.get().await?)
    }
}

fn encode_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|e| Error::Storage(format!("invalid timestamp {raw}: {e}")))
}

fn decode_status(raw: &str) -> Result<ResultStatus> {
    raw.parse().map_err(Error::Storage)
}

fn target_from_row(row: &Row) -> Result<Target> {
    let created_at: String = row.get(5)?;

    Ok(Target {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        interval: Duration::from_millis(row.get::<i64>(3)? as u64),
        is_active: row.get::<i64>(4)? != 0,
        created_at: decode_time(&created_at)?,
    })
}

fn result_from_row(row: &Row) -> Result<CheckResult> {
    let status: String = row.get(2)?;
    let checked_at: String = row.get(5)?;

    Ok(CheckResult {
        id: row.get(0)?,
        target_id: row.get(1)?,
        status: decode_status(&status)?,
        status_code: row.get::<i64>(3)? as u16,
        response_time: Duration::from_nanos(row.get::<i64>(4)? as u64),
        checked_at: decode_time(&checked_at)?,
        error: row.get(6)?,
    })
}

fn alert_from_row(row: &Row) -> Result<Alert> {
    let alert_type: String = row.get(2)?;
    let created_at: String = row.get(4)?;
    let resolved_at: Option<String> = row.get(5)?;

    Ok(Alert {
        id: row.get(0)?,
        target_id: row.get(1)?,
        alert_type: decode_status(&alert_type)?,
        message: row.get(3)?,
        created_at: decode_time(&created_at)?,
        resolved_at: resolved_at.as_deref().map(decode_time).transpose()?,
        is_resolved: row.get::<i64>(6)? != 0,
    })
}

#[async_trait]
impl TargetRepository for LibsqlStore {
    async fn save(&self, target: &Target) -> Result<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO targets (id, url, name, interval_ms, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                url = excluded.url,
                name = excluded.name,
                interval_ms = excluded.interval_ms,
                is_active = excluded.is_active,
                created_at = excluded.created_at",
            params![
                target.id.clone(),
                target.url.clone(),
                target.name.clone(),
                target.interval.as_millis() as i64,
                if target.is_active { 1 } else { 0 },
                encode_time(&target.created_at)
            ],
        )
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Target> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(&format!("SELECT {TARGET_COLUMNS} FROM targets WHERE id = ?"), params![id])
            .await?;

        match rows.next().await? {
            Some(row) => target_from_row(&row),
            None => Err(Error::not_found("target", id)),
        }
    }

    async fn get_all(&self) -> Result<Vec<Target>> {
        let conn = self.get_conn().await?;
        let mut rows = conn.query(&format!("SELECT {TARGET_COLUMNS} FROM targets"), ()).await?;

        let mut targets = Vec::new();
        while let Some(row) = rows.next().await? {
            targets.push(target_from_row(&row)?);
        }
        Ok(targets)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let conn = self.get_conn().await?;
        let affected = conn.execute("DELETE FROM targets WHERE id = ?", params![id]).await?;

        if affected == 0 {
            return Err(Error::not_found("target", id));
        }
        Ok(())
    }

    async fn update(&self, target: &Target) -> Result<()> {
        let conn = self.get_conn().await?;
        let affected = conn
            .execute(
                "UPDATE targets SET url = ?, name = ?, interval_ms = ?, is_active = ?, created_at = ?
                 WHERE id = ?",
                params![
                    target.url.clone(),
                    target.name.clone(),
                    target.interval.as_millis() as i64,
                    if target.is_active { 1 } else { 0 },
                    encode_time(&target.created_at),
                    target.id.clone()
                ],
            )
            .await?;

        if affected == 0 {
            return Err(Error::not_found("target", &target.id));
        }
        Ok(())
    }
}

#[async_trait]
impl ResultRepository for LibsqlStore {
    async fn save(&self, result: &CheckResult) -> Result<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO results (id, target_id, status, status_code, response_time_ns, checked_at, error)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                result.id.clone(),
                result.target_id.clone(),
                result.status.as_str(),
                result.status_code as i64,
                result.response_time.as_nanos() as i64,
                encode_time(&result.checked_at),
                result.error.clone()
            ],
        )
        .await?;
        Ok(())
    }

    async fn find_by_target_id(&self, target_id: &str) -> Result<Vec<CheckResult>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {RESULT_COLUMNS} FROM results WHERE target_id = ? ORDER BY seq"),
                params![target_id],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(result_from_row(&row)?);
        }

        if results.is_empty() {
            return Err(Error::not_found("results for target", target_id));
        }
        Ok(results)
    }

    async fn get_last_by_target_id(&self, target_id: &str) -> Result<CheckResult> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {RESULT_COLUMNS} FROM results WHERE target_id = ? ORDER BY seq DESC LIMIT 1"
                ),
                params![target_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => result_from_row(&row),
            None => Err(Error::not_found("last result for target", target_id)),
        }
    }
}

#[async_trait]
impl AlertRepository for LibsqlStore {
    async fn save(&self, alert: &Alert) -> Result<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO alerts (id, target_id, alert_type, message, created_at, resolved_at, is_resolved)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                alert.id.clone(),
                alert.target_id.clone(),
                alert.alert_type.as_str(),
                alert.message.clone(),
                encode_time(&alert.created_at),
                alert.resolved_at.as_ref().map(encode_time),
                if alert.is_resolved { 1 } else { 0 }
            ],
        )
        .await?;
        Ok(())
    }

    async fn find_by_target_id(&self, target_id: &str) -> Result<Vec<Alert>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE target_id = ? ORDER BY seq"),
                params![target_id],
            )
            .await?;

        let mut alerts = Vec::new();
        while let Some(row) = rows.next().await? {
            alerts.push(alert_from_row(&row)?);
        }

        if alerts.is_empty() {
            return Err(Error::not_found("alerts for target", target_id));
        }
        Ok(alerts)
    }

    async fn get_unresolved_by_target_id(&self, target_id: &str) -> Result<Vec<Alert>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {ALERT_COLUMNS} FROM alerts WHERE target_id = ? AND is_resolved = 0 ORDER BY seq"
                ),
                params![target_id],
            )
            .await?;

        let mut alerts = Vec::new();
        while let Some(row) = rows.next().await? {
            alerts.push(alert_from_row(&row)?);
        }
        Ok(alerts)
    }

    async fn update(&self, alert: &Alert) -> Result<()> {
        let conn = self.get_conn().await?;
        let affected = conn
            .execute(
                "UPDATE alerts SET alert_type = ?, message = ?, created_at = ?, resolved_at = ?, is_resolved = ?
                 WHERE id = ? AND target_id = ?",
                params![
                    alert.alert_type.as_str(),
                    alert.message.clone(),
                    encode_time(&alert.created_at),
                    alert.resolved_at.as_ref().map(encode_time),
                    if alert.is_resolved { 1 } else { 0 },
                    alert.id.clone(),
                    alert.target_id.clone()
                ],
            )
            .await?;

        if affected == 0 {
            return Err(Error::not_found("alert", &alert.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{TempDir, tempdir};

    /// Helper to create a store on a throwaway database file
    async fn create_test_store() -> (LibsqlStore, TempDir) {
        let dir = tempdir().unwrap();
        let store = LibsqlStore::open(dir.path().join("test.db")).await.unwrap();
        (store, dir)
    }

    fn result(id: &str, code: u16) -> CheckResult {
        CheckResult::new(
            id,
            "t1",
            ResultStatus::from_status_code(code),
            code,
            Duration::from_micros(40_123),
        )
    }

    #[tokio::test]
    async fn test_target_upsert_and_update() {
        let (store, _dir) = create_test_store().await;
        let mut target = Target::new("t1", "https://example.com", "Example", Duration::from_secs(30));

        TargetRepository::save(&store, &target).await.unwrap();
        target.name = "Renamed".into();
        TargetRepository::save(&store, &target).await.unwrap();

        assert_eq!(store.get_all().await.unwrap().len(), 1);
        assert_eq!(TargetRepository::find_by_id(&store, "t1").await.unwrap(), target);

        target.is_active = false;
        TargetRepository::update(&store, &target).await.unwrap();
        assert!(!TargetRepository::find_by_id(&store, "t1").await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_target_missing_is_not_found() {
        let (store, _dir) = create_test_store().await;
        let ghost = Target::new("ghost", "https://example.com", "G", Duration::from_secs(5));

        assert!(TargetRepository::find_by_id(&store, "ghost").await.unwrap_err().is_not_found());
        assert!(store.delete("ghost").await.unwrap_err().is_not_found());
        assert!(TargetRepository::update(&store, &ghost).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_last_result_follows_append_order() {
        let (store, _dir) = create_test_store().await;

        // ids deliberately sort opposite to insertion order
        ResultRepository::save(&store, &result("z-first", 200)).await.unwrap();
        let last = result("a-second", 503).with_error("bad gateway");
        ResultRepository::save(&store, &last).await.unwrap();

        assert_eq!(store.get_last_by_target_id("t1").await.unwrap(), last);
        let all = ResultRepository::find_by_target_id(&store, "t1").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "z-first");
    }

    #[tokio::test]
    async fn test_no_results_is_not_found() {
        let (store, _dir) = create_test_store().await;

        assert!(store.get_last_by_target_id("t1").await.unwrap_err().is_not_found());
        assert!(
            ResultRepository::find_by_target_id(&store, "t1").await.unwrap_err().is_not_found()
        );
    }

    #[tokio::test]
    async fn test_alert_resolution_round_trip() {
        let (store, _dir) = create_test_store().await;
        let mut first = Alert::new("a1", "t1", ResultStatus::ServerError, "Target is SERVER_ERROR");
        let second = Alert::new("a2", "t1", ResultStatus::ClientError, "Target is CLIENT_ERROR");
        AlertRepository::save(&store, &first).await.unwrap();
        AlertRepository::save(&store, &second).await.unwrap();

        first.resolve();
        AlertRepository::update(&store, &first).await.unwrap();

        let open = store.get_unresolved_by_target_id("t1").await.unwrap();
        assert_eq!(open, vec![second]);
        let all = AlertRepository::find_by_target_id(&store, "t1").await.unwrap();
        assert_eq!(all[0], first);
        assert!(all[0].resolved_at.is_some());
    }

    #[tokio::test]
    async fn test_alert_update_unknown_id_is_not_found() {
        let (store, _dir) = create_test_store().await;
        AlertRepository::save(&store, &Alert::new("a1", "t1", ResultStatus::Error, "down"))
            .await
            .unwrap();

        let stranger = Alert::new("a2", "t1", ResultStatus::Error, "down");
        assert!(AlertRepository::update(&store, &stranger).await.unwrap_err().is_not_found());
        assert!(store.get_unresolved_by_target_id("nobody").await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_across_targets() {
        let (store, _dir) = create_test_store().await;
        let store = std::sync::Arc::new(store);

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let result = CheckResult::new(
                        format!("r{i}"),
                        format!("t{}", i % 8),
                        ResultStatus::Ok,
                        200,
                        Duration::from_millis(5),
                    );
                    ResultRepository::save(store.as_ref(), &result).await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for t in 0..8 {
            let target_id = format!("t{t}");
            let saved = ResultRepository::find_by_target_id(store.as_ref(), &target_id).await.unwrap();
            assert_eq!(saved.len(), 8);
        }
    }

    #[tokio::test]
    async fn test_reopen_keeps_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("persist.db");

        {
            let store = LibsqlStore::open(&path).await.unwrap();
            ResultRepository::save(&store, &result("r1", 200)).await.unwrap();
        }

        let store = LibsqlStore::open(&path).await.unwrap();
        assert_eq!(store.get_last_by_target_id("t1").await.unwrap().id, "r1");
    }
}
