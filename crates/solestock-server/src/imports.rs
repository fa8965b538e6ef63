//! In-process tracking of bulk import jobs.
//!
//! Each job has its own progress record keyed by UUID, so concurrent imports
//! never overwrite each other's counters.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use solestock_db::{ImportOutcome, ImportRow};
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Running,
    Completed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportRowError {
    pub index: usize,
    pub sku: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportJob {
    pub id: Uuid,
    pub status: ImportStatus,
    pub total: usize,
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub errors: Vec<ImportRowError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Seconds a completed job stays readable.
const FINISHED_JOB_RETENTION_SECS: i64 = 3600;

#[derive(Debug, Clone)]
pub struct ImportJobStore {
    jobs: Arc<RwLock<HashMap<Uuid, ImportJob>>>,
    retention: TimeDelta,
}

impl Default for ImportJobStore {
    fn default() -> Self {
        Self::with_retention(TimeDelta::seconds(FINISHED_JOB_RETENTION_SECS))
    }
}

impl ImportJobStore {
    #[must_use]
    pub fn with_retention(retention: TimeDelta) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    /// Registers a running job, dropping completed jobs past retention.
    pub async fn create(&self, total: usize) -> Uuid {
        let id = Uuid::new_v4();
        let job = ImportJob {
            id,
            status: ImportStatus::Running,
            total,
            processed: 0,
            created: 0,
            updated: 0,
            errors: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        };
        let mut jobs = self.jobs.write().await;
        let cutoff = job.started_at - self.retention;
        jobs.retain(|_, existing| existing.finished_at.is_none_or(|at| at > cutoff));
        jobs.insert(id, job);
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<ImportJob> {
        self.jobs.read().await.get(&id).cloned()
    }

    async fn record(
        &self,
        id: Uuid,
        index: usize,
        sku: &str,
        result: Result<ImportOutcome, String>,
    ) {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&id) else {
            return;
        };
        job.processed += 1;
        match result {
            Ok(ImportOutcome::Created) => job.created += 1,
            Ok(ImportOutcome::Updated) => job.updated += 1,
            Err(message) => job.errors.push(ImportRowError {
                index,
                sku: sku.to_string(),
                message,
            }),
        }
    }

    async fn finish(&self, id: Uuid) {
        if let Some(job) = self.jobs.write().await.get_mut(&id) {
            job.status = ImportStatus::Completed;
            job.finished_at = Some(Utc::now());
        }
    }

    /// Registers a job and processes its rows on a spawned task.
    ///
    /// Rows are written one at a time in their own transactions; a failing
    /// row is recorded and the job moves on.
    pub async fn spawn_import(&self, pool: PgPool, rows: Vec<ImportRow>) -> Uuid {
        let id = self.create(rows.len()).await;
        let store = self.clone();

        tokio::spawn(async move {
            tracing::info!(job_id = %id, rows = rows.len(), "import started");
            for (index, row) in rows.iter().enumerate() {
                let result = solestock_db::import_row(&pool, row)
                    .await
                    .map_err(|e| e.to_string());
                if let Err(ref message) = result {
                    tracing::warn!(
                        job_id = %id,
                        index,
                        sku = %row.sku,
                        error = %message,
                        "import row failed"
                    );
                }
                store.record(id, index, &row.sku, result).await;
            }
            store.finish(id).await;
            tracing::info!(job_id = %id, "import finished");
        });

        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn jobs_track_progress_independently() {
        let store = ImportJobStore::default();
        let first = store.create(2).await;
        let second = store.create(1).await;

        store
            .record(first, 0, "A-1", Ok(ImportOutcome::Created))
            .await;
        store
            .record(first, 1, "A-2", Err("sku is required".to_string()))
            .await;
        store.finish(first).await;

        let job = store.get(first).await.expect("first job");
        assert_eq!(job.status, ImportStatus::Completed);
        assert_eq!(job.processed, 2);
        assert_eq!(job.created, 1);
        assert_eq!(job.errors.len(), 1);
        assert_eq!(job.errors[0].index, 1);
        assert!(job.finished_at.is_some());

        let other = store.get(second).await.expect("second job");
        assert_eq!(other.status, ImportStatus::Running);
        assert_eq!(other.processed, 0);
    }

    #[tokio::test]
    async fn finished_jobs_are_dropped_after_retention() {
        let store = ImportJobStore::with_retention(TimeDelta::minutes(10));
        let stale = store.create(1).await;
        let recent = store.create(1).await;
        let running = store.create(1).await;
        store.finish(stale).await;
        store.finish(recent).await;
        {
            let mut jobs = store.jobs.write().await;
            let job = jobs.get_mut(&stale).expect("stale job");
            job.finished_at = Some(Utc::now() - TimeDelta::minutes(30));
            let job = jobs.get_mut(&running).expect("running job");
            job.started_at = Utc::now() - TimeDelta::days(1);
        }

        let next = store.create(1).await;

        assert!(store.get(stale).await.is_none());
        assert!(store.get(recent).await.is_some());
        assert!(store.get(running).await.is_some());
        assert!(store.get(next).await.is_some());
    }

    #[tokio::test]
    async fn unknown_job_is_none() {
        let store = ImportJobStore::default();
        assert!(store.get(Uuid::new_v4()).await.is_none());
    }
}
