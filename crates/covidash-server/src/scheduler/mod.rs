//! User-scheduled dashboard updates.
//!
//! Each update is a one-shot [`Job`] on a shared [`JobScheduler`]. The ledger
//! maps update names to the id of their pending job; a job only acts when
//! the ledger still points at it, so cancelling is a ledger removal plus a
//! best-effort removal of the pending job.
//!
//! [`Job`]: tokio_cron_scheduler::Job

mod jobs;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveTime, Utc};
use covidash_core::{seconds_until, CoreError, UpdateDescriptor, UpdateRequest};
use covidash_sources::SourceError;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{JobScheduler, JobSchedulerError};
use uuid::Uuid;

use crate::store::Store;

/// The data refreshes a scheduled update can trigger.
#[async_trait]
pub trait Refresher: Send + Sync {
    async fn refresh_covid(&self) -> Result<(), SourceError>;
    async fn refresh_news(&self) -> Result<(), SourceError>;
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("an update named \"{0}\" is already scheduled")]
    NameInUse(String),

    #[error("no update named \"{0}\" is scheduled")]
    NotFound(String),

    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error("job scheduler error: {0}")]
    Scheduler(#[from] JobSchedulerError),
}

struct Inner {
    jobs: JobScheduler,
    store: Store,
    refresher: Arc<dyn Refresher>,
    /// Update name → id of its pending job. Lock before the store.
    ledger: Mutex<HashMap<String, Uuid>>,
}

/// Handle to the running update scheduler.
#[derive(Clone)]
pub struct UpdateScheduler {
    inner: Arc<Inner>,
}

impl UpdateScheduler {
    /// Creates and starts the job scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if the scheduler cannot be initialised
    /// or started.
    pub async fn start(
        store: Store,
        refresher: Arc<dyn Refresher>,
    ) -> Result<Self, JobSchedulerError> {
        let jobs = JobScheduler::new().await?;
        jobs.start().await?;
        Ok(Self {
            inner: Arc::new(Inner {
                jobs,
                store,
                refresher,
                ledger: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Schedules `request` to run at its next occurrence after `now`.
    ///
    /// # Errors
    ///
    /// - [`ScheduleError::NameInUse`] if an update with the same name exists.
    /// - [`ScheduleError::Scheduler`] if the job cannot be registered.
    pub async fn schedule(
        &self,
        request: UpdateRequest,
        now: NaiveTime,
    ) -> Result<UpdateDescriptor, ScheduleError> {
        let mut ledger = self.inner.ledger.lock().await;
        if ledger.contains_key(&request.name) {
            return Err(ScheduleError::NameInUse(request.name));
        }

        let delay_secs = seconds_until(now, request.time.time());
        let id = jobs::register(&self.inner, &request, Duration::from_secs(delay_secs)).await?;
        ledger.insert(request.name.clone(), id);

        let descriptor = UpdateDescriptor::from_request(&request, Utc::now());
        self.inner.store.push_update(descriptor.clone()).await;
        drop(ledger);

        tracing::info!(
            name = %request.name,
            time = %request.time,
            repeat = request.repeat,
            delay_secs,
            job_id = %id,
            "scheduler: update scheduled"
        );
        Ok(descriptor)
    }

    /// Cancels the update called `name`.
    ///
    /// A refresh already in progress runs to completion but the update is
    /// not rescheduled.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::NotFound`] if no such update exists.
    pub async fn cancel(&self, name: &str) -> Result<UpdateDescriptor, ScheduleError> {
        let mut ledger = self.inner.ledger.lock().await;
        let Some(id) = ledger.remove(name) else {
            return Err(ScheduleError::NotFound(name.to_owned()));
        };

        if let Err(e) = self.inner.jobs.remove(&id).await {
            tracing::warn!(name, job_id = %id, error = %e, "scheduler: failed to remove pending job");
        }

        let removed = self.inner.store.remove_update(name).await;
        drop(ledger);

        tracing::info!(name, job_id = %id, "scheduler: update cancelled");
        removed.ok_or_else(|| ScheduleError::NotFound(name.to_owned()))
    }

    /// Names of all pending updates, sorted.
    pub async fn active(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.ledger.lock().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Stops the job scheduler. Pending updates are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if the scheduler fails to shut down.
    pub async fn shutdown(&self) -> Result<(), JobSchedulerError> {
        let mut jobs = self.inner.jobs.clone();
        jobs.shutdown().await?;
        tracing::info!("scheduler: shut down");
        Ok(())
    }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
