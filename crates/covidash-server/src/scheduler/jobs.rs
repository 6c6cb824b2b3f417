use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use covidash_core::{UpdateRequest, REPEAT_INTERVAL};
use tokio_cron_scheduler::{Job, JobSchedulerError};
use uuid::Uuid;

use super::Inner;

type JobFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Registers a one-shot job that runs `request` after `delay` and returns
/// its id.
pub(super) async fn register(
    inner: &Arc<Inner>,
    request: &UpdateRequest,
    delay: Duration,
) -> Result<Uuid, JobSchedulerError> {
    let weak = Arc::downgrade(inner);
    let request = request.clone();

    let job = Job::new_one_shot_async(delay, move |id, _lock| {
        let weak = weak.clone();
        let request = request.clone();
        Box::pin(async move {
            // The scheduler handle has been dropped; nothing to update.
            let Some(inner) = weak.upgrade() else {
                return;
            };
            run_update(inner, id, request).await;
        })
    })?;

    inner.jobs.add(job).await
}

fn run_update(inner: Arc<Inner>, id: Uuid, request: UpdateRequest) -> JobFuture {
    Box::pin(async move {
        let fired_at = Instant::now();
        let name = request.name.as_str();

        if !owns_entry(&inner, name, id).await {
            tracing::debug!(name, job_id = %id, "scheduler: stale job fired; ignoring");
            return;
        }

        tracing::info!(name, refresh = request.target.phrase(), "scheduler: running update");

        if request.target.includes_covid() {
            match inner.refresher.refresh_covid().await {
                Ok(()) => tracing::info!(name, "scheduler: covid data refreshed"),
                Err(e) => tracing::error!(name, error = %e, "scheduler: covid refresh failed"),
            }
        }
        if request.target.includes_news() {
            match inner.refresher.refresh_news().await {
                Ok(()) => tracing::info!(name, "scheduler: news refreshed"),
                Err(e) => tracing::error!(name, error = %e, "scheduler: news refresh failed"),
            }
        }

        let mut ledger = inner.ledger.lock().await;
        if ledger.get(name) != Some(&id) {
            tracing::info!(name, "scheduler: update cancelled while running; not rescheduling");
            return;
        }

        if request.repeat {
            // The next run is due `REPEAT_INTERVAL` after this one fired.
            let delay = REPEAT_INTERVAL.saturating_sub(fired_at.elapsed());
            match register(&inner, &request, delay).await {
                Ok(next) => {
                    ledger.insert(request.name.clone(), next);
                    tracing::info!(name, job_id = %next, "scheduler: repeating update rescheduled");
                }
                Err(e) => {
                    tracing::error!(name, error = %e, "scheduler: failed to reschedule; dropping update");
                    ledger.remove(name);
                    inner.store.remove_update(name).await;
                }
            }
        } else {
            ledger.remove(name);
            inner.store.remove_update(name).await;
            tracing::info!(name, "scheduler: one-off update complete");
        }
    })
}

async fn owns_entry(inner: &Inner, name: &str, id: Uuid) -> bool {
    inner.ledger.lock().await.get(name) == Some(&id)
}
