// SYNOID Forge Worker
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{error, info};
use uuid::Uuid;

use super::dispatch::{Completed, Dispatcher};
use super::progress::Progress;
use super::request::TransformRequest;
use crate::error::{ForgeError, ForgeResult};

/// Finished jobs kept for `job_status` and `list_jobs`.
pub const JOB_HISTORY: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum JobStatus {
    Queued,
    Processing,
    Completed { duration_secs: f64 },
    Failed(String),
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Failed(_))
    }
}

struct ForgeJob {
    id: Uuid,
    request: TransformRequest,
    progress: Progress,
    done: oneshot::Sender<ForgeResult<Completed>>,
}

/// Caller's view of a submitted job.
pub struct JobHandle {
    pub id: Uuid,
    pub progress: mpsc::UnboundedReceiver<f32>,
    pub done: oneshot::Receiver<ForgeResult<Completed>>,
}

impl JobHandle {
    /// Wait for the result, feeding every progress update to `on_progress`
    /// on the caller's task.
    pub async fn wait_with(self, mut on_progress: impl FnMut(f32)) -> ForgeResult<Completed> {
        let JobHandle { mut progress, mut done, .. } = self;
        loop {
            tokio::select! {
                Some(fraction) = progress.recv() => on_progress(fraction),
                result = &mut done => {
                    while let Ok(fraction) = progress.try_recv() {
                        on_progress(fraction);
                    }
                    return result.unwrap_or_else(|_| {
                        Err(ForgeError::native("forge worker stopped before the job finished"))
                    });
                }
            }
        }
    }
}

/// One background slot running one request at a time. Submitting while a
/// job is in flight is refused with `ForgeError::Busy`.
pub struct ForgeWorker {
    tx: mpsc::UnboundedSender<ForgeJob>,
    busy: Arc<AtomicBool>,
    jobs: Arc<Mutex<Vec<(Uuid, JobStatus)>>>,
}

impl ForgeWorker {
    /// Must be called inside a tokio runtime.
    pub fn new(dispatcher: Dispatcher) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<ForgeJob>();
        let busy = Arc::new(AtomicBool::new(false));
        let jobs = Arc::new(Mutex::new(Vec::<(Uuid, JobStatus)>::new()));

        let busy_worker = busy.clone();
        let jobs_worker = jobs.clone();

        tokio::spawn(async move {
            info!("[WORKER] Forge worker started.");
            while let Some(job) = rx.recv().await {
                let ForgeJob { id, request, progress, done } = job;
                set_status(&jobs_worker, id, JobStatus::Processing).await;
                info!("[WORKER] Processing job {} ({:?})", id, request.kind());
                let started = Instant::now();

                // A panicking strategy unwinds its workspace guards and
                // surfaces as an error instead of killing the slot.
                let dispatcher = dispatcher.clone();
                let result = match tokio::spawn(async move { dispatcher.dispatch(&request, &progress).await }).await {
                    Ok(result) => result,
                    Err(e) => Err(ForgeError::native(format!("job panicked: {}", e))),
                };

                let status = match &result {
                    Ok(_) => {
                        let duration_secs = started.elapsed().as_secs_f64();
                        info!("[WORKER] Job {} completed in {:.1}s", id, duration_secs);
                        JobStatus::Completed { duration_secs }
                    }
                    Err(e) => {
                        error!("[WORKER] Job {} failed: {}", id, e);
                        JobStatus::Failed(e.to_string())
                    }
                };
                set_status(&jobs_worker, id, status).await;

                busy_worker.store(false, Ordering::SeqCst);
                let _ = done.send(result);
            }
            info!("[WORKER] Forge worker stopped.");
        });

        Self { tx, busy, jobs }
    }

    pub async fn submit(&self, request: TransformRequest) -> ForgeResult<JobHandle> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ForgeError::Busy);
        }

        let id = Uuid::new_v4();
        let (progress, progress_rx) = Progress::channel();
        let (done_tx, done_rx) = oneshot::channel();

        set_status(&self.jobs, id, JobStatus::Queued).await;

        let job = ForgeJob { id, request, progress, done: done_tx };
        if self.tx.send(job).is_err() {
            self.busy.store(false, Ordering::SeqCst);
            return Err(ForgeError::native("forge worker is not running"));
        }

        info!("[WORKER] Submitted job {}", id);
        Ok(JobHandle { id, progress: progress_rx, done: done_rx })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub async fn job_status(&self, id: Uuid) -> Option<JobStatus> {
        let jobs = self.jobs.lock().await;
        jobs.iter().find(|(j, _)| *j == id).map(|(_, s)| s.clone())
    }

    pub async fn list_jobs(&self) -> Vec<(Uuid, JobStatus)> {
        self.jobs.lock().await.clone()
    }
}

async fn set_status(jobs: &Mutex<Vec<(Uuid, JobStatus)>>, id: Uuid, status: JobStatus) {
    record(&mut *jobs.lock().await, id, status);
}

/// Updates or appends an entry, then drops the oldest finished jobs beyond
/// `JOB_HISTORY`. Queued and running jobs are never dropped.
fn record(jobs: &mut Vec<(Uuid, JobStatus)>, id: Uuid, status: JobStatus) {
    match jobs.iter_mut().find(|(j, _)| *j == id) {
        Some(entry) => entry.1 = status,
        None => jobs.push((id, status)),
    }
    let mut excess = jobs.iter().filter(|(_, s)| s.is_finished()).count().saturating_sub(JOB_HISTORY);
    jobs.retain(|(_, s)| {
        if excess > 0 && s.is_finished() {
            excess -= 1;
            return false;
        }
        true
    });
}
