// SPDX-License-Identifier: MIT

//! Background workflow runs with an explicit result channel
//!
//! Every submission gets an id. Its outcome is kept until it expires or is
//! pushed out by newer finished jobs; pending jobs are never evicted.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::adk::error::Result;
use crate::stepwise::workflow::graph::Execution;

/// Finished jobs retained by [`JobStore::new`]
pub const DEFAULT_JOB_CAPACITY: usize = 1000;
/// How long [`JobStore::new`] keeps a finished job
pub const DEFAULT_JOB_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    /// `halted` is set when a step limit cut the run short
    Completed { result: Value, halted: bool },
    Failed { error: String },
}

struct JobEntry {
    status: JobStatus,
    finished_at: Option<Instant>,
}

#[derive(Default)]
struct Jobs {
    entries: HashMap<Uuid, JobEntry>,
    /// Finished job ids, oldest first
    finished: VecDeque<Uuid>,
}

impl Jobs {
    fn drop_expired(&mut self, ttl: Duration) {
        while let Some(id) = self.finished.front() {
            let expired = match self.entries.get(id).and_then(|entry| entry.finished_at) {
                Some(at) => at.elapsed() >= ttl,
                None => true,
            };
            if !expired {
                break;
            }
            if let Some(id) = self.finished.pop_front() {
                log::debug!("Job {} expired", id);
                self.entries.remove(&id);
            }
        }
    }

    fn drop_overflow(&mut self, capacity: usize) {
        while self.finished.len() > capacity {
            if let Some(id) = self.finished.pop_front() {
                log::debug!("Job {} evicted", id);
                self.entries.remove(&id);
            }
        }
    }
}

#[derive(Clone)]
pub struct JobStore {
    jobs: Arc<RwLock<Jobs>>,
    capacity: usize,
    ttl: Duration,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_JOB_CAPACITY, DEFAULT_JOB_TTL)
    }
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` finished jobs, each for at most `ttl`
    pub fn with_limits(capacity: usize, ttl: Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(Jobs::default())),
            capacity,
            ttl,
        }
    }

    /// Record a pending job and run `work` on the runtime
    pub async fn submit(&self, work: BoxFuture<'static, Result<Execution>>) -> Uuid {
        let id = Uuid::new_v4();
        {
            let mut jobs = self.jobs.write().await;
            jobs.drop_expired(self.ttl);
            jobs.entries.insert(
                id,
                JobEntry {
                    status: JobStatus::Pending,
                    finished_at: None,
                },
            );
        }

        let store = self.clone();
        tokio::spawn(async move {
            let status = match AssertUnwindSafe(work).catch_unwind().await {
                Ok(Ok(execution)) => {
                    log::info!("Job {} completed after {} steps", id, execution.steps);
                    JobStatus::Completed {
                        result: execution.state.to_json(),
                        halted: execution.halted,
                    }
                }
                Ok(Err(e)) => {
                    log::error!("Job {} failed: {}", id, e);
                    JobStatus::Failed {
                        error: e.to_string(),
                    }
                }
                Err(payload) => {
                    let error = format!("job panicked: {}", panic_message(payload.as_ref()));
                    log::error!("Job {} {}", id, error);
                    JobStatus::Failed { error }
                }
            };
            store.finish(id, status).await;
        });

        id
    }

    async fn finish(&self, id: Uuid, status: JobStatus) {
        let mut jobs = self.jobs.write().await;
        jobs.drop_expired(self.ttl);
        jobs.entries.insert(
            id,
            JobEntry {
                status,
                finished_at: Some(Instant::now()),
            },
        );
        jobs.finished.push_back(id);
        jobs.drop_overflow(self.capacity);
    }

    pub async fn get(&self, id: &Uuid) -> Option<JobStatus> {
        self.jobs
            .read()
            .await
            .entries
            .get(id)
            .map(|entry| entry.status.clone())
    }

    /// Poll until the job leaves `Pending`
    pub async fn wait(&self, id: &Uuid) -> Option<JobStatus> {
        loop {
            match self.get(id).await {
                Some(JobStatus::Pending) => tokio::time::sleep(Duration::from_millis(10)).await,
                other => return other,
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::StepwiseError;
    use crate::stepwise::workflow::state::State;
    use serde_json::json;

    fn finished(answer: u64, halted: bool) -> BoxFuture<'static, Result<Execution>> {
        async move {
            Ok(Execution {
                state: State::empty().with("answer", answer),
                steps: 1,
                path: vec!["answer".to_string()],
                halted,
            })
        }
        .boxed()
    }

    fn explode() -> Result<Execution> {
        panic!("tool blew up")
    }

    #[tokio::test]
    async fn test_completed_job_keeps_result() {
        let store = JobStore::new();
        let id = store.submit(finished(42, false)).await;

        let status = store.wait(&id).await.unwrap();
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({
                "status": "completed",
                "result": {"messages": [], "answer": 42},
                "halted": false
            })
        );
    }

    #[tokio::test]
    async fn test_halted_run_is_reported() {
        let store = JobStore::new();
        let id = store.submit(finished(7, true)).await;

        match store.wait(&id).await {
            Some(JobStatus::Completed { result, halted }) => {
                assert!(halted);
                assert_eq!(result["answer"], 7);
            }
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_job_keeps_error() {
        let store = JobStore::new();
        let id = store
            .submit(async { Err(StepwiseError::other("backend down")) }.boxed())
            .await;

        match store.wait(&id).await {
            Some(JobStatus::Failed { error }) => assert_eq!(error, "backend down"),
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_panicking_job_is_failed() {
        let store = JobStore::new();
        let id = store.submit(async { explode() }.boxed()).await;

        match store.wait(&id).await {
            Some(JobStatus::Failed { error }) => {
                assert_eq!(error, "job panicked: tool blew up");
            }
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_oldest_finished_jobs_are_evicted() {
        let store = JobStore::with_limits(2, DEFAULT_JOB_TTL);
        let mut ids = Vec::new();
        for answer in 0..3 {
            let id = store.submit(finished(answer, false)).await;
            assert!(store.wait(&id).await.is_some());
            ids.push(id);
        }

        assert!(store.get(&ids[0]).await.is_none());
        assert!(store.get(&ids[1]).await.is_some());
        assert!(store.get(&ids[2]).await.is_some());
    }

    #[tokio::test]
    async fn test_expired_jobs_are_dropped() {
        let store = JobStore::with_limits(DEFAULT_JOB_CAPACITY, Duration::ZERO);
        let first = store.submit(finished(1, false)).await;
        assert!(store.wait(&first).await.is_some());

        store.submit(finished(2, false)).await;
        assert!(store.get(&first).await.is_none());
    }

    #[tokio::test]
    async fn test_pending_jobs_are_not_evicted() {
        let store = JobStore::with_limits(0, Duration::ZERO);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let slow = store
            .submit(
                async move {
                    let _ = rx.await;
                    Err(StepwiseError::other("released"))
                }
                .boxed(),
            )
            .await;

        let quick = store.submit(finished(1, false)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.get(&quick).await.is_none());
        assert_eq!(store.get(&slow).await, Some(JobStatus::Pending));

        tx.send(()).unwrap();
    }

    #[tokio::test]
    async fn test_unknown_job() {
        assert!(JobStore::new().get(&Uuid::new_v4()).await.is_none());
    }
}
