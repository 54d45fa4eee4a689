//! Observable background work.
//!
//! Deferred writes (categorizing bills nobody is looking at yet) run here
//! instead of as detached futures, so failures show up in metrics, in the
//! health payload and in [`BackgroundTasks::recent_failures`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const RECENT_FAILURE_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFailure {
    pub task: String,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackgroundStats {
    pub spawned: u64,
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Shared {
    spawned: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    recent: Mutex<VecDeque<TaskFailure>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Shared {
    fn record_failure(&self, failure: TaskFailure) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut recent) = self.recent.lock() {
            if recent.len() == RECENT_FAILURE_CAPACITY {
                recent.pop_front();
            }
            recent.push_back(failure);
        }
    }
}

/// Cloneable handle for spawning tracked fire-and-forget work.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    shared: Arc<Shared>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `work` on the current runtime and records its outcome under `task`.
    pub fn spawn<F, E>(&self, task: impl Into<String>, work: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let task = task.into();
        let shared = self.shared.clone();
        shared.spawned.fetch_add(1, Ordering::Relaxed);

        let handle = tokio::spawn(async move {
            match work.await {
                Ok(()) => {
                    shared.succeeded.fetch_add(1, Ordering::Relaxed);
                    debug!(task = %task, "background task finished");
                }
                Err(err) => {
                    warn!(task = %task, error = %err, "background task failed");
                    metrics::counter!("background_task_failures_total", "task" => task.clone())
                        .increment(1);
                    shared.record_failure(TaskFailure {
                        task,
                        error: err.to_string(),
                        failed_at: Utc::now(),
                    });
                }
            }
        });

        if let Ok(mut handles) = self.shared.handles.lock() {
            handles.retain(|handle| !handle.is_finished());
            handles.push(handle);
        }
    }

    pub fn stats(&self) -> BackgroundStats {
        BackgroundStats {
            spawned: self.shared.spawned.load(Ordering::Relaxed),
            succeeded: self.shared.succeeded.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
        }
    }

    /// Most recent failures, oldest first.
    pub fn recent_failures(&self) -> Vec<TaskFailure> {
        self.shared
            .recent
            .lock()
            .map(|recent| recent.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Waits for every task spawned so far. Used by shutdown and tests.
    pub async fn drain(&self) {
        let handles = match self.shared.handles.lock() {
            Ok(mut handles) => std::mem::take(&mut *handles),
            Err(_) => return,
        };

        for handle in handles {
            if let Err(err) = handle.await {
                // A panicking task never reached the failure branch above.
                self.shared.record_failure(TaskFailure {
                    task: "unknown".to_string(),
                    error: err.to_string(),
                    failed_at: Utc::now(),
                });
            }
        }
    }
}
