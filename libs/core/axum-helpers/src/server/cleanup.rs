//! Resource release during graceful shutdown.

use std::future::Future;
use std::pin::Pin;
use tracing::{error, info};

pub async fn close_postgres(db: sea_orm::DatabaseConnection) {
    match db.close().await {
        Ok(()) => info!("PostgreSQL pool closed"),
        Err(e) => error!(error = %e, "Error closing PostgreSQL pool"),
    }
}

type CleanupTask = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Named cleanup tasks, started together by [`run`](Self::run) and awaited.
///
/// Nothing is polled before `run`, so tasks can be registered at startup.
#[derive(Default)]
pub struct CleanupCoordinator {
    tasks: Vec<(&'static str, CleanupTask)>,
}

impl CleanupCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push((name, Box::pin(task)));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub async fn run(self) {
        let handles: Vec<_> = self
            .tasks
            .into_iter()
            .map(|(name, task)| (name, tokio::spawn(task)))
            .collect();

        for (name, handle) in handles {
            match handle.await {
                Ok(()) => info!(task = name, "Cleanup task finished"),
                Err(e) => error!(task = name, error = %e, "Cleanup task failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_runs_every_task() {
        let done = Arc::new(AtomicUsize::new(0));
        let mut cleanup = CleanupCoordinator::new();
        for name in ["postgres", "redis"] {
            let done = done.clone();
            cleanup.add_task(name, async move {
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(cleanup.len(), 2);
        cleanup.run().await;
        assert_eq!(done.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_stop_others() {
        let done = Arc::new(AtomicUsize::new(0));
        let mut cleanup = CleanupCoordinator::new();
        cleanup.add_task("boom", async { panic!("boom") });
        let counter = done.clone();
        cleanup.add_task("ok", async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        cleanup.run().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tasks_wait_for_run() {
        let done = Arc::new(AtomicUsize::new(0));
        let mut cleanup = CleanupCoordinator::new();
        let counter = done.clone();
        cleanup.add_task("deferred", async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::task::yield_now().await;
        assert_eq!(done.load(Ordering::SeqCst), 0);

        cleanup.run().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
