//! Single-concurrency task queue.
//!
//! One background worker runs queued tasks strictly in FIFO order, awaiting
//! each to completion before dequeuing the next. Any two tasks submitted to
//! the same [`Worker`] therefore never interleave — this is the mutual
//! exclusion primitive for structural edits that read-modify-write a shared
//! file.

use std::any::Any;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument, warn};

/// A unit of queued work.
#[async_trait::async_trait]
pub trait Task: Send + 'static {
    type Output: Send + 'static;
    async fn run(self: Box<Self>) -> Result<Self::Output>;
}

#[async_trait::async_trait]
trait TaskTrait: Send {
    async fn run_boxed(self: Box<Self>) -> Result<Box<dyn Any + Send>>;
}

#[async_trait::async_trait]
impl<T: Task> TaskTrait for T {
    async fn run_boxed(self: Box<Self>) -> Result<Box<dyn Any + Send>> {
        self.run()
            .await
            .map(|output| Box::new(output) as Box<dyn Any + Send>)
            .map_err(|e| {
                error!(?e, "Task execution failed");
                e
            })
    }
}

enum TaskMessage {
    Execute(Box<dyn TaskTrait>),
    WithResult(
        Box<dyn TaskTrait>,
        oneshot::Sender<Result<Box<dyn Any + Send>>>,
    ),
}

struct WorkerInner {
    sender: mpsc::Sender<TaskMessage>,
    shutdown_sender: Option<oneshot::Sender<()>>,
}

/// Handle to the queue; clones share the same worker.
#[derive(Clone)]
pub struct Worker {
    inner: Arc<WorkerInner>,
}

impl Worker {
    #[must_use]
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel(32);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            info!("Worker task started");
            loop {
                tokio::select! {
                    Some(msg) = receiver.recv() => {
                        // Awaiting here, before the next recv, is what makes
                        // the queue single-concurrency.
                        match msg {
                            TaskMessage::Execute(task) => {
                                if let Err(e) = task.run_boxed().await {
                                    error!(?e, "Task execution failed");
                                }
                            }
                            TaskMessage::WithResult(task, sender) => {
                                let result = task.run_boxed().await;
                                if sender.send(result).is_err() {
                                    warn!("Failed to send task result - receiver dropped");
                                }
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        info!("Worker received shutdown signal");
                        break;
                    }
                }
            }
            info!("Worker task stopped");
        });

        Self {
            inner: Arc::new(WorkerInner {
                sender,
                shutdown_sender: Some(shutdown_tx),
            }),
        }
    }

    /// Enqueue without waiting; fails if the queue is full.
    #[instrument(skip(self, task))]
    pub fn execute<T>(&self, task: T) -> Result<()>
    where
        T: Task + 'static,
    {
        self.inner
            .sender
            .try_send(TaskMessage::Execute(Box::new(task)))
            .map_err(|e| {
                error!(?e, "Failed to execute task");
                anyhow::anyhow!("Failed to execute task: {}", e)
            })
    }

    /// Enqueue, waiting for a queue slot if necessary. The task's result is
    /// discarded.
    #[instrument(skip(self, task))]
    pub async fn submit<T>(&self, task: T) -> Result<()>
    where
        T: Task + 'static,
    {
        self.inner
            .sender
            .send(TaskMessage::Execute(Box::new(task)))
            .await
            .map_err(|e| {
                error!(?e, "Failed to submit task");
                anyhow::anyhow!("Failed to submit task: {}", e)
            })
    }

    /// Enqueue and wait for the task's own result.
    #[instrument(skip(self, task))]
    pub async fn wait_for<T>(&self, task: T) -> Result<T::Output>
    where
        T: Task + 'static,
    {
        let (tx, rx) = oneshot::channel();

        self.inner
            .sender
            .send(TaskMessage::WithResult(Box::new(task), tx))
            .await
            .map_err(|e| {
                error!(?e, "Failed to send task");
                anyhow::anyhow!("Failed to send task: {}", e)
            })?;

        debug!("Waiting for task result");
        let result = rx.await.map_err(|e| {
            error!(?e, "Failed to receive task result");
            anyhow::anyhow!("Failed to receive result: {}", e)
        })??;

        result.downcast().map(|b| *b).map_err(|_| {
            error!("Failed to downcast task result");
            anyhow::anyhow!("Failed to downcast result")
        })
    }
}

impl Drop for WorkerInner {
    fn drop(&mut self) {
        if let Some(sender) = self.shutdown_sender.take() {
            if sender.send(()).is_err() {
                warn!("Failed to send shutdown signal - receiver already dropped");
            }
        }
    }
}

impl Default for Worker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    struct TestTask(i32);

    #[async_trait::async_trait]
    impl Task for TestTask {
        type Output = i32;

        async fn run(self: Box<Self>) -> Result<Self::Output> {
            Ok(self.0 * 2)
        }
    }

    struct ErrorTask;

    #[async_trait::async_trait]
    impl Task for ErrorTask {
        type Output = ();

        async fn run(self: Box<Self>) -> Result<Self::Output> {
            Err(anyhow!("Task failed"))
        }
    }

    #[tokio::test]
    async fn test_wait_for() {
        let worker = Worker::new();
        let result = worker.wait_for(TestTask(21)).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn test_execute() {
        let worker = Worker::new();
        assert!(worker.execute(TestTask(21)).is_ok());
        sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_error_handling() {
        let worker = Worker::new();

        assert!(worker.wait_for(ErrorTask).await.is_err());

        // The worker survives a failed task
        let result = worker.wait_for(TestTask(21)).await.unwrap();
        assert_eq!(result, 42);
    }

    // Two tasks touching shared state must never observe each other mid-run.
    struct OrderedTask {
        busy: Arc<AtomicBool>,
        out: tokio::sync::mpsc::UnboundedSender<i32>,
        id: i32,
    }

    #[async_trait::async_trait]
    impl Task for OrderedTask {
        type Output = ();

        async fn run(self: Box<Self>) -> Result<Self::Output> {
            assert!(
                !self.busy.swap(true, Ordering::SeqCst),
                "two tasks in flight at once"
            );
            sleep(Duration::from_millis(10)).await;
            self.out.send(self.id).unwrap();
            self.busy.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_tasks_run_serially_in_fifo_order() {
        let worker = Worker::new();
        let busy = Arc::new(AtomicBool::new(false));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        for id in 0..5 {
            worker
                .submit(OrderedTask {
                    busy: busy.clone(),
                    out: tx.clone(),
                    id,
                })
                .await
                .unwrap();
        }
        // Flush: wait_for completes only after everything ahead of it ran.
        worker.wait_for(TestTask(0)).await.unwrap();

        let mut seen = Vec::new();
        while let Ok(id) = rx.try_recv() {
            seen.push(id);
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_worker_cloning() {
        let worker = Worker::new();
        let worker2 = worker.clone();

        let (result1, result2) = tokio::join!(
            worker.wait_for(TestTask(21)),
            worker2.wait_for(TestTask(42))
        );

        assert_eq!(result1.unwrap(), 42);
        assert_eq!(result2.unwrap(), 84);
    }

    #[tokio::test]
    async fn test_shutdown() {
        {
            let worker = Worker::new();
            worker.execute(TestTask(1)).unwrap();
            worker.wait_for(TestTask(2)).await.unwrap();
            // Worker dropped here, triggering shutdown
        }
        sleep(Duration::from_millis(50)).await;
    }
}
