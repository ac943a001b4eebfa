//! Background task queue.
//!
//! Fire-and-forget work (snapshots, auto-collected examples, auto-triggered
//! training) is enqueued here instead of being spawned ad hoc. A single
//! worker task pulls jobs from a bounded channel and runs them on a
//! `JoinSet`, so jobs may overlap but every one of them is tracked.
//! `drain()` lets callers wait until all queued and in-flight jobs finished.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle, JoinSet};

pub struct Job {
    label: &'static str,
    future: BoxFuture<'static, ()>,
}

enum Message {
    Run(Job),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct BackgroundQueue {
    tx: mpsc::Sender<Message>,
    pending: Arc<AtomicUsize>,
}

impl BackgroundQueue {
    /// Spawns the worker on the current tokio runtime.
    pub fn spawn(capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let pending = Arc::new(AtomicUsize::new(0));
        let handle = tokio::spawn(run_worker(rx, pending.clone()));
        (Self { tx, pending }, handle)
    }

    /// Enqueues a job without waiting. Returns `false` if the job was dropped.
    pub fn enqueue<F>(&self, label: &'static str, future: F) -> bool
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let job = Job {
            label,
            future: Box::pin(future),
        };

        match self.tx.try_send(Message::Run(job)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                tracing::warn!("Background queue full, dropping '{}' job", label);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                tracing::warn!("Background worker stopped, dropping '{}' job", label);
                false
            }
        }
    }

    /// Number of jobs enqueued or running.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Waits for every job enqueued before this call, plus any jobs those
    /// jobs enqueue in turn.
    pub async fn drain(&self) {
        while self.pending() > 0 {
            let (done_tx, done_rx) = oneshot::channel();
            if self.tx.send(Message::Flush(done_tx)).await.is_err() {
                return;
            }
            if done_rx.await.is_err() {
                return;
            }
        }
    }
}

async fn run_worker(mut rx: mpsc::Receiver<Message>, pending: Arc<AtomicUsize>) {
    let mut in_flight: JoinSet<&'static str> = JoinSet::new();
    // Flush requests waiting for `in_flight` to empty. New jobs keep running
    // while they wait.
    let mut waiters: Vec<oneshot::Sender<()>> = Vec::new();

    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some(Message::Run(job)) => {
                    let Job { label, future } = job;
                    tracing::trace!("Running background job '{}'", label);
                    in_flight.spawn(async move {
                        future.await;
                        label
                    });
                }
                Some(Message::Flush(done)) => {
                    if in_flight.is_empty() {
                        let _ = done.send(());
                    } else {
                        waiters.push(done);
                    }
                }
                None => break,
            },
            Some(result) = in_flight.join_next(), if !in_flight.is_empty() => {
                reap(result, &pending);
                if in_flight.is_empty() {
                    notify(&mut waiters);
                }
            }
        }
    }

    while let Some(result) = in_flight.join_next().await {
        reap(result, &pending);
    }
    notify(&mut waiters);
}

fn notify(waiters: &mut Vec<oneshot::Sender<()>>) {
    for done in waiters.drain(..) {
        let _ = done.send(());
    }
}

fn reap(result: Result<&'static str, JoinError>, pending: &AtomicUsize) {
    pending.fetch_sub(1, Ordering::SeqCst);
    if let Err(err) = result {
        tracing::error!("Background job panicked: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    #[tokio::test]
    async fn drain_waits_for_nested_jobs() {
        let (queue, _handle) = BackgroundQueue::spawn(8);
        let finished = Arc::new(AtomicBool::new(false));

        let nested_queue = queue.clone();
        let flag = finished.clone();
        assert!(queue.enqueue("outer", async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            nested_queue.enqueue("inner", async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                flag.store(true, Ordering::SeqCst);
            });
        }));

        queue.drain().await;
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn full_queue_drops_job_without_blocking() {
        let (tx, _rx) = mpsc::channel(1);
        let queue = BackgroundQueue {
            tx,
            pending: Arc::new(AtomicUsize::new(0)),
        };

        assert!(queue.enqueue("first", async {}));
        assert!(!queue.enqueue("second", async {}));
        assert_eq!(queue.pending(), 1);
    }

    #[tokio::test]
    async fn jobs_keep_running_while_drain_waits() {
        let (queue, _handle) = BackgroundQueue::spawn(8);
        queue.enqueue("slow", async {
            tokio::time::sleep(Duration::from_millis(600)).await;
        });

        let draining = queue.clone();
        let drain = tokio::spawn(async move { draining.drain().await });
        tokio::time::sleep(Duration::from_millis(30)).await;

        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        assert!(queue.enqueue("snapshot", async move {
            flag.store(true, Ordering::SeqCst);
        }));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(ran.load(Ordering::SeqCst));
        assert!(!drain.is_finished());

        drain.await.unwrap();
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn drain_on_idle_queue_returns_immediately() {
        let (queue, _handle) = BackgroundQueue::spawn(2);
        queue.enqueue("quick", async {});
        queue.drain().await;
        tokio::time::timeout(Duration::from_millis(100), queue.drain())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn panicking_job_is_reaped() {
        let (queue, _handle) = BackgroundQueue::spawn(4);
        queue.enqueue("boom", async { panic!("boom") });
        queue.drain().await;
        assert_eq!(queue.pending(), 0);
    }
}
