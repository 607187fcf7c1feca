//! The bounded worker pool named in spec §5: a `tokio::sync::Semaphore`
//! caps how many runs execute concurrently, and a bounded `tokio::sync::mpsc`
//! queue sits in front of it so a burst of submissions either waits
//! ([`BackPressurePolicy::Queue`]) or is rejected
//! ([`BackPressurePolicy::Reject`]) once that queue is full. Grounded on
//! `automaat-server::worker::Worker`'s run-loop shape (pull one unit of
//! work, drive it to completion), generalized here to bounded concurrency
//! instead of one thread polling for one job at a time.

use crate::config::BackPressurePolicy;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::{error, fmt};
use tokio::sync::{mpsc, Semaphore};

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A running bounded worker pool.
///
/// Dropping every [`WorkerPool`] handle closes the submission queue; the
/// dispatch task then drains whatever is already queued and exits.
#[derive(Clone, Debug)]
pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
    back_pressure: BackPressurePolicy,
}

impl WorkerPool {
    /// Starts a pool that runs at most `concurrency` jobs at once, queuing
    /// up to `queue_depth` more.
    #[must_use]
    pub fn spawn(concurrency: usize, queue_depth: usize, back_pressure: BackPressurePolicy) -> Self {
        let (sender, receiver) = mpsc::channel(queue_depth.max(1));
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        tokio::spawn(dispatch(receiver, semaphore));
        Self { sender, back_pressure }
    }

    /// Submits `job` according to this pool's configured back-pressure
    /// policy: queues and waits for room under [`BackPressurePolicy::Queue`],
    /// or fails immediately under [`BackPressurePolicy::Reject`] if the
    /// queue is already full.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::QueueFull`] if rejected, or
    /// [`SubmitError::Closed`] if every [`WorkerPool`] handle (and so the
    /// dispatch task) has already gone away.
    pub async fn submit<F>(&self, job: F) -> Result<(), SubmitError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.back_pressure {
            BackPressurePolicy::Queue => self.sender.send(Box::pin(job)).await.map_err(|_| SubmitError::Closed),
            BackPressurePolicy::Reject => self.try_submit(job),
        }
    }

    /// Submits `job` only if there is immediate room in the queue,
    /// regardless of this pool's configured policy.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::QueueFull`] or [`SubmitError::Closed`].
    pub fn try_submit<F>(&self, job: F) -> Result<(), SubmitError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.sender.try_send(Box::pin(job)).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => SubmitError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SubmitError::Closed,
        })
    }
}

async fn dispatch(mut receiver: mpsc::Receiver<Job>, semaphore: Arc<Semaphore>) {
    while let Some(job) = receiver.recv().await {
        let permit = semaphore.clone().acquire_owned().await.expect("pool semaphore is never closed");
        tokio::spawn(async move {
            job.await;
            drop(permit);
        });
    }
}

/// Ways [`WorkerPool::submit`] or [`WorkerPool::try_submit`] can fail.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitError {
    /// The queue was full and the policy in effect does not wait for room.
    QueueFull,
    /// The pool has shut down.
    Closed,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::QueueFull => f.write_str("submission queue is full"),
            SubmitError::Closed => f.write_str("worker pool is closed"),
        }
    }
}

impl error::Error for SubmitError {}
