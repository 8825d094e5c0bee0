//! Worker pool
//!
//! Fixed set of worker threads fed through a bounded queue. A full queue
//! pushes back on the submitter instead of growing without limit.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, SendTimeoutError, Sender};

use crate::error::Result;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Why a job was not queued
pub enum SubmitError {
    /// Queue still full after the timeout; the job is handed back
    Full(Job),

    /// The pool is shutting down
    Closed,
}

pub struct WorkerPool {
    workers: Vec<Worker>,
    sender: Option<Sender<Job>>,
}

impl WorkerPool {
    /// Spawn `size` workers sharing a queue of `capacity` pending jobs
    pub fn new(size: usize, capacity: usize) -> Result<Self> {
        let (sender, receiver) = channel::bounded(capacity);

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            workers.push(Worker::spawn(id, receiver.clone())?);
        }

        Ok(Self {
            workers,
            sender: Some(sender),
        })
    }

    /// Queue a job, waiting at most `timeout` for a free slot
    pub fn submit_timeout(&self, job: Job, timeout: Duration) -> std::result::Result<(), SubmitError> {
        let Some(sender) = self.sender.as_ref() else {
            return Err(SubmitError::Closed);
        };
        match sender.send_timeout(job, timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(job)) => Err(SubmitError::Full(job)),
            Err(SendTimeoutError::Disconnected(_)) => Err(SubmitError::Closed),
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Jobs waiting for a worker
    pub fn queued(&self) -> usize {
        self.sender.as_ref().map_or(0, |s| s.len())
    }

    /// Close the queue and wait for every worker to finish.
    ///
    /// Jobs already queued still run; they are expected to notice shutdown
    /// themselves and return quickly.
    pub fn join(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.sender.take());

        for worker in self.workers.drain(..) {
            tracing::debug!("Shutting down worker {}", worker.id);
            if worker.thread.join().is_err() {
                tracing::error!("Worker {} panicked", worker.id);
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    id: usize,
    thread: JoinHandle<()>,
}

impl Worker {
    fn spawn(id: usize, receiver: Receiver<Job>) -> Result<Self> {
        let thread = thread::Builder::new()
            .name(format!("framelink-worker-{id}"))
            .spawn(move || {
                // Ends once the queue is closed and drained
                for job in receiver.iter() {
                    tracing::trace!("worker {id} handling a connection");
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        tracing::error!("worker {id}: connection task panicked");
                    }
                }
                tracing::trace!("worker {id} exiting");
            })?;

        Ok(Self { id, thread })
    }
}
