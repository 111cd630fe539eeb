// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Fixed-size pool of engine workers.
//!
//! Every worker thread owns its own [`Engine`] (and so its own SQLite
//! connection) on the same database file. Jobs are taken from a shared queue
//! by whichever worker is idle. Writers serialize on the database lock and the
//! balance version check; readers run in parallel on WAL snapshots.

use std::{
    sync::{Arc, Mutex, mpsc},
    thread::{self, JoinHandle},
};

use tracing::{debug, error, info};

use crate::{
    config::EngineConfig,
    engine::Engine,
    error::{EngineError, ResultEngine},
};

type Job = Box<dyn FnOnce(&mut Engine) + Send + 'static>;

pub struct EnginePool {
    sender: Option<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

/// Result of a job submitted with [`EnginePool::submit`].
pub struct JobHandle<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> JobHandle<T> {
    /// Blocks until the job has run.
    pub fn join(self) -> ResultEngine<T> {
        self.rx.recv().map_err(|_| EngineError::PoolShutdown)
    }
}

impl EnginePool {
    /// Opens `config.workers` engines up front so a bad path fails here, not in a job.
    pub fn open(config: &EngineConfig) -> ResultEngine<Self> {
        let size = config.workers.max(1);
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let engine = Engine::open(config)?;
            let receiver = Arc::clone(&receiver);
            let handle = thread::Builder::new()
                .name(format!("finledger-worker-{id}"))
                .spawn(move || run_worker(id, engine, receiver))?;
            workers.push(handle);
        }
        info!(workers = size, db = %config.db_path.display(), "engine pool started");
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queues `job` and returns a handle to its result.
    pub fn submit<T, F>(&self, job: F) -> JobHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Engine) -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.execute(move |engine| {
            // The caller may have dropped its handle.
            let _ = tx.send(job(engine));
        });
        JobHandle { rx }
    }

    /// Queues `job` without waiting for it.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce(&mut Engine) + Send + 'static,
    {
        if let Some(sender) = &self.sender {
            if sender.send(Box::new(job)).is_err() {
                error!("engine pool queue is closed, job dropped");
            }
        }
    }
}

impl Drop for EnginePool {
    fn drop(&mut self) {
        // Closing the queue lets every worker drain it and exit.
        drop(self.sender.take());
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("engine worker panicked");
            }
        }
    }
}

fn run_worker(id: usize, mut engine: Engine, receiver: Arc<Mutex<mpsc::Receiver<Job>>>) {
    loop {
        let next = match receiver.lock() {
            Ok(queue) => queue.recv(),
            Err(_) => break,
        };
        match next {
            Ok(job) => job(&mut engine),
            Err(_) => break,
        }
    }
    debug!(worker = id, "engine worker stopped");
}
