//! Bounded worker pool — the core's interface to the external task
//! manager. Concurrency is capped at the worker count (CPU count by
//! default); all handles are owned by the pool and joined at drop.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn a pool with one worker per available CPU.
    pub fn with_default_size() -> Self {
        let size = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        Self::new(size)
    }

    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (tx, rx) = channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));
        let workers = (0..size)
            .map(|_| {
                let rx: Arc<Mutex<Receiver<Job>>> = Arc::clone(&rx);
                thread::spawn(move || loop {
                    let job = {
                        let guard = rx.lock().expect("pool receiver poisoned");
                        guard.recv()
                    };
                    match job {
                        Ok(job) => job(),
                        Err(_) => break,
                    }
                })
            })
            .collect();
        Self {
            tx: Some(tx),
            workers,
        }
    }

    /// Submit a job. Runs as soon as a worker is free.
    pub fn execute<F: FnOnce() + Send + 'static>(&self, job: F) {
        if let Some(tx) = &self.tx {
            // Send only fails if every worker has exited.
            let _ = tx.send(Box::new(job));
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.tx.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[test]
    fn jobs_run() {
        let pool = WorkerPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        let (done_tx, done_rx) = mpsc::channel();
        for _ in 0..32 {
            let counter = Arc::clone(&counter);
            let done = done_tx.clone();
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = done.send(());
            });
        }
        for _ in 0..32 {
            done_rx
                .recv_timeout(std::time::Duration::from_secs(5))
                .expect("job did not finish");
        }
        assert_eq!(counter.load(Ordering::SeqCst), 32);
    }

    #[test]
    fn results_flow_back_over_channels() {
        let pool = WorkerPool::new(2);
        let (tx, rx) = mpsc::channel();
        for i in 0..8u64 {
            let tx = tx.clone();
            pool.execute(move || {
                let _ = tx.send(i * i);
            });
        }
        drop(tx);
        let mut results: Vec<u64> = rx.iter().collect();
        results.sort();
        assert_eq!(results, vec![0, 1, 4, 9, 16, 25, 36, 49]);
    }

    #[test]
    fn drop_joins_workers() {
        let pool = WorkerPool::new(2);
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..4 {
            let ran = Arc::clone(&ran);
            pool.execute(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(pool); // must not hang, must finish queued work
        assert_eq!(ran.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn size_is_at_least_one() {
        assert_eq!(WorkerPool::new(0).size(), 1);
    }
}
