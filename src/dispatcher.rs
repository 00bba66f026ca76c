//! Render-thread dispatcher.
//!
//! A single worker thread, a FIFO job queue guarded by a mutex/condvar pair, and a
//! separate ring for deferred resource frees ([`crate::destruction::DestructionRing`]).
//! Owned as a value by [`crate::engine::Engine`] rather than a process-wide singleton.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::destruction::DestructionRing;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    queue: Mutex<Vec<Job>>,
    cond: Condvar,
    quitting: std::sync::atomic::AtomicBool,
    initialized: std::sync::atomic::AtomicBool,
}

/// Single background worker executing a FIFO of closures submitted from any thread.
///
/// Jobs enqueued from the same thread execute in submission order. A panicking job
/// is caught, logged, and does not stop the worker from draining later jobs.
pub struct Dispatcher {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    destruction: Arc<DestructionRing>,
}

impl Dispatcher {
    /// Constructs the dispatcher without spawning the worker yet; jobs enqueued before
    /// [`Dispatcher::spawn`] run inline on the calling thread (bootstrap convenience).
    pub fn new(destruction: Arc<DestructionRing>) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(Vec::new()),
                cond: Condvar::new(),
                quitting: std::sync::atomic::AtomicBool::new(false),
                initialized: std::sync::atomic::AtomicBool::new(false),
            }),
            worker: Mutex::new(None),
            destruction,
        }
    }

    /// Starts the background worker. Safe to call once; a second call is a no-op.
    pub fn spawn(&self) {
        let mut worker = self.worker.lock().unwrap_or_else(|p| p.into_inner());
        if worker.is_some() {
            return;
        }
        let shared = self.shared.clone();
        let handle = std::thread::Builder::new()
            .name("render-dispatcher".to_string())
            .spawn(move || Self::run(shared))
            .expect("failed to spawn render-dispatcher thread");
        *worker = Some(handle);
        self.shared
            .initialized
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_initialized(&self) -> bool {
        self.shared
            .initialized
            .load(std::sync::atomic::Ordering::SeqCst)
    }

    fn run(shared: Arc<Shared>) {
        loop {
            let mut batch = {
                let mut queue = shared.queue.lock().unwrap_or_else(|p| p.into_inner());
                while queue.is_empty()
                    && !shared.quitting.load(std::sync::atomic::Ordering::SeqCst)
                {
                    queue = shared.cond.wait(queue).unwrap_or_else(|p| p.into_inner());
                }
                if queue.is_empty() {
                    return;
                }
                std::mem::take(&mut *queue)
            };
            for job in batch.drain(..) {
                if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(job)) {
                    let msg = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "non-string panic payload".to_string());
                    tracing::error!(target: "dispatcher", "job panicked: {msg}");
                }
            }
        }
    }

    /// Enqueues `job`; runs inline on the caller if the worker hasn't been spawned yet.
    pub fn enqueue<F: FnOnce() + Send + 'static>(&self, job: F) {
        if !self.is_initialized() {
            job();
            return;
        }
        {
            let mut queue = self
                .shared
                .queue
                .lock()
                .unwrap_or_else(|p| p.into_inner());
            queue.push(Box::new(job));
        }
        self.shared.cond.notify_one();
    }

    /// Delegates to the deferred-destruction ring.
    pub fn enqueue_resource_free<F: FnOnce() + Send + 'static>(&self, job: F) {
        self.destruction.enqueue_destroy(job);
    }

    pub fn advance_frame(&self) {
        self.destruction.advance_frame();
    }

    /// Blocks until the FIFO is empty. Does not drain the deferred-destruction ring.
    pub fn flush(&self) {
        if !self.is_initialized() {
            return;
        }
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        self.enqueue(move || {
            let _ = tx.send(());
        });
        let _ = rx.recv();
    }

    /// Signals shutdown, joins the worker, then drains every deferred-destruction bucket.
    pub fn shutdown(&self) {
        if self.is_initialized() {
            self.shared
                .quitting
                .store(true, std::sync::atomic::Ordering::SeqCst);
            self.shared.cond.notify_all();
            let handle = self
                .worker
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .take();
            if let Some(handle) = handle {
                let _ = handle.join();
            }
        }
        self.destruction.drain_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn inline_before_spawn() {
        let dispatcher = Dispatcher::new(Arc::new(DestructionRing::new(1)));
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        dispatcher.enqueue(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fifo_ordering_under_contention() {
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(DestructionRing::new(1))));
        dispatcher.spawn();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut threads = Vec::new();
        for t in 0..2u32 {
            let dispatcher = dispatcher.clone();
            let log = log.clone();
            threads.push(std::thread::spawn(move || {
                for seq in 0..200u32 {
                    let log = log.clone();
                    dispatcher.enqueue(move || {
                        log.lock().unwrap().push((t, seq));
                    });
                }
            }));
        }
        for t in threads {
            t.join().unwrap();
        }
        dispatcher.flush();
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 400);
        let mut last_seq = [None; 2];
        for &(t, seq) in log.iter() {
            if let Some(prev) = last_seq[t as usize] {
                assert!(seq > prev, "FIFO violated for thread {t}");
            }
            last_seq[t as usize] = Some(seq);
        }
        dispatcher.shutdown();
    }

    #[test]
    fn panicking_job_does_not_kill_worker() {
        let dispatcher = Dispatcher::new(Arc::new(DestructionRing::new(1)));
        dispatcher.spawn();
        dispatcher.enqueue(|| panic!("boom"));
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        dispatcher.enqueue(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        dispatcher.flush();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        dispatcher.shutdown();
    }

    #[test]
    fn shutdown_drains_deferred_ring() {
        let destruction = Arc::new(DestructionRing::new(2));
        let dispatcher = Dispatcher::new(destruction.clone());
        dispatcher.spawn();
        dispatcher.enqueue_resource_free(|| {});
        dispatcher.shutdown();
        assert_eq!(destruction.pending_count(), 0);
    }
}
