//! Deferred-destruction ring.
//!
//! Generalized from a single flush-once `Vec<Box<dyn FnOnce()>>` stack into
//! `N = frames_in_flight` buckets advanced one at a time, so a resource destroy never
//! runs while the frame that last used it might still be in flight.
//!
//! `enqueue_destroy` targets the current bucket; since `advance_frame` always moves
//! forward one slot before draining, that bucket isn't drained again until the ring
//! has come all the way around, so a destroy enqueued at frame F survives exactly `N`
//! calls to `advance_frame` before it runs.

use std::sync::Mutex;

type Destroy = Box<dyn FnOnce() + Send>;

struct Ring {
    buckets: Vec<Vec<Destroy>>,
    current: usize,
}

/// Owns `frames_in_flight` buckets of destroy callables and the advance/drain logic.
///
/// Has its own mutex, disjoint from the bindless table's, so resource registration never
/// contends with teardown.
pub struct DestructionRing {
    ring: Mutex<Ring>,
    frames_in_flight: usize,
    initialized: std::sync::atomic::AtomicBool,
}

impl DestructionRing {
    pub fn new(frames_in_flight: usize) -> Self {
        assert!(frames_in_flight >= 1);
        Self {
            ring: Mutex::new(Ring {
                buckets: (0..frames_in_flight).map(|_| Vec::new()).collect(),
                current: 0,
            }),
            frames_in_flight,
            initialized: std::sync::atomic::AtomicBool::new(true),
        }
    }

    /// Marks the ring as not-yet-initialized: destroys enqueued before a real GPU context
    /// exists run inline instead of being buffered. Convenience for bootstrap/tests.
    pub fn uninitialized(frames_in_flight: usize) -> Self {
        let ring = Self::new(frames_in_flight);
        ring.initialized
            .store(false, std::sync::atomic::Ordering::SeqCst);
        ring
    }

    pub fn mark_initialized(&self) {
        self.initialized
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Schedules `f` to run after the GPU has advanced through one full ring.
    pub fn enqueue_destroy<F: FnOnce() + Send + 'static>(&self, f: F) {
        if !self.initialized.load(std::sync::atomic::Ordering::SeqCst) {
            f();
            return;
        }
        let mut ring = match self.ring.lock() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        };
        // `advance_frame` moves `current` forward before draining, so the bucket at
        // today's `current` is the one that comes back around — and gets drained —
        // after exactly `frames_in_flight` advances.
        let target = ring.current;
        ring.buckets[target].push(Box::new(f));
    }

    /// Advances the ring by one frame, running (outside the lock) every destroy whose
    /// delay has elapsed. A no-op on an empty bucket; never waits on GPU state itself —
    /// the caller is expected to have already waited on the relevant frame fence.
    pub fn advance_frame(&self) {
        let pending = {
            let mut ring = match self.ring.lock() {
                Ok(g) => g,
                Err(p) => p.into_inner(),
            };
            ring.current = (ring.current + 1) % self.frames_in_flight;
            std::mem::take(&mut ring.buckets[ring.current])
        };
        for destroy in pending {
            destroy();
        }
    }

    /// Drains every remaining bucket synchronously, in bucket order, guaranteeing zero
    /// leaks on shutdown.
    pub fn drain_all(&self) {
        let buckets = {
            let mut ring = match self.ring.lock() {
                Ok(g) => g,
                Err(p) => p.into_inner(),
            };
            let n = self.frames_in_flight;
            (0..n)
                .map(|i| std::mem::take(&mut ring.buckets[(ring.current + 1 + i) % n]))
                .collect::<Vec<_>>()
        };
        for bucket in buckets {
            for destroy in bucket {
                destroy();
            }
        }
    }

    /// Total pending destroy count across all buckets; used by tests asserting shutdown
    /// drains everything.
    pub fn pending_count(&self) -> usize {
        let ring = match self.ring.lock() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        };
        ring.buckets.iter().map(|b| b.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn destroy_runs_after_exactly_n_advances() {
        let ring = DestructionRing::new(3);
        let ran = Arc::new(AtomicUsize::new(0));
        let flag = ran.clone();
        ring.enqueue_destroy(move || {
            flag.fetch_add(1, Ordering::SeqCst);
        });
        ring.advance_frame();
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        ring.advance_frame();
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        ring.advance_frame();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shutdown_drains_everything() {
        let ring = DestructionRing::new(3);
        for _ in 0..5 {
            ring.enqueue_destroy(|| {});
        }
        assert_eq!(ring.pending_count(), 5);
        ring.drain_all();
        assert_eq!(ring.pending_count(), 0);
    }

    #[test]
    fn advance_on_empty_bucket_is_noop() {
        let ring = DestructionRing::new(3);
        ring.advance_frame();
        ring.advance_frame();
        assert_eq!(ring.pending_count(), 0);
    }

    #[test]
    fn uninitialized_ring_runs_inline() {
        let ring = DestructionRing::uninitialized(3);
        let ran = Arc::new(AtomicUsize::new(0));
        let flag = ran.clone();
        ring.enqueue_destroy(move || {
            flag.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
