use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

/// Buffers pre-allocated per media type. Fixed at construction: the pool is
/// the pipeline's backpressure mechanism, so it must never grow under
/// pressure.
pub(crate) const POOL_DEPTH: usize = 4;

/// Fixed-capacity pool of reusable buffers.
///
/// `acquire` blocks the caller until a buffer is free; `release` never blocks
/// and never fails. The total number of buffers in circulation is constant:
/// when all of them are in flight, producers stall until the worker catches
/// up. Cloning yields another handle to the same pool.
pub struct BufferPool<B> {
    shared: Arc<Shared<B>>,
}

struct Shared<B> {
    free: Mutex<VecDeque<B>>,
    available: Condvar,
}

impl<B> BufferPool<B> {
    /// Create a pool holding `depth` buffers built by `init`.
    pub fn new(depth: usize, mut init: impl FnMut() -> B) -> Self {
        let mut free = VecDeque::with_capacity(depth);
        for _ in 0..depth {
            free.push_back(init());
        }
        Self {
            shared: Arc::new(Shared { free: Mutex::new(free), available: Condvar::new() }),
        }
    }

    /// Take a buffer, blocking until one is released if the pool is empty.
    pub fn acquire(&self) -> B {
        let mut free = self.shared.free.lock().unwrap();
        loop {
            if let Some(buffer) = free.pop_front() {
                return buffer;
            }
            free = self.shared.available.wait(free).unwrap();
        }
    }

    /// Return a buffer to the pool and wake one blocked producer.
    pub fn release(&self, buffer: B) {
        let mut free = self.shared.free.lock().unwrap();
        free.push_back(buffer);
        drop(free);
        self.shared.available.notify_one();
    }

    /// Number of buffers currently free.
    #[cfg(test)]
    pub fn free_count(&self) -> usize {
        self.shared.free.lock().unwrap().len()
    }
}

impl<B> Clone for BufferPool<B> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn acquire_release_cycles_buffers() {
        let pool = BufferPool::new(2, Vec::<u8>::new);
        let a = pool.acquire();
        let b = pool.acquire();
        assert_eq!(pool.free_count(), 0);
        pool.release(a);
        pool.release(b);
        assert_eq!(pool.free_count(), 2);
    }

    #[test]
    fn fifth_acquire_blocks_until_release() {
        let pool = BufferPool::new(POOL_DEPTH, || vec![0u8; 16]);
        let outstanding: Vec<_> = (0..POOL_DEPTH).map(|_| pool.acquire()).collect();

        let acquired = Arc::new(AtomicBool::new(false));
        let waiter = {
            let pool = pool.clone();
            let acquired = Arc::clone(&acquired);
            thread::spawn(move || {
                let buffer = pool.acquire();
                acquired.store(true, Ordering::SeqCst);
                pool.release(buffer);
            })
        };

        // The fifth acquire must stall while all four buffers are in flight.
        thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));

        for buffer in outstanding {
            pool.release(buffer);
        }
        waiter.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
        assert_eq!(pool.free_count(), POOL_DEPTH);
    }
}
