use anyhow::{Context, Result};
use log::debug;
use std::thread;
use tokio::sync::mpsc;

/// FIFO task queue with one dedicated worker thread.
///
/// Tasks are delivered to the worker in strict enqueue order over an
/// unbounded channel; ordering matters because container tracks need
/// monotonically non-decreasing timestamps. Backpressure comes from the
/// buffer pool, not from the queue.
///
/// Stopping closes the channel. The channel hands the worker every task that
/// was queued before the close and only then reports disconnection, so
/// shutdown is drain-to-empty rather than abort: a flush task enqueued before
/// `stop` is guaranteed to run last.
pub(crate) struct TaskWorker<T> {
    tx: Option<mpsc::UnboundedSender<T>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl<T: Send + 'static> TaskWorker<T> {
    /// Spawn the worker thread. `run` executes each task synchronously on
    /// that thread; a task failure must be handled inside `run`, the worker
    /// loop itself never exits early.
    pub fn spawn(name: &str, mut run: impl FnMut(T) + Send + 'static) -> Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                while let Some(task) = rx.blocking_recv() {
                    run(task);
                }
            })
            .with_context(|| format!("failed to spawn worker thread {name}"))?;

        Ok(Self { tx: Some(tx), handle: Some(handle) })
    }

    /// Append a task to the queue. Returns the task back if the worker has
    /// already been stopped, so the caller can recover owned buffers.
    pub fn enqueue(&self, task: T) -> std::result::Result<(), T> {
        match &self.tx {
            Some(tx) => tx.send(task).map_err(|err| err.0),
            None => Err(task),
        }
    }
}

impl<T> TaskWorker<T> {
    /// Close the queue and wait for the worker to drain it and exit.
    pub fn stop(&mut self) {
        drop(self.tx.take());
        if let Some(handle) = self.handle.take() {
            let name = handle.thread().name().unwrap_or("worker").to_owned();
            if handle.join().is_err() {
                debug!("{name}: worker thread panicked during drain");
            }
        }
    }
}

impl<T> Drop for TaskWorker<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn executes_tasks_in_enqueue_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let worker = TaskWorker::spawn("test-order", move |n: u32| {
            sink.lock().unwrap().push(n);
        })
        .unwrap();

        for n in 0..100 {
            worker.enqueue(n).unwrap();
        }
        drop(worker);

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn stop_drains_pending_tasks() {
        let executed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&executed);
        let mut worker = TaskWorker::spawn("test-drain", move |_: ()| {
            // Slow task so the queue is still full when stop is called.
            std::thread::sleep(Duration::from_millis(2));
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let queued = 20;
        for _ in 0..queued {
            worker.enqueue(()).unwrap();
        }
        worker.stop();

        assert_eq!(executed.load(Ordering::SeqCst), queued);
    }

    #[test]
    fn enqueue_after_stop_returns_task() {
        let mut worker = TaskWorker::spawn("test-stopped", |_: u32| {}).unwrap();
        worker.stop();
        assert_eq!(worker.enqueue(7), Err(7));
    }
}
