use arc_swap::ArcSwapOption;
use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Default number of worker threads per processor.
pub(crate) const THREAD_COUNT: usize = 100;
/// Default number of task sub-queues the workers are spread across.
pub(crate) const QUEUE_COUNT: usize = 10;

pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size worker pool running opaque task closures.
///
/// Submission round-robins across a small number of sub-queues to spread
/// contention; each worker blocks on a single sub-queue. There is no work
/// stealing.
pub(crate) struct WorkerPool {
    queues: ArcSwapOption<Vec<Sender<Task>>>,
    next_queue: AtomicUsize,
    active: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(threads: usize, queues: usize) -> WorkerPool {
        assert!(threads > 0 && queues > 0, "pool must have threads and queues");
        let mut senders = Vec::with_capacity(queues);
        let mut receivers = Vec::with_capacity(queues);
        for _ in 0..queues {
            let (sender, receiver) = unbounded::<Task>();
            senders.push(sender);
            receivers.push(receiver);
        }

        let workers = (0..threads)
            .map(|index| {
                let queue = receivers[index % queues].clone();
                thread::Builder::new()
                    .name(format!("lockstep-worker-{index}"))
                    .spawn(move || {
                        while let Ok(task) = queue.recv() {
                            task();
                        }
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();

        WorkerPool {
            queues: ArcSwapOption::new(Some(Arc::new(senders))),
            next_queue: AtomicUsize::new(0),
            active: AtomicBool::new(true),
            workers: Mutex::new(workers),
        }
    }

    /// Whether the pool is accepting and running tasks. The scheduler loops
    /// poll this to know when to exit.
    pub fn active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Submits a task onto the next sub-queue. Silently dropped once the pool
    /// has shut down.
    pub fn submit(&self, task: Task) {
        if let Some(queues) = self.queues.load_full() {
            let index = self.next_queue.fetch_add(1, Ordering::Relaxed) % queues.len();
            let _ = queues[index].send(task);
        }
    }

    /// Stops the pool: already-queued tasks still run, the sub-queue senders
    /// are dropped so every worker's receive loop ends, and the workers are
    /// joined.
    pub fn shutdown(&self) {
        self.active.store(false, Ordering::Release);
        self.queues.store(None);
        for worker in self.workers.lock().drain(..) {
            let _ = worker.join();
        }
    }
}
