//! How background flows get a thread to run on.
//!
//! A flow blocks its thread for the whole transit delay of its packet, so
//! every flow in flight needs a thread of its own. [`Unbounded`] spawns a
//! new thread per flow; [`WorkerPool`] caps the number of flows in flight
//! and queues the others.

use anyhow::{Context as _, Result, anyhow, bail};
use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
        mpsc,
    },
    thread::{self, JoinHandle},
};

/// A unit of background work: usually one packet crossing the network.
pub type Flow = Box<dyn FnOnce() + Send + 'static>;

/// Runs flows concurrently with the caller.
pub trait Dispatcher: Send + Sync {
    /// Hand a flow over. Never waits for the flow to complete.
    fn dispatch(&self, flow: Flow) -> Result<()>;

    /// Wait for every dispatched flow to complete and release the threads.
    ///
    /// No flow can be dispatched afterwards.
    fn shutdown(&self) -> Result<()>;
}

/// One dedicated thread per flow.
///
/// Concurrency is only limited by how many threads the system lets the
/// process spawn.
#[derive(Debug, Default)]
pub struct Unbounded {
    next: AtomicU64,
    flows: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

/// A fixed number of threads fed by an unbounded queue.
#[derive(Debug)]
pub struct WorkerPool {
    queue: Mutex<Option<mpsc::Sender<Flow>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

fn run(flow: Flow) {
    if panic::catch_unwind(AssertUnwindSafe(flow)).is_err() {
        let current = thread::current();
        tracing::error!(thread = current.name().unwrap_or("<unnamed>"), "background flow panicked");
    }
}

fn join_all(handles: Vec<JoinHandle<()>>) -> Result<()> {
    for handle in handles {
        let name = handle.thread().name().unwrap_or("<unnamed>").to_owned();
        handle
            .join()
            .map_err(|error| anyhow!("Thread {name} panicked: {error:?}"))?;
    }
    Ok(())
}

impl Unbounded {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Dispatcher for Unbounded {
    fn dispatch(&self, flow: Flow) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            bail!("Cannot dispatch flow, dispatcher is shut down")
        }

        let id = self.next.fetch_add(1, Ordering::Relaxed);
        let handle = thread::Builder::new()
            .name(format!("probesim-flow-{id}"))
            .spawn(move || run(flow))
            .with_context(|| format!("Failed to spawn thread for flow {id}"))?;

        let mut flows = self.flows.lock().unwrap_or_else(PoisonError::into_inner);
        flows.retain(|flow| !flow.is_finished());
        flows.push(handle);
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);

        let flows = std::mem::take(&mut *self.flows.lock().unwrap_or_else(PoisonError::into_inner));
        join_all(flows).context("Failed to join background flows")
    }
}

impl WorkerPool {
    /// Start `size` worker threads.
    ///
    /// # Errors
    ///
    /// Fails if `size` is zero or if the threads cannot be spawned.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            bail!("A worker pool needs at least one worker")
        }

        let (queue, receiver) = mpsc::channel::<Flow>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..size)
            .map(|id| {
                let receiver = Arc::clone(&receiver);
                thread::Builder::new()
                    .name(format!("probesim-worker-{id}"))
                    .spawn(move || worker(receiver))
                    .with_context(|| format!("Failed to spawn worker {id}"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            queue: Mutex::new(Some(queue)),
            workers: Mutex::new(workers),
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

fn worker(receiver: Arc<Mutex<mpsc::Receiver<Flow>>>) {
    loop {
        // the guard is dropped before running the flow
        let next = receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv();

        match next {
            Ok(flow) => run(flow),
            // every sender is gone: shut down
            Err(mpsc::RecvError) => break,
        }
    }
}

impl Dispatcher for WorkerPool {
    fn dispatch(&self, flow: Flow) -> Result<()> {
        let queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(queue) = queue.as_ref() else {
            bail!("Cannot dispatch flow, worker pool is shut down")
        };
        queue
            .send(flow)
            .map_err(|_| anyhow!("Cannot dispatch flow, every worker stopped"))
    }

    fn shutdown(&self) -> Result<()> {
        // closing the queue lets the workers drain it and exit
        drop(self.queue.lock().unwrap_or_else(PoisonError::into_inner).take());

        let workers =
            std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        join_all(workers).context("Failed to join worker pool")
    }
}
