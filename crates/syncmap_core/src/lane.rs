//! The serialized lane.
//!
//! A single named thread owns the lane state and runs submitted jobs one at
//! a time, in submission order. Callers get a [`Pending`] back immediately.

use parking_lot::Mutex;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::mpsc::{self, Receiver, Sender};
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

/// The result of work queued on the lane.
///
/// Resolve it with `.await` or, from non-async code, with
/// [`Pending::wait`]. If the lane drops the work without running it, the
/// result is `T::default()`, which for every mapping operation is its
/// failure value.
#[must_use = "a Pending does nothing unless awaited or waited on"]
#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<T>,
}

impl<T: Default> Pending<T> {
    /// Blocks the current thread until the result is available.
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async runtime; use `.await` there.
    pub fn wait(self) -> T {
        self.rx.blocking_recv().unwrap_or_default()
    }
}

impl<T: Default> Future for Pending<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or_default())
    }
}

/// A dedicated thread running jobs against owned state.
pub(crate) struct Lane<S> {
    sender: Mutex<Option<Sender<Job<S>>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<S: Send + 'static> Lane<S> {
    /// Starts the lane thread, moving `state` onto it.
    pub(crate) fn spawn(name: &str, state: S) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run(rx, state))?;

        Ok(Self {
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Queues `job`; its return value resolves the returned [`Pending`].
    pub(crate) fn submit<T, F>(&self, job: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut S) -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job<S> = Box::new(move |state| {
            let _ = tx.send(job(state));
        });

        // A refused job is dropped along with `tx`, resolving `rx` empty.
        if let Some(sender) = self.sender.lock().as_ref() {
            let _ = sender.send(job);
        }
        Pending { rx }
    }

    /// Queues a job whose result nobody waits for.
    pub(crate) fn post<F>(&self, job: F)
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        if let Some(sender) = self.sender.lock().as_ref() {
            let _ = sender.send(Box::new(job));
        }
    }

    /// Queues `last` and stops accepting work.
    ///
    /// Jobs already queued still run; `last` runs after them, then the
    /// thread exits and drops the state.
    pub(crate) fn finish<T, F>(&self, last: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut S) -> T + Send + 'static,
    {
        let pending = self.submit(last);
        self.sender.lock().take();
        pending
    }

    pub(crate) fn is_accepting(&self) -> bool {
        self.sender.lock().is_some()
    }

    /// Waits for the thread to exit. Only returns once the lane is finished.
    #[cfg(test)]
    pub(crate) fn join(&self) {
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
    }
}

impl<S> Drop for Lane<S> {
    fn drop(&mut self) {
        self.sender.lock().take();
        // Detach; the thread drains its queue and exits on its own.
        self.worker.lock().take();
    }
}

fn run<S>(jobs: Receiver<Job<S>>, mut state: S) {
    while let Ok(job) = jobs.recv() {
        job(&mut state);
    }
}
