//! Runtime abstraction layer for async operations
//!
//! The map is driven from a single thread (a browser event loop or a tokio
//! `LocalSet`), so tasks are spawned locally and never need to be `Send`.
//! Results come back through a oneshot channel so callers can either await
//! the [`TaskHandle`] or poll it from a frame loop.

use crate::prelude::{Future, Pin};
use futures::channel::oneshot;
use std::task::{Context, Poll};

/// Handle to a task spawned with [`spawn_local`]
pub struct TaskHandle<T> {
    receiver: oneshot::Receiver<T>,
    finished: bool,
}

impl<T> TaskHandle<T> {
    /// Try to get the result without waiting; `None` while still running
    pub fn try_result(&mut self) -> Option<T> {
        match self.receiver.try_recv() {
            Ok(Some(value)) => {
                self.finished = true;
                Some(value)
            }
            Ok(None) => None,
            Err(_) => {
                self.finished = true;
                None
            }
        }
    }

    /// Whether the result has already been taken or the task was dropped
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl<T> Future for TaskHandle<T> {
    /// `None` when the task was dropped before producing a value
    type Output = Option<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(result) => {
                self.finished = true;
                Poll::Ready(result.ok())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Spawn a future on the current thread's executor
///
/// With the `tokio-runtime` feature this must be called from inside a
/// `tokio::task::LocalSet`. On `wasm32` with the `wasm` feature the browser
/// event loop drives the task. Without either the future is run to completion
/// before returning.
pub fn spawn_local<F, T>(future: F) -> TaskHandle<T>
where
    F: Future<Output = T> + 'static,
    T: 'static,
{
    let (sender, receiver) = oneshot::channel();
    let task = async move {
        // The receiver may have been dropped; nobody is waiting then.
        let _ = sender.send(future.await);
    };

    #[cfg(all(feature = "wasm", target_arch = "wasm32"))]
    wasm_bindgen_futures::spawn_local(task);

    #[cfg(all(
        feature = "tokio-runtime",
        not(all(feature = "wasm", target_arch = "wasm32"))
    ))]
    {
        ::tokio::task::spawn_local(task);
    }

    #[cfg(not(any(
        feature = "tokio-runtime",
        all(feature = "wasm", target_arch = "wasm32")
    )))]
    futures::executor::block_on(task);

    log::debug!("spawned local task");

    TaskHandle {
        receiver,
        finished: false,
    }
}
