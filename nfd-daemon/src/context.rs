//! Per-session event loop.
//!
//! A [`RuntimeContext`] is created for every session and dropped with it. The loop is a
//! current-thread tokio runtime driven by the session thread; the stop signal is a watch
//! channel, so a stop requested before the loop starts still ends the session.

use std::future::Future;
use std::sync::Arc;

use nfd_core::Result;
use tokio::runtime::{Builder, EnterGuard, Handle, Runtime};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Event loop and stop signal owned by one session.
pub struct RuntimeContext {
    runtime: Runtime,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl RuntimeContext {
    /// Build a fresh loop with the stop signal cleared.
    pub fn new() -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .thread_name("nfd-io")
            .build()?;
        let (stop_tx, _stop_rx) = watch::channel(false);
        Ok(Self {
            runtime,
            stop_tx: Arc::new(stop_tx),
        })
    }

    /// Handle that requests the loop to stop from any thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    /// Non-owning handle given to subsystems when they are bound to the loop.
    pub fn io_handle(&self) -> IoHandle {
        IoHandle {
            handle: self.runtime.handle().clone(),
            stop_rx: self.stop_tx.subscribe(),
        }
    }

    /// Whether any [`StopHandle`] has fired.
    pub fn is_stop_requested(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Drive `future` to completion on the loop, blocking the calling thread.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Make the loop current for code that registers I/O without running it yet.
    pub fn enter(&self) -> EnterGuard<'_> {
        self.runtime.enter()
    }
}

/// Requests a session's loop to stop. Never blocks; repeated calls are harmless.
#[derive(Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Request the stop.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    /// Whether a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

impl std::fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopHandle")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Lets a subsystem spawn tasks on the session loop and watch for the stop signal.
#[derive(Clone)]
pub struct IoHandle {
    handle: Handle,
    stop_rx: watch::Receiver<bool>,
}

impl IoHandle {
    /// Spawn a task on the session loop.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Resolves once a stop has been requested.
    pub async fn stopped(&self) {
        let mut rx = self.stop_rx.clone();
        // the sender lives in the context, which outlives every handle in use
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn stop_before_run_is_not_lost() {
        let ctx = RuntimeContext::new().unwrap();
        let stop = ctx.stop_handle();
        stop.stop();
        stop.stop();
        assert!(ctx.is_stop_requested());

        let io = ctx.io_handle();
        ctx.block_on(async move { io.stopped().await });
    }

    #[test]
    fn stop_from_another_thread_unblocks_loop() {
        let ctx = RuntimeContext::new().unwrap();
        let stop = ctx.stop_handle();
        let io = ctx.io_handle();

        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            stop.stop();
        });

        let ticks = ctx.block_on(async move {
            let counter = io.spawn(async {
                let mut n = 0u32;
                loop {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    n += 1;
                    if n > 1000 {
                        break n;
                    }
                }
            });
            io.stopped().await;
            counter.abort();
            counter.await.is_err()
        });
        stopper.join().unwrap();
        assert!(ticks, "background task should have been aborted");
    }

    #[test]
    fn contexts_are_independent() {
        let first = RuntimeContext::new().unwrap();
        first.stop_handle().stop();
        drop(first);

        let second = RuntimeContext::new().unwrap();
        assert!(!second.is_stop_requested());
        assert!(!second.stop_handle().is_stopped());
    }
}
