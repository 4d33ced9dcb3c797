//! Process-wide transport runtime.
//!
//! Every engine holds an `Arc` on one shared tokio runtime. The first engine
//! starts it, the last one to go away shuts it down; the registry only keeps a
//! weak reference.

use crate::base::neterror::NetError;
use std::future::Future;
use std::sync::{Arc, Mutex, Weak};
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

static SHARED: Mutex<Weak<TransportRuntime>> = Mutex::new(Weak::new());

/// Reference-counted I/O runtime shared by all engines in the process.
#[derive(Debug)]
pub struct TransportRuntime {
    runtime: Option<Runtime>,
}

impl TransportRuntime {
    /// Take a reference on the shared runtime, starting it if no engine
    /// currently holds one.
    pub fn acquire() -> Result<Arc<Self>, NetError> {
        let mut slot = SHARED.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = slot.upgrade() {
            return Ok(existing);
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("slimnet-transport")
            .enable_all()
            .build()
            .map_err(|e| NetError::TransportInit(e.to_string()))?;

        let shared = Arc::new(Self {
            runtime: Some(runtime),
        });
        *slot = Arc::downgrade(&shared);
        tracing::debug!("transport runtime started");
        Ok(shared)
    }

    /// Number of live references, 0 when no runtime is running.
    pub fn active_references() -> usize {
        SHARED
            .lock()
            .map(|slot| slot.strong_count())
            .unwrap_or_else(|poisoned| poisoned.into_inner().strong_count())
    }

    fn handle(&self) -> Option<&Handle> {
        self.runtime.as_ref().map(Runtime::handle)
    }

    pub(crate) fn spawn<F>(&self, future: F) -> Result<JoinHandle<F::Output>, NetError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle()
            .map(|h| h.spawn(future))
            .ok_or_else(|| NetError::TransportInit("transport runtime is shut down".into()))
    }

    /// Drive `future` to completion from the calling thread.
    ///
    /// Must not be called from inside an async context.
    pub(crate) fn block_on<F: Future>(&self, future: F) -> Result<F::Output, NetError> {
        self.handle()
            .map(|h| h.block_on(future))
            .ok_or_else(|| NetError::TransportInit("transport runtime is shut down".into()))
    }
}

impl Drop for TransportRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
            tracing::debug!("transport runtime stopped");
        }
    }
}
