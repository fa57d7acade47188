//! Runtime abstraction layer for async operations
//!
//! Tile and elevation downloads are spawned through an [`AsyncSpawner`] injected at the
//! composition root. Each [`crate::MapContext`] carries its own spawner, so tests can run
//! fully deterministic with [`InlineSpawner`]. The only shared state is the background
//! runtime [`default_spawner`] starts for callers that have no tokio runtime of their own.

use crate::prelude::Arc;
use futures::future::BoxFuture;
#[cfg(feature = "tokio-runtime")]
use once_cell::sync::Lazy;
use std::future::Future;

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and return a handle to it
    fn spawn_boxed(&self, future: BoxFuture<'static, ()>) -> Box<dyn AsyncHandle>;
}

/// Handle to a spawned async task
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task
    fn cancel(&self);
}

/// Spawns a typed future on a spawner
pub fn spawn_on<F>(spawner: &dyn AsyncSpawner, future: F) -> Box<dyn AsyncHandle>
where
    F: Future<Output = ()> + Send + 'static,
{
    spawner.spawn_boxed(Box::pin(future))
}

/// Default spawner implementations
pub mod spawners {
    use super::*;

    #[cfg(feature = "tokio-runtime")]
    pub mod tokio_impl {
        use super::*;
        use ::tokio::runtime::Handle;
        use ::tokio::task::JoinHandle;

        /// Tokio-based async spawner bound to a runtime handle
        #[derive(Clone)]
        pub struct TokioSpawner {
            handle: Handle,
        }

        impl TokioSpawner {
            pub fn new(handle: Handle) -> Self {
                Self { handle }
            }

            /// Binds to the runtime the caller is running on, if any
            pub fn current() -> Option<Self> {
                Handle::try_current().ok().map(Self::new)
            }
        }

        impl AsyncSpawner for TokioSpawner {
            fn spawn_boxed(&self, future: BoxFuture<'static, ()>) -> Box<dyn AsyncHandle> {
                let handle = self.handle.spawn(future);
                Box::new(TokioHandle(handle))
            }
        }

        struct TokioHandle(JoinHandle<()>);

        impl AsyncHandle for TokioHandle {
            fn is_finished(&self) -> bool {
                self.0.is_finished()
            }

            fn cancel(&self) {
                self.0.abort();
            }
        }
    }

    pub mod inline {
        use super::*;

        /// Runs every future to completion on the calling thread.
        ///
        /// Completions are still delivered through the result channels, so callers observe
        /// them on their next update exactly as with a threaded runtime.
        #[derive(Debug, Default, Clone, Copy)]
        pub struct InlineSpawner;

        impl AsyncSpawner for InlineSpawner {
            fn spawn_boxed(&self, future: BoxFuture<'static, ()>) -> Box<dyn AsyncHandle> {
                futures::executor::block_on(future);
                Box::new(FinishedHandle)
            }
        }

        struct FinishedHandle;

        impl AsyncHandle for FinishedHandle {
            fn is_finished(&self) -> bool {
                true
            }

            fn cancel(&self) {}
        }
    }
}

pub use spawners::inline::InlineSpawner;
#[cfg(feature = "tokio-runtime")]
pub use spawners::tokio_impl::TokioSpawner;

/// Runtime started on first use when the caller has none; it lives for the process
#[cfg(feature = "tokio-runtime")]
static BACKGROUND_RUNTIME: Lazy<Option<::tokio::runtime::Runtime>> = Lazy::new(|| {
    let runtime = ::tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("terrascope-io")
        .enable_all()
        .build();
    match runtime {
        Ok(runtime) => {
            log::info!("started background tokio runtime for downloads");
            Some(runtime)
        }
        Err(e) => {
            log::warn!("failed to start background tokio runtime: {}", e);
            None
        }
    }
});

/// Spawner on a tokio runtime: the caller's own, or a shared background one
#[cfg(feature = "tokio-runtime")]
pub fn tokio_spawner() -> Option<TokioSpawner> {
    TokioSpawner::current().or_else(|| {
        log::debug!("no tokio runtime on this thread, using the background runtime");
        BACKGROUND_RUNTIME
            .as_ref()
            .map(|runtime| TokioSpawner::new(runtime.handle().clone()))
    })
}

/// Picks a tokio runtime for downloads, falling back to inline execution only when
/// none is available
pub fn default_spawner() -> Arc<dyn AsyncSpawner> {
    #[cfg(feature = "tokio-runtime")]
    {
        if let Some(spawner) = tokio_spawner() {
            return Arc::new(spawner);
        }
    }
    log::debug!("no tokio runtime available, spawning inline");
    Arc::new(InlineSpawner)
}
