//! Runtime abstraction layer for async operations
//!
//! Provider attempts are spawned through this module so the crate does not
//! depend on a particular executor. Tokio is the default; embedders can
//! install their own spawner with [`init_runtime`] before the first request.

use crate::prelude::{Future, Pin};

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and return a handle to it
    fn spawn_boxed(
        &self,
        future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
    ) -> Box<dyn AsyncHandle>;
}

/// Handle to a spawned async task
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task
    fn cancel(&self);
}

/// Spawn a future on the installed runtime
pub fn spawn<F>(future: F) -> Box<dyn AsyncHandle>
where
    F: Future<Output = ()> + Send + 'static,
{
    runtime().spawn_boxed(Box::pin(future))
}

/// Default spawner implementations
pub mod spawners {
    use super::*;

    #[cfg(feature = "tokio-runtime")]
    pub mod tokio_impl {
        use super::*;
        use ::tokio::runtime::{Builder, Handle, Runtime};
        use ::tokio::task::JoinHandle;
        use once_cell::sync::Lazy;

        /// Runtime used when a task is spawned from a thread that is not
        /// inside a tokio runtime, e.g. a UI thread.
        static FALLBACK_RUNTIME: Lazy<Runtime> = Lazy::new(|| {
            Builder::new_multi_thread()
                .worker_threads(2)
                .thread_name("tilechain-worker")
                .enable_time()
                .build()
                .expect("failed to build fallback tokio runtime")
        });

        /// Tokio-based async spawner
        pub struct TokioSpawner;

        impl AsyncSpawner for TokioSpawner {
            fn spawn_boxed(
                &self,
                future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
            ) -> Box<dyn AsyncHandle> {
                let handle = match Handle::try_current() {
                    Ok(current) => current.spawn(future),
                    Err(_) => FALLBACK_RUNTIME.spawn(future),
                };
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
}

/// Async helpers shared by the tile pipeline
pub mod async_utils {
    use super::*;
    use std::time::Duration;

    /// Await `future`, giving up after `duration`
    ///
    /// Returns `None` when the deadline passed first. Without the tokio
    /// runtime no deadline is enforced.
    pub async fn with_timeout<F>(duration: Duration, future: F) -> Option<F::Output>
    where
        F: Future,
    {
        #[cfg(feature = "tokio-runtime")]
        {
            ::tokio::time::timeout(duration, future).await.ok()
        }

        #[cfg(not(feature = "tokio-runtime"))]
        {
            let _ = duration;
            Some(future.await)
        }
    }
}

/// Global runtime instance
static RUNTIME: std::sync::OnceLock<Box<dyn AsyncSpawner>> = std::sync::OnceLock::new();

/// Initialize the runtime with a specific spawner
///
/// Returns `false` if a runtime was already installed.
pub fn init_runtime(spawner: Box<dyn AsyncSpawner>) -> bool {
    RUNTIME.set(spawner).is_ok()
}

/// Get the global runtime spawner
pub fn runtime() -> &'static dyn AsyncSpawner {
    RUNTIME
        .get_or_init(|| {
            #[cfg(feature = "tokio-runtime")]
            {
                Box::new(spawners::tokio_impl::TokioSpawner)
            }

            #[cfg(not(feature = "tokio-runtime"))]
            {
                panic!("No async runtime available. Enable 'tokio-runtime' or call init_runtime().");
            }
        })
        .as_ref()
}
