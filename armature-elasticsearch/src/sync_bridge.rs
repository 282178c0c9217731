//! Blocking execution of async fetches.
//!
//! The blocking API must work from plain threads and from inside a tokio
//! runtime, including a current-thread one. Calling `Runtime::block_on` from
//! a runtime thread panics, and parking a current-thread runtime while its
//! own task waits on I/O never completes. [`SyncExecutor`] avoids both by
//! spawning the operation onto a dedicated runtime whose workers drive it to
//! completion while the caller only waits for the join handle.

use std::future::Future;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::debug;

use crate::error::{ElasticsearchError, Result};
use crate::result::ResultDetails;

static BRIDGE_RUNTIME: OnceCell<Runtime> = OnceCell::new();

const BRIDGE_WORKER_THREADS: usize = 2;

fn bridge_handle() -> Result<Handle> {
    BRIDGE_RUNTIME
        .get_or_try_init(|| {
            debug!("Starting elasticsearch sync bridge runtime");
            Builder::new_multi_thread()
                .worker_threads(BRIDGE_WORKER_THREADS)
                .thread_name("armature-es-bridge")
                .enable_all()
                .build()
        })
        .map(|runtime| runtime.handle().clone())
        .map_err(|e| {
            ElasticsearchError::Runtime(format!("failed to start bridge runtime: {}", e))
        })
}

/// Runs async fetches to completion on behalf of a blocked caller.
#[derive(Clone, Default)]
pub struct SyncExecutor {
    handle: Option<Handle>,
}

impl SyncExecutor {
    /// Executor backed by the shared bridge runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor backed by a caller-owned runtime.
    ///
    /// The runtime must be multi-threaded and must not be the one the
    /// blocking call is made from.
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Run `operation` and block until its envelope is available.
    ///
    /// Panics raised by the operation are resumed on the calling thread.
    pub fn execute_result_details<T, F, Fut>(&self, operation: F) -> Result<ResultDetails<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ResultDetails<T>>> + Send + 'static,
    {
        let handle = match &self.handle {
            Some(handle) => handle.clone(),
            None => bridge_handle()?,
        };

        let task = handle.spawn(operation());

        match futures::executor::block_on(task) {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(ElasticsearchError::Runtime(format!(
                "bridge task did not complete: {}",
                e
            ))),
        }
    }
}

impl std::fmt::Debug for SyncExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncExecutor")
            .field("dedicated_runtime", &self.handle.is_some())
            .finish()
    }
}

/// Shared executor used by clients that were not given one.
pub(crate) fn shared_executor() -> Arc<SyncExecutor> {
    static SHARED: OnceCell<Arc<SyncExecutor>> = OnceCell::new();
    SHARED.get_or_init(|| Arc::new(SyncExecutor::new())).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use std::time::Duration;

    fn ok_details(payload: u32) -> Result<ResultDetails<u32>> {
        let mut details = ResultDetails::new("http://localhost:9200/test");
        details.status = StatusCode::OK;
        details.payload = Some(payload);
        Ok(details)
    }

    #[test]
    fn test_execute_from_plain_thread() {
        let executor = SyncExecutor::new();
        let details = executor
            .execute_result_details(|| async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                ok_details(7)
            })
            .unwrap();

        assert!(details.is_ok());
        assert_eq!(details.payload, Some(7));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_execute_inside_current_thread_runtime() {
        let executor = SyncExecutor::new();
        let details = executor
            .execute_result_details(|| async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                ok_details(11)
            })
            .unwrap();

        assert_eq!(details.payload, Some(11));
    }

    #[test]
    fn test_errors_are_returned() {
        let executor = SyncExecutor::new();
        let result = executor.execute_result_details::<u32, _, _>(|| async {
            Err::<ResultDetails<u32>, _>(ElasticsearchError::Runtime("boom".to_string()))
        });

        assert!(matches!(result, Err(ElasticsearchError::Runtime(msg)) if msg == "boom"));
    }

    #[test]
    #[should_panic(expected = "operation panicked")]
    #[allow(unreachable_code)]
    fn test_panics_are_resumed() {
        let executor = SyncExecutor::new();
        let _ = executor.execute_result_details(|| async {
            panic!("operation panicked");
            ok_details(0)
        });
    }

    #[test]
    fn test_with_handle() {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let executor = SyncExecutor::with_handle(runtime.handle().clone());

        let details = executor.execute_result_details(|| async { ok_details(3) }).unwrap();
        assert_eq!(details.payload, Some(3));
    }
}
