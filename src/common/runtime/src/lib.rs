//! Async runtime utilities for rowflow.
//!
//! The engine itself is synchronous; these helpers let async callers drive
//! it without stalling their executor.

use common_error::{FlowError, FlowResult};

/// Run a blocking closure on Tokio's blocking pool and await its result.
///
/// Must be called from within a Tokio runtime.
pub async fn run_blocking<F, T>(f: F) -> FlowResult<T>
where
    F: FnOnce() -> FlowResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| FlowError::internal(format!("Blocking task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_blocking() {
        let value = run_blocking(|| Ok::<_, FlowError>(7)).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_run_blocking_propagates_error() {
        let result: FlowResult<()> = run_blocking(|| Err(FlowError::execution("boom"))).await;
        assert!(matches!(result, Err(FlowError::ExecutionError(_))));
    }
}
