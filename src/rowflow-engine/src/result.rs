//! Deferred action results.

use std::fmt;
use std::sync::{Arc, OnceLock};

use common_error::{FlowError, FlowResult};

use crate::engine::EngineInner;

/// Handle to the result of a lazy action.
///
/// The value becomes available once the engine's traversal has completed;
/// [`LazyResult::get`] triggers that traversal when needed. Handles are
/// cheap to clone and can be read from any thread, any number of times.
pub struct LazyResult<V> {
    engine: Arc<EngineInner>,
    cell: Arc<OnceLock<V>>,
}

impl<V> LazyResult<V> {
    pub(crate) fn new(engine: Arc<EngineInner>, cell: Arc<OnceLock<V>>) -> Self {
        Self { engine, cell }
    }

    /// Whether the value has already been computed.
    pub fn is_ready(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The value, if already computed, without triggering a traversal.
    pub fn try_get(&self) -> Option<&V> {
        self.cell.get()
    }

    /// The merged value, running the traversal first if needed.
    ///
    /// Errors of the traversal are returned to every caller that triggers
    /// it; a later call retries the traversal.
    pub fn get(&self) -> FlowResult<&V> {
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }
        self.engine.run()?;
        self.cell
            .get()
            .ok_or_else(|| FlowError::internal("traversal finished without producing the result"))
    }
}

impl<V: Clone + Send + Sync + 'static> LazyResult<V> {
    /// Owned copy of the merged value.
    pub fn value(&self) -> FlowResult<V> {
        self.get().cloned()
    }

    /// Resolve the handle on the blocking pool of the current Tokio runtime.
    pub async fn get_async(&self) -> FlowResult<V> {
        let handle = self.clone();
        common_runtime::run_blocking(move || handle.value()).await
    }
}

impl<V> Clone for LazyResult<V> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for LazyResult<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyResult")
            .field("value", &self.cell.get())
            .finish_non_exhaustive()
    }
}
