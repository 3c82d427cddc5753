use std::collections::HashMap;

use parking_lot::RwLock;

use crate::{Error, Result, WorkHandle};

/// Thread-safe mapping from [`WorkHandle`] to a completed digest.
///
/// Each handle is written once by the task that finished its work and is read
/// any number of times afterwards. Entries live for the lifetime of the store.
#[derive(Debug, Default)]
pub struct ResultStore {
    values: RwLock<HashMap<WorkHandle, String>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` for `handle`.
    ///
    /// The pipeline calls this exactly once per handle. A second write for the
    /// same handle replaces the first.
    pub fn put(&self, handle: WorkHandle, value: String) {
        let _previous = self.values.write().insert(handle, value);

        #[cfg(feature = "tracing")]
        if _previous.is_some() {
            tracing::warn!(%handle, "Overwrote an existing result");
        }
    }

    /// Returns a copy of the value stored for `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] both when the handle was never issued and
    /// when its work has not completed yet.
    pub fn get(&self, handle: WorkHandle) -> Result<String> {
        self.values
            .read()
            .get(&handle)
            .cloned()
            .ok_or(Error::NotFound { handle })
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}
