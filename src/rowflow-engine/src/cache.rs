//! Per-slot memoization of node results.
//!
//! Every filter and derived column owns one [`SlotCache`] per slot. A cache
//! remembers the last row it was asked about; any later request for the same
//! row in the same slot returns the stored value without recomputing it.
//! Because a slot handles one row at a time, every consumer of a node asks
//! about the current row before the slot moves on, so a single entry is
//! enough.

use rowflow_core::RowIndex;

/// Single-entry cache keyed by row index.
#[derive(Debug, Clone)]
pub(crate) struct SlotCache<T> {
    entry: Option<(RowIndex, T)>,
}

impl<T> SlotCache<T> {
    pub(crate) const fn new() -> Self {
        Self { entry: None }
    }

    /// Return the cached value for `row`, computing and storing it first
    /// when the cache holds a different row.
    ///
    /// An error from `compute` leaves the cache untouched.
    pub(crate) fn get_or_compute<E, F>(&mut self, row: RowIndex, compute: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let entry = match self.entry.take() {
            Some((cached, value)) if cached == row => (cached, value),
            previous => match compute() {
                Ok(value) => (row, value),
                Err(e) => {
                    self.entry = previous;
                    return Err(e);
                }
            },
        };
        Ok(&self.entry.insert(entry).1)
    }

    #[cfg(test)]
    fn last_row(&self) -> Option<RowIndex> {
        self.entry.as_ref().map(|(row, _)| *row)
    }
}

impl<T> Default for SlotCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
