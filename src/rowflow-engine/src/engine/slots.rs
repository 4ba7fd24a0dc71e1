//! Thread-to-slot assignment for threaded traversals.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread::{self, ThreadId};

use common_error::{FlowError, FlowResult};
use log::debug;
use rowflow_core::SlotId;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    // (assigner token, slot) of the last assignment seen by this thread.
    static ASSIGNED: Cell<(u64, SlotId)> = const { Cell::new((0, 0)) };
}

/// Hands out slot ids to worker threads on first contact.
///
/// The map is locked only the first time a thread asks; afterwards the slot
/// is served from a thread-local.
#[derive(Debug)]
pub(crate) struct SlotAssigner {
    token: u64,
    n_slots: usize,
    map: Mutex<HashMap<ThreadId, SlotId>>,
}

impl SlotAssigner {
    pub(crate) fn new(n_slots: usize) -> Self {
        Self {
            token: NEXT_TOKEN.fetch_add(1, Ordering::Relaxed),
            n_slots,
            map: Mutex::new(HashMap::with_capacity(n_slots)),
        }
    }

    /// Slot of the calling thread, assigning the next free one if needed.
    pub(crate) fn slot_for_current_thread(&self) -> FlowResult<SlotId> {
        let (token, slot) = ASSIGNED.with(Cell::get);
        if token == self.token {
            return Ok(slot);
        }

        let mut map = self
            .map
            .lock()
            .map_err(|_| FlowError::internal("slot map lock poisoned"))?;
        let next = map.len();
        let id = thread::current().id();
        let slot = *map.entry(id).or_insert(next);
        if slot >= self.n_slots {
            map.remove(&id);
            return Err(FlowError::internal(format!(
                "more worker threads than the {} configured slots",
                self.n_slots
            )));
        }
        drop(map);

        debug!("assigned slot {slot} to thread {id:?}");
        ASSIGNED.with(|cell| cell.set((self.token, slot)));
        Ok(slot)
    }

    /// Number of threads that have been given a slot.
    pub(crate) fn assigned(&self) -> usize {
        self.map.lock().map(|map| map.len()).unwrap_or(0)
    }
}
