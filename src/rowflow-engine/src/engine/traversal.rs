//! Sequential and threaded traversals of a bound graph.

use std::sync::{Mutex, TryLockError};

use common_error::{FlowError, FlowResult};
use log::debug;
use rayon::prelude::*;
use rowflow_source::RowCursor;

use super::slots::SlotAssigner;
use crate::graph::{BoundGraph, SlotState};

fn drain(bound: &BoundGraph<'_>, st: &mut SlotState, cursor: &mut dyn RowCursor) -> FlowResult<()> {
    while let Some(row) = cursor.next_row()? {
        bound.process_row(st, row, &*cursor)?;
    }
    Ok(())
}

/// Run every cursor on the calling thread as slot 0.
pub(crate) fn sequential(
    bound: &BoundGraph<'_>,
    cursors: Vec<Box<dyn RowCursor>>,
) -> FlowResult<Vec<SlotState>> {
    let mut st = bound.create_slot(0);
    for mut cursor in cursors {
        drain(bound, &mut st, cursor.as_mut())?;
    }
    debug!("sequential traversal processed {} rows", st.rows());
    Ok(vec![st])
}

/// Spread the cursors over a pool of `n_slots` worker threads.
///
/// Each worker thread owns one slot for the whole traversal; the first error
/// stops the remaining partitions.
pub(crate) fn threaded(
    bound: &BoundGraph<'_>,
    cursors: Vec<Box<dyn RowCursor>>,
    n_slots: usize,
) -> FlowResult<Vec<SlotState>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_slots)
        .thread_name(|i| format!("rowflow-slot-{i}"))
        .build()
        .map_err(|e| FlowError::execution(format!("failed to start worker pool: {e}")))?;
    let assigner = SlotAssigner::new(n_slots);
    let states: Vec<Mutex<SlotState>> = (0..n_slots)
        .map(|slot| Mutex::new(bound.create_slot(slot)))
        .collect();

    pool.install(|| {
        cursors.into_par_iter().try_for_each(|mut cursor| {
            let slot = assigner.slot_for_current_thread()?;
            // Uncontended: only this thread ever locks its slot.
            let mut st = match states[slot].try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::WouldBlock) => {
                    return Err(FlowError::internal(format!("slot {slot} re-entered")))
                }
                Err(TryLockError::Poisoned(_)) => {
                    return Err(FlowError::internal(format!("slot {slot} state poisoned")))
                }
            };
            drain(bound, &mut st, cursor.as_mut())
        })
    })?;

    debug!(
        "threaded traversal used {} of {n_slots} slots",
        assigner.assigned()
    );
    states
        .into_iter()
        .map(|state| {
            state
                .into_inner()
                .map_err(|_| FlowError::internal("slot state poisoned"))
        })
        .collect()
}
