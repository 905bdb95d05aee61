//! Per-thread marker for the pipeline's own work
//!
//! While a [`Reentry`] is alive on a thread, the panic hook installed by
//! [`crate::install_panic_capture`] leaves panics on that thread alone. They
//! come from inside telemetry (a storage adapter, a property getter, code
//! running under the pipeline lock) and capturing them would re-enter the
//! pipeline.

use std::cell::Cell;

thread_local! {
    static ACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as running telemetry code until dropped.
pub(crate) struct Reentry {
    previous: bool,
}

impl Reentry {
    pub(crate) fn enter() -> Self {
        let previous = ACTIVE.try_with(|active| active.replace(true)).unwrap_or(false);
        Self { previous }
    }
}

impl Drop for Reentry {
    fn drop(&mut self) {
        let _ = ACTIVE.try_with(|active| active.set(self.previous));
    }
}

/// Whether the current thread is running telemetry code.
pub(crate) fn is_active() -> bool {
    ACTIVE.try_with(Cell::get).unwrap_or(false)
}
