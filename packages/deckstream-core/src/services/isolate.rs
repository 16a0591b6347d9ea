//! Panic boundary for feed callbacks.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Runs a feed callback, catching and logging any panic it raises.
///
/// Returns `false` if the callback panicked. A fault in one producer never
/// unwinds into the feed thread that invoked it, so other producers and the
/// bus keep running.
pub(crate) fn isolate<F>(component: &str, callback: &str, f: F) -> bool
where
    F: FnOnce(),
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            log::error!(
                "[{}] Panic in {}: {}",
                component,
                callback,
                panic_message(payload.as_ref())
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
