//! Instrumentation hook
//!
//! The call an instrumenting collaborator (bytecode rewriter, source macro,
//! probe) inserts immediately before the first instruction of a target line.
//! It carries only the class and line, supplied as literals at the call site,
//! so it reaches the aggregator through a process-wide slot set once by
//! [`install`].
//!
//! Guarantees to the instrumented code:
//! - never panics into the caller (failures are swallowed)
//! - O(1) amortized; a no-op until an aggregator is installed

use super::aggregator::HitAggregator;
use crate::domain::HookError;
use std::borrow::Cow;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

static AGGREGATOR: OnceLock<Arc<HitAggregator>> = OnceLock::new();

/// Route all subsequent hook calls in this process to `aggregator`.
///
/// # Errors
/// Returns [`HookError::AlreadyInstalled`] if an aggregator was installed
/// before.
pub fn install(aggregator: Arc<HitAggregator>) -> Result<(), HookError> {
    AGGREGATOR.set(aggregator).map_err(|_| HookError::AlreadyInstalled)
}

/// The installed aggregator, if any
pub fn installed() -> Option<&'static Arc<HitAggregator>> {
    AGGREGATOR.get()
}

/// Record one execution of `class_name:line_number`.
#[inline]
pub fn hit(class_name: impl Into<Cow<'static, str>>, line_number: u32) {
    if let Some(aggregator) = AGGREGATOR.get() {
        record(aggregator, class_name, line_number);
    }
}

/// Hook body against an explicit aggregator.
pub fn record(aggregator: &HitAggregator, class_name: impl Into<Cow<'static, str>>, line_number: u32) {
    let line = i32::try_from(line_number).unwrap_or(i32::MAX);
    let class_name = class_name.into();
    swallow(|| {
        aggregator.register_hit(class_name, line);
    });
}

/// Run `body`, discarding any panic it raises.
fn swallow(body: impl FnOnce()) {
    let _ = catch_unwind(AssertUnwindSafe(body));
}

/// Mark the current source line as a hit.
///
/// Expands to a [`hit`] call with the enclosing module path and line.
#[macro_export]
macro_rules! progress_hit {
    () => {
        $crate::hits::hook::hit(::std::module_path!(), ::std::line!())
    };
}
