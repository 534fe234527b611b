//! # Operator-facing diagnostics.
//!
//! - [`MaxListenersWarning`] possible listener leak on one key (logged at `warn`);
//! - [`UnhandledFailure`] a deferred listener failure nobody handled.
//!
//! Neither goes through the `error` event.

use std::fmt;

use crate::core::config::{UnhandledHook, WarningHook};
use crate::events::{EventKey, Payload};

/// Listener count for a key went over the configured threshold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaxListenersWarning {
    /// Key that went over the threshold.
    pub event: EventKey,
    /// Listener count after the insertion.
    pub count: usize,
    /// Threshold in effect.
    pub max: usize,
}

impl fmt::Display for MaxListenersWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "possible emitter leak detected: {} {} listeners added, max listeners is {}; \
             use set_max_listeners() to increase the limit",
            self.count, self.event, self.max
        )
    }
}

/// Deferred listener failure that reached the end of the routing chain.
#[derive(Clone, Debug)]
pub struct UnhandledFailure {
    /// Event whose listener produced the failure.
    pub event: EventKey,
    /// The failure value.
    pub failure: Payload,
}

pub(crate) fn report_warning(warning: &MaxListenersWarning, hook: Option<&WarningHook>) {
    tracing::warn!(
        event = %warning.event,
        count = warning.count,
        max = warning.max,
        "{warning}"
    );
    if let Some(hook) = hook {
        hook(warning);
    }
}

/// Last stop for asynchronous failures.
///
/// Without a hook the failure is logged and re-raised as a panic of the runtime
/// task driving the deferred result.
pub(crate) fn report_unhandled(failure: UnhandledFailure, hook: Option<&UnhandledHook>) {
    if let Some(hook) = hook {
        hook(failure);
        return;
    }
    tracing::error!(
        event = %failure.event,
        failure = ?failure.failure,
        "unhandled deferred listener failure"
    );
    panic!(
        "unhandled deferred listener failure on event {}: {:?}",
        failure.event, failure.failure
    );
}
