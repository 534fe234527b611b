//! Error types used by the emitter.
//!
//! [`EmitterError`] covers every failure an emitter operation reports to its
//! direct caller:
//!
//! - validation failures (malformed max-listener value);
//! - unhandled listener failures (nothing was listening on `error`);
//! - deferred listener results that could not be scheduled.
//!
//! Like the rest of the crate, it exposes `as_label` for log/metric fields.

use thiserror::Error;

use crate::events::{EventKey, Payload};

/// # Errors produced by emitter operations.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum EmitterError {
    /// The max-listener value is neither a non-negative integer nor unlimited.
    #[error("invalid max listeners value {value:?}: expected a non-negative integer or unlimited")]
    InvalidMaxListeners {
        /// Rendering of the rejected value.
        value: String,
    },

    /// A listener failure (or an explicit `error` emission) reached the router
    /// and no handler took it.
    #[error("unhandled failure on event {event}: {failure:?}")]
    Unhandled {
        /// Event whose dispatch produced the failure.
        event: EventKey,
        /// The failure value itself.
        failure: Payload,
    },

    /// A listener returned a deferred result outside of a tokio runtime.
    #[error("listener on event {event} returned a deferred result outside of a tokio runtime")]
    NoRuntime {
        /// Event whose listener returned the deferred result.
        event: EventKey,
    },
}

impl EmitterError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use emitvisor::EmitterError;
    ///
    /// let err = EmitterError::InvalidMaxListeners { value: "-1".into() };
    /// assert_eq!(err.as_label(), "invalid_max_listeners");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EmitterError::InvalidMaxListeners { .. } => "invalid_max_listeners",
            EmitterError::Unhandled { .. } => "unhandled_failure",
            EmitterError::NoRuntime { .. } => "no_runtime",
        }
    }

    /// Returns the failure value carried by [`EmitterError::Unhandled`].
    pub fn failure(&self) -> Option<&Payload> {
        match self {
            EmitterError::Unhandled { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// Indicates a validation failure (reported synchronously, never routed).
    pub fn is_validation(&self) -> bool {
        matches!(self, EmitterError::InvalidMaxListeners { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        let err = EmitterError::Unhandled {
            event: EventKey::from("y"),
            failure: Payload::from("boom"),
        };
        assert_eq!(err.as_label(), "unhandled_failure");
        assert_eq!(
            err.failure().and_then(|p| p.downcast_ref::<&str>()).copied(),
            Some("boom")
        );
        assert!(!err.is_validation());

        let err = EmitterError::InvalidMaxListeners { value: "NaN".into() };
        assert!(err.is_validation());
        assert!(err.failure().is_none());
    }

    #[test]
    fn test_display_mentions_event() {
        let err = EmitterError::NoRuntime {
            event: EventKey::from("tick"),
        };
        assert!(err.to_string().contains("tick"));
    }
}
