//! # Emitter configuration.
//!
//! Provides [`EmitterConfig`], the per-instance settings captured when an
//! [`Emitter`](crate::Emitter) is constructed, and [`MaxListeners`], the
//! listener-count warning threshold.
//!
//! `EmitterConfig::default()` reads the process-wide defaults (see
//! [`defaults`](crate::defaults)) exactly once; later changes to those defaults
//! never affect an existing emitter.
//!
//! ## Sentinel values
//! - `MaxListeners::Limited(0)` → never warn (same as `Unlimited`)
//! - `f64::INFINITY` / `"unlimited"` / `"infinity"` → `Unlimited`

use std::fmt;
use std::sync::Arc;

use crate::core::diagnostics::{MaxListenersWarning, UnhandledFailure};
use crate::core::defaults;
use crate::error::EmitterError;
use crate::events::Token;

/// Default listener-count warning threshold.
pub const DEFAULT_MAX_LISTENERS: usize = 10;

/// Listener-count warning threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaxListeners {
    /// Warn once the count for a key exceeds `n` (`0` never warns).
    Limited(usize),
    /// Never warn.
    Unlimited,
}

impl MaxListeners {
    /// Returns the effective threshold as an `Option`.
    ///
    /// - `None` → warnings disabled (`Unlimited` or `Limited(0)`)
    /// - `Some(n)` → warn when a key holds more than `n` listeners
    #[inline]
    pub fn limit(&self) -> Option<usize> {
        match *self {
            MaxListeners::Limited(0) | MaxListeners::Unlimited => None,
            MaxListeners::Limited(n) => Some(n),
        }
    }

    /// True if a key holding `count` listeners is over the threshold.
    #[inline]
    pub fn exceeded_by(&self, count: usize) -> bool {
        self.limit().is_some_and(|n| count > n)
    }

    /// True if `count` is strictly below the threshold.
    #[inline]
    pub(crate) fn is_under(&self, count: usize) -> bool {
        self.limit().is_none_or(|n| count < n)
    }

    /// True if `next` allows more listeners than `self` before warning.
    #[inline]
    pub fn is_raised_by(&self, next: MaxListeners) -> bool {
        rank(next) > rank(*self)
    }
}

fn rank(max: MaxListeners) -> u128 {
    max.limit().map_or(u128::MAX, |n| n as u128)
}

impl Default for MaxListeners {
    fn default() -> Self {
        MaxListeners::Limited(DEFAULT_MAX_LISTENERS)
    }
}

impl fmt::Display for MaxListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxListeners::Limited(n) => write!(f, "{n}"),
            MaxListeners::Unlimited => f.write_str("unlimited"),
        }
    }
}

fn invalid(value: impl fmt::Display) -> EmitterError {
    EmitterError::InvalidMaxListeners {
        value: value.to_string(),
    }
}

impl TryFrom<usize> for MaxListeners {
    type Error = EmitterError;

    fn try_from(n: usize) -> Result<Self, Self::Error> {
        Ok(MaxListeners::Limited(n))
    }
}

impl TryFrom<u32> for MaxListeners {
    type Error = EmitterError;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        usize::try_from(n)
            .map(MaxListeners::Limited)
            .map_err(|_| invalid(n))
    }
}

impl TryFrom<i32> for MaxListeners {
    type Error = EmitterError;

    fn try_from(n: i32) -> Result<Self, Self::Error> {
        MaxListeners::try_from(i64::from(n))
    }
}

impl TryFrom<i64> for MaxListeners {
    type Error = EmitterError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        usize::try_from(n)
            .map(MaxListeners::Limited)
            .map_err(|_| invalid(n))
    }
}

impl TryFrom<f64> for MaxListeners {
    type Error = EmitterError;

    fn try_from(n: f64) -> Result<Self, Self::Error> {
        if n == f64::INFINITY {
            return Ok(MaxListeners::Unlimited);
        }
        if n.is_nan() || n < 0.0 || n.fract() != 0.0 || n > usize::MAX as f64 {
            return Err(invalid(n));
        }
        Ok(MaxListeners::Limited(n as usize))
    }
}

impl TryFrom<&str> for MaxListeners {
    type Error = EmitterError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unlimited") || s.eq_ignore_ascii_case("infinity") {
            return Ok(MaxListeners::Unlimited);
        }
        s.parse::<usize>()
            .map(MaxListeners::Limited)
            .map_err(|_| invalid(format!("{s:?}")))
    }
}

/// Observer of max-listener warnings.
pub type WarningHook = Arc<dyn Fn(&MaxListenersWarning) + Send + Sync>;

/// Observer of failures nobody handled after a deferred result failed.
pub type UnhandledHook = Arc<dyn Fn(UnhandledFailure) + Send + Sync>;

/// Per-instance emitter configuration.
///
/// ## Field semantics
/// - `max_listeners`: leak-warning threshold (see [`MaxListeners`])
/// - `capture_rejections`: route failures of deferred listener results
/// - `capture_rejection_symbol`: token under which a rejection handler may be assigned
/// - `on_warning`: extra observer for leak warnings (always logged via `tracing`)
/// - `on_unhandled`: replaces the default unhandled-failure behavior (log + panic
///   inside the runtime task)
#[derive(Clone)]
pub struct EmitterConfig {
    /// Listener-count warning threshold.
    pub max_listeners: MaxListeners,

    /// Route failures of deferred listener results.
    ///
    /// When `false`, a failing deferred result goes straight to the
    /// unhandled-failure channel.
    pub capture_rejections: bool,

    /// Token naming the per-instance rejection handler.
    pub capture_rejection_symbol: Token,

    /// Observer of leak warnings.
    pub on_warning: Option<WarningHook>,

    /// Observer of unhandled asynchronous failures.
    pub on_unhandled: Option<UnhandledHook>,
}

impl EmitterConfig {
    /// Sets the warning threshold.
    pub fn with_max_listeners(mut self, max: MaxListeners) -> Self {
        self.max_listeners = max;
        self
    }

    /// Enables or disables capture-rejections mode.
    pub fn with_capture_rejections(mut self, capture: bool) -> Self {
        self.capture_rejections = capture;
        self
    }

    /// Sets the token naming the rejection handler.
    pub fn with_capture_rejection_symbol(mut self, token: Token) -> Self {
        self.capture_rejection_symbol = token;
        self
    }

    /// Installs a leak-warning observer.
    pub fn on_warning<F>(mut self, f: F) -> Self
    where
        F: Fn(&MaxListenersWarning) + Send + Sync + 'static,
    {
        self.on_warning = Some(Arc::new(f));
        self
    }

    /// Installs an unhandled-failure observer.
    pub fn on_unhandled<F>(mut self, f: F) -> Self
    where
        F: Fn(UnhandledFailure) + Send + Sync + 'static,
    {
        self.on_unhandled = Some(Arc::new(f));
        self
    }
}

impl Default for EmitterConfig {
    /// Snapshot of the process-wide defaults, no hooks.
    fn default() -> Self {
        let d = defaults::snapshot();
        Self {
            max_listeners: d.max_listeners,
            capture_rejections: d.capture_rejections,
            capture_rejection_symbol: d.capture_rejection_symbol,
            on_warning: None,
            on_unhandled: None,
        }
    }
}

impl fmt::Debug for EmitterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmitterConfig")
            .field("max_listeners", &self.max_listeners)
            .field("capture_rejections", &self.capture_rejections)
            .field("capture_rejection_symbol", &self.capture_rejection_symbol)
            .field("on_warning", &self.on_warning.is_some())
            .field("on_unhandled", &self.on_unhandled.is_some())
            .finish()
    }
}
