//! # Process-wide defaults.
//!
//! Values every new [`EmitterConfig`](crate::EmitterConfig) starts from:
//! - default max listeners (`10`);
//! - default capture-rejections flag (`false`);
//! - default capture-rejection token (`Token::for_key("nodejs.rejection")`).
//!
//! Setters only affect emitters constructed afterwards.
//!
//! ## Example
//! ```rust
//! use emitvisor::{MaxListeners, defaults};
//!
//! let prev = defaults::max_listeners();
//! defaults::set_max_listeners(20).unwrap();
//! assert_eq!(defaults::max_listeners(), MaxListeners::Limited(20));
//! assert!(defaults::set_max_listeners(-1).is_err());
//! defaults::set_max_listeners(prev.limit().unwrap_or(0)).unwrap();
//! ```

use std::sync::LazyLock;

use parking_lot::RwLock;

use crate::core::config::MaxListeners;
use crate::error::EmitterError;
use crate::events::{REJECTION_TOKEN_KEY, Token};

#[derive(Clone, Debug)]
pub(crate) struct Defaults {
    pub(crate) max_listeners: MaxListeners,
    pub(crate) capture_rejections: bool,
    pub(crate) capture_rejection_symbol: Token,
}

static DEFAULTS: LazyLock<RwLock<Defaults>> = LazyLock::new(|| {
    RwLock::new(Defaults {
        max_listeners: MaxListeners::default(),
        capture_rejections: false,
        capture_rejection_symbol: Token::for_key(REJECTION_TOKEN_KEY),
    })
});

pub(crate) fn snapshot() -> Defaults {
    DEFAULTS.read().clone()
}

/// Current default warning threshold.
pub fn max_listeners() -> MaxListeners {
    DEFAULTS.read().max_listeners
}

/// Sets the default warning threshold.
///
/// Accepts anything convertible into [`MaxListeners`]; negative, fractional or
/// NaN values are rejected with [`EmitterError::InvalidMaxListeners`].
pub fn set_max_listeners<T>(value: T) -> Result<(), EmitterError>
where
    T: TryInto<MaxListeners, Error = EmitterError>,
{
    let max = value.try_into()?;
    DEFAULTS.write().max_listeners = max;
    Ok(())
}

/// Current default capture-rejections flag.
pub fn capture_rejections() -> bool {
    DEFAULTS.read().capture_rejections
}

/// Sets the default capture-rejections flag.
pub fn set_capture_rejections(capture: bool) {
    DEFAULTS.write().capture_rejections = capture;
}

/// Current default capture-rejection token.
pub fn capture_rejection_symbol() -> Token {
    DEFAULTS.read().capture_rejection_symbol.clone()
}

/// Sets the default capture-rejection token.
pub fn set_capture_rejection_symbol(token: Token) {
    DEFAULTS.write().capture_rejection_symbol = token;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Emitter, EmitterConfig};

    // The only test touching the process-wide values; other tests pass explicit configs.
    #[test]
    fn test_defaults_are_read_once_at_construction() {
        let saved = snapshot();

        set_max_listeners(3_usize).unwrap();
        set_capture_rejections(true);
        let token = Token::new("test.rejection");
        set_capture_rejection_symbol(token.clone());

        let cfg = EmitterConfig::default();
        assert_eq!(cfg.max_listeners, MaxListeners::Limited(3));
        assert!(cfg.capture_rejections);
        assert_eq!(cfg.capture_rejection_symbol, token);
        let emitter = Emitter::with_config(cfg);

        set_max_listeners(f64::INFINITY).unwrap();
        set_capture_rejections(false);
        assert_eq!(max_listeners(), MaxListeners::Unlimited);
        assert!(!capture_rejections());
        assert_eq!(emitter.get_max_listeners(), MaxListeners::Limited(3));
        assert!(emitter.capture_rejections());

        let err = set_max_listeners(-2_i64).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(max_listeners(), MaxListeners::Unlimited);

        *DEFAULTS.write() = saved;
        assert_ne!(capture_rejection_symbol(), token);
    }
}
