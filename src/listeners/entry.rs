//! # Stored listener entries (`RawListener`)
//!
//! The registry stores [`RawListener`]s, not bare [`Listener`]s:
//! - [`RawListener::Plain`] a listener registered with `on`/`prepend_listener`;
//! - [`RawListener::Once`] a self-removing wrapper registered with `once`,
//!   carrying a back-reference to the original listener.
//!
//! ## Identity matching
//! ```text
//! entry            target           match when
//! Plain(l)         Plain(t)         l == t
//! Once(w)          Plain(t)         w.original == t
//! Once(w)          Once(v)          w is v (same wrapper)
//! Plain(_)         Once(_)          never
//! ```
//!
//! ## Once semantics
//! ```text
//! call(args):
//!   ├─ fired already? ──► Done (original never runs twice)
//!   ├─ remove this wrapper from the emitter (emits removeListener)
//!   └─ original.call(args)
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::WeakEmitter;
use crate::events::{EventKey, Payload};

use super::listener::{Listener, ListenerResult, Outcome};

/// Listener entry as stored in the registry.
#[derive(Clone)]
pub enum RawListener {
    /// Regular listener.
    Plain(Listener),
    /// Self-removing wrapper around a once-listener.
    Once(OnceWrapper),
}

impl RawListener {
    /// Original user-supplied listener (unwraps once-wrappers).
    pub fn listener(&self) -> &Listener {
        match self {
            RawListener::Plain(l) => l,
            RawListener::Once(w) => &w.state.original,
        }
    }

    /// True for once-wrappers.
    pub fn is_once(&self) -> bool {
        matches!(self, RawListener::Once(_))
    }

    /// True if this entry is (or wraps) `target`.
    pub fn matches(&self, target: &RawListener) -> bool {
        match (self, target) {
            (RawListener::Once(w), RawListener::Once(v)) => Arc::ptr_eq(&w.state, &v.state),
            (_, RawListener::Plain(t)) => self.listener().ptr_eq(t),
            (RawListener::Plain(_), RawListener::Once(_)) => false,
        }
    }

    /// Invokes the entry exactly as a dispatch would.
    pub fn call(&self, args: &[Payload]) -> ListenerResult {
        match self {
            RawListener::Plain(l) => l.call(args),
            RawListener::Once(w) => w.call(args),
        }
    }
}

impl fmt::Debug for RawListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawListener::Plain(l) => write!(f, "Plain({l:?})"),
            RawListener::Once(w) => write!(f, "Once({:?})", w.state.original),
        }
    }
}

struct OnceState {
    emitter: WeakEmitter,
    key: EventKey,
    original: Listener,
    fired: AtomicBool,
}

/// Self-removing wrapper created by `once`/`prepend_once_listener`.
#[derive(Clone)]
pub struct OnceWrapper {
    state: Arc<OnceState>,
}

impl OnceWrapper {
    pub(crate) fn new(emitter: WeakEmitter, key: EventKey, original: Listener) -> Self {
        Self {
            state: Arc::new(OnceState {
                emitter,
                key,
                original,
                fired: AtomicBool::new(false),
            }),
        }
    }

    /// True once the wrapper has been invoked.
    pub fn fired(&self) -> bool {
        self.state.fired.load(Ordering::Acquire)
    }

    fn call(&self, args: &[Payload]) -> ListenerResult {
        if self.state.fired.swap(true, Ordering::AcqRel) {
            return Ok(Outcome::Done);
        }
        if let Some(emitter) = self.state.emitter.upgrade() {
            emitter
                .remove_entry(&self.state.key, &RawListener::Once(self.clone()))
                .map_err(Payload::from)?;
        }
        self.state.original.call(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Emitter;

    fn noop() -> Listener {
        Listener::sync(|_: &[Payload]| {})
    }

    #[test]
    fn test_matching_rules() {
        let emitter = Emitter::new();
        let a = noop();
        let b = noop();
        let once = RawListener::Once(OnceWrapper::new(
            emitter.downgrade(),
            EventKey::from("x"),
            a.clone(),
        ));
        let other_once = RawListener::Once(OnceWrapper::new(
            emitter.downgrade(),
            EventKey::from("x"),
            a.clone(),
        ));

        assert!(RawListener::Plain(a.clone()).matches(&RawListener::Plain(a.clone())));
        assert!(!RawListener::Plain(a.clone()).matches(&RawListener::Plain(b.clone())));
        assert!(once.matches(&RawListener::Plain(a.clone())));
        assert!(once.matches(&once.clone()));
        assert!(!once.matches(&other_once));
        assert!(!RawListener::Plain(a.clone()).matches(&once));
        assert!(once.listener().ptr_eq(&a));
        assert!(once.is_once());
    }

    #[test]
    fn test_once_wrapper_fires_at_most_once_without_emitter() {
        let hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let original = Listener::sync(move |_: &[Payload]| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        let wrapper = {
            let emitter = Emitter::new();
            OnceWrapper::new(emitter.downgrade(), EventKey::from("x"), original)
        };

        let raw = RawListener::Once(wrapper.clone());
        assert!(raw.call(&[]).is_ok());
        assert!(raw.call(&[]).is_ok());
        assert!(wrapper.fired());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
