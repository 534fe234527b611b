//! # Emitter - the public façade.
//!
//! [`Emitter`] composes the [`Registry`] and the dispatch engine, and adds the
//! convenience operations (`once`, `prepend_*`, bulk removal), the leak warning
//! heuristic and failure routing.
//!
//! ## Architecture
//! ```text
//! on/once/prepend_* ──► emit(newListener) ──► Registry.add ──► leak check ──► warn (tracing + hook)
//! off               ──► Registry.remove_one ──► emit(removeListener)
//! emit(key, args)   ──► Registry.get (snapshot) ──► dispatch ──┬─► sync failures ──► route
//!                                                             └─► deferred ──► runtime task ──► route (later)
//! ```
//!
//! ## Rules
//! - The state lock is never held while a listener runs, so listeners may
//!   register/remove listeners (affects only later emissions).
//! - `Emitter` is a cheap handle (`Arc`); clones share one registry.
//! - Listeners that need their emitter should capture a [`WeakEmitter`] to
//!   avoid a reference cycle.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::core::config::{EmitterConfig, MaxListeners, UnhandledHook, WarningHook};
use crate::core::diagnostics::{self, MaxListenersWarning};
use crate::core::dispatch::dispatch;
use crate::core::registry::Registry;
use crate::error::EmitterError;
use crate::events::{ERROR, ERROR_MONITOR, EventKey, NEW_LISTENER, Payload, REMOVE_LISTENER, Token};
use crate::listeners::{Listener, OnceWrapper, RawListener};

/// Mutable per-instance state guarded by one lock.
struct State {
    registry: Registry,
    max_listeners: MaxListeners,
    warned: HashSet<EventKey>,
    properties: HashMap<Token, Listener>,
}

impl State {
    /// Marks `key` as warned and returns the warning if `count` just went over the threshold.
    fn check_leak(&mut self, key: &EventKey, count: usize) -> Option<MaxListenersWarning> {
        let max = self.max_listeners.limit()?;
        if count <= max || self.warned.contains(key) {
            return None;
        }
        self.warned.insert(key.clone());
        Some(MaxListenersWarning {
            event: key.clone(),
            count,
            max,
        })
    }

    /// Forgets the warning for `key` once it holds fewer listeners than the threshold.
    fn relax_leak(&mut self, key: &EventKey, remaining: usize) {
        if remaining == 0 || self.max_listeners.is_under(remaining) {
            self.warned.remove(key);
        }
    }
}

pub(crate) struct Shared {
    state: Mutex<State>,
    pub(crate) capture_rejections: bool,
    pub(crate) capture_rejection_symbol: Token,
    on_warning: Option<WarningHook>,
    pub(crate) on_unhandled: Option<UnhandledHook>,
}

/// Synchronous publish/subscribe emitter.
///
/// # Example
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use emitvisor::{Emitter, Listener, Payload};
///
/// let emitter = Emitter::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let s = Arc::clone(&seen);
///
/// emitter
///     .on("data", Listener::sync(move |args: &[Payload]| {
///         if let Some(n) = args[0].downcast_ref::<i32>() {
///             s.lock().unwrap().push(*n);
///         }
///     }))
///     .unwrap();
///
/// assert!(emitter.emit("data", &[Payload::new(1)]).unwrap());
/// assert!(!emitter.emit("other", &[]).unwrap());
/// assert_eq!(*seen.lock().unwrap(), vec![1]);
/// ```
#[derive(Clone)]
pub struct Emitter {
    pub(crate) shared: Arc<Shared>,
}

/// Non-owning handle to an [`Emitter`].
#[derive(Clone, Default)]
pub struct WeakEmitter {
    shared: Weak<Shared>,
}

impl WeakEmitter {
    /// Returns the emitter if it is still alive.
    pub fn upgrade(&self) -> Option<Emitter> {
        self.shared.upgrade().map(|shared| Emitter { shared })
    }
}

impl fmt::Debug for WeakEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakEmitter")
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter {
    /// Creates an emitter from the current process-wide defaults.
    pub fn new() -> Self {
        Self::with_config(EmitterConfig::default())
    }

    /// Creates an emitter from an explicit configuration.
    pub fn with_config(cfg: EmitterConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    registry: Registry::default(),
                    max_listeners: cfg.max_listeners,
                    warned: HashSet::new(),
                    properties: HashMap::new(),
                }),
                capture_rejections: cfg.capture_rejections,
                capture_rejection_symbol: cfg.capture_rejection_symbol,
                on_warning: cfg.on_warning,
                on_unhandled: cfg.on_unhandled,
            }),
        }
    }

    /// Returns a non-owning handle.
    pub fn downgrade(&self) -> WeakEmitter {
        WeakEmitter {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// True if both handles refer to the same emitter.
    pub fn ptr_eq(&self, other: &Emitter) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    // ---------------------------
    // Registration
    // ---------------------------

    /// Appends `listener` to `key`. Alias: [`Emitter::add_listener`].
    ///
    /// Emits `newListener(key, listener)` before the insertion.
    pub fn on(&self, key: impl Into<EventKey>, listener: Listener) -> Result<&Self, EmitterError> {
        self.insert(key.into(), RawListener::Plain(listener), false)
    }

    /// Same as [`Emitter::on`].
    pub fn add_listener(
        &self,
        key: impl Into<EventKey>,
        listener: Listener,
    ) -> Result<&Self, EmitterError> {
        self.on(key, listener)
    }

    /// Inserts `listener` at the front of `key`.
    pub fn prepend_listener(
        &self,
        key: impl Into<EventKey>,
        listener: Listener,
    ) -> Result<&Self, EmitterError> {
        self.insert(key.into(), RawListener::Plain(listener), true)
    }

    /// Appends a listener that removes itself before its first invocation.
    pub fn once(&self, key: impl Into<EventKey>, listener: Listener) -> Result<&Self, EmitterError> {
        let key = key.into();
        let wrapper = OnceWrapper::new(self.downgrade(), key.clone(), listener);
        self.insert(key, RawListener::Once(wrapper), false)
    }

    /// Inserts a once-listener at the front of `key`.
    pub fn prepend_once_listener(
        &self,
        key: impl Into<EventKey>,
        listener: Listener,
    ) -> Result<&Self, EmitterError> {
        let key = key.into();
        let wrapper = OnceWrapper::new(self.downgrade(), key.clone(), listener);
        self.insert(key, RawListener::Once(wrapper), true)
    }

    fn insert(&self, key: EventKey, entry: RawListener, prepend: bool) -> Result<&Self, EmitterError> {
        self.emit_key(
            &EventKey::from(NEW_LISTENER),
            &[Payload::from(key.clone()), Payload::from(entry.listener().clone())],
        )?;

        let warning = {
            let mut st = self.shared.state.lock();
            let count = st.registry.add(&key, entry, prepend);
            st.check_leak(&key, count)
        };
        if let Some(warning) = warning {
            diagnostics::report_warning(&warning, self.shared.on_warning.as_ref());
        }
        Ok(self)
    }

    // ---------------------------
    // Removal
    // ---------------------------

    /// Removes the first occurrence of `listener` (plain or once-wrapped) from `key`.
    ///
    /// Emits `removeListener(key, listener)` only if something was removed.
    pub fn off(&self, key: impl Into<EventKey>, listener: &Listener) -> Result<&Self, EmitterError> {
        self.remove_entry(&key.into(), &RawListener::Plain(listener.clone()))
    }

    /// Same as [`Emitter::off`].
    pub fn remove_listener(
        &self,
        key: impl Into<EventKey>,
        listener: &Listener,
    ) -> Result<&Self, EmitterError> {
        self.off(key, listener)
    }

    /// Removes the first entry matching `target` (a specific once-wrapper or any form of a listener).
    pub fn remove_raw_listener(
        &self,
        key: impl Into<EventKey>,
        target: &RawListener,
    ) -> Result<&Self, EmitterError> {
        self.remove_entry(&key.into(), target)
    }

    pub(crate) fn remove_entry(
        &self,
        key: &EventKey,
        target: &RawListener,
    ) -> Result<&Self, EmitterError> {
        let removed = {
            let mut st = self.shared.state.lock();
            let removed = st.registry.remove_one(key, target);
            if let Some((_, remaining)) = &removed {
                st.relax_leak(key, *remaining);
            }
            removed
        };
        if let Some((entry, _)) = removed {
            self.notify_removed(key, &entry)?;
        }
        Ok(self)
    }

    /// Removes every listener of `key`, one at a time front-to-back, each
    /// followed by a `removeListener` emission.
    pub fn remove_all_listeners_of(&self, key: impl Into<EventKey>) -> Result<&Self, EmitterError> {
        self.drain_key(&key.into())?;
        Ok(self)
    }

    /// Removes every listener of every key.
    ///
    /// Keys are drained in [`Emitter::event_names`] order; `removeListener`
    /// itself is drained last so its listeners observe every other removal.
    pub fn remove_all_listeners(&self) -> Result<&Self, EmitterError> {
        let remove_key = EventKey::from(REMOVE_LISTENER);
        let keys = self.shared.state.lock().registry.keys();
        for key in keys.iter().filter(|k| **k != remove_key) {
            self.drain_key(key)?;
        }
        self.drain_key(&remove_key)?;
        Ok(self)
    }

    fn drain_key(&self, key: &EventKey) -> Result<(), EmitterError> {
        let pending = self.shared.state.lock().registry.len(key);
        for _ in 0..pending {
            let popped = {
                let mut st = self.shared.state.lock();
                let popped = st.registry.pop_front(key);
                if let Some((_, remaining)) = &popped {
                    st.relax_leak(key, *remaining);
                }
                popped
            };
            match popped {
                Some((entry, _)) => self.notify_removed(key, &entry)?,
                None => break,
            }
        }
        Ok(())
    }

    fn notify_removed(&self, key: &EventKey, entry: &RawListener) -> Result<(), EmitterError> {
        self.emit_key(
            &EventKey::from(REMOVE_LISTENER),
            &[Payload::from(key.clone()), Payload::from(entry.listener().clone())],
        )
        .map(|_| ())
    }

    // ---------------------------
    // Emission
    // ---------------------------

    /// Synchronously invokes every listener registered for `key` at call time.
    ///
    /// Returns `Ok(true)` if at least one listener was invoked, `Ok(false)` otherwise.
    ///
    /// ### Failure policy
    /// - All listeners of the snapshot run, even if some fail or panic.
    /// - Each synchronous failure is then routed: rejection handler, else the
    ///   `error` event.
    /// - The first failure nobody handles is returned as [`EmitterError::Unhandled`]
    ///   (the remaining failures are still routed).
    /// - Emitting `error` with no `error` listeners returns
    ///   [`EmitterError::Unhandled`] carrying the first argument.
    pub fn emit(&self, key: impl Into<EventKey>, args: &[Payload]) -> Result<bool, EmitterError> {
        self.emit_key(&key.into(), args)
    }

    pub(crate) fn emit_key(&self, key: &EventKey, args: &[Payload]) -> Result<bool, EmitterError> {
        if key.is_error() {
            self.run_monitors(args);
        }

        let snapshot = self.shared.state.lock().registry.get(key);
        if snapshot.is_empty() {
            if key.is_error() {
                return Err(EmitterError::Unhandled {
                    event: key.clone(),
                    failure: args
                        .first()
                        .cloned()
                        .unwrap_or_else(|| Payload::from("unhandled error")),
                });
            }
            return Ok(false);
        }

        let mut out = dispatch(&snapshot, args);
        tracing::trace!(
            event = %key,
            invoked = out.invoked,
            failures = out.failures.len(),
            deferred = out.deferred.len(),
            "emitted"
        );
        for fut in out.deferred.drain(..) {
            if let Err(err) = self.watch(key, args, fut) {
                out.failures.push(Payload::from(err));
            }
        }

        let mut unhandled = None;
        for failure in out.failures {
            let routed = if key.is_error() {
                Err(EmitterError::Unhandled {
                    event: key.clone(),
                    failure,
                })
            } else {
                self.route(key, args, failure)
            };
            if let Err(err) = routed {
                unhandled.get_or_insert(err);
            }
        }
        match unhandled {
            Some(err) => Err(err),
            None => Ok(true),
        }
    }

    /// `ERROR_MONITOR` listeners observe `error` first; their failures are terminal
    /// (logged when synchronous, unhandled when deferred).
    fn run_monitors(&self, args: &[Payload]) {
        let monitor = EventKey::from(&*ERROR_MONITOR);
        let snapshot = self.shared.state.lock().registry.get(&monitor);
        if snapshot.is_empty() {
            return;
        }
        let out = dispatch(&snapshot, args);
        for failure in out.failures {
            tracing::error!(failure = ?failure, "error monitor listener failed");
        }
        for fut in out.deferred {
            if let Err(err) = self.watch(&monitor, args, fut) {
                tracing::error!(error = %err, "error monitor deferred result dropped");
            }
        }
    }

    // ---------------------------
    // Introspection
    // ---------------------------

    /// Keys currently holding at least one listener.
    pub fn event_names(&self) -> Vec<EventKey> {
        self.shared.state.lock().registry.keys()
    }

    /// Original listeners of `key` (once-wrappers unwrapped), in invocation order.
    pub fn listeners(&self, key: impl Into<EventKey>) -> Vec<Listener> {
        self.raw_listeners(key)
            .iter()
            .map(|entry| entry.listener().clone())
            .collect()
    }

    /// Stored entries of `key`, once-wrappers included.
    pub fn raw_listeners(&self, key: impl Into<EventKey>) -> Vec<RawListener> {
        self.shared.state.lock().registry.get(&key.into())
    }

    /// Number of listeners registered for `key`.
    pub fn listener_count(&self, key: impl Into<EventKey>) -> usize {
        self.shared.state.lock().registry.len(&key.into())
    }

    /// Number of times `listener` (plain or once-wrapped) is registered for `key`.
    pub fn listener_count_of(&self, key: impl Into<EventKey>, listener: &Listener) -> usize {
        self.raw_listeners(key)
            .iter()
            .filter(|entry| entry.listener().ptr_eq(listener))
            .count()
    }

    // ---------------------------
    // Configuration
    // ---------------------------

    /// Current warning threshold.
    pub fn get_max_listeners(&self) -> MaxListeners {
        self.shared.state.lock().max_listeners
    }

    /// Sets the warning threshold.
    ///
    /// Raising it forgets every key already warned about; lowering it never
    /// warns retroactively.
    pub fn set_max_listeners<T>(&self, value: T) -> Result<&Self, EmitterError>
    where
        T: TryInto<MaxListeners, Error = EmitterError>,
    {
        let next = value.try_into()?;
        {
            let mut st = self.shared.state.lock();
            if st.max_listeners.is_raised_by(next) {
                st.warned.clear();
            }
            st.max_listeners = next;
        }
        Ok(self)
    }

    /// Whether deferred failures are routed for this instance.
    pub fn capture_rejections(&self) -> bool {
        self.shared.capture_rejections
    }

    /// Token naming this instance's rejection handler.
    pub fn capture_rejection_symbol(&self) -> &Token {
        &self.shared.capture_rejection_symbol
    }

    /// Assigns `handler` under `token`.
    ///
    /// When `token` is [`Emitter::capture_rejection_symbol`], the handler takes
    /// every routed failure as `(failure, event key, emission args...)` instead
    /// of the `error` event.
    pub fn set_symbol_handler(&self, token: &Token, handler: Listener) -> &Self {
        self.shared
            .state
            .lock()
            .properties
            .insert(token.clone(), handler);
        self
    }

    /// Clears the handler assigned under `token`.
    pub fn remove_symbol_handler(&self, token: &Token) -> Option<Listener> {
        self.shared.state.lock().properties.remove(token)
    }

    pub(crate) fn rejection_handler(&self) -> Option<Listener> {
        self.shared
            .state
            .lock()
            .properties
            .get(&self.shared.capture_rejection_symbol)
            .cloned()
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.shared.state.lock();
        f.debug_struct("Emitter")
            .field("events", &st.registry.keys())
            .field("max_listeners", &st.max_listeners)
            .field("capture_rejections", &self.shared.capture_rejections)
            .finish()
    }
}

/// Name of the reserved error event as a key.
pub(crate) fn error_key() -> EventKey {
    EventKey::from(ERROR)
}
