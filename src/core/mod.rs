//! Emitter core: registry, dispatch and failure routing.
//!
//! The public API from this module is [`Emitter`] with its configuration
//! ([`EmitterConfig`], [`MaxListeners`]), diagnostics and process-wide defaults.
//!
//! Internal modules:
//! - [`registry`]: per-key listener sequences;
//! - [`dispatch`]: one synchronous pass over a listener snapshot;
//! - [`router`]: where listener failures go (handler, `error`, unhandled);
//! - [`emitter`]: the façade composing all of the above;
//! - [`diagnostics`]: leak warnings and unhandled-failure reporting.

mod config;
pub mod defaults;
mod diagnostics;
mod dispatch;
mod emitter;
mod registry;
mod router;

pub use config::{DEFAULT_MAX_LISTENERS, EmitterConfig, MaxListeners, UnhandledHook, WarningHook};
pub use diagnostics::{MaxListenersWarning, UnhandledFailure};
pub use emitter::{Emitter, WeakEmitter};
