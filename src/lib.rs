//! # emitvisor
//!
//! **Emitvisor** is a synchronous publish/subscribe event emitter for Rust.
//!
//! Independent pieces of code register [`Listener`]s against named events
//! ([`EventKey`]) and later deliver values ([`Payload`]) to all of them, in
//! registration order, with once-only and prepended subscriptions, listener
//! leak warnings, and a routing policy for listeners that fail now or later.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  on / once / prepend_*           off / remove_all_*               emit(key, args)
//!        │                               │                               │
//!        ▼                               ▼                               ▼
//! ┌───────────────────────────────────────────────────────────────────────────────┐
//! │  Emitter (façade)                                                             │
//! │  - lifecycle events: newListener (before insert), removeListener (after)      │
//! │  - leak warning: count > max_listeners → one warning per key (tracing + hook) │
//! │  - config captured at construction (max listeners, capture-rejections, token) │
//! └──────┬──────────────────────────────┬─────────────────────────────────────────┘
//!        ▼                              ▼
//! ┌──────────────────┐        ┌────────────────────────────────────┐
//! │ Registry         │ snapshot│ dispatch (synchronous walk)       │
//! │ key → [entries]  │───────►│  Ok(Done) │ Ok(Deferred) │ Err/panic│
//! │ Plain | Once     │        └─────┬─────────────┬──────────┬──────┘
//! └──────────────────┘              │             │          │
//!                                   ▼             ▼          ▼
//!                                 done      tokio task    router ──► rejection handler
//!                                           (await, then          ├─► emit("error")
//!                                            router later)        └─► Unhandled
//! ```
//!
//! ### Failure policy
//! ```text
//! synchronous failure (Err or panic) of a listener of `key`:
//!   ├─ every other listener of the snapshot still runs
//!   └─ then: rejection handler │ "error" listeners │ emit() returns Err(Unhandled)
//!
//! deferred failure (future resolved to Err or panicked):
//!   ├─ capture_rejections = true  → rejection handler │ "error" listeners │ unhandled channel
//!   └─ capture_rejections = false → unhandled channel
//!
//! failure of an "error" listener → emit() returns Err(Unhandled) (never re-routed)
//! ```
//!
//! ## Features
//! | Area              | Description                                                        | Key types / functions                      |
//! |-------------------|--------------------------------------------------------------------|--------------------------------------------|
//! | **Emitter**       | Register, remove, emit, introspect.                                | [`Emitter`], [`WeakEmitter`]               |
//! | **Listeners**     | Sync, fallible and deferred callbacks; once-wrappers.              | [`Listener`], [`Outcome`], [`RawListener`] |
//! | **Events**        | Text or token keys, type-erased payloads.                          | [`EventKey`], [`Token`], [`Payload`]       |
//! | **Diagnostics**   | Leak warnings, unhandled failures.                                 | [`MaxListenersWarning`], [`UnhandledFailure`] |
//! | **Errors**        | Typed errors for validation and unhandled failures.                | [`EmitterError`]                           |
//! | **Configuration** | Per-instance config, process-wide defaults.                        | [`EmitterConfig`], [`MaxListeners`], [`defaults`] |
//! | **Waiting**       | Await the next emission of a key.                                  | [`once`]                                   |
//!
//! ## Example
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use emitvisor::{Emitter, EmitterConfig, ERROR, Listener, MaxListeners, Payload};
//!
//! fn main() -> Result<(), emitvisor::EmitterError> {
//!     let emitter = Emitter::with_config(
//!         EmitterConfig::default().with_max_listeners(MaxListeners::Limited(5)),
//!     );
//!     let errors = Arc::new(Mutex::new(Vec::new()));
//!     let sink = Arc::clone(&errors);
//!
//!     emitter
//!         .on(ERROR, Listener::sync(move |args: &[Payload]| {
//!             sink.lock().unwrap().push(args[0].as_str().unwrap_or("?").to_string());
//!         }))?
//!         .once("job", Listener::fallible(|_: &[Payload]| Err(Payload::from("boom"))))?;
//!
//!     assert!(emitter.emit("job", &[])?);  // failure routed to "error"
//!     assert!(!emitter.emit("job", &[])?); // once-listener already gone
//!     assert_eq!(*errors.lock().unwrap(), vec!["boom".to_string()]);
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod listeners;
mod wait;

// ---- Public re-exports ----

pub use self::core::defaults;
pub use self::core::{
    DEFAULT_MAX_LISTENERS, Emitter, EmitterConfig, MaxListeners, MaxListenersWarning,
    UnhandledFailure, UnhandledHook, WarningHook, WeakEmitter,
};
pub use error::EmitterError;
pub use events::{
    ERROR, ERROR_MONITOR, EventKey, NEW_LISTENER, Payload, REJECTION_TOKEN_KEY, REMOVE_LISTENER,
    Token,
};
pub use listeners::{DeferredFuture, Listener, ListenerResult, OnceWrapper, Outcome, RawListener};
pub use wait::once;
