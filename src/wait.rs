//! # Awaiting a single emission.
//!
//! [`once`] turns the next emission of a key into a future:
//! - resolves with the emission arguments;
//! - fails with the first argument of an `error` emission that happens first
//!   (unless the awaited key is `error` itself).
//!
//! Both temporary listeners are removed as soon as either fires. If they are
//! removed by someone else first, the future stays pending.
//!
//! ## Example
//! ```rust
//! use emitvisor::{Emitter, Payload, once};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let emitter = Emitter::new();
//! let e = emitter.clone();
//! tokio::spawn(async move {
//!     e.emit("ready", &[Payload::new(1_u8)]).unwrap();
//! });
//!
//! let args = once(&emitter, "ready").await.unwrap();
//! assert_eq!(args[0].downcast_ref::<u8>(), Some(&1));
//! # }
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::core::Emitter;
use crate::events::{ERROR, EventKey, Payload};
use crate::listeners::Listener;

type Slot = Arc<Mutex<Option<oneshot::Sender<Result<Vec<Payload>, Payload>>>>>;

/// Waits for the next emission of `key`.
pub async fn once(emitter: &Emitter, key: impl Into<EventKey>) -> Result<Vec<Payload>, Payload> {
    let key = key.into();
    let (tx, rx) = oneshot::channel();
    let slot: Slot = Arc::new(Mutex::new(Some(tx)));

    let on_event = {
        let slot = Arc::clone(&slot);
        Listener::sync(move |args: &[Payload]| {
            if let Some(tx) = slot.lock().take() {
                let _ = tx.send(Ok(args.to_vec()));
            }
        })
    };
    emitter.once(key.clone(), on_event.clone()).map_err(Payload::from)?;

    let on_error = if key.is_error() {
        None
    } else {
        let slot = Arc::clone(&slot);
        let on_error = Listener::sync(move |args: &[Payload]| {
            if let Some(tx) = slot.lock().take() {
                let failure = args
                    .first()
                    .cloned()
                    .unwrap_or_else(|| Payload::from("unhandled error"));
                let _ = tx.send(Err(failure));
            }
        });
        if let Err(err) = emitter.once(ERROR, on_error.clone()) {
            if let Err(cleanup) = emitter.off(key.clone(), &on_event) {
                tracing::debug!(event = %key, error = %cleanup, "waiter cleanup failed");
            }
            return Err(Payload::from(err));
        }
        Some(on_error)
    };
    drop(slot);

    let received = rx
        .await
        .map_err(|_| Payload::from("waiter dropped before the event fired"))?;

    match (&received, on_error) {
        (Ok(_), Some(on_error)) => {
            emitter.off(ERROR, &on_error).map_err(Payload::from)?;
        }
        (Err(_), _) => {
            emitter.off(key, &on_event).map_err(Payload::from)?;
        }
        (Ok(_), None) => {}
    }
    received
}
