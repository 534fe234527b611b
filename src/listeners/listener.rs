//! # Listener callbacks (`Listener`)
//!
//! A [`Listener`] is a shared, type-erased callback with a uniform contract:
//! it receives the emission arguments and either completes (`Outcome::Done`),
//! hands back a deferred result (`Outcome::Deferred`), or fails synchronously
//! with a [`Payload`].
//!
//! Identity is the identity of the shared allocation: clones of one listener
//! are the same listener, two listeners built from identical closures are not.
//!
//! ## Example
//! ```rust
//! use emitvisor::{Listener, Payload};
//!
//! let l = Listener::sync(|args: &[Payload]| {
//!     let _ = args;
//! });
//! assert!(l.ptr_eq(&l.clone()));
//! assert!(!l.ptr_eq(&Listener::sync(|_: &[Payload]| {})));
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::events::Payload;

/// Future returned by deferred listeners.
pub type DeferredFuture = BoxFuture<'static, Result<(), Payload>>;

/// What a listener call produced.
pub enum Outcome {
    /// Completed synchronously.
    Done,
    /// Completes later; a failure is routed once it happens.
    Deferred(DeferredFuture),
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Done => f.write_str("Done"),
            Outcome::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

/// Result of a single listener call.
pub type ListenerResult = Result<Outcome, Payload>;

type ListenerFn = dyn Fn(&[Payload]) -> ListenerResult + Send + Sync + 'static;

/// Shared callback registered against an event key.
#[derive(Clone)]
pub struct Listener {
    f: Arc<ListenerFn>,
}

impl Listener {
    /// Creates a listener from the full callback contract.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Payload]) -> ListenerResult + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Creates an infallible listener.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&[Payload]) + Send + Sync + 'static,
    {
        Self::new(move |args| {
            f(args);
            Ok(Outcome::Done)
        })
    }

    /// Creates a listener that may fail synchronously.
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn(&[Payload]) -> Result<(), Payload> + Send + Sync + 'static,
    {
        Self::new(move |args| f(args).map(|()| Outcome::Done))
    }

    /// Creates a listener returning a deferred result.
    ///
    /// The future must own what it needs from the arguments (clone payloads out).
    pub fn deferred<F, Fut>(f: F) -> Self
    where
        F: Fn(&[Payload]) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Payload>> + Send + 'static,
    {
        Self::new(move |args| Ok(Outcome::Deferred(Box::pin(f(args)))))
    }

    /// Invokes the callback.
    #[inline]
    pub fn call(&self, args: &[Payload]) -> ListenerResult {
        (self.f)(args)
    }

    /// True if both handles refer to the same callback.
    #[inline]
    pub fn ptr_eq(&self, other: &Listener) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Arc::as_ptr(&self.f) as *const ())
    }
}

impl From<Listener> for Payload {
    fn from(value: Listener) -> Self {
        Payload::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_sync_listener_reports_done() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let l = Listener::sync(move |args: &[Payload]| {
            h.fetch_add(args.len(), Ordering::SeqCst);
        });

        let out = l.call(&[Payload::new(1), Payload::new(2)]);
        assert!(matches!(out, Ok(Outcome::Done)));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fallible_listener_surfaces_failure() {
        let l = Listener::fallible(|_: &[Payload]| Err(Payload::from("boom")));
        let err = l.call(&[]).unwrap_err();
        assert_eq!(err.as_str(), Some("boom"));
    }

    #[tokio::test]
    async fn test_deferred_listener_returns_future() {
        let l = Listener::deferred(|args: &[Payload]| {
            let first = args.first().cloned();
            async move {
                match first {
                    Some(p) if p.as_str() == Some("ok") => Ok(()),
                    _ => Err(Payload::from("rejected")),
                }
            }
        });

        let Ok(Outcome::Deferred(fut)) = l.call(&[Payload::from("ok")]) else {
            panic!("expected deferred outcome");
        };
        assert!(fut.await.is_ok());

        let Ok(Outcome::Deferred(fut)) = l.call(&[]) else {
            panic!("expected deferred outcome");
        };
        assert_eq!(fut.await.unwrap_err().as_str(), Some("rejected"));
    }

    #[test]
    fn test_payload_carries_listener_identity() {
        let l = Listener::sync(|_: &[Payload]| {});
        let p = Payload::from(l.clone());
        assert!(p.downcast_ref::<Listener>().is_some_and(|x| x.ptr_eq(&l)));
    }
}
