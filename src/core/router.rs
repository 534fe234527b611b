//! # Failure router.
//!
//! Decides where a listener failure goes:
//!
//! ```text
//! route(key, args, failure):
//!   ├─ rejection handler assigned under capture_rejection_symbol?
//!   │     └─► handler(failure, key, args...)   (terminal: its own failures are only logged)
//!   └─ else emit("error", failure)
//!         └─ no `error` listeners ──► Err(Unhandled)
//!
//! watch(key, args, deferred):                     (runtime task, after emit returned)
//!   await deferred
//!   ├─ Ok                              ──► done
//!   ├─ Err/panic, capture_rejections   ──► route(...)
//!   │     └─ Err(Unhandled) / emitter gone ──► unhandled channel
//!   ├─ Err/panic, no capture           ──► unhandled channel
//!   └─ Err/panic, key is `error` or ERROR_MONITOR ──► unhandled channel
//! ```
//!
//! Failures of `error` and `ERROR_MONITOR` listeners are never routed back to
//! `error`, synchronous or deferred.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::core::diagnostics::{self, UnhandledFailure};
use crate::core::dispatch::{dispatch, panic_payload};
use crate::core::emitter::{Emitter, error_key};
use crate::error::EmitterError;
use crate::events::{ERROR_MONITOR, EventKey, Payload};
use crate::listeners::{DeferredFuture, RawListener};

impl Emitter {
    /// Routes one failure produced by a listener of `key`.
    pub(crate) fn route(
        &self,
        key: &EventKey,
        args: &[Payload],
        failure: Payload,
    ) -> Result<(), EmitterError> {
        if let Some(handler) = self.rejection_handler() {
            let mut handler_args = Vec::with_capacity(args.len() + 2);
            handler_args.push(failure);
            handler_args.push(Payload::from(key.clone()));
            handler_args.extend_from_slice(args);

            let out = dispatch(&[RawListener::Plain(handler)], &handler_args);
            for failure in out.failures {
                tracing::error!(event = %key, failure = ?failure, "rejection handler failed");
            }
            for fut in out.deferred {
                let event = key.clone();
                if let Err(err) = spawn_detached(key, async move {
                    if let Err(failure) = fut.await {
                        tracing::error!(event = %event, failure = ?failure, "rejection handler failed");
                    }
                }) {
                    tracing::error!(event = %key, error = %err, "rejection handler result dropped");
                }
            }
            return Ok(());
        }

        self.emit_key(&error_key(), &[failure]).map(|_| ())
    }

    /// Drives a deferred listener result to completion and routes its failure.
    pub(crate) fn watch(
        &self,
        key: &EventKey,
        args: &[Payload],
        fut: DeferredFuture,
    ) -> Result<(), EmitterError> {
        let weak = self.downgrade();
        let capture = self.shared.capture_rejections && !is_terminal(key);
        let hook = self.shared.on_unhandled.clone();
        let event = key.clone();
        let args = args.to_vec();

        spawn_detached(key, async move {
            let failure = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(())) => return,
                Ok(Err(failure)) => failure,
                Err(panic) => panic_payload(panic),
            };

            let failure = match weak.upgrade() {
                Some(emitter) if capture => match emitter.route(&event, &args, failure) {
                    Ok(()) => return,
                    Err(EmitterError::Unhandled { failure, .. }) => failure,
                    Err(err) => Payload::from(err),
                },
                _ => failure,
            };

            diagnostics::report_unhandled(UnhandledFailure { event, failure }, hook.as_ref());
        })
    }
}

/// Keys whose listener failures end the routing chain.
fn is_terminal(key: &EventKey) -> bool {
    key.is_error() || key.as_token() == Some(&*ERROR_MONITOR)
}

/// Spawns on the ambient tokio runtime.
fn spawn_detached<F>(key: &EventKey, fut: F) -> Result<(), EmitterError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::runtime::Handle::try_current().map_err(|_| EmitterError::NoRuntime {
        event: key.clone(),
    })?;
    handle.spawn(fut);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tokio::sync::mpsc;

    use crate::core::{Emitter, EmitterConfig, MaxListeners};
    use crate::events::{ERROR, ERROR_MONITOR, EventKey, Payload, Token};
    use crate::listeners::Listener;

    fn config() -> EmitterConfig {
        EmitterConfig::default().with_max_listeners(MaxListeners::Limited(10))
    }

    fn failing_later(msg: &'static str) -> Listener {
        Listener::deferred(move |_: &[Payload]| async move {
            tokio::task::yield_now().await;
            Err(Payload::from(msg))
        })
    }

    fn unhandled_channel(cfg: EmitterConfig) -> (EmitterConfig, mpsc::UnboundedReceiver<(String, Payload)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cfg = cfg.on_unhandled(move |f| {
            let _ = tx.send((f.event.to_string(), f.failure));
        });
        (cfg, rx)
    }

    #[tokio::test]
    async fn test_captured_rejection_goes_to_error_listener() {
        let emitter = Emitter::with_config(config().with_capture_rejections(true));
        let (tx, mut rx) = mpsc::unbounded_channel();
        emitter
            .on(ERROR, Listener::sync(move |args: &[Payload]| {
                let _ = tx.send(args.to_vec());
            }))
            .unwrap();
        emitter.on("job", failing_later("late")).unwrap();

        assert!(emitter.emit("job", &[]).unwrap());
        let args = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].as_str(), Some("late"));
    }

    #[tokio::test]
    async fn test_deferred_failure_of_error_listener_is_not_rerouted() {
        let (cfg, mut rx) = unhandled_channel(config().with_capture_rejections(true));
        let emitter = Emitter::with_config(cfg);
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        emitter
            .on(ERROR, Listener::deferred(move |_: &[Payload]| {
                c.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::task::yield_now().await;
                    Err(Payload::from("error listener broke"))
                }
            }))
            .unwrap();
        emitter
            .on("job", Listener::fallible(|_: &[Payload]| Err(Payload::from("sync"))))
            .unwrap();

        assert!(emitter.emit("job", &[]).unwrap());
        let (event, failure) = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, ERROR);
        assert_eq!(failure.as_str(), Some("error listener broke"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_deferred_failure_of_error_monitor_is_unhandled_once() {
        let (cfg, mut rx) = unhandled_channel(config().with_capture_rejections(true));
        let emitter = Emitter::with_config(cfg);
        let errors = Arc::new(AtomicUsize::new(0));
        let e = Arc::clone(&errors);
        emitter
            .on(ERROR, Listener::sync(move |_: &[Payload]| {
                e.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        emitter
            .on(&*ERROR_MONITOR, failing_later("monitor broke"))
            .unwrap();

        assert!(emitter.emit(ERROR, &[Payload::from("bad")]).unwrap());
        let (event, failure) = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, EventKey::from(&*ERROR_MONITOR).to_string());
        assert_eq!(failure.as_str(), Some("monitor broke"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_captured_rejection_without_error_listener_is_unhandled() {
        let (cfg, mut rx) = unhandled_channel(config().with_capture_rejections(true));
        let emitter = Emitter::with_config(cfg);
        emitter.on("job", failing_later("nobody")).unwrap();

        assert!(emitter.emit("job", &[]).unwrap());
        let (event, failure) = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, "job");
        assert_eq!(failure.as_str(), Some("nobody"));
    }

    #[tokio::test]
    async fn test_rejection_handler_takes_precedence() {
        let token = Token::new("custom.rejection");
        let emitter = Emitter::with_config(
            config()
                .with_capture_rejections(true)
                .with_capture_rejection_symbol(token.clone()),
        );
        let errors = Arc::new(Mutex::new(0));
        let e = Arc::clone(&errors);
        emitter
            .on(ERROR, Listener::sync(move |_: &[Payload]| *e.lock().unwrap() += 1))
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        emitter.set_symbol_handler(
            &token,
            Listener::sync(move |args: &[Payload]| {
                let _ = tx.send(args.to_vec());
            }),
        );
        emitter.on("job", failing_later("late")).unwrap();
        emitter.emit("job", &[Payload::new(5_u8)]).unwrap();

        let args = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(args[0].as_str(), Some("late"));
        assert_eq!(args[1].downcast_ref::<EventKey>(), Some(&EventKey::from("job")));
        assert_eq!(args[2].downcast_ref::<u8>(), Some(&5));
        assert_eq!(*errors.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_uncaptured_rejection_is_unhandled_even_with_error_listener() {
        let (cfg, mut rx) = unhandled_channel(config().with_capture_rejections(false));
        let emitter = Emitter::with_config(cfg);
        let errors = Arc::new(Mutex::new(0));
        let e = Arc::clone(&errors);
        emitter
            .on(ERROR, Listener::sync(move |_: &[Payload]| *e.lock().unwrap() += 1))
            .unwrap();
        emitter.on("job", failing_later("ignored")).unwrap();

        emitter.emit("job", &[]).unwrap();
        let (_, failure) = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(failure.as_str(), Some("ignored"));
        assert_eq!(*errors.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_successful_deferred_result_is_silent() {
        let (cfg, mut rx) = unhandled_channel(config().with_capture_rejections(true));
        let emitter = Emitter::with_config(cfg);
        let (tx, mut done) = mpsc::unbounded_channel();
        emitter
            .on("job", Listener::deferred(move |_: &[Payload]| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(());
                    Ok(())
                }
            }))
            .unwrap();

        emitter.emit("job", &[]).unwrap();
        done.recv().await.unwrap();
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_deferred_outside_runtime_is_routed_synchronously() {
        let emitter = Emitter::with_config(config().with_capture_rejections(true));
        emitter.on("job", failing_later("never polled")).unwrap();

        let err = emitter.emit("job", &[]).unwrap_err();
        let failure = err.failure().unwrap();
        let inner = failure.downcast_ref::<crate::EmitterError>().unwrap();
        assert_eq!(inner.as_label(), "no_runtime");
    }
}
