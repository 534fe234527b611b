//! Event data model: keys, tokens and payloads.
//!
//! ## Contents
//! - [`EventKey`], [`Token`] channel identity (text name or opaque token)
//! - [`Payload`] type-erased emission argument / failure value
//! - reserved names [`NEW_LISTENER`], [`REMOVE_LISTENER`], [`ERROR`] and the
//!   [`ERROR_MONITOR`] token

mod key;
mod payload;

pub use key::{
    ERROR, ERROR_MONITOR, EventKey, NEW_LISTENER, REJECTION_TOKEN_KEY, REMOVE_LISTENER, Token,
};
pub use payload::Payload;
