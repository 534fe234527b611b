//! # Event keys and opaque tokens.
//!
//! An [`EventKey`] names a delivery channel. It is either a text name
//! (`"data"`, `"error"`) or an opaque [`Token`] that is only equal to itself
//! and its clones.
//!
//! ## Reserved names
//! - [`NEW_LISTENER`]: emitted before a listener is inserted.
//! - [`REMOVE_LISTENER`]: emitted after a listener is removed.
//! - [`ERROR`]: failure channel; emitting it with no listeners is an unhandled failure.
//!
//! ## Example
//! ```rust
//! use emitvisor::{EventKey, Token};
//!
//! let tick = Token::new("tick");
//! assert_eq!(EventKey::from(&tick), EventKey::from(tick.clone()));
//! assert_ne!(EventKey::from(&tick), EventKey::from(&Token::new("tick")));
//! assert_eq!(EventKey::from("data"), EventKey::from(String::from("data")));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

/// Reserved event emitted with `(key, listener)` before a listener is inserted.
pub const NEW_LISTENER: &str = "newListener";
/// Reserved event emitted with `(key, listener)` after a listener is removed.
pub const REMOVE_LISTENER: &str = "removeListener";
/// Reserved failure event.
pub const ERROR: &str = "error";

/// Description of the well-known rejection token (see [`Token::for_key`]).
pub const REJECTION_TOKEN_KEY: &str = "nodejs.rejection";

/// Global sequence for token identities.
static TOKEN_SEQ: AtomicU64 = AtomicU64::new(1);

/// Registry behind [`Token::for_key`].
static WELL_KNOWN: LazyLock<Mutex<HashMap<Arc<str>, Token>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Token observing `error` emissions before regular `error` listeners run.
///
/// Listeners on this token never count as handlers: emitting `error` with
/// only monitors attached is still an unhandled failure.
pub static ERROR_MONITOR: LazyLock<Token> = LazyLock::new(|| Token::new("events.errorMonitor"));

/// Opaque unique token usable as an event key or property name.
///
/// Two tokens compare equal only if one is a clone of the other.
/// The description is for diagnostics and plays no part in equality.
#[derive(Clone)]
pub struct Token {
    id: u64,
    description: Option<Arc<str>>,
}

impl Token {
    /// Creates a fresh token with a diagnostic description.
    pub fn new(description: impl Into<Arc<str>>) -> Self {
        Self {
            id: TOKEN_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            description: Some(description.into()),
        }
    }

    /// Creates a fresh token without description.
    pub fn anonymous() -> Self {
        Self {
            id: TOKEN_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            description: None,
        }
    }

    /// Returns the process-wide token registered under `key`, creating it on first use.
    ///
    /// Every call with the same key returns the same token.
    pub fn for_key(key: &str) -> Self {
        let mut known = WELL_KNOWN.lock();
        if let Some(token) = known.get(key) {
            return token.clone();
        }
        let key: Arc<str> = Arc::from(key);
        let token = Token::new(Arc::clone(&key));
        known.insert(key, token.clone());
        token
    }

    /// Diagnostic description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Token {}

impl std::hash::Hash for Token {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.description().unwrap_or(""))
    }
}

/// Key identifying a channel of delivery.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum EventKey {
    /// Text event name.
    Name(Arc<str>),
    /// Opaque token.
    Token(Token),
}

impl EventKey {
    /// True if this key is the text name `name`.
    #[inline]
    pub fn is_name(&self, name: &str) -> bool {
        matches!(self, EventKey::Name(n) if n.as_ref() == name)
    }

    /// True for the reserved `error` event.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.is_name(ERROR)
    }

    /// Text name, if this key is one.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            EventKey::Name(n) => Some(n),
            EventKey::Token(_) => None,
        }
    }

    /// Token, if this key is one.
    pub fn as_token(&self) -> Option<&Token> {
        match self {
            EventKey::Name(_) => None,
            EventKey::Token(t) => Some(t),
        }
    }
}

impl From<&str> for EventKey {
    fn from(name: &str) -> Self {
        EventKey::Name(Arc::from(name))
    }
}

impl From<String> for EventKey {
    fn from(name: String) -> Self {
        EventKey::Name(Arc::from(name))
    }
}

impl From<Arc<str>> for EventKey {
    fn from(name: Arc<str>) -> Self {
        EventKey::Name(name)
    }
}

impl From<Token> for EventKey {
    fn from(token: Token) -> Self {
        EventKey::Token(token)
    }
}

impl From<&Token> for EventKey {
    fn from(token: &Token) -> Self {
        EventKey::Token(token.clone())
    }
}

impl From<&EventKey> for EventKey {
    fn from(key: &EventKey) -> Self {
        key.clone()
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKey::Name(n) => f.write_str(n),
            EventKey::Token(t) => write!(f, "{t:?}"),
        }
    }
}

impl fmt::Debug for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKey::Name(n) => write!(f, "{n:?}"),
            EventKey::Token(t) => write!(f, "{t:?}"),
        }
    }
}
