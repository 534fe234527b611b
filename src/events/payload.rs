//! # Dynamically typed event values.
//!
//! [`Payload`] carries emission arguments and listener failure values. Event
//! names do not constrain payload shapes, so each value is type-erased and
//! recovered with [`Payload::downcast_ref`].
//!
//! ## Example
//! ```rust
//! use emitvisor::Payload;
//!
//! let p = Payload::new(42_u32);
//! assert_eq!(p.downcast_ref::<u32>(), Some(&42));
//! assert!(p.downcast_ref::<i64>().is_none());
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::EmitterError;
use crate::events::EventKey;

/// Shared, type-erased value (cheap to clone).
#[derive(Clone)]
pub struct Payload {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Payload {
    /// Wraps a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Borrows the value as `T`, if it is one.
    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// True if the value is a `T`.
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Name of the wrapped type (diagnostics only).
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// True if both payloads share the same allocation.
    pub fn ptr_eq(a: &Payload, b: &Payload) -> bool {
        Arc::ptr_eq(&a.value, &b.value)
    }

    /// Text rendering of string-like payloads.
    pub fn as_str(&self) -> Option<&str> {
        if let Some(s) = self.downcast_ref::<&'static str>() {
            return Some(s);
        }
        self.downcast_ref::<String>().map(String::as_str)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.as_str() {
            return write!(f, "{s:?}");
        }
        if let Some(key) = self.downcast_ref::<EventKey>() {
            return write!(f, "{key:?}");
        }
        if let Some(err) = self.downcast_ref::<EmitterError>() {
            return write!(f, "{err}");
        }
        write!(f, "Payload<{}>", self.type_name)
    }
}

impl From<&'static str> for Payload {
    fn from(value: &'static str) -> Self {
        Payload::new(value)
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::new(value)
    }
}

impl From<EventKey> for Payload {
    fn from(value: EventKey) -> Self {
        Payload::new(value)
    }
}

impl From<EmitterError> for Payload {
    fn from(value: EmitterError) -> Self {
        Payload::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_payloads_render_as_text() {
        assert_eq!(Payload::from("boom").as_str(), Some("boom"));
        assert_eq!(Payload::from(String::from("bang")).as_str(), Some("bang"));
        assert_eq!(format!("{:?}", Payload::from("boom")), "\"boom\"");
        assert!(Payload::new(1_u8).as_str().is_none());
    }

    #[test]
    fn test_clones_share_allocation() {
        let a = Payload::new(vec![1, 2, 3]);
        let b = a.clone();
        assert!(Payload::ptr_eq(&a, &b));
        assert!(!Payload::ptr_eq(&a, &Payload::new(vec![1, 2, 3])));
        assert!(a.is::<Vec<i32>>());
    }
}
