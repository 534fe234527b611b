//! # Listener registry - per-emitter listener sequences.
//!
//! Maps each event key to its ordered sequence of [`RawListener`] entries.
//!
//! ## Rules
//! - A key is present only while its sequence is non-empty.
//! - Keys keep the order in which they were (re)created.
//! - Entries are never mutated in place: only inserted or removed.
//! - No de-duplication: the same listener may appear several times.
//!
//! The registry is plain data; locking and lifecycle events belong to the
//! [`Emitter`](crate::Emitter).

use indexmap::IndexMap;

use crate::events::EventKey;
use crate::listeners::RawListener;

#[derive(Debug, Default)]
pub(crate) struct Registry {
    events: IndexMap<EventKey, Vec<RawListener>>,
}

impl Registry {
    /// Snapshot of the sequence for `key` (empty if absent).
    pub(crate) fn get(&self, key: &EventKey) -> Vec<RawListener> {
        self.events.get(key).cloned().unwrap_or_default()
    }

    /// Number of entries stored for `key`.
    pub(crate) fn len(&self, key: &EventKey) -> usize {
        self.events.get(key).map_or(0, Vec::len)
    }

    /// Inserts `entry` at the tail (or the front when `prepend`); returns the new count.
    pub(crate) fn add(&mut self, key: &EventKey, entry: RawListener, prepend: bool) -> usize {
        let seq = self.events.entry(key.clone()).or_default();
        if prepend {
            seq.insert(0, entry);
        } else {
            seq.push(entry);
        }
        seq.len()
    }

    /// Removes the first entry matching `target`; returns it with the remaining count.
    pub(crate) fn remove_one(
        &mut self,
        key: &EventKey,
        target: &RawListener,
    ) -> Option<(RawListener, usize)> {
        let seq = self.events.get_mut(key)?;
        let pos = seq.iter().position(|entry| entry.matches(target))?;
        let removed = seq.remove(pos);
        let remaining = seq.len();
        if remaining == 0 {
            self.events.shift_remove(key);
        }
        Some((removed, remaining))
    }

    /// Removes the front entry; returns it with the remaining count.
    pub(crate) fn pop_front(&mut self, key: &EventKey) -> Option<(RawListener, usize)> {
        let seq = self.events.get_mut(key)?;
        if seq.is_empty() {
            self.events.shift_remove(key);
            return None;
        }
        let removed = seq.remove(0);
        let remaining = seq.len();
        if remaining == 0 {
            self.events.shift_remove(key);
        }
        Some((removed, remaining))
    }

    /// Keys currently holding at least one entry.
    pub(crate) fn keys(&self) -> Vec<EventKey> {
        self.events.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Payload;
    use crate::listeners::Listener;

    fn plain() -> (Listener, RawListener) {
        let l = Listener::sync(|_: &[Payload]| {});
        (l.clone(), RawListener::Plain(l))
    }

    #[test]
    fn test_add_appends_and_prepends() {
        let mut reg = Registry::default();
        let key = EventKey::from("x");
        let (a, ra) = plain();
        let (b, rb) = plain();
        let (c, rc) = plain();

        assert_eq!(reg.add(&key, ra, false), 1);
        assert_eq!(reg.add(&key, rb, false), 2);
        assert_eq!(reg.add(&key, rc, true), 3);

        let seq = reg.get(&key);
        assert!(seq[0].listener().ptr_eq(&c));
        assert!(seq[1].listener().ptr_eq(&a));
        assert!(seq[2].listener().ptr_eq(&b));
    }

    #[test]
    fn test_get_absent_is_empty() {
        let reg = Registry::default();
        assert!(reg.get(&EventKey::from("nope")).is_empty());
        assert_eq!(reg.len(&EventKey::from("nope")), 0);
    }

    #[test]
    fn test_remove_one_takes_first_occurrence_and_deletes_empty_key() {
        let mut reg = Registry::default();
        let key = EventKey::from("x");
        let (a, ra) = plain();
        reg.add(&key, ra.clone(), false);
        reg.add(&key, ra, false);

        let (_, remaining) = reg.remove_one(&key, &RawListener::Plain(a.clone())).unwrap();
        assert_eq!(remaining, 1);
        assert_eq!(reg.keys(), vec![key.clone()]);

        let (_, remaining) = reg.remove_one(&key, &RawListener::Plain(a.clone())).unwrap();
        assert_eq!(remaining, 0);
        assert!(reg.keys().is_empty());
        assert!(reg.remove_one(&key, &RawListener::Plain(a)).is_none());
    }

    #[test]
    fn test_keys_follow_creation_order() {
        let mut reg = Registry::default();
        let (_, r) = plain();
        for name in ["a", "b", "c"] {
            reg.add(&EventKey::from(name), r.clone(), false);
        }
        reg.pop_front(&EventKey::from("a"));
        reg.add(&EventKey::from("a"), r, false);

        let names: Vec<String> = reg.keys().iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_pop_front_drains_in_order() {
        let mut reg = Registry::default();
        let key = EventKey::from("x");
        let (a, ra) = plain();
        let (b, rb) = plain();
        reg.add(&key, ra, false);
        reg.add(&key, rb, false);

        let (first, remaining) = reg.pop_front(&key).unwrap();
        assert!(first.listener().ptr_eq(&a));
        assert_eq!(remaining, 1);

        let (second, remaining) = reg.pop_front(&key).unwrap();
        assert!(second.listener().ptr_eq(&b));
        assert_eq!(remaining, 0);
        assert!(reg.pop_front(&key).is_none());
        assert!(reg.keys().is_empty());
    }
}
