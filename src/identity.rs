//! # Subscriber identity.
//!
//! A [`Subscriber`] correlates every server call and reconnection of one logical client.
//! Callers either supply their own identifier or let [`SubscriberIds`] draw one at random:
//!
//! ```text
//! resolve(Some(s)) ──► s
//! resolve(None)    ──► N × IndexSource::next_index(62) ──► ALPHABET[i] ──► "aZ3...": N chars
//! ```
//!
//! Generated identifiers are a pure random draw with no collision checking; callers that
//! need uniqueness across clients must supply their own.

use std::fmt;
use std::sync::Arc;

use rand::Rng;

/// Symbols used for generated subscriber identifiers (62, case-sensitive).
pub const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Default length of generated identifiers.
pub const DEFAULT_ID_LENGTH: usize = 15;

/// Opaque identifier of a logical push subscriber.
///
/// Cheap to clone (`Arc<str>` inside).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subscriber(Arc<str>);

impl Subscriber {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Subscriber {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Subscriber {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl AsRef<str> for Subscriber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Source of uniformly distributed indices.
///
/// Implementations must return a value in `0..bound` with every value equally likely.
/// The default is [`ThreadRandom`]; tests inject a scripted source.
pub trait IndexSource: Send + 'static {
    /// Returns the next index in `0..bound`.
    fn next_index(&mut self, bound: usize) -> usize;
}

/// Thread-local RNG backed [`IndexSource`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl IndexSource for ThreadRandom {
    fn next_index(&mut self, bound: usize) -> usize {
        rand::rng().random_range(0..bound)
    }
}

/// Resolves explicit subscribers or generates fresh ones.
pub struct SubscriberIds {
    length: usize,
    source: Box<dyn IndexSource>,
}

impl SubscriberIds {
    /// Creates a generator drawing `length` symbols (min 1) from `source`.
    pub fn new(length: usize, source: Box<dyn IndexSource>) -> Self {
        Self {
            length: length.max(1),
            source,
        }
    }

    /// Returns `explicit` if provided, otherwise a freshly generated identifier.
    pub fn resolve(&mut self, explicit: Option<Subscriber>) -> Subscriber {
        match explicit {
            Some(subscriber) => subscriber,
            None => self.generate(),
        }
    }

    /// Draws a new identifier.
    pub fn generate(&mut self) -> Subscriber {
        let id: String = (0..self.length)
            .map(|_| {
                // Out-of-range indices from a misbehaving source wrap instead of panicking.
                let i = self.source.next_index(ALPHABET.len()) % ALPHABET.len();
                char::from(ALPHABET[i])
            })
            .collect();
        Subscriber::new(id)
    }
}

impl Default for SubscriberIds {
    fn default() -> Self {
        Self::new(DEFAULT_ID_LENGTH, Box::new(ThreadRandom))
    }
}

impl fmt::Debug for SubscriberIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberIds")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedIndices;

    #[test]
    fn explicit_subscriber_is_returned_untouched() {
        let mut ids = SubscriberIds::default();
        let s = ids.resolve(Some(Subscriber::from("client-42")));
        assert_eq!(s.as_str(), "client-42");
    }

    #[test]
    fn generated_id_has_default_length_and_alphabet() {
        let mut ids = SubscriberIds::default();
        for _ in 0..50 {
            let s = ids.resolve(None);
            assert_eq!(s.as_str().len(), DEFAULT_ID_LENGTH);
            assert!(s.as_str().bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn scripted_source_gives_deterministic_id() {
        // indices 0, 1, 26, 52, 61 repeated: 'A', 'B', 'a', '0', '9'
        let script = vec![0, 1, 26, 52, 61];
        let mut ids = SubscriberIds::new(DEFAULT_ID_LENGTH, Box::new(ScriptedIndices::new(script)));
        let s = ids.resolve(None);
        assert_eq!(s.as_str(), "ABa09ABa09ABa09");
    }

    #[test]
    fn configured_length_is_respected() {
        let mut ids = SubscriberIds::new(4, Box::new(ScriptedIndices::new(vec![25])));
        assert_eq!(ids.generate().as_str(), "ZZZZ");

        let mut zero = SubscriberIds::new(0, Box::new(ScriptedIndices::new(vec![27])));
        assert_eq!(zero.generate().as_str(), "b");
    }

    #[test]
    fn thread_random_stays_in_bounds() {
        let mut src = ThreadRandom;
        for _ in 0..1000 {
            assert!(src.next_index(62) < 62);
        }
    }
}
