//! Keys of work that runs outside the state lock.
//!
//! A claim is released when its guard is dropped, so a caller that abandons
//! the future (timeout, `select!`) never leaves a key behind.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default)]
pub(crate) struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    /// Claims `key`, or returns `None` if it is already claimed.
    pub fn try_claim(&self, key: &str) -> Option<InFlightClaim> {
        let inserted = lock(&self.keys).insert(key.to_string());
        inserted.then(|| InFlightClaim {
            keys: Arc::clone(&self.keys),
            key: key.to_string(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.keys).contains(key)
    }
}

#[derive(Debug)]
pub(crate) struct InFlightClaim {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        lock(&self.keys).remove(&self.key);
    }
}

// The set stays consistent even if a holder panicked.
fn lock(keys: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    keys.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_exclusive_until_dropped() {
        let in_flight = InFlight::default();
        let claim = in_flight.try_claim("a").unwrap();
        assert!(in_flight.contains("a"));
        assert!(in_flight.try_claim("a").is_none());
        assert!(in_flight.try_claim("b").is_some());

        drop(claim);
        assert!(!in_flight.contains("a"));
        assert!(in_flight.try_claim("a").is_some());
    }
}
