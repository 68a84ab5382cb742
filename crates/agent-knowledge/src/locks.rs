use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// One lazily created lock per corpus id
pub(crate) struct KeyedLocks<L> {
    locks: Mutex<HashMap<String, Arc<L>>>,
}

impl<L: Default> KeyedLocks<L> {
    pub(crate) fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Arc<L> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(key.to_string()).or_default().clone()
    }
}
