use std::collections::HashMap;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// In-memory TTL cache fronting repeated work for the same key. Expired
/// entries are evicted lazily on read.
pub struct TtlCache<V> {
    ttl: Duration,
    entries: HashMap<String, Entry<V>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() <= self.ttl => Some(entry.value.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&mut self, key: String, value: V) {
        self.entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_entry_is_returned() {
        let mut cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("0xabc".to_string(), 42);
        assert_eq!(cache.get("0xabc"), Some(42));
        assert_eq!(cache.get("0xdef"), None);
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let mut cache = TtlCache::new(Duration::ZERO);
        cache.insert("0xabc".to_string(), 42);
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(cache.get("0xabc"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_replaces_previous_value() {
        let mut cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("0xabc".to_string(), 1);
        cache.insert("0xabc".to_string(), 2);
        assert_eq!(cache.get("0xabc"), Some(2));
        assert_eq!(cache.len(), 1);
    }
}
