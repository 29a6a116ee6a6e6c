use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A small TTL-keyed cache with monotonic-clock expiry and lazy
/// repopulation on miss — no background refresher, matching the
/// `timed_cached_property` pattern the cloud API wrappers use upstream.
pub struct TtlCache<K, V> {
    entries: DashMap<K, Entry<V>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self { entries: DashMap::new(), ttl }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Some(entry.value.clone());
            }
        }
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            Entry { value, expires_at: Instant::now() + self.ttl },
        );
    }

    /// Return the cached value, or compute and cache it via `populate` on a miss.
    pub fn get_or_populate(&self, key: K, populate: impl FnOnce() -> V) -> V {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = populate();
        self.insert(key, value.clone());
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_entry_is_not_returned() {
        let cache: TtlCache<&str, i32> = TtlCache::new(Duration::from_millis(1));
        cache.insert("a", 1);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn populate_only_called_on_miss() {
        let cache: TtlCache<&str, i32> = TtlCache::new(Duration::from_secs(60));
        let calls = std::cell::Cell::new(0);
        let first = cache.get_or_populate("a", || {
            calls.set(calls.get() + 1);
            42
        });
        let second = cache.get_or_populate("a", || {
            calls.set(calls.get() + 1);
            99
        });
        assert_eq!(first, 42);
        assert_eq!(second, 42);
        assert_eq!(calls.get(), 1);
    }
}
