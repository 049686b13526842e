use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

/// 纯函数解析结果的有界 LRU 缓存。
///
/// 内部的 `LruCache` 由 `Mutex` 保护，可以作为进程级共享状态在多个工作线程之间使用。
/// 缓存只影响性能，不影响结果：锁被污染时直接恢复继续使用。
pub struct ParseCache<K, V> {
    cache: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq, V: Clone> ParseCache<K, V> {
    // 根据容量构造
    pub fn from_capacity(capacity: usize) -> Self {
        if capacity == 0 {
            panic!("调用from_capacity时指定的大小是0。解析缓存至少需要一个槽位");
        }
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).expect("容量已检查非零"),
            )),
        }
    }

    // 查询，未命中时计算并放入
    pub fn get_or_insert_with<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        let mut cache = match self.cache.lock() {
            Ok(lock) => lock,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(value) = cache.get(&key) {
            return value.clone();
        }
        let value = compute();
        cache.put(key, value.clone());
        value
    }

    // 失败的计算不进入缓存
    pub fn try_get_or_insert_with<F, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let mut cache = match self.cache.lock() {
            Ok(lock) => lock,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(value) = cache.get(&key) {
            return Ok(value.clone());
        }
        let value = compute()?;
        cache.put(key, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        match self.cache.lock() {
            Ok(lock) => lock.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        match self.cache.lock() {
            Ok(lock) => lock.cap().get(),
            Err(poisoned) => poisoned.into_inner().cap().get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_cache_creation() {
        let cache: ParseCache<String, u32> = ParseCache::from_capacity(10);
        assert_eq!(cache.capacity(), 10);
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    #[should_panic(expected = "调用from_capacity时指定的大小是0")]
    fn test_cache_zero_capacity_panics() {
        let _: ParseCache<String, u32> = ParseCache::from_capacity(0);
    }

    #[test]
    fn test_cache_computes_once() {
        let cache = ParseCache::from_capacity(3);
        let calls = Cell::new(0);

        for _ in 0..3 {
            let value = cache.get_or_insert_with("a=1".to_string(), || {
                calls.set(calls.get() + 1);
                vec![("a".to_string(), "1".to_string())]
            });
            assert_eq!(value.len(), 1);
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_lru_eviction() {
        let cache = ParseCache::from_capacity(2);
        let calls = Cell::new(0);
        let compute = |key: &str| {
            cache.get_or_insert_with(key.to_string(), || {
                calls.set(calls.get() + 1);
                key.len()
            })
        };

        compute("one");
        compute("two");
        // 访问 one，使 two 成为最久未使用
        compute("one");
        compute("three");
        assert_eq!(calls.get(), 3);

        compute("one");
        assert_eq!(calls.get(), 3);
        compute("two");
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn test_cache_skips_failures() {
        let cache: ParseCache<String, u32> = ParseCache::from_capacity(2);
        let failed: Result<u32, &str> = cache.try_get_or_insert_with("k".to_string(), || Err("boom"));
        assert!(failed.is_err());
        assert!(cache.is_empty());

        let ok: Result<u32, &str> = cache.try_get_or_insert_with("k".to_string(), || Ok(7));
        assert_eq!(ok, Ok(7));
        assert_eq!(cache.len(), 1);
    }
}
