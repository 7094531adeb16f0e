//! Thread-safe in-memory [`Cache`] implementation; the default backend for a single process.

// self
use crate::{
	_prelude::*,
	cache::{Cache, CacheEntry, CacheError, CacheFuture},
};

type CacheMap = Arc<RwLock<HashMap<String, CacheEntry>>>;

/// In-process cache with lazy TTL eviction.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache(CacheMap);
impl MemoryCache {
	/// Number of stored entries, including expired ones not yet evicted.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` if no entries are stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn get_now(map: &CacheMap, key: &str, now: OffsetDateTime) -> Option<String> {
		{
			let guard = map.read();

			match guard.get(key) {
				Some(entry) if !entry.is_expired_at(now) => return Some(entry.value.clone()),
				Some(_) => {},
				None => return None,
			}
		}

		let mut guard = map.write();

		// Re-check under the write lock; a concurrent set may have replaced the entry.
		if guard.get(key).is_some_and(|entry| entry.is_expired_at(now)) {
			guard.remove(key);
		}

		None
	}

	fn set_now(
		map: &CacheMap,
		key: &str,
		value: String,
		ttl: Option<StdDuration>,
		now: OffsetDateTime,
	) -> bool {
		map.write().insert(key.to_owned(), CacheEntry::new(value, ttl, now));

		true
	}
}
impl Cache for MemoryCache {
	fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>> {
		Box::pin(async move { Ok(Self::get_now(&self.0, key, OffsetDateTime::now_utc())) })
	}

	fn set<'a>(
		&'a self,
		key: &'a str,
		value: String,
		ttl: Option<StdDuration>,
	) -> CacheFuture<'a, bool> {
		Box::pin(async move { Ok(Self::set_now(&self.0, key, value, ttl, OffsetDateTime::now_utc())) })
	}

	fn delete<'a>(&'a self, key: &'a str) -> CacheFuture<'a, bool> {
		Box::pin(async move {
			self.0.write().remove(key);

			Ok(true)
		})
	}

	fn has<'a>(&'a self, key: &'a str) -> CacheFuture<'a, bool> {
		Box::pin(async move { Ok(Self::get_now(&self.0, key, OffsetDateTime::now_utc()).is_some()) })
	}

	fn clear(&self) -> CacheFuture<'_, bool> {
		Box::pin(async move {
			self.0.write().clear();

			Ok::<_, CacheError>(true)
		})
	}
}
