// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for the token lifecycle.
#[derive(Debug, Default)]
pub struct TokenMetrics {
	authentications: AtomicU64,
	refreshes: AtomicU64,
	cache_hits: AtomicU64,
	failures: AtomicU64,
}
impl TokenMetrics {
	/// Returns the number of calls made to the token endpoint.
	pub fn authentications(&self) -> u64 {
		self.authentications.load(Ordering::Relaxed)
	}

	/// Returns the number of forced refreshes (explicit or after a rejected token).
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	/// Returns the number of tokens promoted from the cache.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Returns the number of failed token endpoint calls.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_authentication(&self) {
		self.authentications.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh(&self) {
		self.refreshes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
