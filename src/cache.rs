//! Cache contract and built-in backends used to mirror access tokens across client instances.

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

// self
use crate::_prelude::*;

/// Boxed future returned by [`Cache`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Key/value store with per-entry TTL expiry.
///
/// Implementations must make each operation atomic per key; no cross-key transactions are
/// required. Expired entries behave exactly like missing ones.
pub trait Cache
where
	Self: Send + Sync,
{
	/// Returns the value for `key`, or `None` when missing or expired.
	fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>>;

	/// Stores `value` under `key`; `None` means no expiry.
	fn set<'a>(&'a self, key: &'a str, value: String, ttl: Option<StdDuration>)
	-> CacheFuture<'a, bool>;

	/// Removes `key`; succeeds even when the key is absent.
	fn delete<'a>(&'a self, key: &'a str) -> CacheFuture<'a, bool>;

	/// Returns `true` if a live entry exists for `key`.
	fn has<'a>(&'a self, key: &'a str) -> CacheFuture<'a, bool>;

	/// Removes every entry.
	fn clear(&self) -> CacheFuture<'_, bool>;
}

/// Error type produced by [`Cache`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CacheError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Cached value with its absolute expiry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
	/// Stored value.
	pub value: String,
	/// Expiry instant; `None` never expires.
	#[serde(with = "time::serde::rfc3339::option")]
	pub expires_at: Option<OffsetDateTime>,
}
impl CacheEntry {
	/// Creates an entry stamped relative to `now`.
	pub fn new(value: String, ttl: Option<StdDuration>, now: OffsetDateTime) -> Self {
		// A TTL too large to represent never expires.
		let expires_at = ttl
			.and_then(|ttl| Duration::try_from(ttl).ok())
			.and_then(|ttl| now.checked_add(ttl));

		Self { value, expires_at }
	}

	/// Returns `true` once `instant` reaches the expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant >= expires_at)
	}
}
