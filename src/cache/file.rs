//! Simple file-backed [`Cache`] so tokens survive process restarts (CLIs, cron jobs).

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	cache::{Cache, CacheEntry, CacheError, CacheFuture},
};

/// Persists cache entries to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileCache {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<String, CacheEntry>>>,
}
impl FileCache {
	/// Opens (or creates) a cache at the provided path, eagerly loading live entries.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let now = OffsetDateTime::now_utc();
		let mut snapshot = if path.exists() { Self::load_snapshot(&path)? } else { HashMap::new() };

		snapshot.retain(|_, entry| !entry.is_expired_at(now));

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<String, CacheEntry>, CacheError> {
		let metadata = path.metadata().map_err(|e| CacheError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| CacheError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		serde_json::from_slice(&bytes).map_err(|e| CacheError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), CacheError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| CacheError::Backend {
				message: format!("Failed to create cache directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &HashMap<String, CacheEntry>) -> Result<(), CacheError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| CacheError::Serialization {
				message: format!("Failed to serialize cache snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| CacheError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| CacheError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| CacheError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| CacheError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn live_value(&self, key: &str) -> Result<Option<String>, CacheError> {
		let now = OffsetDateTime::now_utc();

		{
			let guard = self.inner.read();

			match guard.get(key) {
				Some(entry) if !entry.is_expired_at(now) => return Ok(Some(entry.value.clone())),
				Some(_) => {},
				None => return Ok(None),
			}
		}

		let mut guard = self.inner.write();

		if guard.get(key).is_some_and(|entry| entry.is_expired_at(now)) {
			guard.remove(key);
			self.persist_locked(&guard)?;
		}

		Ok(None)
	}
}
impl Cache for FileCache {
	fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>> {
		Box::pin(async move { self.live_value(key) })
	}

	fn set<'a>(
		&'a self,
		key: &'a str,
		value: String,
		ttl: Option<StdDuration>,
	) -> CacheFuture<'a, bool> {
		Box::pin(async move {
			let entry = CacheEntry::new(value, ttl, OffsetDateTime::now_utc());
			let mut guard = self.inner.write();

			guard.insert(key.to_owned(), entry);
			self.persist_locked(&guard)?;

			Ok(true)
		})
	}

	fn delete<'a>(&'a self, key: &'a str) -> CacheFuture<'a, bool> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			if guard.remove(key).is_some() {
				self.persist_locked(&guard)?;
			}

			Ok(true)
		})
	}

	fn has<'a>(&'a self, key: &'a str) -> CacheFuture<'a, bool> {
		Box::pin(async move { Ok(self.live_value(key)?.is_some()) })
	}

	fn clear(&self) -> CacheFuture<'_, bool> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.clear();
			self.persist_locked(&guard)?;

			Ok(true)
		})
	}
}
