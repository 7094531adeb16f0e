//! Explicit registry of named clients owned by the host application.

// self
use crate::{_prelude::*, client::Client};
#[cfg(feature = "reqwest")] use crate::config::Config;

/// Map from instance name to configured [`Client`].
///
/// The registry is an ordinary value: create one where the application is assembled and pass
/// it (or an `Arc` of it) to whatever needs named clients.
#[derive(Clone, Debug, Default)]
pub struct ClientRegistry {
	clients: Arc<RwLock<HashMap<String, Client>>>,
}
impl ClientRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a client with the default transport and cache, stores it under `name` (replacing
	/// any previous entry), and returns it.
	#[cfg(feature = "reqwest")]
	pub fn create(&self, name: impl Into<String>, config: Config) -> Result<Client> {
		let client = Client::new(config)?;

		self.insert(name, client.clone());

		Ok(client)
	}

	/// Stores a pre-built client, returning the one it replaced.
	pub fn insert(&self, name: impl Into<String>, client: Client) -> Option<Client> {
		self.clients.write().insert(name.into(), client)
	}

	/// Returns the client registered under `name`.
	pub fn get(&self, name: &str) -> Option<Client> {
		self.clients.read().get(name).cloned()
	}

	/// `true` if `name` is registered.
	pub fn has(&self, name: &str) -> bool {
		self.clients.read().contains_key(name)
	}

	/// Removes and returns the client registered under `name`.
	pub fn remove(&self, name: &str) -> Option<Client> {
		self.clients.write().remove(name)
	}

	/// Registered names in sorted order.
	pub fn names(&self) -> Vec<String> {
		let mut names = self.clients.read().keys().cloned().collect::<Vec<_>>();

		names.sort_unstable();

		names
	}

	/// Number of registered clients.
	pub fn len(&self) -> usize {
		self.clients.read().len()
	}

	/// `true` when no client is registered.
	pub fn is_empty(&self) -> bool {
		self.clients.read().is_empty()
	}

	/// Removes every client.
	pub fn clear(&self) {
		self.clients.write().clear();
	}
}
