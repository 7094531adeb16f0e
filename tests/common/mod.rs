//! Shared fixtures for integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::{HashMap, VecDeque},
	sync::Arc,
	time::Duration,
};
// crates.io
use parking_lot::Mutex;
use serde_json::{Value, json};
// self
use paygate_sdk::{
	Client, Config,
	config::Credentials,
	error::TransportError,
	http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	token::TOKEN_ENDPOINT,
};

pub const CLIENT_ID: &str = "client-it";
pub const CLIENT_SECRET: &str = "secret-it";
pub const API_KEY: &str = "partner-it";

/// Fake transport replaying scripted responses per path.
///
/// Each path owns a queue; the last queued response is sticky and keeps being returned once
/// the queue drains to it. Unscripted paths answer 404.
#[derive(Default)]
pub struct ScriptedTransport {
	routes: Mutex<HashMap<String, VecDeque<Result<HttpResponse, String>>>>,
	requests: Mutex<Vec<HttpRequest>>,
	latency: Mutex<Option<Duration>>,
}
impl ScriptedTransport {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Queues a JSON response for `path`.
	pub fn reply(&self, path: &str, status: u16, body: Value) -> &Self {
		self.routes
			.lock()
			.entry(path.to_owned())
			.or_default()
			.push_back(Ok(HttpResponse::json(status, &body)));

		self
	}

	/// Queues a network failure for `path`.
	pub fn fail(&self, path: &str, message: &str) -> &Self {
		self.routes.lock().entry(path.to_owned()).or_default().push_back(Err(message.to_owned()));

		self
	}

	/// Queues a successful token response.
	pub fn token(&self, token: &str, expires_in: i64) -> &Self {
		self.reply(
			TOKEN_ENDPOINT,
			200,
			json!({
				"success": true,
				"data": { "access_token": token, "expires_in": expires_in }
			}),
		)
	}

	/// Delays every response, so concurrent callers overlap.
	pub fn with_latency(&self, latency: Duration) -> &Self {
		*self.latency.lock() = Some(latency);

		self
	}

	/// Requests seen so far, in order.
	pub fn requests(&self) -> Vec<HttpRequest> {
		self.requests.lock().clone()
	}

	/// Requests seen for `path`.
	pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
		self.requests.lock().iter().filter(|request| request.url.path() == path).cloned().collect()
	}

	/// Number of requests seen for `path`.
	pub fn calls(&self, path: &str) -> usize {
		self.requests_to(path).len()
	}

	fn next(&self, path: &str) -> Result<HttpResponse, String> {
		let mut routes = self.routes.lock();

		match routes.get_mut(path) {
			Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| Err("empty".into())),
			Some(queue) => queue.front().cloned().unwrap_or_else(|| Err("empty".into())),
			None => Ok(HttpResponse::json(404, &json!({ "success": false, "message": "not found" }))),
		}
	}
}
impl HttpTransport for ScriptedTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let reply = self.next(request.url.path());
		let latency = *self.latency.lock();

		self.requests.lock().push(request);

		Box::pin(async move {
			if let Some(latency) = latency {
				tokio::time::sleep(latency).await;
			}

			reply.map_err(|message| TransportError::network(std::io::Error::other(message)))
		})
	}
}

/// Credentials shared by the integration tests.
pub fn credentials() -> Credentials {
	Credentials::new(CLIENT_ID, CLIENT_SECRET, API_KEY)
}

/// Config pointing at a local base URL with millisecond retry delays.
pub fn config(max_retries: u32) -> Config {
	Config::builder(credentials())
		.base_url("http://gateway.test")
		.max_retries(max_retries)
		.retry_delay(Duration::from_millis(1))
		.build()
		.expect("Integration test config should build.")
}

/// Client wired to the scripted transport.
pub fn client(transport: &Arc<ScriptedTransport>, config: Config) -> Client {
	Client::builder(config)
		.transport(transport.clone())
		.build()
		.expect("Client should build with a scripted transport.")
}

/// Header value as a string, if present.
pub fn header(request: &HttpRequest, name: &str) -> Option<String> {
	request.headers.get(name).and_then(|value| value.to_str().ok()).map(ToOwned::to_owned)
}
