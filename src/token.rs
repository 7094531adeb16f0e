//! Access-token lifecycle: acquisition, in-memory and cache-backed storage, forced refresh.
//!
//! The manager keeps the current [`AccessToken`] in memory and mirrors it into a [`Cache`] under
//! a key derived from a hash of the client credentials, so SDK instances with different
//! credentials never collide. Every path that may contact the token endpoint runs inside a
//! single async mutex: concurrent callers that find the token missing or stale queue behind the
//! first one and reuse the token it obtained instead of re-authenticating themselves.

mod metrics;

pub use self::metrics::TokenMetrics;

// crates.io
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	cache::Cache,
	config::Config,
	error::{BoxError, ConfigError},
	executor::RequestExecutor,
	http::header_value,
	obs::{self, Operation, OperationSpan, Outcome},
	response::Response,
	sign,
};

/// Token endpoint path, relative to the base URL.
pub const TOKEN_ENDPOINT: &str = "/api/v1.1/access-token/b2b";

const CACHE_KEY_PREFIX: &str = "paygate:access_token:";
const DEFAULT_EXPIRES_IN_SECS: i64 = 3_600;
const CACHE_SAFETY_BUFFER_SECS: i64 = 120;
// Keeps `issued_at + expires_in` representable.
const MAX_EXPIRES_IN_SECS: i64 = i32::MAX as i64;

/// Owns the access-token state machine for one set of credentials.
pub struct TokenManager {
	config: Arc<Config>,
	cache: Arc<dyn Cache>,
	cache_key: String,
	executor: Option<Arc<RequestExecutor>>,
	current: RwLock<Option<AccessToken>>,
	guard: AsyncMutex<()>,
	metrics: Arc<TokenMetrics>,
}
impl TokenManager {
	/// Creates a manager without an HTTP executor; attach one with
	/// [`TokenManager::with_executor`] before acquiring tokens.
	pub fn new(config: Arc<Config>, cache: Arc<dyn Cache>) -> Self {
		let cache_key = cache_key_for(&config);

		Self {
			config,
			cache,
			cache_key,
			executor: None,
			current: RwLock::new(None),
			guard: AsyncMutex::new(()),
			metrics: Default::default(),
		}
	}

	/// Attaches the executor used to reach the token endpoint.
	pub fn with_executor(mut self, executor: Arc<RequestExecutor>) -> Self {
		self.executor = Some(executor);

		self
	}

	/// Overrides the metrics sink (useful when several managers share counters).
	pub fn with_metrics(mut self, metrics: Arc<TokenMetrics>) -> Self {
		self.metrics = metrics;

		self
	}

	/// Namespaced cache key holding the mirrored token.
	pub fn cache_key(&self) -> &str {
		&self.cache_key
	}

	/// Token lifecycle counters.
	pub fn metrics(&self) -> &Arc<TokenMetrics> {
		&self.metrics
	}

	/// Snapshot of the in-memory token, valid or not.
	pub fn current(&self) -> Option<AccessToken> {
		self.current.read().clone()
	}

	/// `true` iff a token is held in memory.
	///
	/// This is a liveness hint: the token may already be past its safety margin, and tokens only
	/// present in the cache are not considered.
	pub fn is_authenticated(&self) -> bool {
		self.current.read().is_some()
	}

	/// Returns a valid token, consulting memory, then the cache, then the token endpoint.
	pub async fn get_access_token(&self) -> Result<AccessToken> {
		if let Some(token) = self.live_token() {
			return Ok(token);
		}

		let _singleflight = self.guard.lock().await;

		// Another caller may have obtained a token while this one was queued.
		if let Some(token) = self.live_token() {
			return Ok(token);
		}
		if let Some(token) = self.cached_token().await {
			*self.current.write() = Some(token.clone());

			return Ok(token);
		}

		self.authenticate_locked().await
	}

	/// Requests a fresh token from the token endpoint, replacing any held token.
	pub async fn authenticate(&self) -> Result<AccessToken> {
		let _singleflight = self.guard.lock().await;

		self.authenticate_locked().await
	}

	/// Drops the held token and its cache mirror, then re-authenticates.
	pub async fn refresh_token(&self) -> Result<AccessToken> {
		let _singleflight = self.guard.lock().await;

		self.refresh_locked().await
	}

	/// Refreshes after the server rejected `rejected`.
	///
	/// When another caller already replaced the rejected token with a valid one, that token is
	/// returned and no refresh happens.
	pub async fn refresh_rejected(&self, rejected: &str) -> Result<AccessToken> {
		let _singleflight = self.guard.lock().await;

		if let Some(token) = self.live_token().filter(|token| token.expose() != rejected) {
			tracing::debug!("rejected token was already replaced; skipping refresh");

			return Ok(token);
		}

		self.refresh_locked().await
	}

	fn live_token(&self) -> Option<AccessToken> {
		self.current.read().as_ref().filter(|token| token.is_valid()).cloned()
	}

	async fn cached_token(&self) -> Option<AccessToken> {
		let raw = match self.cache.get(&self.cache_key).await {
			Ok(Some(raw)) => raw,
			Ok(None) => {
				tracing::debug!("token cache miss");

				return None;
			},
			Err(e) => {
				tracing::warn!(error = %e, "token cache read failed; treating as miss");

				return None;
			},
		};

		match serde_json::from_str::<AccessToken>(&raw) {
			Ok(token) if token.is_valid() => {
				tracing::debug!(expires_at = %token.expires_at, "token cache hit");
				self.metrics.record_cache_hit();

				Some(token)
			},
			Ok(_) => {
				tracing::debug!("cached token is past its safety margin");

				None
			},
			Err(e) => {
				tracing::warn!(error = %e, "cached token is unreadable; treating as miss");

				None
			},
		}
	}

	async fn refresh_locked(&self) -> Result<AccessToken> {
		const OPERATION: Operation = Operation::Refresh;

		let span = OperationSpan::new(OPERATION, "refresh_token");

		obs::record_outcome(OPERATION, Outcome::Attempt);
		self.metrics.record_refresh();

		let result = span
			.instrument(async move {
				*self.current.write() = None;

				if let Err(e) = self.cache.delete(&self.cache_key).await {
					tracing::warn!(error = %e, "failed to evict cached token");
				}

				self.authenticate_locked().await
			})
			.await;

		match &result {
			Ok(_) => obs::record_outcome(OPERATION, Outcome::Success),
			Err(_) => obs::record_outcome(OPERATION, Outcome::Failure),
		}

		result
	}

	async fn authenticate_locked(&self) -> Result<AccessToken> {
		const OPERATION: Operation = Operation::Authenticate;

		let executor = self.executor.as_ref().ok_or(ConfigError::MissingHttpClient)?;
		let span = OperationSpan::new(OPERATION, "authenticate");

		obs::record_outcome(OPERATION, Outcome::Attempt);
		self.metrics.record_authentication();

		let result = span
			.instrument(async move {
				let credentials = &self.config.credentials;
				let signature = sign::auth_signature(
					&credentials.client_id,
					credentials.client_secret.expose(),
				);
				let mut headers = HeaderMap::new();

				headers.insert("x-client-id", header_value(&credentials.client_id)?);
				headers.insert("x-partner-id", header_value(credentials.api_key.expose())?);
				headers.insert("x-signature", header_value(&signature)?);
				headers.insert(::http::header::ACCEPT, HeaderValue::from_static("application/json"));
				headers.insert(
					::http::header::CONTENT_TYPE,
					HeaderValue::from_static("application/json"),
				);

				let body = json!({ "grant_type": "client_credentials" });
				let response = executor
					.execute(Method::POST, TOKEN_ENDPOINT, Some(&body), headers)
					.await
					.map_err(Error::into_authentication)?;

				if !response.is_success() {
					return Err(Error::Authentication {
						message: response
							.message()
							.unwrap_or("token endpoint reported failure")
							.to_owned(),
						code: response.code(),
						status: Some(response.status()),
						source: None,
					});
				}

				let (value, expires_in) = parse_token_payload(&response)?;
				let token = AccessToken::issued(
					value,
					OffsetDateTime::now_utc(),
					Duration::seconds(expires_in),
				);

				*self.current.write() = Some(token.clone());
				self.store_in_cache(&token, expires_in).await;

				tracing::info!(expires_in, "access token acquired");

				Ok(token)
			})
			.await;

		match &result {
			Ok(_) => obs::record_outcome(OPERATION, Outcome::Success),
			Err(e) => {
				self.metrics.record_failure();
				obs::record_outcome(OPERATION, Outcome::Failure);
				tracing::warn!(error = %e, "token acquisition failed");
			},
		}

		result
	}

	async fn store_in_cache(&self, token: &AccessToken, expires_in: i64) {
		let Some(ttl) = cache_ttl(expires_in, self.config.cache_ttl) else {
			tracing::debug!(expires_in, "token lifetime too short to cache");

			return;
		};
		let serialized = match serde_json::to_string(token) {
			Ok(serialized) => serialized,
			Err(e) => {
				tracing::warn!(error = %e, "failed to serialize token for the cache");

				return;
			},
		};

		if let Err(e) = self.cache.set(&self.cache_key, serialized, Some(ttl)).await {
			tracing::warn!(error = %e, "failed to mirror token into the cache");
		}
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("cache_key", &self.cache_key)
			.field("current", &*self.current.read())
			.field("has_executor", &self.executor.is_some())
			.finish()
	}
}

#[derive(Deserialize)]
struct TokenPayload {
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	expires_in: Option<ExpiresIn>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExpiresIn {
	Seconds(i64),
	Fractional(f64),
	Text(String),
}
impl ExpiresIn {
	/// Whole seconds; fractions are truncated and non-finite or non-numeric values yield `None`.
	fn seconds(&self) -> Option<i64> {
		let fractional = match self {
			Self::Seconds(secs) => return Some(*secs),
			Self::Fractional(secs) => *secs,
			Self::Text(raw) => {
				let raw = raw.trim();

				if let Ok(secs) = raw.parse::<i64>() {
					return Some(secs);
				}

				raw.parse::<f64>().ok()?
			},
		};

		// Float-to-int casts saturate.
		fractional.is_finite().then(|| fractional.trunc() as i64)
	}
}

/// Extracts `(access_token, expires_in)` from the token response.
///
/// The endpoint has returned both a flat shape and one nested under `data`; the top level is
/// tried first, then `data`. A candidate that fails to parse falls through to the next one, and
/// the first failure is reported only when no candidate yields a token. A missing `expires_in`
/// defaults to one hour.
fn parse_token_payload(response: &Response) -> Result<(String, i64)> {
	let body = response.body();
	let candidates = [Some(body), body.get("data")];
	let authentication_error = |message: String, source: Option<BoxError>| Error::Authentication {
		message,
		code: response.code(),
		status: Some(response.status()),
		source,
	};
	let mut first_error = None;

	for candidate in candidates.into_iter().flatten().filter(|value| value.is_object()) {
		let payload: TokenPayload = match serde_path_to_error::deserialize(candidate) {
			Ok(payload) => payload,
			Err(e) => {
				first_error.get_or_insert_with(|| {
					authentication_error(
						format!("token response is malformed at `{}`", e.path()),
						Some(Box::new(e)),
					)
				});

				continue;
			},
		};
		let Some(token) = payload.access_token.filter(|token| !token.is_empty()) else {
			continue;
		};
		let expires_in = match &payload.expires_in {
			None => DEFAULT_EXPIRES_IN_SECS,
			Some(raw) => match raw.seconds() {
				Some(secs) => secs,
				None => {
					first_error.get_or_insert_with(|| {
						authentication_error("token response has a non-numeric expires_in".into(), None)
					});

					continue;
				},
			},
		};

		return Ok((token, expires_in.clamp(0, MAX_EXPIRES_IN_SECS)));
	}

	Err(first_error.unwrap_or_else(|| {
		authentication_error("token response did not contain an access_token".into(), None)
	}))
}

/// TTL for the cache mirror: `expires_in - 120s`, capped at `cap`; `None` means do not cache.
fn cache_ttl(expires_in: i64, cap: StdDuration) -> Option<StdDuration> {
	let secs = expires_in.checked_sub(CACHE_SAFETY_BUFFER_SECS).filter(|secs| *secs > 0)?;
	let ttl = StdDuration::from_secs(u64::try_from(secs).ok()?);

	Some(ttl.min(cap)).filter(|ttl| !ttl.is_zero())
}

fn cache_key_for(config: &Config) -> String {
	let credentials = &config.credentials;
	let digest = Sha256::digest(
		format!("{}:{}", credentials.client_id, credentials.client_secret.expose()).as_bytes(),
	);

	format!("{CACHE_KEY_PREFIX}{}", hex::encode(digest))
}
