//! High-level client facade that resource helpers build on.
//!
//! [`Client`] wires the [`TokenManager`], [`RequestExecutor`], and [`RetryingClient`] around one
//! [`Config`]. It is cheap to clone: clones share the token state, the cache, and the transport.

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	cache::{Cache, MemoryCache},
	config::Config,
	error::ConfigError,
	executor::RequestExecutor,
	http::HttpTransport,
	intercept::Interceptor,
	response::Response,
	retry::{RetryPolicy, RetryingClient},
	sign::{self, WebhookBody},
	token::TokenManager,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Authenticated API client.
#[derive(Clone, Debug)]
pub struct Client {
	config: Arc<Config>,
	executor: Arc<RequestExecutor>,
	tokens: Arc<TokenManager>,
	retrying: RetryingClient,
}
impl Client {
	/// Starts building a client for the provided configuration.
	pub fn builder(config: Config) -> ClientBuilder {
		ClientBuilder::new(config)
	}

	/// Builds a client with the default reqwest transport and an in-memory token cache.
	#[cfg(feature = "reqwest")]
	pub fn new(config: Config) -> Result<Self> {
		Self::builder(config).build()
	}

	/// Sends a request with the standard authenticated headers.
	pub async fn request(
		&self,
		method: Method,
		endpoint: &str,
		body: Option<&Value>,
	) -> Result<Response> {
		self.retrying.request_with_retry(method, endpoint, body, HeaderMap::new()).await
	}

	/// Sends a request with extra headers; they override the standard ones on conflict.
	pub async fn request_with_headers(
		&self,
		method: Method,
		endpoint: &str,
		body: Option<&Value>,
		headers: HeaderMap,
	) -> Result<Response> {
		self.retrying.request_with_retry(method, endpoint, body, headers).await
	}

	/// Sends a signed request (`X-Timestamp` + disbursement `X-Signature`), as required by
	/// transfer-money endpoints.
	pub async fn request_signed(
		&self,
		method: Method,
		endpoint: &str,
		body: Option<&Value>,
	) -> Result<Response> {
		self.retrying.request_signed(method, endpoint, body, HeaderMap::new()).await
	}

	/// `GET` an endpoint; query strings may be appended to `endpoint`.
	pub async fn get(&self, endpoint: &str) -> Result<Response> {
		self.request(Method::GET, endpoint, None).await
	}

	/// `POST` a serializable payload.
	pub async fn post<T>(&self, endpoint: &str, payload: &T) -> Result<Response>
	where
		T: ?Sized + Serialize,
	{
		let body = to_body(payload)?;

		self.request(Method::POST, endpoint, Some(&body)).await
	}

	/// `PUT` a serializable payload.
	pub async fn put<T>(&self, endpoint: &str, payload: &T) -> Result<Response>
	where
		T: ?Sized + Serialize,
	{
		let body = to_body(payload)?;

		self.request(Method::PUT, endpoint, Some(&body)).await
	}

	/// `PATCH` a serializable payload.
	pub async fn patch<T>(&self, endpoint: &str, payload: &T) -> Result<Response>
	where
		T: ?Sized + Serialize,
	{
		let body = to_body(payload)?;

		self.request(Method::PATCH, endpoint, Some(&body)).await
	}

	/// `DELETE` an endpoint.
	pub async fn delete(&self, endpoint: &str) -> Result<Response> {
		self.request(Method::DELETE, endpoint, None).await
	}

	/// Returns a valid access token, authenticating if needed.
	pub async fn access_token(&self) -> Result<AccessToken> {
		self.tokens.get_access_token().await
	}

	/// Forces a token refresh.
	pub async fn refresh_token(&self) -> Result<AccessToken> {
		self.tokens.refresh_token().await
	}

	/// Liveness hint: `true` iff a token is held in memory (see
	/// [`TokenManager::is_authenticated`]).
	pub fn is_authenticated(&self) -> bool {
		self.tokens.is_authenticated()
	}

	/// Verifies an inbound webhook with the configured HMAC validation key.
	pub fn verify_webhook_signature<'a>(
		&self,
		timestamp: &str,
		body: impl Into<WebhookBody<'a>>,
		received_signature: &str,
	) -> Result<bool> {
		let key = self
			.config
			.credentials
			.hmac_validation_key
			.as_ref()
			.filter(|key| !key.is_blank())
			.ok_or(ConfigError::MissingHmacKey)?;

		sign::verify_webhook(timestamp, body, received_signature, key.expose())
	}

	/// Active configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Token manager shared by every clone.
	pub fn tokens(&self) -> &Arc<TokenManager> {
		&self.tokens
	}

	/// Single-exchange executor (no retries, no authentication headers).
	pub fn executor(&self) -> &Arc<RequestExecutor> {
		&self.executor
	}

	/// Retry policy applied to requests.
	pub fn retry_policy(&self) -> &RetryPolicy {
		self.retrying.policy()
	}
}

/// Builder for [`Client`] values.
pub struct ClientBuilder {
	config: Config,
	transport: Option<Arc<dyn HttpTransport>>,
	cache: Option<Arc<dyn Cache>>,
	interceptors: Vec<Arc<dyn Interceptor>>,
}
impl ClientBuilder {
	/// Creates a builder with the default transport and cache.
	pub fn new(config: Config) -> Self {
		Self { config, transport: None, cache: None, interceptors: Vec::new() }
	}

	/// Uses the provided transport instead of the default reqwest one.
	pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = Some(transport);

		self
	}

	/// Uses the provided cache to mirror tokens.
	pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self {
		self.cache = Some(cache);

		self
	}

	/// Registers an interceptor; hooks run in registration order.
	pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
		self.interceptors.push(interceptor);

		self
	}

	/// Assembles the pipeline.
	pub fn build(self) -> Result<Client> {
		let config = Arc::new(self.config);
		let transport = match self.transport {
			Some(transport) => transport,
			None => default_transport()?,
		};
		let cache = self.cache.unwrap_or_else(|| Arc::new(MemoryCache::default()));
		let executor = Arc::new(
			RequestExecutor::new(config.clone(), transport).with_interceptors(self.interceptors),
		);
		let tokens =
			Arc::new(TokenManager::new(config.clone(), cache).with_executor(executor.clone()));
		let retrying = RetryingClient::new(executor.clone(), tokens.clone());

		tracing::debug!(
			environment = %config.environment,
			base_url = %config.base_url,
			"paygate client ready"
		);

		Ok(Client { config, executor, tokens, retrying })
	}
}
impl Debug for ClientBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientBuilder")
			.field("config", &self.config)
			.field("custom_transport", &self.transport.is_some())
			.field("custom_cache", &self.cache.is_some())
			.field("interceptors", &self.interceptors.len())
			.finish()
	}
}

#[cfg(feature = "reqwest")]
fn default_transport() -> Result<Arc<dyn HttpTransport>> {
	Ok(Arc::new(ReqwestTransport::new()?))
}

#[cfg(not(feature = "reqwest"))]
fn default_transport() -> Result<Arc<dyn HttpTransport>> {
	Err(ConfigError::MissingHttpClient.into())
}

fn to_body<T>(payload: &T) -> Result<Value>
where
	T: ?Sized + Serialize,
{
	serde_json::to_value(payload).map_err(|e| ConfigError::from(e).into())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		config::Credentials,
		error::TransportError,
		http::{HttpRequest, TransportFuture},
	};

	struct Offline;
	impl HttpTransport for Offline {
		fn send(&self, _request: HttpRequest) -> TransportFuture<'_> {
			Box::pin(async { Err(TransportError::network(std::io::Error::other("offline"))) })
		}
	}

	fn client(hmac_key: Option<&str>) -> Client {
		let mut credentials = Credentials::new("client", "secret", "partner");

		if let Some(key) = hmac_key {
			credentials = credentials.with_hmac_validation_key(key);
		}

		Client::builder(Config::builder(credentials).build().expect("Test config should build."))
			.transport(Arc::new(Offline))
			.build()
			.expect("Client should build with a custom transport.")
	}

	#[test]
	fn webhook_verification_requires_a_key() {
		let err = client(None)
			.verify_webhook_signature("1700000000", "{}", "abcd")
			.expect_err("Missing HMAC keys must be a configuration error.");

		assert!(matches!(err, Error::Config(ConfigError::MissingHmacKey)));
	}

	#[test]
	fn webhook_verification_uses_the_configured_key() {
		let client = client(Some("hook-key"));
		let body = r#"{"event":"va.paid"}"#;
		let signature =
			sign::webhook_signature("1700000000", body, "hook-key").expect("Signature should compute.");

		assert!(
			client
				.verify_webhook_signature("1700000000", body, &signature)
				.expect("Verification should run.")
		);
		assert!(
			!client
				.verify_webhook_signature("1700000001", body, &signature)
				.expect("Verification should run.")
		);
	}

	#[test]
	fn clones_share_token_state() {
		let client = client(None);
		let clone = client.clone();

		assert!(Arc::ptr_eq(client.tokens(), clone.tokens()));
		assert!(!clone.is_authenticated());
		assert_eq!(client.retry_policy().max_retries, Config::DEFAULT_MAX_RETRIES);
	}
}
