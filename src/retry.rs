//! Retry/backoff policy and the retrying request loop with transparent re-authentication.
//!
//! Each attempt fetches a token and rebuilds the standard headers, so a refreshed token (and,
//! for signed calls, a fresh signature) is used on the next try. A 401 triggers one
//! single-flight refresh followed by a flat [`RetryPolicy::retry_delay`] wait; transient server
//! statuses back off exponentially with jitter.

// crates.io
use rand::Rng;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	config::Config,
	executor::RequestExecutor,
	http::header_value,
	obs::{self, Operation, OperationSpan, Outcome},
	response::Response,
	sign,
	token::TokenManager,
};

/// Retry knobs derived from [`Config`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Retries after the first attempt.
	pub max_retries: u32,
	/// Base backoff delay and flat wait after a re-authentication.
	pub retry_delay: StdDuration,
	/// Refresh the token and retry on 401.
	pub auto_reauth: bool,
}
impl RetryPolicy {
	/// Statuses treated as transient.
	pub const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];
	/// Upper bound for a single backoff wait.
	pub const MAX_BACKOFF: StdDuration = StdDuration::from_secs(30);
	/// Largest jitter fraction added on top of the exponential delay.
	pub const MAX_JITTER: f64 = 0.3;

	/// Reads the policy from the configuration.
	pub fn from_config(config: &Config) -> Self {
		Self {
			max_retries: config.max_retries,
			retry_delay: config.retry_delay,
			auto_reauth: config.auto_reauth,
		}
	}

	/// `false` once `attempt` reached the bound; otherwise `true` iff the error carries a
	/// retryable HTTP status.
	pub fn should_retry(&self, error: &Error, attempt: u32) -> bool {
		if attempt >= self.max_retries {
			return false;
		}

		error.status().is_some_and(|status| Self::RETRYABLE_STATUSES.contains(&status))
	}

	/// Randomized exponential delay before retry number `attempt` (1-based).
	pub fn backoff(&self, attempt: u32) -> StdDuration {
		let jitter = rand::rng().random_range(0.0..=Self::MAX_JITTER);

		self.backoff_with_jitter(attempt, jitter)
	}

	/// `retry_delay * 2^(attempt - 1) * (1 + jitter)`, capped at [`RetryPolicy::MAX_BACKOFF`].
	pub fn backoff_with_jitter(&self, attempt: u32, jitter: f64) -> StdDuration {
		let exponent = attempt.saturating_sub(1).min(31);
		let base = self.retry_delay.saturating_mul(1_u32 << exponent).min(Self::MAX_BACKOFF);
		let jitter = if jitter.is_finite() { jitter.clamp(0.0, Self::MAX_JITTER) } else { 0.0 };

		base.mul_f64(1.0 + jitter).min(Self::MAX_BACKOFF)
	}
}

/// Executes authenticated requests with retries, backoff, and re-authentication.
#[derive(Clone, Debug)]
pub struct RetryingClient {
	executor: Arc<RequestExecutor>,
	tokens: Arc<TokenManager>,
	policy: RetryPolicy,
}
impl RetryingClient {
	/// Wires the executor and token manager with the policy taken from the executor's
	/// configuration.
	pub fn new(executor: Arc<RequestExecutor>, tokens: Arc<TokenManager>) -> Self {
		let policy = RetryPolicy::from_config(executor.config());

		Self { executor, tokens, policy }
	}

	/// Overrides the retry policy.
	pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
		self.policy = policy;

		self
	}

	/// Active retry policy.
	pub fn policy(&self) -> &RetryPolicy {
		&self.policy
	}

	/// Token manager feeding the `Authorization` header.
	pub fn tokens(&self) -> &Arc<TokenManager> {
		&self.tokens
	}

	/// Sends an authenticated request with the standard headers plus `headers`.
	///
	/// At most `max_retries + 1` attempts are made. The last error is returned when every
	/// attempt fails. Configuration errors and token acquisition failures are returned
	/// immediately.
	pub async fn request_with_retry(
		&self,
		method: Method,
		endpoint: &str,
		body: Option<&Value>,
		headers: HeaderMap,
	) -> Result<Response> {
		self.run(method, endpoint, body, headers, false).await
	}

	/// Same as [`RetryingClient::request_with_retry`], additionally sending `X-Timestamp` and
	/// the disbursement `X-Signature` computed for each attempt.
	pub async fn request_signed(
		&self,
		method: Method,
		endpoint: &str,
		body: Option<&Value>,
		headers: HeaderMap,
	) -> Result<Response> {
		self.run(method, endpoint, body, headers, true).await
	}

	async fn run(
		&self,
		method: Method,
		endpoint: &str,
		body: Option<&Value>,
		headers: HeaderMap,
		signed: bool,
	) -> Result<Response> {
		const OPERATION: Operation = Operation::Request;

		let span = OperationSpan::new(OPERATION, if signed { "request_signed" } else { "request" });

		obs::record_outcome(OPERATION, Outcome::Attempt);

		let result = span.instrument(self.run_attempts(method, endpoint, body, &headers, signed)).await;

		match &result {
			Ok(_) => obs::record_outcome(OPERATION, Outcome::Success),
			Err(_) => obs::record_outcome(OPERATION, Outcome::Failure),
		}

		result
	}

	async fn run_attempts(
		&self,
		method: Method,
		endpoint: &str,
		body: Option<&Value>,
		extra: &HeaderMap,
		signed: bool,
	) -> Result<Response> {
		let mut attempt = 0;
		let mut last_error = None;

		while attempt <= self.policy.max_retries {
			let token = self.tokens.get_access_token().await?;
			let headers = self.attempt_headers(&method, endpoint, body, &token, extra, signed)?;
			let error = match self.executor.execute(method.clone(), endpoint, body, headers).await {
				Ok(response) => return Ok(response),
				Err(e) => e,
			};

			match error {
				Error::Config(_) => return Err(error),
				Error::Authentication { .. }
					if self.policy.auto_reauth && attempt < self.policy.max_retries =>
				{
					attempt += 1;
					obs::record_retry(Operation::Request, error.status());
					tracing::info!(attempt, endpoint, "request unauthenticated; refreshing token");

					self.tokens.refresh_rejected(token.expose()).await?;
					tokio::time::sleep(self.policy.retry_delay).await;
				},
				Error::Authentication { .. } => {
					last_error = Some(error);

					break;
				},
				_ => {
					let retry = self.policy.should_retry(&error, attempt);

					if !retry {
						last_error = Some(error);

						break;
					}

					attempt += 1;

					let delay = self.policy.backoff(attempt);

					obs::record_retry(Operation::Request, error.status());
					tracing::warn!(
						attempt,
						endpoint,
						status = error.status(),
						delay_ms = obs::millis(delay),
						"transient failure; backing off"
					);

					last_error = Some(error);

					tokio::time::sleep(delay).await;
				},
			}
		}

		Err(last_error.unwrap_or_else(|| Error::Api {
			message: format!("request failed after {} attempts", attempt + 1),
			code: 0,
			status: None,
			source: None,
		}))
	}

	fn attempt_headers(
		&self,
		method: &Method,
		endpoint: &str,
		body: Option<&Value>,
		token: &AccessToken,
		extra: &HeaderMap,
		signed: bool,
	) -> Result<HeaderMap> {
		let credentials = &self.executor.config().credentials;
		let mut headers = HeaderMap::new();
		let mut authorization = header_value(&format!("Bearer {}", token.expose()))?;

		authorization.set_sensitive(true);

		headers.insert("x-partner-id", header_value(credentials.api_key.expose())?);
		headers.insert(::http::header::AUTHORIZATION, authorization);
		headers.insert(::http::header::ACCEPT, HeaderValue::from_static("application/json"));
		headers.insert(::http::header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
		headers.extend(extra.clone());

		if signed {
			let timestamp = OffsetDateTime::now_utc().unix_timestamp();
			let signature = sign::disbursement_signature(
				method,
				endpoint,
				token.expose(),
				body,
				timestamp,
				credentials.client_secret.expose(),
			)?;

			headers.insert("x-timestamp", header_value(&timestamp.to_string())?);
			headers.insert("x-signature", header_value(&signature)?);
		}

		Ok(headers)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn policy(max_retries: u32) -> RetryPolicy {
		RetryPolicy { max_retries, retry_delay: StdDuration::from_millis(1_000), auto_reauth: true }
	}

	fn api_error(status: u16) -> Error {
		Error::Api { message: "failed".into(), code: status.into(), status: Some(status), source: None }
	}

	#[test]
	fn only_transient_statuses_are_retried() {
		let policy = policy(3);

		assert!(!policy.should_retry(&api_error(404), 0));
		assert!(policy.should_retry(&api_error(503), 0));

		for status in RetryPolicy::RETRYABLE_STATUSES {
			assert!(policy.should_retry(&api_error(status), 2), "{status} should be retryable");
		}
		for status in [400, 401, 403, 409, 422, 501] {
			assert!(!policy.should_retry(&api_error(status), 0), "{status} should not be retried");
		}

		let network = Error::Api { message: "reset".into(), code: 0, status: None, source: None };

		assert!(!policy.should_retry(&network, 0));
	}

	#[test]
	fn retries_stop_at_the_bound() {
		let policy = policy(3);

		assert!(policy.should_retry(&api_error(503), 2));
		assert!(!policy.should_retry(&api_error(503), 3));
		assert!(!policy.should_retry(&api_error(503), 4));
		assert!(!self::policy(0).should_retry(&api_error(503), 0));
	}

	#[test]
	fn backoff_grows_exponentially_and_is_capped() {
		let policy = policy(10);

		assert_eq!(policy.backoff_with_jitter(1, 0.0), StdDuration::from_millis(1_000));
		assert_eq!(policy.backoff_with_jitter(2, 0.0), StdDuration::from_millis(2_000));
		assert_eq!(policy.backoff_with_jitter(3, 0.0), StdDuration::from_millis(4_000));
		assert_eq!(policy.backoff_with_jitter(2, 0.3), StdDuration::from_millis(2_600));
		assert_eq!(policy.backoff_with_jitter(2, 5.0), StdDuration::from_millis(2_600));
		assert_eq!(policy.backoff_with_jitter(6, 0.0), RetryPolicy::MAX_BACKOFF);
		assert_eq!(policy.backoff_with_jitter(40, 0.3), RetryPolicy::MAX_BACKOFF);
		assert_eq!(policy.backoff_with_jitter(1, f64::NAN), StdDuration::from_millis(1_000));
	}

	#[test]
	fn randomized_backoff_stays_within_jitter_bounds() {
		let policy = policy(5);

		for attempt in 1..=4 {
			let floor = policy.backoff_with_jitter(attempt, 0.0);
			let ceiling = policy.backoff_with_jitter(attempt, RetryPolicy::MAX_JITTER);

			for _ in 0..32 {
				let delay = policy.backoff(attempt);

				assert!(delay >= floor && delay <= ceiling, "{delay:?} outside {floor:?}..={ceiling:?}");
			}
		}
	}
}
