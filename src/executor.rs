//! Single HTTP exchange with interceptor notification and outcome classification.

// self
use crate::{
	_prelude::*,
	config::Config,
	error::ConfigError,
	http::{HttpRequest, HttpTransport},
	intercept::{Interceptor, RequestAttempt},
	response::Response,
};

/// Performs exactly one HTTP exchange and translates its outcome.
///
/// The executor never retries and never swallows errors: a 2xx status yields a [`Response`],
/// any other status is classified through [`Error::from_response`], and transport failures
/// surface as [`Error::Api`] with code `0`.
#[derive(Clone)]
pub struct RequestExecutor {
	config: Arc<Config>,
	transport: Arc<dyn HttpTransport>,
	interceptors: Vec<Arc<dyn Interceptor>>,
}
impl RequestExecutor {
	/// Creates an executor without interceptors.
	pub fn new(config: Arc<Config>, transport: Arc<dyn HttpTransport>) -> Self {
		Self { config, transport, interceptors: Vec::new() }
	}

	/// Registers an interceptor; hooks run in registration order.
	pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
		self.interceptors.push(interceptor);

		self
	}

	/// Replaces the interceptor list.
	pub fn with_interceptors(
		mut self,
		interceptors: impl IntoIterator<Item = Arc<dyn Interceptor>>,
	) -> Self {
		self.interceptors = interceptors.into_iter().collect();

		self
	}

	/// Returns the configuration shared with the rest of the pipeline.
	pub fn config(&self) -> &Arc<Config> {
		&self.config
	}

	/// Returns the registered interceptors.
	pub fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
		&self.interceptors
	}

	/// Executes one request.
	///
	/// Configured custom headers are merged with `headers`, and per-call values win on
	/// conflicts. A failing interceptor hook aborts the exchange with the hook's error.
	pub async fn execute(
		&self,
		method: Method,
		endpoint: &str,
		body: Option<&Value>,
		headers: HeaderMap,
	) -> Result<Response> {
		let url = self.config.endpoint_url(endpoint)?;
		let payload = body.map(serde_json::to_vec).transpose().map_err(ConfigError::from)?;
		let mut merged = self.config.custom_headers.clone();

		merged.extend(headers);

		let attempt = RequestAttempt {
			method: method.clone(),
			endpoint: endpoint.to_owned(),
			headers: merged.clone(),
			body: body.cloned(),
			started_at: Instant::now(),
		};

		for interceptor in &self.interceptors {
			interceptor.on_request(&attempt).await?;
		}

		let started_at = Instant::now();
		let outcome = self
			.transport
			.send(HttpRequest {
				method,
				url,
				headers: merged,
				body: payload,
				timeout: self.config.timeout,
			})
			.await;
		let elapsed = started_at.elapsed();
		let error = match outcome {
			Ok(raw) if raw.is_success_status() => {
				let response = Response::from_bytes(raw.status, &raw.body);

				for interceptor in &self.interceptors {
					interceptor.on_response(&attempt, &response, elapsed).await?;
				}

				return Ok(response);
			},
			Ok(raw) => Error::from_response(&Response::from_bytes(raw.status, &raw.body)),
			Err(e) => Error::transport(e),
		};

		for interceptor in &self.interceptors {
			interceptor.on_error(&attempt, &error, elapsed).await?;
		}

		Err(error)
	}
}
impl Debug for RequestExecutor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestExecutor")
			.field("base_url", &self.config.base_url.as_str())
			.field("interceptors", &self.interceptors.len())
			.finish()
	}
}
