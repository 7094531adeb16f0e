// self
use crate::{
	_prelude::*,
	intercept::{HookFuture, Interceptor, RequestAttempt},
	obs,
	response::Response,
};

/// Side-effect-free interceptor that logs each exchange through `tracing`.
///
/// Only the method, endpoint, status, code, and latency are recorded; headers and bodies are
/// never logged.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingInterceptor;
impl Interceptor for LoggingInterceptor {
	fn on_request<'a>(&'a self, attempt: &'a RequestAttempt) -> HookFuture<'a> {
		tracing::debug!(method = %attempt.method, endpoint = %attempt.endpoint, "sending request");

		Box::pin(async { Ok(()) })
	}

	fn on_response<'a>(
		&'a self,
		attempt: &'a RequestAttempt,
		response: &'a Response,
		elapsed: StdDuration,
	) -> HookFuture<'a> {
		tracing::info!(
			method = %attempt.method,
			endpoint = %attempt.endpoint,
			status = response.status(),
			success = response.is_success(),
			elapsed_ms = obs::millis(elapsed),
			"request completed"
		);

		Box::pin(async { Ok(()) })
	}

	fn on_error<'a>(
		&'a self,
		attempt: &'a RequestAttempt,
		error: &'a Error,
		elapsed: StdDuration,
	) -> HookFuture<'a> {
		tracing::warn!(
			method = %attempt.method,
			endpoint = %attempt.endpoint,
			status = error.status(),
			code = error.code(),
			elapsed_ms = obs::millis(elapsed),
			error = %error,
			"request failed"
		);

		Box::pin(async { Ok(()) })
	}
}
