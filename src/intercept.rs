//! Interceptors observe the request/response/error lifecycle of each HTTP exchange.
//!
//! Every hook has a no-op default, so an implementation only overrides the capabilities it
//! needs. Hooks run sequentially in registration order, and a hook error aborts the exchange
//! and is surfaced to the caller.

mod logging;
mod metrics;

pub use self::logging::LoggingInterceptor;
pub use self::metrics::{MetricsInterceptor, MetricsSnapshot};

// self
use crate::{_prelude::*, response::Response};

/// Boxed future returned by [`Interceptor`] hooks.
pub type HookFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a + Send>>;

/// Ephemeral record of a single request attempt handed to interceptors.
#[derive(Clone, Debug)]
pub struct RequestAttempt {
	/// HTTP method.
	pub method: Method,
	/// Endpoint path relative to the base URL.
	pub endpoint: String,
	/// Final merged headers (may contain credentials; never log them verbatim).
	pub headers: HeaderMap,
	/// JSON body, if any.
	pub body: Option<Value>,
	/// Instant the attempt was dispatched.
	pub started_at: Instant,
}
impl RequestAttempt {
	/// Time elapsed since dispatch.
	pub fn elapsed(&self) -> StdDuration {
		self.started_at.elapsed()
	}
}

/// Observer hooked around a single HTTP exchange.
pub trait Interceptor
where
	Self: Send + Sync,
{
	/// Called before the request is sent.
	fn on_request<'a>(&'a self, attempt: &'a RequestAttempt) -> HookFuture<'a> {
		let _ = attempt;

		Box::pin(async { Ok(()) })
	}

	/// Called after a 2xx response was received.
	fn on_response<'a>(
		&'a self,
		attempt: &'a RequestAttempt,
		response: &'a Response,
		elapsed: StdDuration,
	) -> HookFuture<'a> {
		let _ = (attempt, response, elapsed);

		Box::pin(async { Ok(()) })
	}

	/// Called after the exchange failed, with the classified error.
	fn on_error<'a>(
		&'a self,
		attempt: &'a RequestAttempt,
		error: &'a Error,
		elapsed: StdDuration,
	) -> HookFuture<'a> {
		let _ = (attempt, error, elapsed);

		Box::pin(async { Ok(()) })
	}
}
