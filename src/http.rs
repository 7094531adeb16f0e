//! Transport primitives for API exchanges.
//!
//! [`HttpTransport`] is the SDK's only dependency on an HTTP stack. Any HTTP status, including
//! 4xx/5xx, is a successful transport outcome; implementations return [`TransportError`] only
//! when no response was received (DNS, TCP, TLS, timeout). Classification of statuses is the
//! executor's job.

// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP clients able to execute a single request.
///
/// Implementations must be `Send + Sync + 'static` so they can be shared behind `Arc` across
/// cloned clients and concurrent tasks.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends the request and resolves with whatever response the server produced.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Fully resolved outbound request.
#[derive(Clone, Debug)]
pub struct HttpRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL.
	pub url: Url,
	/// Final merged headers.
	pub headers: HeaderMap,
	/// Serialized body, if any.
	pub body: Option<Vec<u8>>,
	/// Per-call timeout.
	pub timeout: StdDuration,
}

/// Raw inbound response.
#[derive(Clone, Debug, Default)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Builds a JSON response (used by fakes and tests).
	pub fn json(status: u16, body: &Value) -> Self {
		Self { status, headers: HeaderMap::new(), body: body.to_string().into_bytes() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success_status(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// [`HttpTransport`] backed by a shared [`ReqwestClient`].
///
/// Redirects are not followed: gateway endpoints answer directly and a redirect would
/// re-send bearer credentials to another URI.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport with the SDK's default reqwest settings.
	pub fn new() -> Result<Self> {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.map_err(crate::error::ConfigError::from)?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let timeout = request.timeout;
			let mut builder = self
				.0
				.request(request.method, request.url)
				.headers(request.headers)
				.timeout(timeout);

			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(|e| map_reqwest_error(e, timeout))?;
			let status = response.status().as_u16();
			let headers = response.headers().to_owned();
			let body = response.bytes().await.map_err(|e| map_reqwest_error(e, timeout))?.to_vec();

			Ok(HttpResponse { status, headers, body })
		})
	}
}

/// Converts a dynamic header value, rejecting bytes HTTP does not allow.
pub(crate) fn header_value(value: &str) -> Result<HeaderValue> {
	HeaderValue::from_str(value)
		.map_err(|_| Error::invalid_field("header", "contains characters not allowed in HTTP headers"))
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(err: ReqwestError, timeout: StdDuration) -> TransportError {
	if err.is_timeout() {
		TransportError::Timeout { timeout, source: Some(Box::new(err)) }
	} else {
		TransportError::from(err)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn json_helper_serializes_body() {
		let response = HttpResponse::json(201, &json!({ "success": true }));

		assert!(response.is_success_status());
		assert_eq!(response.body, br#"{"success":true}"#.to_vec());
		assert!(!HttpResponse::json(401, &Value::Null).is_success_status());
	}

	#[cfg(feature = "reqwest")]
	#[tokio::test]
	async fn reqwest_transport_reports_connection_failures() {
		let transport = ReqwestTransport::new().expect("Default reqwest transport should build.");
		let request = HttpRequest {
			method: Method::GET,
			url: Url::parse("http://127.0.0.1:9/unreachable").expect("Test URL should parse."),
			headers: HeaderMap::new(),
			body: None,
			timeout: StdDuration::from_secs(2),
		};
		let err = transport.send(request).await.expect_err("Closed ports must fail.");

		assert!(matches!(err, TransportError::Network { .. } | TransportError::Timeout { .. }));
	}
}
