//! SDK-level error taxonomy shared by the token manager, executor, and retrying client.

// self
use crate::{_prelude::*, response::Response};

/// SDK-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error used as an optional cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Field name to messages map carried by [`Error::Validation`].
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Canonical SDK error exposed by public APIs.
///
/// The taxonomy is flat: callers branch on the variant. Every request-level variant carries a
/// message, a numeric code (the API's `error.code` when present, otherwise the HTTP status, `0`
/// for network failures), the HTTP status when a response was received, and an optional cause.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Token acquisition/refresh failed, or a request was rejected with 401 and could not be
	/// recovered through re-authentication.
	#[error("Authentication failed: {message}.")]
	Authentication {
		/// Human-readable failure summary.
		message: String,
		/// API error code or HTTP status.
		code: i64,
		/// HTTP status code, when a response was received.
		status: Option<u16>,
		/// Underlying cause, if any.
		#[source]
		source: Option<BoxError>,
	},
	/// Request rejected with 422, or local pre-flight validation failed.
	#[error("Validation failed: {message}.")]
	Validation {
		/// Human-readable failure summary.
		message: String,
		/// API error code or HTTP status.
		code: i64,
		/// HTTP status code, when a response was received.
		status: Option<u16>,
		/// Field-level error messages.
		errors: FieldErrors,
		/// Underlying cause, if any.
		#[source]
		source: Option<BoxError>,
	},
	/// Any other non-success response, or a network/timeout failure (code `0`).
	#[error("API request failed: {message}.")]
	Api {
		/// Human-readable failure summary.
		message: String,
		/// API error code, HTTP status, or `0` for transport failures.
		code: i64,
		/// HTTP status code, when a response was received.
		status: Option<u16>,
		/// Underlying cause, if any.
		#[source]
		source: Option<BoxError>,
	},
	/// Local configuration problem; fatal and never retried.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// Builds an [`Error::Authentication`] without an HTTP status.
	pub fn authentication(message: impl Into<String>) -> Self {
		Self::Authentication { message: message.into(), code: 0, status: None, source: None }
	}

	/// Builds a local [`Error::Validation`] for a single field.
	pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
		let field = field.into();
		let message = message.into();
		let mut errors = FieldErrors::new();

		errors.insert(field.clone(), vec![message.clone()]);

		Self::Validation {
			message: format!("{field} {message}"),
			code: 0,
			status: None,
			errors,
			source: None,
		}
	}

	/// Wraps a transport failure (no HTTP response) as an [`Error::Api`] with code `0`.
	pub fn transport(err: TransportError) -> Self {
		Self::Api { message: err.to_string(), code: 0, status: None, source: Some(Box::new(err)) }
	}

	/// Classifies a non-2xx [`Response`]: 401 → authentication, 422 → validation, anything else
	/// → API error.
	pub fn from_response(response: &Response) -> Self {
		let status = response.status();
		let message = response
			.message()
			.map(ToOwned::to_owned)
			.unwrap_or_else(|| format!("request failed with status {status}"));
		let code = response.code();

		match status {
			401 => Self::Authentication { message, code, status: Some(status), source: None },
			422 => Self::Validation {
				message,
				code,
				status: Some(status),
				errors: response.field_errors(),
				source: None,
			},
			_ => Self::Api { message, code, status: Some(status), source: None },
		}
	}

	/// Re-labels any request error as [`Error::Authentication`], keeping its code, status, and
	/// the original error as the cause. Configuration errors pass through untouched.
	pub fn into_authentication(self) -> Self {
		match self {
			Self::Authentication { .. } | Self::Config(_) => self,
			other => {
				let message = other.message().to_owned();
				let code = other.code();
				let status = other.status();

				Self::Authentication { message, code, status, source: Some(Box::new(other)) }
			},
		}
	}

	/// Returns the numeric error code (`0` for configuration and transport failures).
	pub fn code(&self) -> i64 {
		match self {
			Self::Authentication { code, .. }
			| Self::Validation { code, .. }
			| Self::Api { code, .. } => *code,
			Self::Config(_) => 0,
		}
	}

	/// Returns the HTTP status code, when a response was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Authentication { status, .. }
			| Self::Validation { status, .. }
			| Self::Api { status, .. } => *status,
			Self::Config(_) => None,
		}
	}

	/// Returns the failure summary without the variant prefix.
	pub fn message(&self) -> &str {
		match self {
			Self::Authentication { message, .. }
			| Self::Validation { message, .. }
			| Self::Api { message, .. } => message,
			Self::Config(_) => "configuration error",
		}
	}

	/// Returns the field errors carried by [`Error::Validation`].
	pub fn field_errors(&self) -> Option<&FieldErrors> {
		match self {
			Self::Validation { errors, .. } => Some(errors),
			_ => None,
		}
	}

	/// Returns `true` for [`Error::Authentication`].
	pub fn is_authentication(&self) -> bool {
		matches!(self, Self::Authentication { .. })
	}

	/// Returns `true` for [`Error::Validation`].
	pub fn is_validation(&self) -> bool {
		matches!(self, Self::Validation { .. })
	}

	/// Returns `true` for [`Error::Api`].
	pub fn is_api(&self) -> bool {
		matches!(self, Self::Api { .. })
	}

	/// Returns `true` for [`Error::Config`].
	pub fn is_config(&self) -> bool {
		matches!(self, Self::Config(_))
	}
}

/// Configuration and programmer errors raised by the SDK.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required credential field is missing or blank.
	#[error("Credential `{field}` is required.")]
	MissingCredential {
		/// Name of the missing field.
		field: &'static str,
	},
	/// Environment name is not `sandbox` or `production`.
	#[error("Environment `{value}` is invalid; expected `sandbox` or `production`.")]
	InvalidEnvironment {
		/// Value that failed to parse.
		value: String,
	},
	/// Maximum retry count is negative.
	#[error("The max_retries value must not be negative (got {value}).")]
	NegativeMaxRetries {
		/// Value that failed validation.
		value: i64,
	},
	/// A loosely typed setting could not be interpreted.
	#[error("Setting `{name}` has an invalid value `{value}`.")]
	InvalidSetting {
		/// Setting name without the environment prefix.
		name: &'static str,
		/// Raw value that failed to parse.
		value: String,
	},
	/// Base URL cannot be parsed or does not use HTTP(S).
	#[error("Base URL `{url}` is invalid.")]
	InvalidBaseUrl {
		/// Offending URL string.
		url: String,
		/// Underlying parsing failure, if any.
		#[source]
		source: Option<url::ParseError>,
	},
	/// Endpoint cannot be joined onto the base URL.
	#[error("Endpoint `{endpoint}` does not form a valid URL.")]
	InvalidEndpoint {
		/// Offending endpoint path.
		endpoint: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Custom header name or value is not valid HTTP.
	#[error("Custom header `{name}` is invalid.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// A token request was attempted without an attached HTTP executor.
	#[error("No HTTP executor is attached to the token manager.")]
	MissingHttpClient,
	/// Webhook verification was requested without an HMAC validation key.
	#[error("Webhook verification requires an HMAC validation key.")]
	MissingHmacKey,
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	BodySerialization(#[from] serde_json::Error),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures where no HTTP response was received.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error: {source}")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded the configured timeout.
	#[error("Request timed out after {timeout:?}")]
	Timeout {
		/// Timeout that elapsed.
		timeout: StdDuration,
		/// Transport-specific timeout error, when available.
		#[source]
		source: Option<BoxError>,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
