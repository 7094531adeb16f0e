//! Normalized API responses.

// self
use crate::{_prelude::*, error::FieldErrors};

/// Immutable wrapper around an HTTP status and its parsed JSON body.
///
/// The gateway wraps payloads in an envelope (`success`, `data`, `error`, `message`,
/// `pagination`); the accessors below read that envelope while tolerating bodies that omit it.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
	status: u16,
	body: Value,
}
impl Response {
	/// Wraps an already-parsed body.
	pub fn new(status: u16, body: Value) -> Self {
		Self { status, body }
	}

	/// Parses raw body bytes: empty bodies become `null`, non-JSON bodies a JSON string.
	pub fn from_bytes(status: u16, bytes: &[u8]) -> Self {
		let body = if bytes.iter().all(u8::is_ascii_whitespace) {
			Value::Null
		} else {
			serde_json::from_slice(bytes)
				.unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
		};

		Self::new(status, body)
	}

	/// HTTP status code.
	pub fn status(&self) -> u16 {
		self.status
	}

	/// Raw parsed body.
	pub fn body(&self) -> &Value {
		&self.body
	}

	/// Consumes the response, returning the raw body.
	pub fn into_body(self) -> Value {
		self.body
	}

	/// `true` iff the status is 2xx and the body reports `success: true`.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status) && self.body.get("success") == Some(&Value::Bool(true))
	}

	/// Returns `body.data`, falling back to the whole body.
	pub fn data(&self) -> &Value {
		match self.body.get("data") {
			Some(data) if !data.is_null() => data,
			_ => &self.body,
		}
	}

	/// Returns `body.error.message`, falling back to `body.message`.
	pub fn message(&self) -> Option<&str> {
		self.body
			.get("error")
			.and_then(|error| error.get("message"))
			.and_then(Value::as_str)
			.or_else(|| self.body.get("message").and_then(Value::as_str))
	}

	/// Returns `body.error.code` when numeric (or a numeric string), falling back to the HTTP
	/// status.
	pub fn code(&self) -> i64 {
		self.body
			.get("error")
			.and_then(|error| error.get("code"))
			.and_then(|code| match code {
				Value::Number(n) => n.as_i64(),
				Value::String(s) => s.trim().parse().ok(),
				_ => None,
			})
			.unwrap_or(i64::from(self.status))
	}

	/// Returns `body.pagination`, if present.
	pub fn pagination(&self) -> Option<&Value> {
		self.body.get("pagination").filter(|value| !value.is_null())
	}

	/// Returns `body.errors` normalized into a field → messages map.
	///
	/// Each entry may be a list of messages or a single message; other shapes are rendered as
	/// JSON text.
	pub fn field_errors(&self) -> FieldErrors {
		let Some(Value::Object(map)) = self.body.get("errors") else {
			return FieldErrors::new();
		};

		map.iter()
			.map(|(field, messages)| {
				let messages = match messages {
					Value::Array(items) => items.iter().map(render_message).collect(),
					other => vec![render_message(other)],
				};

				(field.clone(), messages)
			})
			.collect()
	}
}

fn render_message(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}
