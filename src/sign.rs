//! HMAC signatures for token acquisition, signed disbursement calls, and webhook verification.
//!
//! Every function here is pure. Signatures bind the method, endpoint, token, body, and time so a
//! captured request cannot be replayed against another endpoint or after expiry.
//!
//! Disbursement signatures are encoded as standard padded base64; this is the canonical wire
//! format for the `X-Signature` header on signed endpoints.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use time::{Date, format_description::FormatItem, macros::format_description};
// self
use crate::_prelude::*;

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

const AUTH_DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year][month][day]");

/// Body whose digest is covered by a webhook signature.
#[derive(Clone, Copy, Debug)]
pub enum WebhookBody<'a> {
	/// Raw request body exactly as received.
	Raw(&'a str),
	/// Parsed JSON body; hashed in its compact serialized form with keys in received order.
	Json(&'a Value),
}
impl<'a> From<&'a str> for WebhookBody<'a> {
	fn from(value: &'a str) -> Self {
		Self::Raw(value)
	}
}
impl<'a> From<&'a Value> for WebhookBody<'a> {
	fn from(value: &'a Value) -> Self {
		Self::Json(value)
	}
}

/// Formats a date as `YYYYMMDD`.
pub fn auth_date(date: Date) -> String {
	// The format only contains numeric components, which always render.
	date.format(AUTH_DATE_FORMAT).unwrap_or_default()
}

/// Token-request signature for the given date: hex HMAC-SHA512 keyed by the client secret over
/// `"{client_id}_{client_secret}_{YYYYMMDD}"`.
pub fn auth_signature_for(client_id: &str, client_secret: &str, date: Date) -> String {
	let message = format!("{client_id}_{client_secret}_{}", auth_date(date));

	hex::encode(hmac_sha512(client_secret.as_bytes(), message.as_bytes()))
}

/// Token-request signature for the current UTC date, so signatures rotate daily.
pub fn auth_signature(client_id: &str, client_secret: &str) -> String {
	auth_signature_for(client_id, client_secret, OffsetDateTime::now_utc().date())
}

/// Lowercase hex SHA-256 of the compact JSON body (the empty string when there is no body).
pub fn body_digest(body: Option<&Value>) -> Result<String> {
	let serialized = match body {
		Some(value) => serde_json::to_vec(value).map_err(crate::error::ConfigError::from)?,
		None => Vec::new(),
	};

	Ok(sha256_hex(&serialized))
}

/// Signature for transfer-money endpoints: base64 HMAC-SHA512 keyed by the client secret over
/// `"{METHOD}:{endpoint}:{access_token}:{body_digest}:{timestamp}"`.
pub fn disbursement_signature(
	method: &Method,
	endpoint: &str,
	access_token: &str,
	body: Option<&Value>,
	timestamp: i64,
	client_secret: &str,
) -> Result<String> {
	let digest = body_digest(body)?;
	let message = format!(
		"{}:{endpoint}:{access_token}:{digest}:{timestamp}",
		method.as_str().to_ascii_uppercase()
	);

	Ok(BASE64.encode(hmac_sha512(client_secret.as_bytes(), message.as_bytes())))
}

/// Verifies an inbound webhook signature in constant time.
///
/// The expected signature is hex HMAC-SHA256 keyed by `hmac_key` over
/// `"{timestamp}{sha256_hex(body)}"`. Mismatches (including malformed hex) return `Ok(false)`;
/// empty inputs are a caller error.
pub fn verify_webhook<'a>(
	timestamp: &str,
	body: impl Into<WebhookBody<'a>>,
	received_signature: &str,
	hmac_key: &str,
) -> Result<bool> {
	for (field, value) in
		[("timestamp", timestamp), ("signature", received_signature), ("hmac_key", hmac_key)]
	{
		if value.trim().is_empty() {
			return Err(Error::invalid_field(field, "must not be empty"));
		}
	}

	let digest = match body.into() {
		WebhookBody::Raw(raw) => sha256_hex(raw.as_bytes()),
		WebhookBody::Json(value) => body_digest(Some(value))?,
	};
	let Ok(received) = hex::decode(received_signature.trim()) else {
		return Ok(false);
	};
	let mut mac = new_mac::<HmacSha256>(hmac_key.as_bytes());

	mac.update(timestamp.as_bytes());
	mac.update(digest.as_bytes());

	Ok(mac.verify_slice(&received).is_ok())
}

/// Computes the webhook signature for the given inputs (useful for tests and local relays).
pub fn webhook_signature<'a>(
	timestamp: &str,
	body: impl Into<WebhookBody<'a>>,
	hmac_key: &str,
) -> Result<String> {
	let digest = match body.into() {
		WebhookBody::Raw(raw) => sha256_hex(raw.as_bytes()),
		WebhookBody::Json(value) => body_digest(Some(value))?,
	};
	let mut mac = new_mac::<HmacSha256>(hmac_key.as_bytes());

	mac.update(timestamp.as_bytes());
	mac.update(digest.as_bytes());

	Ok(hex::encode(mac.finalize().into_bytes()))
}

fn sha256_hex(bytes: &[u8]) -> String {
	hex::encode(Sha256::digest(bytes))
}

fn hmac_sha512(key: &[u8], message: &[u8]) -> Vec<u8> {
	let mut mac = new_mac::<HmacSha512>(key);

	mac.update(message);

	mac.finalize().into_bytes().to_vec()
}

fn new_mac<M>(key: &[u8]) -> M
where
	M: Mac + hmac::digest::KeyInit,
{
	// HMAC accepts keys of any length.
	<M as hmac::digest::KeyInit>::new_from_slice(key)
		.unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"))
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn auth_signature_is_deterministic_per_day() {
		let day = macros::date!(2025 - 03 - 07);
		let first = auth_signature_for("client", "secret", day);

		assert_eq!(auth_date(day), "20250307");
		assert_eq!(first.len(), 128);
		assert_eq!(first, auth_signature_for("client", "secret", day));
		assert_ne!(first, auth_signature_for("client2", "secret", day));
		assert_ne!(first, auth_signature_for("client", "secret2", day));
		assert_ne!(first, auth_signature_for("client", "secret", macros::date!(2025 - 03 - 08)));
		assert_eq!(auth_signature("client", "secret"), auth_signature("client", "secret"));
	}

	#[test]
	fn auth_signature_matches_manual_hmac() {
		let day = macros::date!(2024 - 12 - 31);
		let mut mac = HmacSha512::new_from_slice(b"s3cr3t").expect("HMAC key should be accepted.");

		mac.update(b"cid_s3cr3t_20241231");

		assert_eq!(
			auth_signature_for("cid", "s3cr3t", day),
			hex::encode(mac.finalize().into_bytes())
		);
	}

	#[test]
	fn disbursement_signature_is_sensitive_to_every_field() {
		let body = json!({ "amount": 10_000, "account": "123" });
		let sign = |method: &Method, endpoint: &str, token: &str, body: Option<&Value>, ts: i64| {
			disbursement_signature(method, endpoint, token, body, ts, "secret")
				.expect("Signature should compute.")
		};
		let base = sign(&Method::POST, "/api/v1/transfer", "tok", Some(&body), 1_700_000_000);

		assert_eq!(base, sign(&Method::POST, "/api/v1/transfer", "tok", Some(&body), 1_700_000_000));
		assert_ne!(base, sign(&Method::PUT, "/api/v1/transfer", "tok", Some(&body), 1_700_000_000));
		assert_ne!(base, sign(&Method::POST, "/api/v2/transfer", "tok", Some(&body), 1_700_000_000));
		assert_ne!(base, sign(&Method::POST, "/api/v1/transfer", "tok2", Some(&body), 1_700_000_000));
		assert_ne!(base, sign(&Method::POST, "/api/v1/transfer", "tok", None, 1_700_000_000));
		assert_ne!(
			base,
			sign(&Method::POST, "/api/v1/transfer", "tok", Some(&json!({ "amount": 10_001 })), 1_700_000_000)
		);
		assert_ne!(base, sign(&Method::POST, "/api/v1/transfer", "tok", Some(&body), 1_700_000_001));
		assert!(BASE64.decode(&base).is_ok_and(|raw| raw.len() == 64));
	}

	#[test]
	fn empty_body_hashes_empty_string() {
		assert_eq!(
			body_digest(None).expect("Digest should compute."),
			"e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
		);
	}

	#[test]
	fn webhook_verification_accepts_matching_and_rejects_mutations() {
		let body = r#"{"event":"payment.paid","amount":5000}"#;
		let signature =
			webhook_signature("1700000000", body, "hook-key").expect("Signature should compute.");
		let verify = |ts: &str, body: &str, sig: &str, key: &str| {
			verify_webhook(ts, body, sig, key).expect("Verification should not error.")
		};

		assert!(verify("1700000000", body, &signature, "hook-key"));
		assert!(verify("1700000000", body, &signature.to_uppercase(), "hook-key"));
		assert!(!verify("1700000000", &body.replace("5000", "5001"), &signature, "hook-key"));
		assert!(!verify("1700000001", body, &signature, "hook-key"));
		assert!(!verify("1700000000", body, &signature, "hook-kez"));
		assert!(!verify("1700000000", body, "not-hex", "hook-key"));
		assert!(!verify("1700000000", body, &signature[..10], "hook-key"));
	}

	#[test]
	fn webhook_verification_hashes_json_bodies_compactly() {
		let value = json!({ "event": "qris.paid" });
		let raw = serde_json::to_string(&value).expect("Value should serialize.");
		let signature =
			webhook_signature("42", raw.as_str(), "k").expect("Signature should compute.");

		assert!(verify_webhook("42", &value, &signature, "k").expect("Verification should run."));
	}

	#[test]
	fn webhook_verification_keeps_received_key_order() {
		let raw = r#"{"event":"payment.paid","amount":5000,"customer":{"name":"A","id":7}}"#;
		let value: Value = serde_json::from_str(raw).expect("Webhook body should parse.");
		let signature =
			webhook_signature("1700000000", raw, "hook-key").expect("Signature should compute.");

		assert_eq!(serde_json::to_string(&value).expect("Value should serialize."), raw);
		assert!(
			verify_webhook("1700000000", &value, &signature, "hook-key")
				.expect("Verification should run.")
		);
	}

	#[test]
	fn webhook_verification_rejects_empty_inputs() {
		for (ts, sig, key, field) in
			[("", "ab", "k", "timestamp"), ("1", "", "k", "signature"), ("1", "ab", " ", "hmac_key")]
		{
			let err = verify_webhook(ts, "{}", sig, key).expect_err("Empty inputs must error.");

			assert!(err.field_errors().is_some_and(|errors| errors.contains_key(field)));
		}
	}
}
