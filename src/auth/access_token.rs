//! Access-token value object and its validity rules.

// self
use crate::{_prelude::*, auth::Secret};

/// Immutable access token paired with its absolute expiry instant.
///
/// A token is treated as invalid [`AccessToken::SAFETY_MARGIN`] before its nominal expiry so it
/// never dies mid-flight.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
	/// Bearer token value; callers must avoid logging it.
	pub token: Secret,
	/// Nominal expiry instant reported by the token endpoint.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Margin subtracted from the nominal expiry when checking validity.
	pub const SAFETY_MARGIN: Duration = Duration::seconds(60);

	/// Creates a token expiring at the provided instant.
	pub fn new(token: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { token: Secret::new(token), expires_at }
	}

	/// Creates a token issued at `issued_at` and valid for `expires_in`.
	pub fn issued(token: impl Into<String>, issued_at: OffsetDateTime, expires_in: Duration) -> Self {
		Self::new(token, issued_at + expires_in)
	}

	/// Returns the bearer value.
	pub fn expose(&self) -> &str {
		self.token.expose()
	}

	/// `true` while `instant < expires_at - SAFETY_MARGIN`.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at - Self::SAFETY_MARGIN
	}

	/// Checks validity against the current UTC clock.
	pub fn is_valid(&self) -> bool {
		self.is_valid_at(OffsetDateTime::now_utc())
	}

	/// Time left before the token stops being valid (zero when already invalid).
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - Self::SAFETY_MARGIN - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
