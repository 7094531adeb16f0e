//! Observability helpers for the request pipeline.
//!
//! - Operations run inside `tracing` spans named `paygate.operation` with the `operation` and
//!   `stage` fields.
//! - Enable `metrics` to increment the `paygate_operation_total` counter for every
//!   attempt/success/failure/retry, labeled by `operation` + `outcome` (retries also carry the triggering `status`).

mod counter;
mod span;

pub use counter::*;
pub use span::*;

// self
use crate::_prelude::*;

/// Pipeline operations observed by the SDK.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Authenticated API request (including its retries).
	Request,
	/// Token acquisition against the token endpoint.
	Authenticate,
	/// Forced token refresh.
	Refresh,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::Request => "request",
			Operation::Authenticate => "authenticate",
			Operation::Refresh => "refresh",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// A failed attempt that will be retried.
	Retry,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
			Outcome::Retry => "retry",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn millis(duration: StdDuration) -> u64 {
	u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
