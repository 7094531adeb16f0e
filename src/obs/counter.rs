// self
use crate::obs::{Operation, Outcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_outcome(operation: Operation, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"paygate_operation_total",
			"operation" => operation.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (operation, outcome);
	}
}

/// Records a retried attempt, labeled with the HTTP status that triggered it.
///
/// Failures without a response are labeled `network`.
pub fn record_retry(operation: Operation, status: Option<u16>) {
	let status = retry_status_label(status);

	tracing::trace!(operation = %operation, status = %status, "retry recorded");

	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"paygate_operation_total",
			"operation" => operation.as_str(),
			"outcome" => Outcome::Retry.as_str(),
			"status" => status
		)
		.increment(1);
	}
}

fn retry_status_label(status: Option<u16>) -> String {
	status.map_or_else(|| "network".into(), |status| status.to_string())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_outcome_noop_without_recorder() {
		record_outcome(Operation::Refresh, Outcome::Failure);
		record_retry(Operation::Request, Some(503));
	}

	#[test]
	fn retry_labels_carry_the_status() {
		assert_eq!(retry_status_label(Some(401)), "401");
		assert_eq!(retry_status_label(None), "network");
	}
}
