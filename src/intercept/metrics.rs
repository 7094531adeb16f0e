// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	intercept::{HookFuture, Interceptor, RequestAttempt},
	obs,
	response::Response,
};

/// Thread-safe request counters and latency accumulator.
///
/// A request counts as successful when a 2xx response reached `on_response`, and as failed when
/// `on_error` fired.
#[derive(Debug, Default)]
pub struct MetricsInterceptor {
	total: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	cumulative_ms: AtomicU64,
	last_request_at: Mutex<Option<OffsetDateTime>>,
}
impl MetricsInterceptor {
	/// Returns the number of completed requests.
	pub fn total_requests(&self) -> u64 {
		self.total.load(Ordering::Relaxed)
	}

	/// Returns the number of successful requests.
	pub fn successful_requests(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of failed requests.
	pub fn failed_requests(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns the summed response time in milliseconds.
	pub fn cumulative_response_time_ms(&self) -> u64 {
		self.cumulative_ms.load(Ordering::Relaxed)
	}

	/// Returns when the last request completed.
	pub fn last_request_at(&self) -> Option<OffsetDateTime> {
		*self.last_request_at.lock()
	}

	/// Captures the counters and derived ratios.
	pub fn snapshot(&self) -> MetricsSnapshot {
		MetricsSnapshot::new(
			self.total_requests(),
			self.successful_requests(),
			self.failed_requests(),
			self.cumulative_response_time_ms(),
			self.last_request_at(),
		)
	}

	/// Resets every counter.
	pub fn reset(&self) {
		self.total.store(0, Ordering::Relaxed);
		self.success.store(0, Ordering::Relaxed);
		self.failure.store(0, Ordering::Relaxed);
		self.cumulative_ms.store(0, Ordering::Relaxed);
		*self.last_request_at.lock() = None;
	}

	fn record(&self, succeeded: bool, elapsed: StdDuration) {
		let elapsed_ms = obs::millis(elapsed);

		self.total.fetch_add(1, Ordering::Relaxed);
		self.cumulative_ms.fetch_add(elapsed_ms, Ordering::Relaxed);

		if succeeded {
			self.success.fetch_add(1, Ordering::Relaxed);
		} else {
			self.failure.fetch_add(1, Ordering::Relaxed);
		}

		*self.last_request_at.lock() = Some(OffsetDateTime::now_utc());
	}
}
impl Interceptor for MetricsInterceptor {
	fn on_response<'a>(
		&'a self,
		_attempt: &'a RequestAttempt,
		_response: &'a Response,
		elapsed: StdDuration,
	) -> HookFuture<'a> {
		self.record(true, elapsed);

		Box::pin(async { Ok(()) })
	}

	fn on_error<'a>(
		&'a self,
		_attempt: &'a RequestAttempt,
		_error: &'a Error,
		elapsed: StdDuration,
	) -> HookFuture<'a> {
		self.record(false, elapsed);

		Box::pin(async { Ok(()) })
	}
}

/// Point-in-time view of [`MetricsInterceptor`] counters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricsSnapshot {
	/// Completed requests.
	pub total_requests: u64,
	/// Successful requests.
	pub successful_requests: u64,
	/// Failed requests.
	pub failed_requests: u64,
	/// Summed response time in milliseconds.
	pub cumulative_response_time_ms: u64,
	/// Completion instant of the last request.
	pub last_request_at: Option<OffsetDateTime>,
	/// `cumulative / total`, or `0` without requests.
	pub average_response_time_ms: f64,
	/// `successful / total * 100`, or `0` without requests.
	pub success_rate: f64,
}
impl MetricsSnapshot {
	fn new(
		total_requests: u64,
		successful_requests: u64,
		failed_requests: u64,
		cumulative_response_time_ms: u64,
		last_request_at: Option<OffsetDateTime>,
	) -> Self {
		let (average_response_time_ms, success_rate) = if total_requests == 0 {
			(0.0, 0.0)
		} else {
			let total = total_requests as f64;

			(
				cumulative_response_time_ms as f64 / total,
				successful_requests as f64 / total * 100.0,
			)
		};

		Self {
			total_requests,
			successful_requests,
			failed_requests,
			cumulative_response_time_ms,
			last_request_at,
			average_response_time_ms,
			success_rate,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn attempt() -> RequestAttempt {
		RequestAttempt {
			method: Method::GET,
			endpoint: "/api/v1/balance".into(),
			headers: HeaderMap::new(),
			body: None,
			started_at: Instant::now(),
		}
	}

	#[test]
	fn empty_snapshot_has_zero_ratios() {
		let snapshot = MetricsInterceptor::default().snapshot();

		assert_eq!(snapshot.total_requests, 0);
		assert_eq!(snapshot.average_response_time_ms, 0.0);
		assert_eq!(snapshot.success_rate, 0.0);
		assert!(snapshot.last_request_at.is_none());
	}

	#[tokio::test]
	async fn hooks_accumulate_counts_and_latency() {
		let metrics = MetricsInterceptor::default();
		let attempt = attempt();
		let response = Response::new(200, json!({ "success": true }));
		let error = Error::authentication("expired");

		metrics
			.on_response(&attempt, &response, StdDuration::from_millis(100))
			.await
			.expect("Metrics hook should not fail.");
		metrics
			.on_response(&attempt, &response, StdDuration::from_millis(200))
			.await
			.expect("Metrics hook should not fail.");
		metrics
			.on_error(&attempt, &error, StdDuration::from_millis(300))
			.await
			.expect("Metrics hook should not fail.");
		metrics.on_request(&attempt).await.expect("Default hook should be a no-op.");

		let snapshot = metrics.snapshot();

		assert_eq!(snapshot.total_requests, 3);
		assert_eq!(snapshot.successful_requests, 2);
		assert_eq!(snapshot.failed_requests, 1);
		assert_eq!(snapshot.cumulative_response_time_ms, 600);
		assert_eq!(snapshot.average_response_time_ms, 200.0);
		assert!((snapshot.success_rate - 200.0 / 3.0).abs() < 1e-9);
		assert!(snapshot.last_request_at.is_some());

		metrics.reset();

		assert_eq!(metrics.total_requests(), 0);
	}
}
