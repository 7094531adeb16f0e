// self
use crate::{_prelude::*, obs::Operation};

/// Future wrapped in an operation span.
pub type InstrumentedOperation<F> = tracing::instrument::Instrumented<F>;

/// A span builder used by pipeline operations.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	span: tracing::Span,
}
impl OperationSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(operation: Operation, stage: &'static str) -> Self {
		let span = tracing::info_span!("paygate.operation", operation = operation.as_str(), stage);

		Self { span }
	}

	/// Returns the underlying span.
	pub fn span(&self) -> &tracing::Span {
		&self.span
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOperation<Fut>
	where
		Fut: Future,
	{
		use tracing::Instrument;

		fut.instrument(self.span.clone())
	}
}
