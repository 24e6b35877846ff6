// self
use crate::{
	_prelude::*,
	obs::{CallKind, CallOutcome, record_call_outcome},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// Span wrapper attached to every remote call.
///
/// The span carries the call kind and stage up front; the HTTP `status` and final `outcome`
/// are filled in as the call progresses, and every outcome also feeds the call counter.
#[derive(Clone, Debug)]
pub struct CallSpan {
	kind: CallKind,
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provided call kind + stage.
	pub fn new(kind: CallKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"tuya_openapi.call",
				call = kind.as_str(),
				stage,
				status = tracing::field::Empty,
				outcome = tracing::field::Empty,
			);

			Self { kind, span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = stage;

			Self { kind }
		}
	}

	/// Call kind this span was opened for.
	pub fn kind(&self) -> CallKind {
		self.kind
	}

	/// Records the HTTP status of the remote response.
	pub fn record_status(&self, status: u16) {
		#[cfg(feature = "tracing")]
		self.span.record("status", status);
		#[cfg(not(feature = "tracing"))]
		let _ = status;
	}

	/// Records `outcome` on the span and bumps the matching call counter.
	pub fn record_outcome(&self, outcome: CallOutcome) {
		#[cfg(feature = "tracing")]
		self.span.record("outcome", outcome.as_str());

		record_call_outcome(self.kind, outcome);
	}

	/// Runs `fut` inside the span, recording the attempt and its final outcome.
	pub async fn run<Fut, T, E>(&self, fut: Fut) -> Result<T, E>
	where
		Fut: Future<Output = Result<T, E>>,
	{
		self.record_outcome(CallOutcome::Attempt);

		let result = self.instrument(fut).await;

		let outcome = if result.is_ok() { CallOutcome::Success } else { CallOutcome::Failure };

		self.record_outcome(outcome);

		result
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}
