// crates.io
use tracing::instrument::Instrumented;
// self
use crate::{_prelude::*, obs::Operation};

/// `connect_core.op` span wrapping one guard, client, or paginator call.
#[derive(Clone, Debug)]
pub struct OpSpan(tracing::Span);
impl OpSpan {
	/// Opens a span for `op`; `stage` names the call site.
	pub fn new(op: Operation, stage: &'static str) -> Self {
		Self(tracing::info_span!("connect_core.op", op = op.label(), stage))
	}

	/// Runs `fut` inside the span.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		use tracing::Instrument;

		fut.instrument(self.0.clone())
	}
}
