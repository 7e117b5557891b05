// self
use crate::{
	_prelude::*,
	http::{ApiRequest, Method},
	obs::FlowKind,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by client flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"hanazoom_client.flow",
				flow = kind.as_str(),
				stage,
				method = tracing::field::Empty,
				path = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Creates a request span carrying the verb and API path of `request`.
	pub fn for_request(stage: &'static str, request: &ApiRequest) -> Self {
		Self::new(FlowKind::Request, stage).with_target(request.method, &request.path)
	}

	/// Records the verb and API path on the span.
	pub fn with_target(self, method: Method, path: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			self.span.record("method", method.as_str());
			self.span.record("path", path);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (method, path);
		}

		self
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
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
