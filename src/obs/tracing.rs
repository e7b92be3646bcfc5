// self
use crate::{
	_prelude::*,
	error::FailureClass,
	obs::FlowKind,
	request::Method,
	store::CompareAndSwapOutcome,
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
			let span = tracing::info_span!("marketplace_http.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
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

/// Emits an event describing how the coordinator classified a failed request.
pub fn trace_auth_failure(class: FailureClass, method: Method, path: &str) {
	#[cfg(feature = "tracing")]
	{
		match class {
			FailureClass::UnauthenticatedRequest | FailureClass::ExpiredCredential =>
				tracing::debug!(class = class.as_str(), %method, path, "request failed"),
			FailureClass::RefreshExhausted | FailureClass::RefreshRejected =>
				tracing::warn!(class = class.as_str(), %method, path, "session ended"),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (class, method, path);
	}
}

/// Emits an event when a refresh episode settles.
pub fn trace_refresh_settled(episode: u64, renewed: bool, detail: Option<&str>) {
	#[cfg(feature = "tracing")]
	{
		if renewed {
			tracing::info!(episode, "access token refreshed");
		} else {
			tracing::warn!(episode, detail, "refresh rejected; session cleared");
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (episode, renewed, detail);
	}
}

/// Emits an event when a refresh result is discarded because the session changed meanwhile.
pub fn trace_refresh_superseded(episode: u64, outcome: CompareAndSwapOutcome) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(episode, outcome = ?outcome, "refresh result discarded; session changed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (episode, outcome);
	}
}

/// Emits an event for a failure that is logged and swallowed.
pub fn trace_ignored_failure(stage: &'static str, error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(stage, error = %error, "ignoring failure");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (stage, error);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn events_noop_without_subscriber() {
		trace_auth_failure(FailureClass::ExpiredCredential, Method::Get, "v1/profile/");
		trace_refresh_settled(1, false, Some("HTTP 401"));
		trace_refresh_superseded(2, CompareAndSwapOutcome::Missing);
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(FlowKind::Refresh, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
