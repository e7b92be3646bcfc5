// self
use crate::{
	error::FailureClass,
	obs::{FlowKind, FlowOutcome},
};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"marketplace_http_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a classified authentication failure via the global metrics recorder (when enabled).
pub fn record_auth_failure(class: FailureClass) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("marketplace_http_auth_failure_total", "class" => class.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = class;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_metrics() {
		record_flow_outcome(FlowKind::Login, FlowOutcome::Failure);
		record_auth_failure(FailureClass::RefreshRejected);
	}
}
