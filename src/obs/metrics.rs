// self
use crate::obs::{FlowKind, FlowOutcome};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"hanazoom_client_flow_total",
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

/// Records an authentication rejection (401/403) observed on an API path.
pub fn record_auth_rejection(status: u16, retried: bool) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"hanazoom_client_auth_rejection_total",
			"status" => status_label(status),
			"retried" => if retried { "true" } else { "false" }
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (status, retried);
	}
}

#[cfg_attr(not(feature = "metrics"), allow(dead_code))]
fn status_label(status: u16) -> &'static str {
	match status {
		401 => "401",
		403 => "403",
		_ => "other",
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_are_noops_without_metrics() {
		record_flow_outcome(FlowKind::Refresh, FlowOutcome::Queued);
		record_auth_rejection(401, false);
	}

	#[test]
	fn status_labels_are_bounded() {
		assert_eq!(status_label(401), "401");
		assert_eq!(status_label(403), "403");
		assert_eq!(status_label(418), "other");
	}
}
