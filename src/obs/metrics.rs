// self
use crate::obs::{Operation, Outcome};

/// Bumps `connect_core_operation_total` for `op` and `outcome`. No-op without `metrics`.
pub fn record(op: Operation, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"connect_core_operation_total",
		"op" => op.label(),
		"outcome" => outcome.label()
	)
	.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (op, outcome);
}

/// Bumps `connect_core_auth_rejection_total`, labeled by the rejection reason.
pub fn record_rejection(reason: &'static str) {
	#[cfg(feature = "metrics")]
	metrics::counter!("connect_core_auth_rejection_total", "reason" => reason).increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = reason;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn counters_tolerate_missing_recorder() {
		record(Operation::SignedRequest, Outcome::Failure);
		record_rejection("signature_mismatch");
	}
}
