//! Spans and counters shared by the guard, the signed client, and the paginator.
//!
//! Every operation runs inside a `connect_core.op` span with `op` and `stage` fields. With the
//! `metrics` feature, [`record`] feeds `connect_core_operation_total{op, outcome}` and
//! [`record_rejection`] feeds `connect_core_auth_rejection_total{reason}`.

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

/// Unit of work that is traced and counted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Verification of an inbound request.
	Authenticate,
	/// Outbound request signed for a tenant.
	SignedRequest,
	/// One page request issued by a paginator.
	PageFetch,
}
impl Operation {
	/// Label used for the `op` span field and metric label.
	pub const fn label(self) -> &'static str {
		match self {
			Self::Authenticate => "authenticate",
			Self::SignedRequest => "signed_request",
			Self::PageFetch => "page_fetch",
		}
	}
}

/// Where an [`Operation`] ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Counted on entry, before any work happens.
	Attempt,
	/// Finished with a value.
	Success,
	/// Finished with an error or rejection.
	Failure,
}
impl Outcome {
	/// Maps a finished operation's result onto `Success` or `Failure`.
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		if result.is_ok() { Self::Success } else { Self::Failure }
	}

	/// Label used for the `outcome` metric label.
	pub const fn label(self) -> &'static str {
		match self {
			Self::Attempt => "attempt",
			Self::Success => "success",
			Self::Failure => "failure",
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn outcome_follows_result() {
		assert_eq!(Outcome::of(&Ok::<_, ()>(1)), Outcome::Success);
		assert_eq!(Outcome::of(&Err::<(), _>("rejected")), Outcome::Failure);
		assert_eq!(Operation::PageFetch.label(), "page_fetch");
	}
}
