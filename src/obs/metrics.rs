// std
use std::time::{Duration, Instant};
// self
use crate::obs::{OpKind, OpOutcome};

/// Increments `marketplace_client_op_total{op, outcome}` (when enabled).
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"marketplace_client_op_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records how long a settled operation took in
/// `marketplace_client_op_duration_seconds{op, outcome}` (when enabled).
pub fn record_op_duration(kind: OpKind, outcome: OpOutcome, elapsed: Duration) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!(
			"marketplace_client_op_duration_seconds",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.record(elapsed.as_secs_f64());
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome, elapsed);
	}
}

/// One in-flight operation: the attempt is counted on [`OpRecord::start`], the outcome and
/// duration on [`OpRecord::finish`].
#[derive(Debug)]
pub struct OpRecord {
	kind: OpKind,
	started: Instant,
}
impl OpRecord {
	/// Counts an attempt of `kind` and starts timing it.
	pub fn start(kind: OpKind) -> Self {
		record_op_outcome(kind, OpOutcome::Attempt);

		Self { kind, started: Instant::now() }
	}

	/// Counts the outcome of `result` together with the elapsed time.
	pub fn finish<T, E>(self, result: &Result<T, E>) -> OpOutcome {
		let outcome = OpOutcome::of(result);

		record_op_outcome(self.kind, outcome);
		record_op_duration(self.kind, outcome, self.started.elapsed());

		outcome
	}
}
