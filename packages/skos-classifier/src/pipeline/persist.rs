use crate::{state::ClassifierState, telemetry::Outcome};

/// Snapshots the terminal decision for the response and telemetry.
pub fn run(state: &mut ClassifierState) {
	let outcome = Outcome::from_state(state);

	tracing::info!(
		trace_id = %state.trace_id,
		validated = outcome.validated,
		classification = outcome.classification_uri.as_deref().unwrap_or(""),
		confidence = outcome.confidence,
		abstain_reason = outcome.abstain_reason.as_deref().unwrap_or(""),
		"Classification finished."
	);

	state.outcome = Some(outcome);
}
