use skos_config::Thresholds;

use crate::state::ClassifierState;

pub const NO_CANDIDATES: &str = "no_candidates";
pub const LOW_CONFIDENCE: &str = "low_confidence";
pub const LANGUAGE_MISMATCH: &str = "language_mismatch";

/// First failing gate, if any. Scores and confidence are left untouched.
pub fn abstain_reason(thresholds: &Thresholds, state: &ClassifierState) -> Option<&'static str> {
	let Some(classification) = state.classification.as_ref() else {
		return Some(NO_CANDIDATES);
	};

	if thresholds.abstain_on_low_confidence && state.confidence < thresholds.tau_low {
		return Some(LOW_CONFIDENCE);
	}
	if thresholds.abstain_on_language_mismatch
		&& let Some(lang) = state.lang.as_deref()
		&& !classification.lang.is_empty()
		&& classification.lang != lang
	{
		return Some(LANGUAGE_MISMATCH);
	}

	None
}

pub fn run(thresholds: &Thresholds, state: &mut ClassifierState) {
	let reason = abstain_reason(thresholds, state);

	state.validated = reason.is_none();
	state.abstain_reason = reason.map(str::to_string);

	match reason {
		Some(reason) => state.explain(format!("validate: abstained ({reason})")),
		None => state.explain("validate: accepted"),
	}
}
