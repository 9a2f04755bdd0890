use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{BoxFuture, TelemetrySink, state::ClassifierState};

/// Terminal decision of one request as reported to telemetry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
	pub validated: bool,
	pub classification_uri: Option<String>,
	pub confidence: f32,
	pub abstain_reason: Option<String>,
}
impl Outcome {
	pub fn from_state(state: &ClassifierState) -> Self {
		let classification_uri = state.classification.as_ref().map(|c| c.uri.clone());

		Self {
			validated: state.validated,
			classification_uri,
			confidence: state.confidence,
			abstain_reason: state.abstain_reason.clone(),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
	pub trace_id: Uuid,
	#[serde(with = "crate::time_serde")]
	pub recorded_at: OffsetDateTime,
	pub metrics: BTreeMap<String, f64>,
	pub outcome: Outcome,
}

/// Emits every record as a structured `tracing` event.
pub struct TracingSink;
impl TelemetrySink for TracingSink {
	fn record<'a>(&'a self, record: TelemetryRecord) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move {
			let metrics = serde_json::to_string(&record.metrics)?;

			tracing::info!(
				trace_id = %record.trace_id,
				validated = record.outcome.validated,
				classification = record.outcome.classification_uri.as_deref().unwrap_or(""),
				confidence = record.outcome.confidence,
				abstain_reason = record.outcome.abstain_reason.as_deref().unwrap_or(""),
				metrics = %metrics,
				"Classification telemetry."
			);

			Ok(())
		})
	}
}
