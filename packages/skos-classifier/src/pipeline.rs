pub mod decide;
pub mod embed;
pub mod graph;
pub mod ingest;
pub mod lexical;
pub mod merge;
pub mod persist;
pub mod rerank;
pub mod retrieval;
pub mod validate;

use std::time::{Duration, Instant};

use time::OffsetDateTime;
use tokio::time as tokio_time;

use skos_config::Retrieval;
use skos_domain::text;

use crate::{
	Error, FeatureFlags, Result, SkosClassifier,
	state::{ClassifierState, Stage},
	telemetry::{Outcome, TelemetryRecord},
};

/// Stage name reported when the whole-request budget runs out.
pub const REQUEST_STAGE: &str = "request";

/// Short single-token queries and product codes get an extra pass over the lexical index.
pub fn need_lexical_boost(flags: FeatureFlags, cfg: &Retrieval, normalized_text: &str) -> bool {
	if !flags.lexical_boost {
		return false;
	}

	text::is_single_token(normalized_text)
		|| text::looks_like_code(normalized_text, cfg.code_max_len as usize)
}

pub fn use_cross_encoder(flags: FeatureFlags, candidate_count: usize) -> bool {
	flags.cross_encoder && candidate_count > 1
}

impl SkosClassifier {
	/// Drives one request from N0 through N9. The first stage error aborts the walk; the caller
	/// turns it into the error terminal.
	pub(crate) async fn run_pipeline(&self, state: &mut ClassifierState) -> Result<()> {
		let mut next = Some(Stage::Ingest);

		while let Some(stage) = next {
			let budget =
				Duration::from_millis(stage.timeout_ms(&self.cfg.performance.node_timeout_ms));
			let started = Instant::now();
			let result = match tokio_time::timeout(budget, self.run_stage(stage, state)).await {
				Ok(result) => result,
				Err(_) => Err(Error::StageTimeout { stage: stage.node_key() }),
			};
			let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;

			state.record_timing(stage, elapsed_ms);

			tracing::debug!(
				trace_id = %state.trace_id,
				stage = stage.node_key(),
				elapsed_ms,
				ok = result.is_ok(),
				"Pipeline stage finished."
			);

			result?;

			next = self.next_stage(stage, state);
		}

		Ok(())
	}

	fn next_stage(&self, current: Stage, state: &ClassifierState) -> Option<Stage> {
		let next = match current {
			Stage::Ingest => Stage::QueryVectors,
			Stage::QueryVectors => Stage::Retrieval,
			Stage::Retrieval =>
				if need_lexical_boost(self.flags, &self.cfg.retrieval, &state.normalized_text) {
					Stage::LexicalBoost
				} else {
					Stage::Merge
				},
			Stage::LexicalBoost => Stage::Merge,
			Stage::Merge => Stage::Graph,
			Stage::Graph =>
				if use_cross_encoder(self.flags, state.graph_ranked.len()) {
					Stage::Rerank
				} else {
					Stage::Decide
				},
			Stage::Rerank => Stage::Decide,
			Stage::Decide => Stage::Validate,
			Stage::Validate => Stage::Persist,
			Stage::Persist => return None,
		};

		Some(next)
	}

	async fn run_stage(&self, stage: Stage, state: &mut ClassifierState) -> Result<()> {
		let cfg = self.cfg.as_ref();

		match stage {
			Stage::Ingest => ingest::run(cfg, state),
			Stage::QueryVectors => {
				let provider = self.providers.embedding.as_ref();

				embed::run(cfg, provider, self.cache.as_ref(), state).await
			},
			Stage::Retrieval => retrieval::run(cfg, self.providers.store.as_ref(), state).await,
			Stage::LexicalBoost => lexical::run(cfg, self.providers.store.as_ref(), state).await,
			Stage::Merge => {
				merge::run(&cfg.retrieval, state);

				Ok(())
			},
			Stage::Graph => {
				graph::run(&cfg.retrieval, self.flags.graph_reasoning, state);

				Ok(())
			},
			Stage::Rerank => rerank::run(cfg, self.providers.cross_encoder.as_ref(), state).await,
			Stage::Decide => {
				decide::run(cfg, self.flags.calibration, state);

				Ok(())
			},
			Stage::Validate => {
				validate::run(&cfg.thresholds, state);

				Ok(())
			},
			Stage::Persist => {
				persist::run(state);

				Ok(())
			},
		}
	}

	/// Error terminal: clears the decision and records a stage-qualified reason.
	pub(crate) fn fail(&self, state: &mut ClassifierState, err: &Error) {
		let reason = err.reason();

		state.classification = None;
		state.validated = false;
		state.confidence = 0.0;
		state.top_k.clear();
		state.abstain_reason = Some(reason.clone());
		state.explain(format!("error: {err}"));
		state.outcome = Some(Outcome::from_state(state));

		tracing::warn!(trace_id = %state.trace_id, reason = %reason, "Classification aborted.");
	}

	/// Closes the timing map and hands the outcome to the telemetry sink on a detached task.
	pub(crate) fn finish(&self, state: &mut ClassifierState) {
		state.close_timings();

		if !self.cfg.observability.telemetry_enabled {
			return;
		}

		let record = TelemetryRecord {
			trace_id: state.trace_id,
			recorded_at: OffsetDateTime::now_utc(),
			metrics: state.timings.clone(),
			outcome: state.outcome.clone().unwrap_or_else(|| Outcome::from_state(state)),
		};
		let sink = self.providers.telemetry.clone();

		tokio::spawn(async move {
			let trace_id = record.trace_id;

			if let Err(err) = sink.record(record).await {
				tracing::error!(trace_id = %trace_id, error = %err, "Telemetry sink failed.");
			}
		});
	}
}
