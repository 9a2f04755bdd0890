use std::{collections::BTreeMap, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::{
	Error, SkosClassifier,
	candidate::{Candidate, Scores},
	pipeline::REQUEST_STAGE,
	state::{ClassifierState, TOTAL_MS_KEY},
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClassifyRequest {
	pub text: String,
	#[serde(default)]
	pub scheme_uri: String,
	pub lang: Option<String>,
	pub hint_type: Option<String>,
	pub ancestor_filter: Option<String>,
}
impl ClassifyRequest {
	pub fn new(text: impl Into<String>, scheme_uri: impl Into<String>) -> Self {
		Self { text: text.into(), scheme_uri: scheme_uri.into(), ..Default::default() }
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
	pub uri: String,
	pub pref_label: String,
	pub breadcrumb: Vec<String>,
	pub scheme: String,
	pub lang: String,
	pub notation: String,
}
impl From<&Candidate> for Classification {
	fn from(candidate: &Candidate) -> Self {
		Self {
			uri: candidate.uri.clone(),
			pref_label: candidate.pref_label.clone(),
			breadcrumb: candidate.breadcrumb.clone(),
			scheme: candidate.scheme.clone(),
			lang: candidate.lang.clone(),
			notation: candidate.notation().to_string(),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
	pub uri: String,
	pub pref_label: String,
	pub breadcrumb: Vec<String>,
	pub score: f32,
	pub scores: Scores,
	pub explanation: Vec<String>,
}
impl From<&Candidate> for ScoredCandidate {
	fn from(candidate: &Candidate) -> Self {
		Self {
			uri: candidate.uri.clone(),
			pref_label: candidate.pref_label.clone(),
			breadcrumb: candidate.breadcrumb.clone(),
			score: candidate.scores.final_score(),
			scores: candidate.scores,
			explanation: candidate.explanation.clone(),
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassifyResponse {
	pub trace_id: Uuid,
	pub classification: Option<Classification>,
	pub confidence: f32,
	pub validated: bool,
	pub abstain_reason: Option<String>,
	pub top_k: Vec<ScoredCandidate>,
	pub metrics: BTreeMap<String, f64>,
	pub explanation: Vec<String>,
	pub detected_lang: Option<String>,
}
impl ClassifyResponse {
	fn from_state(state: ClassifierState) -> Self {
		Self {
			trace_id: state.trace_id,
			classification: state.classification.as_ref().map(Classification::from),
			confidence: state.confidence,
			validated: state.validated,
			abstain_reason: state.abstain_reason,
			top_k: state.top_k.iter().map(ScoredCandidate::from).collect(),
			metrics: state.timings,
			explanation: state.explanation,
			detected_lang: state.lang,
		}
	}

	fn internal_error(trace_id: Uuid, message: &str) -> Self {
		let err = Error::Internal { message: message.to_string() };

		Self {
			trace_id,
			classification: None,
			confidence: 0.0,
			validated: false,
			abstain_reason: Some(err.reason()),
			top_k: Vec::new(),
			metrics: BTreeMap::from([(TOTAL_MS_KEY.to_string(), 0.0)]),
			explanation: vec![format!("error: {err}")],
			detected_lang: None,
		}
	}
}

impl SkosClassifier {
	/// Classifies one text. Failures never escape: they come back as an abstention whose reason
	/// names the failing stage.
	pub async fn classify(&self, request: ClassifyRequest) -> ClassifyResponse {
		self.classify_traced(request, Uuid::new_v4()).await
	}

	async fn classify_traced(&self, request: ClassifyRequest, trace_id: Uuid) -> ClassifyResponse {
		let mut state = ClassifierState::with_trace_id(request, trace_id);
		let budget = Duration::from_millis(self.cfg.performance.request_timeout_ms);
		let result = match self.permits.acquire().await {
			Ok(_permit) => {
				let run = tokio::time::timeout(budget, self.run_pipeline(&mut state));

				match run.await {
					Ok(result) => result,
					Err(_) => Err(Error::StageTimeout { stage: REQUEST_STAGE }),
				}
			},
			Err(err) => Err(Error::Internal { message: err.to_string() }),
		};

		if let Err(err) = result {
			self.fail(&mut state, &err);
		}

		self.finish(&mut state);

		ClassifyResponse::from_state(state)
	}

	/// Classifies every request concurrently under the shared concurrency bound. Responses keep
	/// the input order, and a task that dies still answers with the trace id minted for it.
	pub async fn classify_batch(
		self: &Arc<Self>,
		requests: Vec<ClassifyRequest>,
	) -> Vec<ClassifyResponse> {
		let trace_ids: Vec<Uuid> = requests.iter().map(|_| Uuid::new_v4()).collect();
		let mut tasks = JoinSet::new();
		let mut slots: Vec<Option<ClassifyResponse>> = vec![None; requests.len()];

		for (index, request) in requests.into_iter().enumerate() {
			let classifier = Arc::clone(self);
			let trace_id = trace_ids[index];

			tasks.spawn(async move {
				(index, classifier.classify_traced(request, trace_id).await)
			});
		}

		while let Some(joined) = tasks.join_next().await {
			match joined {
				Ok((index, response)) => slots[index] = Some(response),
				Err(err) => tracing::error!(error = %err, "Classification task failed."),
			}
		}

		slots
			.into_iter()
			.zip(trace_ids)
			.map(|(slot, trace_id)| {
				slot.unwrap_or_else(|| {
					tracing::error!(trace_id = %trace_id, "Batch slot lost its classification.");

					ClassifyResponse::internal_error(trace_id, "task failed")
				})
			})
			.collect()
	}
}
