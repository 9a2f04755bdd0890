use std::collections::BTreeMap;

use uuid::Uuid;

use skos_config::NodeTimeouts;

use crate::{ClassifyRequest, EmbeddingMode, candidate::Candidate, telemetry::Outcome};

pub const TOTAL_MS_KEY: &str = "total_ms";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
	Ingest,
	QueryVectors,
	Retrieval,
	LexicalBoost,
	Merge,
	Graph,
	Rerank,
	Decide,
	Validate,
	Persist,
}
impl Stage {
	pub const ALL: [Self; 10] = [
		Self::Ingest,
		Self::QueryVectors,
		Self::Retrieval,
		Self::LexicalBoost,
		Self::Merge,
		Self::Graph,
		Self::Rerank,
		Self::Decide,
		Self::Validate,
		Self::Persist,
	];

	pub fn node_key(self) -> &'static str {
		match self {
			Self::Ingest => "n0_ingest",
			Self::QueryVectors => "n1_queryvecs",
			Self::Retrieval => "n2_retrieval",
			Self::LexicalBoost => "n3_lexboost",
			Self::Merge => "n4_merge",
			Self::Graph => "n5_graph",
			Self::Rerank => "n6_rerank",
			Self::Decide => "n7_decide",
			Self::Validate => "n8_validate",
			Self::Persist => "n9_persist",
		}
	}

	pub fn metric_key(self) -> &'static str {
		match self {
			Self::Ingest => "n0_ms",
			Self::QueryVectors => "n1_ms",
			Self::Retrieval => "n2_ms",
			Self::LexicalBoost => "n3_ms",
			Self::Merge => "n4_ms",
			Self::Graph => "n5_ms",
			Self::Rerank => "n6_ms",
			Self::Decide => "n7_ms",
			Self::Validate => "n8_ms",
			Self::Persist => "n9_ms",
		}
	}

	pub fn timeout_ms(self, budgets: &NodeTimeouts) -> u64 {
		match self {
			Self::Ingest => budgets.n0_ingest,
			Self::QueryVectors => budgets.n1_queryvecs,
			Self::Retrieval => budgets.n2_retrieval,
			Self::LexicalBoost => budgets.n3_lexboost,
			Self::Merge => budgets.n4_merge,
			Self::Graph => budgets.n5_graph,
			Self::Rerank => budgets.n6_rerank,
			Self::Decide => budgets.n7_decide,
			Self::Validate => budgets.n8_validate,
			Self::Persist => budgets.n9_persist,
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryVectors {
	pub lexical: Vec<f32>,
	pub description: Vec<f32>,
	pub path: Vec<f32>,
	pub composite: Vec<f32>,
}
impl QueryVectors {
	pub fn get(&self, mode: EmbeddingMode) -> &[f32] {
		match mode {
			EmbeddingMode::Lexical => &self.lexical,
			EmbeddingMode::Description => &self.description,
			EmbeddingMode::Path => &self.path,
			EmbeddingMode::Composite => &self.composite,
		}
	}

	pub fn set(&mut self, mode: EmbeddingMode, vector: Vec<f32>) {
		match mode {
			EmbeddingMode::Lexical => self.lexical = vector,
			EmbeddingMode::Description => self.description = vector,
			EmbeddingMode::Path => self.path = vector,
			EmbeddingMode::Composite => self.composite = vector,
		}
	}
}

/// Everything one classification accumulates between entry and response.
#[derive(Clone, Debug)]
pub struct ClassifierState {
	pub trace_id: Uuid,
	pub raw_text: String,
	pub normalized_text: String,
	pub lang_hint: Option<String>,
	/// Language the request is scoped to: the hint when given, otherwise the detected one.
	pub lang: Option<String>,
	pub scheme_uri: String,
	pub hint_type: Option<String>,
	pub ancestor_filter: Option<String>,
	pub query_vectors: QueryVectors,
	pub comp_candidates: Vec<Candidate>,
	pub path_candidates: Vec<Candidate>,
	pub lexical_candidates: Vec<Candidate>,
	pub merged: Vec<Candidate>,
	pub graph_ranked: Vec<Candidate>,
	pub reranked: Option<Vec<Candidate>>,
	pub classification: Option<Candidate>,
	pub confidence: f32,
	pub top_k: Vec<Candidate>,
	pub validated: bool,
	pub abstain_reason: Option<String>,
	pub explanation: Vec<String>,
	pub timings: BTreeMap<String, f64>,
	pub outcome: Option<Outcome>,
}
impl ClassifierState {
	pub fn new(request: ClassifyRequest) -> Self {
		Self::with_trace_id(request, Uuid::new_v4())
	}

	pub fn with_trace_id(request: ClassifyRequest, trace_id: Uuid) -> Self {
		let ClassifyRequest { text, scheme_uri, lang, hint_type, ancestor_filter } = request;

		Self {
			trace_id,
			raw_text: text,
			normalized_text: String::new(),
			lang_hint: lang,
			lang: None,
			scheme_uri,
			hint_type,
			ancestor_filter,
			query_vectors: QueryVectors::default(),
			comp_candidates: Vec::new(),
			path_candidates: Vec::new(),
			lexical_candidates: Vec::new(),
			merged: Vec::new(),
			graph_ranked: Vec::new(),
			reranked: None,
			classification: None,
			confidence: 0.0,
			top_k: Vec::new(),
			validated: false,
			abstain_reason: None,
			explanation: Vec::new(),
			timings: BTreeMap::new(),
			outcome: None,
		}
	}

	pub fn record_timing(&mut self, stage: Stage, elapsed_ms: f64) {
		self.timings.insert(stage.metric_key().to_string(), elapsed_ms);
	}

	/// Sums every recorded stage duration into `total_ms`.
	pub fn close_timings(&mut self) -> f64 {
		let total = self
			.timings
			.iter()
			.filter(|(key, _)| key.as_str() != TOTAL_MS_KEY)
			.map(|(_, elapsed)| *elapsed)
			.sum();

		self.timings.insert(TOTAL_MS_KEY.to_string(), total);

		total
	}

	pub fn explain(&mut self, line: impl Into<String>) {
		self.explanation.push(line.into());
	}
}
