//! Deterministic collaborators for exercising the classifier without network services.

use std::{
	collections::HashMap,
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use color_eyre::eyre;
use tokio::time;

use skos_classifier::{
	BoxFuture, CrossEncoderProvider, EmbeddingMode, EmbeddingProvider, TelemetryRecord,
	TelemetrySink, VectorStore,
};
use skos_config::{Config, EmbeddingProviderConfig, ProviderConfig};
use skos_storage::models::{ConceptPayload, ScoredConcept, SearchFilter};

pub const SCHEME_URI: &str = "https://example.org/taxonomy/";
pub const TEST_VECTOR_DIM: u32 = 8;

/// Default configuration shrunk to small vectors so stubs stay cheap.
pub fn test_config() -> Config {
	let mut cfg = Config::default();

	cfg.embedding.embedding_dim = TEST_VECTOR_DIM;
	cfg.storage.qdrant.vector_dim = TEST_VECTOR_DIM;
	cfg.providers.embedding.dimensions = TEST_VECTOR_DIM;
	cfg.taxonomy.default_scheme_uri = SCHEME_URI.to_string();

	cfg
}

pub fn concept_uri(slug: &str) -> String {
	format!("{SCHEME_URI}{slug}")
}

/// Spanish concept in the test scheme. `ancestors` and `broader` are slugs.
pub fn concept(slug: &str, breadcrumb: &[&str], ancestors: &[&str]) -> ConceptPayload {
	ConceptPayload {
		uri: concept_uri(slug),
		scheme: SCHEME_URI.to_string(),
		lang: "es".to_string(),
		pref_label: breadcrumb.last().map(|label| label.to_string()).unwrap_or_default(),
		breadcrumb: breadcrumb.iter().map(|label| label.to_string()).collect(),
		ancestors: ancestors.iter().map(|slug| concept_uri(slug)).collect(),
		broader: ancestors.last().map(|slug| concept_uri(slug)),
		related: Vec::new(),
	}
}

/// Returns the same vector for every text, counting provider calls.
pub struct FixedEmbedding {
	pub vector_dim: u32,
	pub calls: Arc<AtomicUsize>,
}
impl FixedEmbedding {
	pub fn new(vector_dim: u32) -> Self {
		Self { vector_dim, calls: Arc::new(AtomicUsize::new(0)) }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl EmbeddingProvider for FixedEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		_text: &'a str,
		_mode: EmbeddingMode,
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let vector = vec![0.1; self.vector_dim as usize];

		Box::pin(async move { Ok(vector) })
	}
}

/// Serves scripted hits per named index, honouring the search filter and limit.
#[derive(Default)]
pub struct InMemoryVectorStore {
	hits: HashMap<String, Vec<ScoredConcept>>,
	searches: Mutex<Vec<String>>,
}
impl InMemoryVectorStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_hit(mut self, index: &str, payload: ConceptPayload, score: f32) -> Self {
		self.hits.entry(index.to_string()).or_default().push(ScoredConcept { payload, score });

		self
	}

	/// Index names searched so far, in call order.
	pub fn searches(&self) -> Vec<String> {
		self.searches.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
impl VectorStore for InMemoryVectorStore {
	fn search<'a>(
		&'a self,
		index: &'a str,
		_vector: Vec<f32>,
		filter: &'a SearchFilter,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ScoredConcept>>> {
		self.searches.lock().unwrap_or_else(|err| err.into_inner()).push(index.to_string());

		let mut hits: Vec<ScoredConcept> = self
			.hits
			.get(index)
			.map(|hits| hits.iter().filter(|hit| filter.accepts(&hit.payload)).cloned().collect())
			.unwrap_or_default();

		hits.sort_by(|a, b| b.score.total_cmp(&a.score));
		hits.truncate(limit as usize);

		Box::pin(async move { Ok(hits) })
	}
}

pub struct FailingVectorStore {
	pub message: String,
}
impl VectorStore for FailingVectorStore {
	fn search<'a>(
		&'a self,
		_index: &'a str,
		_vector: Vec<f32>,
		_filter: &'a SearchFilter,
		_limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ScoredConcept>>> {
		Box::pin(async move { Err(eyre::eyre!("{}", self.message)) })
	}
}

/// Sleeps before answering with no hits.
pub struct SlowVectorStore {
	pub delay: Duration,
}
impl VectorStore for SlowVectorStore {
	fn search<'a>(
		&'a self,
		_index: &'a str,
		_vector: Vec<f32>,
		_filter: &'a SearchFilter,
		_limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ScoredConcept>>> {
		Box::pin(async move {
			time::sleep(self.delay).await;

			Ok(Vec::new())
		})
	}
}

/// Scores documents from a fixed table keyed by candidate text.
#[derive(Default)]
pub struct ScriptedCrossEncoder {
	pub scores: HashMap<String, f32>,
	pub fallback: f32,
}
impl ScriptedCrossEncoder {
	pub fn with_score(mut self, doc: &str, score: f32) -> Self {
		self.scores.insert(doc.to_string(), score);

		self
	}
}
impl CrossEncoderProvider for ScriptedCrossEncoder {
	fn score<'a>(
		&'a self,
		_cfg: &'a ProviderConfig,
		_query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		let scores =
			docs.iter().map(|doc| self.scores.get(doc).copied().unwrap_or(self.fallback)).collect();

		Box::pin(async move { Ok(scores) })
	}
}

#[derive(Clone, Default)]
pub struct RecordingSink {
	pub records: Arc<Mutex<Vec<TelemetryRecord>>>,
}
impl RecordingSink {
	pub fn records(&self) -> Vec<TelemetryRecord> {
		self.records.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	/// Polls until `count` records arrived or about a second passed.
	pub async fn wait_for(&self, count: usize) -> Vec<TelemetryRecord> {
		for _ in 0..100 {
			let records = self.records();

			if records.len() >= count {
				return records;
			}

			time::sleep(Duration::from_millis(10)).await;
		}

		self.records()
	}
}
impl TelemetrySink for RecordingSink {
	fn record<'a>(&'a self, record: TelemetryRecord) -> BoxFuture<'a, color_eyre::Result<()>> {
		self.records.lock().unwrap_or_else(|err| err.into_inner()).push(record);

		Box::pin(async move { Ok(()) })
	}
}

pub struct FailingSink;
impl TelemetrySink for FailingSink {
	fn record<'a>(&'a self, _record: TelemetryRecord) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move { Err(eyre::eyre!("Telemetry backend unavailable.")) })
	}
}
