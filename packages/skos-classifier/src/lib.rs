pub mod cache;
pub mod candidate;
pub mod classify;
pub mod pipeline;
pub mod state;
pub mod telemetry;
pub mod time_serde;

mod error;

pub use candidate::{Candidate, Scores, Signal};
pub use classify::{Classification, ClassifyRequest, ClassifyResponse, ScoredCandidate};
pub use error::{Error, Result};
pub use skos_providers::embedding::EmbeddingMode;
pub use skos_storage::models::{ConceptPayload, ScoredConcept, SearchFilter};
pub use state::{ClassifierState, Stage};
pub use telemetry::{Outcome, TelemetryRecord, TracingSink};

use std::{future::Future, pin::Pin, sync::Arc};

use tokio::sync::Semaphore;

use cache::EmbeddingCache;
use skos_config::{Config, EmbeddingProviderConfig, ProviderConfig};
use skos_providers::{embedding, rerank};
use skos_storage::qdrant::QdrantStore;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
		mode: EmbeddingMode,
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>>;
}

pub trait VectorStore
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		index: &'a str,
		vector: Vec<f32>,
		filter: &'a SearchFilter,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ScoredConcept>>>;
}

pub trait CrossEncoderProvider
where
	Self: Send + Sync,
{
	fn score<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>>;
}

pub trait TelemetrySink
where
	Self: Send + Sync,
{
	fn record<'a>(&'a self, record: TelemetryRecord) -> BoxFuture<'a, color_eyre::Result<()>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub store: Arc<dyn VectorStore>,
	pub cross_encoder: Arc<dyn CrossEncoderProvider>,
	pub telemetry: Arc<dyn TelemetrySink>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		store: Arc<dyn VectorStore>,
		cross_encoder: Arc<dyn CrossEncoderProvider>,
		telemetry: Arc<dyn TelemetrySink>,
	) -> Self {
		Self { embedding, store, cross_encoder, telemetry }
	}

	/// HTTP embedding and rerank clients, Qdrant search, and the tracing telemetry sink.
	pub fn from_config(cfg: &Config) -> Result<Self> {
		let store = QdrantStore::new(&cfg.storage.qdrant)
			.map_err(|err| Error::Internal { message: err.to_string() })?;
		let provider = Arc::new(DefaultProviders);

		Ok(Self {
			embedding: provider.clone(),
			store: Arc::new(store),
			cross_encoder: provider,
			telemetry: Arc::new(TracingSink),
		})
	}
}

/// Feature switches, read once when the classifier is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureFlags {
	pub cross_encoder: bool,
	pub lexical_boost: bool,
	pub graph_reasoning: bool,
	pub calibration: bool,
}
impl FeatureFlags {
	pub fn from_config(cfg: &Config) -> Self {
		Self {
			cross_encoder: cfg.features.cross_encoder_enabled,
			lexical_boost: cfg.features.lexical_boost_enabled,
			graph_reasoning: cfg.features.graph_reasoning_enabled,
			calibration: cfg.features.calibration_enabled,
		}
	}
}

pub struct SkosClassifier {
	pub cfg: Arc<Config>,
	pub providers: Providers,
	pub flags: FeatureFlags,
	pub cache: Option<EmbeddingCache>,
	permits: Arc<Semaphore>,
}
impl SkosClassifier {
	pub fn new(cfg: Config) -> Result<Self> {
		let providers = Providers::from_config(&cfg)?;

		Ok(Self::with_providers(cfg, providers))
	}

	pub fn with_providers(cfg: Config, providers: Providers) -> Self {
		let flags = FeatureFlags::from_config(&cfg);
		let cache = cfg.embedding.use_cache.then(|| EmbeddingCache::from_config(&cfg.embedding));
		let permits =
			Arc::new(Semaphore::new(cfg.performance.max_concurrent_requests.max(1) as usize));

		Self { cfg: Arc::new(cfg), providers, flags, cache, permits }
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
		mode: EmbeddingMode,
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(async move {
			let texts = [text.to_string()];
			let mut vectors = embedding::embed(cfg, &texts, mode).await?;

			vectors
				.pop()
				.ok_or_else(|| color_eyre::eyre::eyre!("Embedding provider returned no vectors."))
		})
	}
}
impl CrossEncoderProvider for DefaultProviders {
	fn score<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(rerank::score(cfg, query, docs))
	}
}

impl VectorStore for QdrantStore {
	fn search<'a>(
		&'a self,
		index: &'a str,
		vector: Vec<f32>,
		filter: &'a SearchFilter,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ScoredConcept>>> {
		Box::pin(async move {
			let hits = QdrantStore::search(self, index, vector, filter, limit).await?;

			Ok(hits)
		})
	}
}
