use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub retrieval: Retrieval,
	pub thresholds: Thresholds,
	pub features: Features,
	pub performance: Performance,
	pub embedding: Embedding,
	pub taxonomy: Taxonomy,
	pub observability: Observability,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Service {
	pub log_level: String,
}
impl Default for Service {
	fn default() -> Self {
		Self { log_level: "info".to_string() }
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}
impl Default for Qdrant {
	fn default() -> Self {
		Self {
			url: "http://localhost:6334".to_string(),
			collection: "concepts".to_string(),
			vector_dim: 768,
		}
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub rerank: ProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
	/// Instruction prefixes prepended to the input text, one per embedding mode.
	pub prefixes: EmbeddingPrefixes,
}
impl Default for EmbeddingProviderConfig {
	fn default() -> Self {
		Self {
			provider_id: "local".to_string(),
			api_base: "http://localhost:8000".to_string(),
			api_key: String::new(),
			path: "/v1/embeddings".to_string(),
			model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
			dimensions: 768,
			timeout_ms: 2_000,
			default_headers: Map::new(),
			prefixes: EmbeddingPrefixes::default(),
		}
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddingPrefixes {
	pub lexical: String,
	pub description: String,
	pub path: String,
	pub composite: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}
impl Default for ProviderConfig {
	fn default() -> Self {
		Self {
			provider_id: "local".to_string(),
			api_base: "http://localhost:8000".to_string(),
			api_key: String::new(),
			path: "/v1/rerank".to_string(),
			model: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
			timeout_ms: 5_000,
			default_headers: Map::new(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub retrieval_limit: u32,
	pub top_k_output: u32,
	pub top_m_rerank: u32,
	pub weight_comp: f32,
	pub weight_lex: f32,
	pub weight_path: f32,
	pub weight_graph: f32,
	/// Code-like queries (SKU, EAN) shorter than this many characters trigger the lexical boost.
	pub code_max_len: u32,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self {
			retrieval_limit: 50,
			top_k_output: 5,
			top_m_rerank: 20,
			weight_comp: 1.0,
			weight_lex: 0.3,
			weight_path: 0.2,
			weight_graph: 0.02,
			code_max_len: 24,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Thresholds {
	pub tau_low: f32,
	pub epsilon_tie: f32,
	pub abstain_on_low_confidence: bool,
	pub abstain_on_language_mismatch: bool,
	pub prefer_broader_on_tie: bool,
	pub calibration_slope: f32,
	pub calibration_intercept: f32,
}
impl Default for Thresholds {
	fn default() -> Self {
		Self {
			tau_low: 0.55,
			epsilon_tie: 0.03,
			abstain_on_low_confidence: true,
			abstain_on_language_mismatch: false,
			prefer_broader_on_tie: true,
			calibration_slope: 10.0,
			calibration_intercept: -5.0,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Features {
	pub cross_encoder_enabled: bool,
	pub lexical_boost_enabled: bool,
	pub graph_reasoning_enabled: bool,
	pub calibration_enabled: bool,
}
impl Default for Features {
	fn default() -> Self {
		Self {
			cross_encoder_enabled: false,
			lexical_boost_enabled: true,
			graph_reasoning_enabled: true,
			calibration_enabled: false,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Performance {
	pub max_concurrent_requests: u32,
	pub request_timeout_ms: u64,
	pub node_timeout_ms: NodeTimeouts,
}
impl Default for Performance {
	fn default() -> Self {
		Self {
			max_concurrent_requests: 100,
			request_timeout_ms: 30_000,
			node_timeout_ms: NodeTimeouts::default(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct NodeTimeouts {
	pub n0_ingest: u64,
	pub n1_queryvecs: u64,
	pub n2_retrieval: u64,
	pub n3_lexboost: u64,
	pub n4_merge: u64,
	pub n5_graph: u64,
	pub n6_rerank: u64,
	pub n7_decide: u64,
	pub n8_validate: u64,
	pub n9_persist: u64,
}
impl NodeTimeouts {
	pub fn entries(&self) -> [(&'static str, u64); 10] {
		[
			("n0_ingest", self.n0_ingest),
			("n1_queryvecs", self.n1_queryvecs),
			("n2_retrieval", self.n2_retrieval),
			("n3_lexboost", self.n3_lexboost),
			("n4_merge", self.n4_merge),
			("n5_graph", self.n5_graph),
			("n6_rerank", self.n6_rerank),
			("n7_decide", self.n7_decide),
			("n8_validate", self.n8_validate),
			("n9_persist", self.n9_persist),
		]
	}
}
impl Default for NodeTimeouts {
	fn default() -> Self {
		Self {
			n0_ingest: 1_000,
			n1_queryvecs: 2_000,
			n2_retrieval: 3_000,
			n3_lexboost: 2_000,
			n4_merge: 1_000,
			n5_graph: 2_000,
			// Cross-encoder scoring is the slowest collaborator call.
			n6_rerank: 5_000,
			n7_decide: 1_000,
			n8_validate: 500,
			n9_persist: 1_000,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Embedding {
	pub embedding_dim: u32,
	pub use_cache: bool,
	pub cache_size: u64,
	/// Seconds.
	pub cache_ttl: u64,
}
impl Default for Embedding {
	fn default() -> Self {
		Self { embedding_dim: 768, use_cache: true, cache_size: 10_000, cache_ttl: 3_600 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Taxonomy {
	pub default_scheme_uri: String,
	pub supported_languages: Vec<String>,
	pub default_language: String,
}
impl Default for Taxonomy {
	fn default() -> Self {
		Self {
			default_scheme_uri: "https://example.org/taxonomy/".to_string(),
			supported_languages: vec![
				"es".to_string(),
				"en".to_string(),
				"pt".to_string(),
				"fr".to_string(),
			],
			default_language: "es".to_string(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Observability {
	pub telemetry_enabled: bool,
}
impl Default for Observability {
	fn default() -> Self {
		Self { telemetry_enabled: true }
	}
}
