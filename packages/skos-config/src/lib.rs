mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Embedding, EmbeddingPrefixes, EmbeddingProviderConfig, Features, NodeTimeouts,
	Observability, Performance, ProviderConfig, Providers, Qdrant, Retrieval, Service, Storage,
	Taxonomy, Thresholds,
};

use std::{env, fs, path::Path};

pub const ENV_QDRANT_URL: &str = "SKOS_QDRANT_URL";
pub const ENV_CROSS_ENCODER_ENABLED: &str = "SKOS_CROSS_ENCODER_ENABLED";
pub const ENV_LOG_LEVEL: &str = "SKOS_LOG_LEVEL";

pub fn load(path: &Path) -> Result<Config> {
	let mut cfg = read(path)?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

/// Same as [`load`], with `SKOS_*` environment overrides applied before validation.
pub fn load_with_env(path: &Path) -> Result<Config> {
	let mut cfg = read(path)?;

	apply_env_overrides(&mut cfg, |key| env::var(key).ok());
	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn apply_env_overrides<F>(cfg: &mut Config, lookup: F)
where
	F: Fn(&str) -> Option<String>,
{
	if let Some(url) = lookup(ENV_QDRANT_URL) {
		cfg.storage.qdrant.url = url;
	}
	if let Some(raw) = lookup(ENV_CROSS_ENCODER_ENABLED) {
		cfg.features.cross_encoder_enabled = raw.trim().eq_ignore_ascii_case("true");
	}
	if let Some(level) = lookup(ENV_LOG_LEVEL) {
		cfg.service.log_level = level;
	}
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.qdrant.url.is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.url must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection.is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.embedding.embedding_dim == 0 {
		return Err(Error::Validation {
			message: "embedding.embedding_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.embedding.embedding_dim != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "embedding.embedding_dim must match storage.qdrant.vector_dim.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.embedding.embedding_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match embedding.embedding_dim."
				.to_string(),
		});
	}
	if cfg.embedding.use_cache {
		if cfg.embedding.cache_size == 0 {
			return Err(Error::Validation {
				message: "embedding.cache_size must be greater than zero when use_cache is true."
					.to_string(),
			});
		}
		if cfg.embedding.cache_ttl == 0 {
			return Err(Error::Validation {
				message: "embedding.cache_ttl must be greater than zero when use_cache is true."
					.to_string(),
			});
		}
	}

	for (label, value) in [
		("retrieval.retrieval_limit", cfg.retrieval.retrieval_limit),
		("retrieval.top_k_output", cfg.retrieval.top_k_output),
		("retrieval.top_m_rerank", cfg.retrieval.top_m_rerank),
		("retrieval.code_max_len", cfg.retrieval.code_max_len),
		("performance.max_concurrent_requests", cfg.performance.max_concurrent_requests),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	for (label, weight) in [
		("retrieval.weight_comp", cfg.retrieval.weight_comp),
		("retrieval.weight_lex", cfg.retrieval.weight_lex),
		("retrieval.weight_path", cfg.retrieval.weight_path),
		("retrieval.weight_graph", cfg.retrieval.weight_graph),
	] {
		if !weight.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if weight < 0.0 {
			return Err(Error::Validation { message: format!("{label} must be zero or greater.") });
		}
	}

	for (label, value) in [
		("thresholds.tau_low", cfg.thresholds.tau_low),
		("thresholds.epsilon_tie", cfg.thresholds.epsilon_tie),
	] {
		if !value.is_finite() || !(0.0..=1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if cfg.features.calibration_enabled {
		if !cfg.thresholds.calibration_slope.is_finite() || cfg.thresholds.calibration_slope <= 0.0
		{
			return Err(Error::Validation {
				message: "thresholds.calibration_slope must be a finite number greater than zero."
					.to_string(),
			});
		}
		if !cfg.thresholds.calibration_intercept.is_finite() {
			return Err(Error::Validation {
				message: "thresholds.calibration_intercept must be a finite number.".to_string(),
			});
		}
	}
	if cfg.performance.request_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "performance.request_timeout_ms must be greater than zero.".to_string(),
		});
	}

	for (stage, budget) in cfg.performance.node_timeout_ms.entries() {
		if budget == 0 {
			return Err(Error::Validation {
				message: format!("performance.node_timeout_ms.{stage} must be greater than zero."),
			});
		}
	}

	if cfg.taxonomy.supported_languages.is_empty() {
		return Err(Error::Validation {
			message: "taxonomy.supported_languages must be non-empty.".to_string(),
		});
	}
	if !cfg.taxonomy.supported_languages.iter().any(|lang| lang == &cfg.taxonomy.default_language)
	{
		return Err(Error::Validation {
			message: "taxonomy.default_language must be one of taxonomy.supported_languages."
				.to_string(),
		});
	}
	if cfg.taxonomy.default_scheme_uri.is_empty() {
		return Err(Error::Validation {
			message: "taxonomy.default_scheme_uri must be non-empty.".to_string(),
		});
	}

	for (label, api_base) in [
		("embedding", &cfg.providers.embedding.api_base),
		("rerank", &cfg.providers.rerank.api_base),
	] {
		if api_base.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_base must be non-empty."),
			});
		}
	}

	Ok(())
}

fn read(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	toml::from_str(&raw).map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })
}

fn normalize(cfg: &mut Config) {
	cfg.service.log_level = cfg.service.log_level.trim().to_string();
	cfg.storage.qdrant.url = cfg.storage.qdrant.url.trim().to_string();
	cfg.storage.qdrant.collection = cfg.storage.qdrant.collection.trim().to_string();
	cfg.taxonomy.default_scheme_uri = cfg.taxonomy.default_scheme_uri.trim().to_string();
	cfg.taxonomy.default_language = cfg.taxonomy.default_language.trim().to_lowercase();

	let mut languages: Vec<String> = Vec::with_capacity(cfg.taxonomy.supported_languages.len());

	for lang in &cfg.taxonomy.supported_languages {
		let lang = lang.trim().to_lowercase();

		if !lang.is_empty() && !languages.contains(&lang) {
			languages.push(lang);
		}
	}

	cfg.taxonomy.supported_languages = languages;

	if cfg.service.log_level.is_empty() {
		cfg.service.log_level = "info".to_string();
	}
}
