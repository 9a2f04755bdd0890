use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use skos_config::EmbeddingProviderConfig;

/// The four views a query is embedded under; each one is searched against the concept index of
/// the same name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingMode {
	Lexical,
	Description,
	Path,
	Composite,
}
impl EmbeddingMode {
	pub const ALL: [Self; 4] = [Self::Lexical, Self::Description, Self::Path, Self::Composite];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Lexical => "lexical",
			Self::Description => "description",
			Self::Path => "path",
			Self::Composite => "composite",
		}
	}

	pub fn prefix(self, cfg: &EmbeddingProviderConfig) -> &str {
		match self {
			Self::Lexical => cfg.prefixes.lexical.as_str(),
			Self::Description => cfg.prefixes.description.as_str(),
			Self::Path => cfg.prefixes.path.as_str(),
			Self::Composite => cfg.prefixes.composite.as_str(),
		}
	}
}

pub async fn embed(
	cfg: &EmbeddingProviderConfig,
	texts: &[String],
	mode: EmbeddingMode,
) -> Result<Vec<Vec<f32>>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let prefix = mode.prefix(cfg);
	let input: Vec<String> = texts.iter().map(|text| format!("{prefix}{text}")).collect();
	let body = serde_json::json!({
		"model": cfg.model,
		"input": input,
		"dimensions": cfg.dimensions,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_embedding_response(json)
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json
		.get("data")
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Embedding response is missing data array."))?;
	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding = item
			.get("embedding")
			.and_then(|v| v.as_array())
			.ok_or_else(|| eyre::eyre!("Embedding item missing embedding array."))?;
		let mut vec = Vec::with_capacity(embedding.len());

		for value in embedding {
			let number =
				value.as_f64().ok_or_else(|| eyre::eyre!("Embedding value must be numeric."))?;

			vec.push(number as f32);
		}

		indexed.push((index, vec));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}
