use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use skos_config::ProviderConfig;

#[derive(Debug, Deserialize)]
struct RerankResponse {
	#[serde(alias = "data")]
	results: Vec<RerankResult>,
}

#[derive(Debug, Deserialize)]
struct RerankResult {
	index: usize,
	#[serde(alias = "score")]
	relevance_score: f32,
}

/// Scores every `(query, doc)` pair with the cross-encoder service. Scores come back aligned
/// with `docs`; a response that skips, repeats or invents a document index is rejected.
pub async fn score(cfg: &ProviderConfig, query: &str, docs: &[String]) -> Result<Vec<f32>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let body = serde_json::json!({ "model": cfg.model, "query": query, "documents": docs });
	let json: Value = client
		.post(format!("{}{}", cfg.api_base, cfg.path))
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?
		.error_for_status()?
		.json()
		.await?;

	parse_rerank_response(json, docs.len())
}

fn parse_rerank_response(json: Value, doc_count: usize) -> Result<Vec<f32>> {
	let response: RerankResponse = serde_json::from_value(json)
		.map_err(|err| eyre::eyre!("Rerank response is malformed: {err}."))?;
	let mut slots: Vec<Option<f32>> = vec![None; doc_count];

	for RerankResult { index, relevance_score } in response.results {
		let slot = slots.get_mut(index).ok_or_else(|| {
			eyre::eyre!("Rerank result index {index} is out of range for {doc_count} documents.")
		})?;

		if slot.replace(relevance_score).is_some() {
			return Err(eyre::eyre!("Rerank result index {index} appears more than once."));
		}
	}

	slots
		.into_iter()
		.enumerate()
		.map(|(index, slot)| {
			slot.ok_or_else(|| eyre::eyre!("Rerank response has no score for document {index}."))
		})
		.collect()
}
