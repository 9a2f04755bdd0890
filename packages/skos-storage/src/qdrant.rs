pub const LEXICAL_VECTOR_NAME: &str = "lexical_vec";
pub const PATH_VECTOR_NAME: &str = "path_vec";
pub const COMPOSITE_VECTOR_NAME: &str = "comp_vec";

use std::collections::HashMap;

use qdrant_client::qdrant::{
	Condition, Filter, Query, QueryPointsBuilder, ScoredPoint, Value, value::Kind,
};

use crate::{
	Error, Result,
	models::{ConceptPayload, ScoredConcept, SearchFilter},
};

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &skos_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Nearest-neighbour search against one named vector of the concept collection.
	pub async fn search(
		&self,
		index: &str,
		vector: Vec<f32>,
		filter: &SearchFilter,
		limit: u32,
	) -> Result<Vec<ScoredConcept>> {
		if vector.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"Query vector for {index} has {} dimensions, expected {}.",
				vector.len(),
				self.vector_dim
			)));
		}

		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector))
			.using(index)
			.filter(build_filter(filter))
			.with_payload(true)
			.limit(limit as u64);
		let response = self.client.query(search).await?;

		Ok(collect_concepts(&response.result, index))
	}
}

pub fn build_filter(filter: &SearchFilter) -> Filter {
	let mut must = vec![Condition::matches("scheme", filter.scheme_uri.clone())];

	if let Some(lang) = filter.lang.as_ref() {
		must.push(Condition::matches("lang", lang.clone()));
	}
	if let Some(ancestor) = filter.ancestor_uri.as_ref() {
		must.push(Condition::matches("ancestors", ancestor.clone()));
	}

	Filter::must(must)
}

pub fn collect_concepts(points: &[ScoredPoint], index: &str) -> Vec<ScoredConcept> {
	let mut out = Vec::with_capacity(points.len());

	for point in points {
		let Some(payload) = concept_payload(&point.payload) else {
			tracing::warn!(index, "Concept hit is missing uri or scheme.");

			continue;
		};

		out.push(ScoredConcept { payload, score: point.score });
	}

	out
}

pub fn concept_payload(payload: &HashMap<String, Value>) -> Option<ConceptPayload> {
	let uri = payload_string(payload, "uri")?;
	let scheme = payload_string(payload, "scheme")?;

	Some(ConceptPayload {
		uri,
		scheme,
		lang: payload_string(payload, "lang").unwrap_or_default(),
		pref_label: payload_string(payload, "prefLabel").unwrap_or_default(),
		breadcrumb: payload_strings(payload, "breadcrumb"),
		ancestors: payload_strings(payload, "ancestors"),
		broader: payload_string(payload, "broader").filter(|uri| !uri.is_empty()),
		related: payload_strings(payload, "related"),
	})
}

pub fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		_ => None,
	}
}

pub fn payload_strings(payload: &HashMap<String, Value>, key: &str) -> Vec<String> {
	let Some(value) = payload.get(key) else { return Vec::new() };

	match &value.kind {
		Some(Kind::ListValue(list)) => list
			.values
			.iter()
			.filter_map(|item| match &item.kind {
				Some(Kind::StringValue(text)) => Some(text.to_string()),
				_ => None,
			})
			.collect(),
		Some(Kind::StringValue(text)) => vec![text.to_string()],
		_ => Vec::new(),
	}
}
