use skos_config::Config;
use skos_storage::qdrant::{COMPOSITE_VECTOR_NAME, PATH_VECTOR_NAME};

use crate::{
	Error, Result, SearchFilter, VectorStore,
	candidate::{Candidate, Signal},
	state::{ClassifierState, Stage},
};

pub fn search_filter(state: &ClassifierState) -> SearchFilter {
	SearchFilter {
		scheme_uri: state.scheme_uri.clone(),
		lang: state.lang.clone(),
		ancestor_uri: state.ancestor_filter.clone(),
	}
}

/// Composite and path searches, issued together.
pub async fn run(cfg: &Config, store: &dyn VectorStore, state: &mut ClassifierState) -> Result<()> {
	let stage = Stage::Retrieval.node_key();
	let filter = search_filter(state);
	let limit = cfg.retrieval.retrieval_limit;
	let comp_vector = state.query_vectors.composite.clone();
	let path_vector = state.query_vectors.path.clone();
	let (comp, path) = tokio::join!(
		store.search(COMPOSITE_VECTOR_NAME, comp_vector, &filter, limit),
		store.search(PATH_VECTOR_NAME, path_vector, &filter, limit),
	);
	let comp = comp.map_err(|err| Error::retrieval(stage, err))?;
	let path = path.map_err(|err| Error::retrieval(stage, err))?;

	state.comp_candidates =
		comp.into_iter().map(|hit| Candidate::from_hit(hit, Signal::CompVec)).collect();
	state.path_candidates =
		path.into_iter().map(|hit| Candidate::from_hit(hit, Signal::PathVec)).collect();

	state.explain(format!(
		"retrieval: {} composite hits, {} path hits",
		state.comp_candidates.len(),
		state.path_candidates.len()
	));

	Ok(())
}
