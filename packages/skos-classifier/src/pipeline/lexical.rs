use skos_config::Config;
use skos_storage::qdrant::LEXICAL_VECTOR_NAME;

use crate::{
	Error, Result, VectorStore,
	candidate::{Candidate, Signal},
	pipeline::retrieval,
	state::{ClassifierState, Stage},
};

pub async fn run(cfg: &Config, store: &dyn VectorStore, state: &mut ClassifierState) -> Result<()> {
	let filter = retrieval::search_filter(state);
	let hits = store
		.search(
			LEXICAL_VECTOR_NAME,
			state.query_vectors.lexical.clone(),
			&filter,
			cfg.retrieval.retrieval_limit,
		)
		.await
		.map_err(|err| Error::retrieval(Stage::LexicalBoost.node_key(), err))?;

	state.lexical_candidates =
		hits.into_iter().map(|hit| Candidate::from_hit(hit, Signal::LexicalVec)).collect();

	state.explain(format!("lexical boost: {} hits", state.lexical_candidates.len()));

	Ok(())
}
