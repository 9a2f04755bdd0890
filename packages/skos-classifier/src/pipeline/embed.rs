use skos_config::Config;

use crate::{
	EmbeddingMode, EmbeddingProvider, Error, Result,
	cache::EmbeddingCache,
	state::{ClassifierState, Stage},
};

/// Builds the four query vectors, one provider call per mode unless the cache already holds it.
pub async fn run(
	cfg: &Config,
	provider: &dyn EmbeddingProvider,
	cache: Option<&EmbeddingCache>,
	state: &mut ClassifierState,
) -> Result<()> {
	let stage = Stage::QueryVectors.node_key();
	let expected = cfg.embedding.embedding_dim as usize;
	let mut cached = 0;

	for mode in EmbeddingMode::ALL {
		if let Some(vector) = cache.and_then(|cache| cache.get(mode, &state.normalized_text)) {
			state.query_vectors.set(mode, vector);

			cached += 1;

			continue;
		}

		let vector = provider
			.embed(&cfg.providers.embedding, &state.normalized_text, mode)
			.await
			.map_err(|err| Error::retrieval(stage, err))?;

		if vector.len() != expected {
			return Err(Error::retrieval(
				stage,
				format!(
					"{} embedding has {} dimensions, expected {expected}.",
					mode.as_str(),
					vector.len()
				),
			));
		}
		if let Some(cache) = cache {
			cache.insert(mode, &state.normalized_text, &vector);
		}

		state.query_vectors.set(mode, vector);
	}

	let total = EmbeddingMode::ALL.len();

	state.explain(format!("embed: {total} query vectors, {cached} from cache"));

	Ok(())
}
