use skos_config::Config;

use crate::{
	CrossEncoderProvider, Error, Result,
	candidate::{self, Candidate, Signal},
	state::{ClassifierState, Stage},
};

/// Scores the top `top_m_rerank` candidates against the query. Reranked candidates lead, ordered
/// by `ce`; the rest follow in their graph order without a `ce` score.
pub async fn run(
	cfg: &Config,
	provider: &dyn CrossEncoderProvider,
	state: &mut ClassifierState,
) -> Result<()> {
	let stage = Stage::Rerank.node_key();
	let top_m = (cfg.retrieval.top_m_rerank as usize).min(state.graph_ranked.len());
	let mut head: Vec<Candidate> = state.graph_ranked[..top_m].to_vec();
	let tail = &state.graph_ranked[top_m..];
	let docs: Vec<String> = head.iter().map(Candidate::display_text).collect();
	let scores = provider
		.score(&cfg.providers.rerank, &state.normalized_text, &docs)
		.await
		.map_err(|err| Error::retrieval(stage, err))?;

	if scores.len() != head.len() {
		return Err(Error::retrieval(
			stage,
			format!("cross-encoder returned {} scores for {} candidates", scores.len(), head.len()),
		));
	}

	for (candidate, score) in head.iter_mut().zip(scores) {
		candidate.scores.set(Signal::Ce, score);
	}

	head.sort_by(|a, b| {
		candidate::cmp_by_score(
			a.scores.ce.unwrap_or(0.0),
			&a.uri,
			b.scores.ce.unwrap_or(0.0),
			&b.uri,
		)
	});
	head.extend_from_slice(tail);

	state.explain(format!("rerank: cross-encoder scored {top_m} candidates"));
	state.reranked = Some(head);

	Ok(())
}
