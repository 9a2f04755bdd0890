use skos_config::Retrieval;

use crate::{
	candidate::{self, Scores, Signal},
	state::ClassifierState,
};

/// Weighted sum of the retrieval channels; an absent channel contributes nothing.
pub fn fuse(scores: &Scores, cfg: &Retrieval) -> f32 {
	cfg.weight_comp * scores.comp_vec.unwrap_or(0.0)
		+ cfg.weight_lex * scores.lexical_vec.unwrap_or(0.0)
		+ cfg.weight_path * scores.path_vec.unwrap_or(0.0)
}

pub fn run(cfg: &Retrieval, state: &mut ClassifierState) {
	let lists = [
		std::mem::take(&mut state.comp_candidates),
		std::mem::take(&mut state.path_candidates),
		std::mem::take(&mut state.lexical_candidates),
	];
	let mut merged = candidate::dedup_merge(lists);

	for candidate in &mut merged {
		let fused = fuse(&candidate.scores, cfg);

		candidate.scores.set(Signal::Merge, fused);
	}

	merged.sort_by(|a, b| {
		candidate::cmp_by_score(
			a.scores.merge.unwrap_or(0.0),
			&a.uri,
			b.scores.merge.unwrap_or(0.0),
			&b.uri,
		)
	});
	merged.truncate(cfg.retrieval_limit as usize);

	state.explain(format!("merge: {} unique candidates", merged.len()));
	state.merged = merged;
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Candidate, ClassifyRequest, ConceptPayload, ScoredConcept};

	fn candidate(uri: &str, signal: Signal, score: f32) -> Candidate {
		let payload = ConceptPayload { uri: uri.to_string(), ..Default::default() };

		Candidate::from_hit(ScoredConcept { payload, score }, signal)
	}

	#[test]
	fn adding_a_channel_raises_merge_by_its_weighted_score() {
		let cfg = Retrieval::default();
		let base = Scores { comp_vec: Some(0.8), path_vec: Some(0.6), ..Default::default() };
		let boosted = Scores { lexical_vec: Some(0.5), ..base };
		let delta = fuse(&boosted, &cfg) - fuse(&base, &cfg);

		assert!((delta - cfg.weight_lex * 0.5).abs() < 1e-6);
	}

	#[test]
	fn merges_channels_and_sorts_with_uri_tiebreak() {
		let cfg = Retrieval::default();
		let mut state = ClassifierState::new(ClassifyRequest::new("yogur", ""));

		state.comp_candidates =
			vec![candidate("b", Signal::CompVec, 0.5), candidate("c", Signal::CompVec, 0.5)];
		state.path_candidates = vec![candidate("a", Signal::PathVec, 2.5)];
		state.lexical_candidates = vec![candidate("c", Signal::LexicalVec, 1.0)];

		run(&cfg, &mut state);

		let uris: Vec<&str> = state.merged.iter().map(|c| c.uri.as_str()).collect();

		// c: 0.5 + 0.3, a: 0.2 * 2.5 = 0.5, b: 0.5.
		assert_eq!(uris, vec!["c", "a", "b"]);
		assert_eq!(state.merged[0].scores.lexical_vec, Some(1.0));
		assert!(state.comp_candidates.is_empty());
	}

	#[test]
	fn truncates_to_retrieval_limit() {
		let cfg = Retrieval { retrieval_limit: 2, ..Default::default() };
		let mut state = ClassifierState::new(ClassifyRequest::new("yogur", ""));

		state.comp_candidates = (0..5)
			.map(|i| candidate(&format!("uri-{i}"), Signal::CompVec, i as f32 / 10.0))
			.collect();

		run(&cfg, &mut state);

		assert_eq!(state.merged.len(), 2);
		assert_eq!(state.merged[0].uri, "uri-4");
	}
}
