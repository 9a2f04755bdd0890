use skos_config::{Config, Retrieval, Thresholds};

use crate::{
	candidate::{self, Candidate, Signal},
	state::ClassifierState,
};

/// Bounded transform of the top final score and its lead over the runner-up. Higher `s1` never
/// lowers the result and a shrinking gap never raises it.
pub fn confidence(s1: f32, s2: Option<f32>) -> f32 {
	let raw = match s2 {
		Some(s2) => s1 * (1.0 + (s1 - s2)),
		None => s1,
	};

	if !raw.is_finite() {
		return 0.0;
	}

	raw.clamp(0.0, 1.0)
}

/// Logistic calibration `1 / (1 + exp(-(slope * x + intercept)))`.
pub fn calibrate(x: f32, slope: f32, intercept: f32) -> f32 {
	let calibrated = 1.0 / (1.0 + (-(slope * x + intercept)).exp());

	if calibrated.is_finite() { calibrated.clamp(0.0, 1.0) } else { 0.0 }
}

/// Candidates scored by the cross-encoder lead; within each group the final score decides.
pub fn rank(candidates: &mut [Candidate]) {
	candidates.sort_by(|a, b| {
		let (a_score, b_score) = (a.scores.final_score(), b.scores.final_score());

		b.scores
			.ce
			.is_some()
			.cmp(&a.scores.ce.is_some())
			.then_with(|| candidate::cmp_by_score(a_score, &a.uri, b_score, &b.uri))
	});
}

/// Index of the preferred candidate among those within `epsilon_tie` of the top: fewest
/// ancestors, then smallest URI.
pub fn break_tie(ranked: &[Candidate], thresholds: &Thresholds) -> Option<usize> {
	let top = ranked.first()?.scores.final_score();
	let tied: Vec<usize> = ranked
		.iter()
		.enumerate()
		.take_while(|(_, c)| (top - c.scores.final_score()).abs() < thresholds.epsilon_tie)
		.map(|(index, _)| index)
		.collect();

	if tied.len() < 2 {
		return None;
	}

	tied.into_iter().min_by(|&a, &b| {
		ranked[a]
			.ancestors
			.len()
			.cmp(&ranked[b].ancestors.len())
			.then_with(|| ranked[a].uri.cmp(&ranked[b].uri))
	})
}

pub fn explain_scores(candidate: &Candidate, cfg: &Retrieval) -> Vec<String> {
	let mut lines = Vec::new();
	let channels = [
		(Signal::CompVec, cfg.weight_comp),
		(Signal::LexicalVec, cfg.weight_lex),
		(Signal::PathVec, cfg.weight_path),
	];
	let dominant = channels
		.iter()
		.filter_map(|&(signal, weight)| {
			candidate.scores.get(signal).map(|score| (signal, weight * score))
		})
		.max_by(|a, b| a.1.total_cmp(&b.1));

	if let Some((signal, weighted)) = dominant {
		lines.push(format!("dominant signal {} ({weighted:.4})", signal.as_str()));
	}
	if let Some(graph) = candidate.scores.graph.filter(|graph| *graph > 0.0) {
		lines.push(format!("graph bonus {graph:.4}"));
	}
	if let Some(ce) = candidate.scores.ce {
		lines.push(format!("cross-encoder {ce:.4}"));
	}

	lines
}

/// Length of the leading slice of `ranked` that may win or act as runner-up. After a rerank
/// only candidates carrying `ce` compete; the unscored tail merely trails in the top-K list.
pub fn contenders(ranked: &[Candidate], reranked: bool) -> usize {
	if !reranked {
		return ranked.len();
	}

	match ranked.iter().take_while(|c| c.scores.ce.is_some()).count() {
		0 => ranked.len(),
		scored => scored,
	}
}

pub fn run(cfg: &Config, calibration: bool, state: &mut ClassifierState) {
	let reranked = state.reranked.is_some();
	let mut ranked = state.reranked.clone().unwrap_or_else(|| state.graph_ranked.clone());

	rank(&mut ranked);

	let Some(top) = ranked.first() else {
		state.classification = None;
		state.confidence = 0.0;
		state.top_k.clear();
		state.explain("decide: no candidates");

		return;
	};
	let pool = &ranked[..contenders(&ranked, reranked)];
	let s1 = top.scores.final_score();
	let s2 = pool.get(1).map(|c| c.scores.final_score());
	let mut score = confidence(s1, s2);

	if calibration {
		score = calibrate(
			score,
			cfg.thresholds.calibration_slope,
			cfg.thresholds.calibration_intercept,
		);
	}

	let winner = if cfg.thresholds.prefer_broader_on_tie {
		break_tie(pool, &cfg.thresholds)
	} else {
		None
	};

	if let Some(index) = winner {
		state.explain(format!(
			"decide: tie within {} of the top; preferring broader {}",
			cfg.thresholds.epsilon_tie, ranked[index].uri
		));
	}

	let top_k = cfg.retrieval.top_k_output as usize;

	for candidate in ranked.iter_mut().take(top_k) {
		let lines = explain_scores(candidate, &cfg.retrieval);

		candidate.explanation.extend(lines);
	}

	let classification = ranked[winner.unwrap_or(0)].clone();

	state.explain(format!(
		"decide: {} (score {s1:.4}, confidence {score:.4})",
		classification.uri
	));
	state.classification = Some(classification);
	state.confidence = score;
	state.top_k = ranked.into_iter().take(top_k).collect();
}
