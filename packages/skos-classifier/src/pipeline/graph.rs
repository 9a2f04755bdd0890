use std::collections::HashSet;

use skos_config::Retrieval;

use crate::{
	candidate::{self, Candidate, Signal},
	state::ClassifierState,
};

/// Applies the hierarchy-coherence bonus to the merged list and re-ranks it by `merge + graph`.
///
/// The top candidate by `merge` is the anchor. Another candidate earns `weight_graph` when its
/// broader concept is the anchor itself, the anchor's broader concept, or one of the anchor's
/// ancestors. The anchor earns the bonus only when some other candidate did and it is not a root
/// concept.
pub fn run(cfg: &Retrieval, enabled: bool, state: &mut ClassifierState) {
	let mut ranked = state.merged.clone();

	if enabled {
		apply_bonus(&mut ranked, cfg.weight_graph);
	} else {
		for candidate in &mut ranked {
			candidate.scores.set(Signal::Graph, 0.0);
		}
	}

	ranked.sort_by(|a, b| {
		candidate::cmp_by_score(a.scores.fused(), &a.uri, b.scores.fused(), &b.uri)
	});

	let boosted = ranked.iter().filter(|c| c.scores.graph.is_some_and(|g| g > 0.0)).count();

	state.explain(format!("graph: {boosted} of {} candidates hierarchy-coherent", ranked.len()));
	state.graph_ranked = ranked;
}

fn apply_bonus(ranked: &mut [Candidate], weight: f32) {
	let Some((anchor, rest)) = ranked.split_first_mut() else { return };
	let mut family: HashSet<&str> = anchor.ancestors.iter().map(String::as_str).collect();

	family.insert(anchor.uri.as_str());

	if let Some(broader) = anchor.broader.as_deref() {
		family.insert(broader);
	}

	let mut coherent = 0;

	for candidate in rest.iter_mut() {
		let bonus = match candidate.broader.as_deref() {
			Some(broader) if family.contains(broader) => {
				coherent += 1;
				candidate.explanation.push(format!("graph: shares hierarchy with {}", anchor.uri));

				weight
			},
			_ => 0.0,
		};

		candidate.scores.set(Signal::Graph, bonus);
	}

	let anchor_bonus = if coherent > 0 && anchor.broader.is_some() { weight } else { 0.0 };

	anchor.scores.set(Signal::Graph, anchor_bonus);
}
