use std::{cmp::Ordering, collections::HashMap};

use serde::{Deserialize, Serialize};

use skos_storage::models::ScoredConcept;

/// Every score a candidate can accumulate on its way through the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
	LexicalVec,
	DescVec,
	PathVec,
	CompVec,
	Merge,
	Graph,
	Ce,
}
impl Signal {
	pub const ALL: [Self; 7] = [
		Self::LexicalVec,
		Self::DescVec,
		Self::PathVec,
		Self::CompVec,
		Self::Merge,
		Self::Graph,
		Self::Ce,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::LexicalVec => "lexical_vec",
			Self::DescVec => "desc_vec",
			Self::PathVec => "path_vec",
			Self::CompVec => "comp_vec",
			Self::Merge => "merge",
			Self::Graph => "graph",
			Self::Ce => "ce",
		}
	}
}

/// Per-signal scores; a field is `Some` only once its signal has been computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub lexical_vec: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub desc_vec: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub path_vec: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub comp_vec: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub merge: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub graph: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ce: Option<f32>,
}
impl Scores {
	pub fn get(&self, signal: Signal) -> Option<f32> {
		match signal {
			Signal::LexicalVec => self.lexical_vec,
			Signal::DescVec => self.desc_vec,
			Signal::PathVec => self.path_vec,
			Signal::CompVec => self.comp_vec,
			Signal::Merge => self.merge,
			Signal::Graph => self.graph,
			Signal::Ce => self.ce,
		}
	}

	pub fn set(&mut self, signal: Signal, value: f32) {
		let slot = match signal {
			Signal::LexicalVec => &mut self.lexical_vec,
			Signal::DescVec => &mut self.desc_vec,
			Signal::PathVec => &mut self.path_vec,
			Signal::CompVec => &mut self.comp_vec,
			Signal::Merge => &mut self.merge,
			Signal::Graph => &mut self.graph,
			Signal::Ce => &mut self.ce,
		};

		*slot = Some(value);
	}

	/// Union of present signals. When both records carry the same signal the higher value wins.
	pub fn merge_from(&mut self, other: &Self) {
		for signal in Signal::ALL {
			let Some(incoming) = other.get(signal) else { continue };
			let value = match self.get(signal) {
				Some(existing) => existing.max(incoming),
				None => incoming,
			};

			self.set(signal, value);
		}
	}

	pub fn present(&self) -> impl Iterator<Item = (Signal, f32)> + '_ {
		Signal::ALL.into_iter().filter_map(|signal| self.get(signal).map(|value| (signal, value)))
	}

	pub fn fused(&self) -> f32 {
		self.merge.unwrap_or(0.0) + self.graph.unwrap_or(0.0)
	}

	/// Cross-encoder score when present, otherwise the fused retrieval score.
	pub fn final_score(&self) -> f32 {
		self.ce.unwrap_or_else(|| self.fused())
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
	pub uri: String,
	pub scheme: String,
	pub lang: String,
	pub pref_label: String,
	pub breadcrumb: Vec<String>,
	pub ancestors: Vec<String>,
	pub broader: Option<String>,
	pub related: Vec<String>,
	pub scores: Scores,
	pub explanation: Vec<String>,
}
impl Candidate {
	pub fn from_hit(hit: ScoredConcept, signal: Signal) -> Self {
		let ScoredConcept { payload, score } = hit;
		let mut scores = Scores::default();

		scores.set(signal, score);

		Self {
			uri: payload.uri,
			scheme: payload.scheme,
			lang: payload.lang,
			pref_label: payload.pref_label,
			breadcrumb: payload.breadcrumb,
			ancestors: payload.ancestors,
			broader: payload.broader,
			related: payload.related,
			scores,
			explanation: Vec::new(),
		}
	}

	/// Folds another sighting of the same concept into this one.
	pub fn absorb(&mut self, other: Self) {
		self.scores.merge_from(&other.scores);

		for line in other.explanation {
			if !self.explanation.contains(&line) {
				self.explanation.push(line);
			}
		}
	}

	/// Text shown to the cross-encoder: the breadcrumb path, or the label for root concepts.
	pub fn display_text(&self) -> String {
		if self.breadcrumb.is_empty() {
			return self.pref_label.clone();
		}

		self.breadcrumb.join(" > ")
	}

	/// Last path segment of the concept URI.
	pub fn notation(&self) -> &str {
		let trimmed = self.uri.trim_end_matches(['/', '#']);

		trimmed.rsplit(['/', '#']).next().unwrap_or(trimmed)
	}
}

/// Deduplicates candidates by URI across every list, merging score records. First sighting fixes
/// the position.
pub fn dedup_merge<I>(lists: I) -> Vec<Candidate>
where
	I: IntoIterator<Item = Vec<Candidate>>,
{
	let mut out: Vec<Candidate> = Vec::new();
	let mut positions: HashMap<String, usize> = HashMap::new();

	for candidate in lists.into_iter().flatten() {
		match positions.get(&candidate.uri) {
			Some(&index) => out[index].absorb(candidate),
			None => {
				positions.insert(candidate.uri.clone(), out.len());
				out.push(candidate);
			},
		}
	}

	out
}

/// Descending by score, ascending by URI on equal scores.
pub fn cmp_by_score(a_score: f32, a_uri: &str, b_score: f32, b_uri: &str) -> Ordering {
	b_score.total_cmp(&a_score).then_with(|| a_uri.cmp(b_uri))
}
