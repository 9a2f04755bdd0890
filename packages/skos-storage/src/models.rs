use serde::{Deserialize, Serialize};

/// Concept payload stored next to every point of the concept collection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptPayload {
	pub uri: String,
	pub scheme: String,
	pub lang: String,
	#[serde(rename = "prefLabel")]
	pub pref_label: String,
	/// Labels from the scheme root down to this concept.
	pub breadcrumb: Vec<String>,
	pub ancestors: Vec<String>,
	pub broader: Option<String>,
	pub related: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScoredConcept {
	pub payload: ConceptPayload,
	pub score: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchFilter {
	pub scheme_uri: String,
	pub lang: Option<String>,
	/// Restricts hits to descendants of this concept.
	pub ancestor_uri: Option<String>,
}
impl SearchFilter {
	pub fn accepts(&self, payload: &ConceptPayload) -> bool {
		if payload.scheme != self.scheme_uri {
			return false;
		}
		if let Some(lang) = self.lang.as_deref()
			&& payload.lang != lang
		{
			return false;
		}
		if let Some(ancestor) = self.ancestor_uri.as_deref()
			&& !payload.ancestors.iter().any(|uri| uri == ancestor)
		{
			return false;
		}

		true
	}
}
