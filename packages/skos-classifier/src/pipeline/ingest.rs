use skos_config::Config;
use skos_domain::{language, text};

use crate::{Error, Result, state::ClassifierState};

pub fn run(cfg: &Config, state: &mut ClassifierState) -> Result<()> {
	let normalized = text::normalize_text(&state.raw_text);

	if normalized.is_empty() {
		return Err(Error::InvalidInput {
			message: "text is empty after normalization".to_string(),
		});
	}

	let scheme_uri = state.scheme_uri.trim();

	state.scheme_uri = if scheme_uri.is_empty() {
		cfg.taxonomy.default_scheme_uri.clone()
	} else {
		scheme_uri.to_string()
	};
	state.ancestor_filter = non_blank(state.ancestor_filter.take());
	state.hint_type = non_blank(state.hint_type.take());

	let (lang, source) = match non_blank(state.lang_hint.clone()) {
		Some(hint) => (hint.to_lowercase(), "hint"),
		None => (
			language::detect_language(
				&normalized,
				&cfg.taxonomy.supported_languages,
				&cfg.taxonomy.default_language,
			),
			"detected",
		),
	};

	state.explain(format!("ingest: lang={lang} ({source}), scheme={}", state.scheme_uri));
	state.normalized_text = normalized;
	state.lang = Some(lang);

	Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
	value.map(|raw| raw.trim().to_string()).filter(|trimmed| !trimmed.is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ClassifyRequest;

	#[test]
	fn normalizes_and_keeps_language_hint() {
		let cfg = Config::default();
		let mut request = ClassifyRequest::new("  Yogur   GRIEGO ", "https://example.org/x/");

		request.lang = Some("ES".to_string());

		let mut state = ClassifierState::new(request);

		run(&cfg, &mut state).expect("Ingest should accept non-empty text.");

		assert_eq!(state.normalized_text, "yogur griego");
		assert_eq!(state.lang.as_deref(), Some("es"));
	}

	#[test]
	fn blank_text_is_invalid_input() {
		let cfg = Config::default();
		let mut state = ClassifierState::new(ClassifyRequest::new(" \t ", ""));
		let err = run(&cfg, &mut state).expect_err("Blank text must be rejected.");

		assert!(matches!(err, Error::InvalidInput { .. }));
	}

	#[test]
	fn empty_scheme_falls_back_to_default() {
		let cfg = Config::default();
		let mut state = ClassifierState::new(ClassifyRequest::new("yogur", " "));

		run(&cfg, &mut state).expect("Ingest should accept non-empty text.");

		assert_eq!(state.scheme_uri, cfg.taxonomy.default_scheme_uri);
		assert_eq!(state.lang.as_deref(), Some(cfg.taxonomy.default_language.as_str()));
	}
}
