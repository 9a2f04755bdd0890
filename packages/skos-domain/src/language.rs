use whatlang::{Detector, Lang};

// Below this many letters the detector guesses more than it detects.
const MIN_LETTERS: usize = 16;
const MIN_CONFIDENCE: f64 = 0.5;

/// Detects the language of `text` among `supported` (ISO 639-1 codes), falling back to
/// `default` when the text is too short, the detector is unsure, or no supported code is known
/// to the detector.
pub fn detect_language(text: &str, supported: &[String], default: &str) -> String {
	let letters = text.chars().filter(|ch| ch.is_alphabetic()).count();

	if letters < MIN_LETTERS {
		return default.to_string();
	}

	let allowlist: Vec<Lang> = supported.iter().filter_map(|code| iso639_1_to_lang(code)).collect();

	if allowlist.is_empty() {
		return default.to_string();
	}

	let Some(info) = Detector::with_allowlist(allowlist).detect(text) else {
		return default.to_string();
	};

	if info.confidence() < MIN_CONFIDENCE {
		return default.to_string();
	}

	lang_to_iso639_1(info.lang()).map(str::to_string).unwrap_or_else(|| default.to_string())
}

pub fn iso639_1_to_lang(code: &str) -> Option<Lang> {
	let lang = match code {
		"es" => Lang::Spa,
		"en" => Lang::Eng,
		"pt" => Lang::Por,
		"fr" => Lang::Fra,
		"de" => Lang::Deu,
		"it" => Lang::Ita,
		"nl" => Lang::Nld,
		"pl" => Lang::Pol,
		"sv" => Lang::Swe,
		"tr" => Lang::Tur,
		"ru" => Lang::Rus,
		_ => return None,
	};

	Some(lang)
}

pub fn lang_to_iso639_1(lang: Lang) -> Option<&'static str> {
	let code = match lang {
		Lang::Spa => "es",
		Lang::Eng => "en",
		Lang::Por => "pt",
		Lang::Fra => "fr",
		Lang::Deu => "de",
		Lang::Ita => "it",
		Lang::Nld => "nl",
		Lang::Pol => "pl",
		Lang::Swe => "sv",
		Lang::Tur => "tr",
		Lang::Rus => "ru",
		_ => return None,
	};

	Some(code)
}
