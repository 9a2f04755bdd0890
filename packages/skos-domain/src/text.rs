use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Letters and digits in hyphen-separated groups, e.g. `sku-12345` or `7501055363513`.
static CODE_PATTERN: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"^[\p{L}\p{N}]+(?:-[\p{L}\p{N}]+)*$").ok());

/// NFKC-folds, lowercases, and collapses every whitespace run into a single space.
pub fn normalize_text(raw: &str) -> String {
	let folded: String = raw.nfkc().collect();
	let lowered = folded.to_lowercase();

	lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn token_count(text: &str) -> usize {
	text.split_whitespace().count()
}

pub fn is_single_token(text: &str) -> bool {
	token_count(text) == 1
}

/// SKU/EAN-like strings: no internal whitespace, at least one digit, shorter than `max_len`
/// characters.
pub fn looks_like_code(text: &str, max_len: usize) -> bool {
	let len = text.chars().count();

	if len == 0 || len >= max_len {
		return false;
	}
	if !text.chars().any(|ch| ch.is_ascii_digit()) {
		return false;
	}

	CODE_PATTERN.as_ref().is_some_and(|re| re.is_match(text))
}
