use reqwest::header::AUTHORIZATION;
use serde_json::Map;

#[test]
fn builds_bearer_auth_header() {
	let headers =
		skos_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn blank_api_key_sends_no_authorization() {
	let mut defaults = Map::new();

	defaults.insert("x-tenant".to_string(), serde_json::json!("catalog"));

	let headers = skos_providers::auth_headers("  ", &defaults).expect("Failed to build headers.");

	assert!(headers.get(AUTHORIZATION).is_none());
	assert_eq!(headers.get("x-tenant").expect("Missing default header."), "catalog");
}

#[test]
fn non_string_default_headers_are_rejected() {
	let mut defaults = Map::new();

	defaults.insert("x-retries".to_string(), serde_json::json!(3));

	assert!(skos_providers::auth_headers("secret", &defaults).is_err());
}
