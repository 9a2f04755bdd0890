use std::{sync::Arc, time::Duration};

use skos_classifier::{
	BoxFuture, ClassifyRequest, ClassifyResponse, EmbeddingMode, EmbeddingProvider, Providers,
	SkosClassifier, TelemetrySink, VectorStore,
};
use skos_config::{Config, EmbeddingProviderConfig};
use skos_storage::qdrant::{COMPOSITE_VECTOR_NAME, LEXICAL_VECTOR_NAME, PATH_VECTOR_NAME};
use skos_testkit::{
	FailingSink, FailingVectorStore, FixedEmbedding, InMemoryVectorStore, RecordingSink,
	SCHEME_URI, ScriptedCrossEncoder, SlowVectorStore, TEST_VECTOR_DIM, concept, concept_uri,
	test_config,
};

struct Harness {
	classifier: SkosClassifier,
	embedding: Arc<FixedEmbedding>,
	sink: RecordingSink,
}

fn harness(cfg: Config, store: Arc<dyn VectorStore>) -> Harness {
	harness_with(cfg, store, ScriptedCrossEncoder::default())
}

fn harness_with(
	cfg: Config,
	store: Arc<dyn VectorStore>,
	cross_encoder: ScriptedCrossEncoder,
) -> Harness {
	let embedding = Arc::new(FixedEmbedding::new(TEST_VECTOR_DIM));
	let sink = RecordingSink::default();
	let providers =
		Providers::new(embedding.clone(), store, Arc::new(cross_encoder), Arc::new(sink.clone()));

	Harness { classifier: SkosClassifier::with_providers(cfg, providers), embedding, sink }
}

fn request(text: &str) -> ClassifyRequest {
	let mut request = ClassifyRequest::new(text, SCHEME_URI);

	request.lang = Some("es".to_string());

	request
}

fn yogurt() -> skos_storage::models::ConceptPayload {
	concept("yogur", &["Alimentos", "Lácteos", "Yogur"], &["alimentos", "lacteos"])
}

fn greek_yogurt() -> skos_storage::models::ConceptPayload {
	concept(
		"yogur-griego",
		&["Alimentos", "Lácteos", "Yogur", "Yogur griego"],
		&["alimentos", "lacteos", "yogur"],
	)
}

fn cheese() -> skos_storage::models::ConceptPayload {
	concept("queso", &["Alimentos", "Lácteos", "Queso"], &["alimentos", "lacteos"])
}

fn soap() -> skos_storage::models::ConceptPayload {
	concept("jabon", &["Hogar", "Limpieza", "Jabón"], &["hogar", "limpieza"])
}

fn dairy_store() -> InMemoryVectorStore {
	InMemoryVectorStore::new()
		.with_hit(COMPOSITE_VECTOR_NAME, yogurt(), 0.82)
		.with_hit(COMPOSITE_VECTOR_NAME, cheese(), 0.55)
		.with_hit(COMPOSITE_VECTOR_NAME, soap(), 0.30)
		.with_hit(PATH_VECTOR_NAME, yogurt(), 0.75)
		.with_hit(PATH_VECTOR_NAME, cheese(), 0.50)
		.with_hit(LEXICAL_VECTOR_NAME, yogurt(), 0.90)
}

fn top_k_uris(response: &ClassifyResponse) -> Vec<String> {
	response.top_k.iter().map(|candidate| candidate.uri.clone()).collect()
}

fn classified_uri(response: &ClassifyResponse) -> Option<String> {
	response.classification.as_ref().map(|classification| classification.uri.clone())
}

#[tokio::test]
async fn yogurt_query_is_classified_and_validated() {
	let cfg = test_config();
	let tau_low = cfg.thresholds.tau_low;
	let h = harness(cfg, Arc::new(dairy_store()));
	let response = h.classifier.classify(request("yogur griego natural 0% grasa")).await;
	let classification = response.classification.as_ref().expect("Expected a classification.");

	assert!(response.validated, "Unexpected abstention: {:?}", response.abstain_reason);
	assert!(response.abstain_reason.is_none());
	assert_eq!(classification.pref_label, "Yogur");
	assert_eq!(classification.notation, "yogur");
	assert_eq!(classification.scheme, SCHEME_URI);
	assert!(response.confidence >= tau_low);
	assert!(response.confidence <= 1.0);
	assert_eq!(response.detected_lang.as_deref(), Some("es"));
	assert_eq!(top_k_uris(&response)[0], concept_uri("yogur"));
}

#[tokio::test]
async fn single_tokens_and_codes_take_the_lexical_branch() {
	for (text, boosted) in
		[("yogur", true), ("SKU-12345", true), ("yogur natural sin azúcar", false)]
	{
		let store = Arc::new(dairy_store());
		let h = harness(test_config(), store.clone());
		let response = h.classifier.classify(request(text)).await;

		assert_eq!(response.metrics.contains_key("n3_ms"), boosted, "query {text:?}");
		assert_eq!(
			store.searches().iter().any(|index| index == LEXICAL_VECTOR_NAME),
			boosted,
			"query {text:?}"
		);
	}
}

#[tokio::test]
async fn lexical_hits_are_merged_into_candidates() {
	let h = harness(test_config(), Arc::new(dairy_store()));
	let response = h.classifier.classify(request("yogur")).await;
	let top = &response.top_k[0];

	assert_eq!(top.uri, concept_uri("yogur"));
	assert_eq!(top.scores.lexical_vec, Some(0.90));
	assert_eq!(top.scores.comp_vec, Some(0.82));
	assert_eq!(top.scores.path_vec, Some(0.75));
}

#[tokio::test]
async fn empty_retrieval_abstains_with_no_candidates() {
	let h = harness(test_config(), Arc::new(InMemoryVectorStore::new()));
	let response = h.classifier.classify(request("yogur griego natural")).await;

	assert!(!response.validated);
	assert_eq!(response.abstain_reason.as_deref(), Some("no_candidates"));
	assert!(response.classification.is_none());
	assert!(response.top_k.is_empty());
	assert_eq!(response.confidence, 0.0);
}

#[tokio::test]
async fn raising_tau_low_flips_validation_only() {
	let store = || {
		Arc::new(
			InMemoryVectorStore::new()
				.with_hit(COMPOSITE_VECTOR_NAME, yogurt(), 0.60)
				.with_hit(COMPOSITE_VECTOR_NAME, cheese(), 0.55),
		)
	};
	let relaxed = harness(test_config(), store());
	let mut strict_cfg = test_config();

	strict_cfg.thresholds.tau_low = 0.9;

	let strict = harness(strict_cfg, store());
	let accepted = relaxed.classifier.classify(request("yogur griego natural")).await;
	let rejected = strict.classifier.classify(request("yogur griego natural")).await;

	assert!(accepted.validated);
	assert!(accepted.confidence < 0.9);
	assert!(!rejected.validated);
	assert_eq!(rejected.abstain_reason.as_deref(), Some("low_confidence"));
	assert_eq!(classified_uri(&rejected), classified_uri(&accepted));
	assert_eq!(rejected.confidence, accepted.confidence);
}

#[tokio::test]
async fn close_scores_prefer_the_broader_concept() {
	let store = Arc::new(
		InMemoryVectorStore::new()
			.with_hit(COMPOSITE_VECTOR_NAME, greek_yogurt(), 0.81)
			.with_hit(COMPOSITE_VECTOR_NAME, yogurt(), 0.80),
	);
	let h = harness(test_config(), store);
	let first = h.classifier.classify(request("yogur griego natural")).await;
	let second = h.classifier.classify(request("yogur griego natural")).await;

	assert_eq!(classified_uri(&first), Some(concept_uri("yogur")));
	assert_eq!(classified_uri(&second), classified_uri(&first));
	assert!(first.explanation.iter().any(|line| line.contains("preferring broader")));
}

#[tokio::test]
async fn repeated_queries_are_deterministic() {
	let h = harness(test_config(), Arc::new(dairy_store()));
	let first = h.classifier.classify(request("yogur griego natural 0% grasa")).await;
	let second = h.classifier.classify(request("yogur griego natural 0% grasa")).await;

	assert_ne!(first.trace_id, second.trace_id);
	assert_eq!(classified_uri(&first), classified_uri(&second));
	assert_eq!(first.confidence, second.confidence);
	assert_eq!(top_k_uris(&first), top_k_uris(&second));
}

#[tokio::test]
async fn graph_bonus_is_visible_on_hierarchy_neighbours() {
	let h = harness(test_config(), Arc::new(dairy_store()));
	let response = h.classifier.classify(request("yogur griego natural 0% grasa")).await;
	let graph_of = |slug: &str| {
		response
			.top_k
			.iter()
			.find(|candidate| candidate.uri == concept_uri(slug))
			.and_then(|candidate| candidate.scores.graph)
	};

	assert_eq!(graph_of("queso"), Some(0.02));
	assert_eq!(graph_of("yogur"), Some(0.02));
	assert_eq!(graph_of("jabon"), Some(0.0));
}

#[tokio::test]
async fn cross_encoder_overrides_fused_ranking_when_enabled() {
	let mut cfg = test_config();

	cfg.features.cross_encoder_enabled = true;

	let cross_encoder = ScriptedCrossEncoder::default()
		.with_score("Alimentos > Lácteos > Queso", 0.95)
		.with_score("Alimentos > Lácteos > Yogur", 0.20);
	let h = harness_with(cfg, Arc::new(dairy_store()), cross_encoder);
	let response = h.classifier.classify(request("queso fresco de cabra")).await;

	assert!(response.metrics.contains_key("n6_ms"));
	assert_eq!(classified_uri(&response), Some(concept_uri("queso")));
	assert_eq!(response.top_k[0].scores.ce, Some(0.95));
}

#[tokio::test]
async fn partial_rerank_keeps_unscored_tail_out_of_the_decision() {
	let mut cfg = test_config();

	cfg.features.cross_encoder_enabled = true;
	cfg.retrieval.top_m_rerank = 1;

	let store = InMemoryVectorStore::new()
		.with_hit(COMPOSITE_VECTOR_NAME, greek_yogurt(), 0.95)
		.with_hit(COMPOSITE_VECTOR_NAME, soap(), 0.90);
	let cross_encoder = ScriptedCrossEncoder::default()
		.with_score("Alimentos > Lácteos > Yogur > Yogur griego", 0.91);
	let h = harness_with(cfg, Arc::new(store), cross_encoder);
	let response = h.classifier.classify(request("yogur griego natural")).await;

	assert!(response.metrics.contains_key("n6_ms"));
	assert_eq!(classified_uri(&response), Some(concept_uri("yogur-griego")));
	assert!((response.confidence - 0.91).abs() < 1e-6);
	assert_eq!(top_k_uris(&response), vec![concept_uri("yogur-griego"), concept_uri("jabon")]);
	assert!(response.top_k[1].scores.ce.is_none());
}

#[tokio::test]
async fn cross_encoder_is_skipped_when_disabled() {
	let h = harness(test_config(), Arc::new(dairy_store()));
	let response = h.classifier.classify(request("queso fresco de cabra")).await;

	assert!(!response.metrics.contains_key("n6_ms"));
	assert!(response.top_k.iter().all(|candidate| candidate.scores.ce.is_none()));
}

#[tokio::test]
async fn ancestor_filter_scopes_retrieval() {
	let h = harness(test_config(), Arc::new(dairy_store()));
	let mut scoped = request("jabón líquido para manos");

	scoped.ancestor_filter = Some(concept_uri("hogar"));

	let response = h.classifier.classify(scoped).await;

	assert_eq!(top_k_uris(&response), vec![concept_uri("jabon")]);
}

#[tokio::test]
async fn slow_stage_times_out_with_stage_reason() {
	let mut cfg = test_config();

	cfg.performance.node_timeout_ms.n2_retrieval = 50;

	let store = Arc::new(SlowVectorStore { delay: Duration::from_millis(500) });
	let h = harness(cfg, store);
	let response = h.classifier.classify(request("yogur griego")).await;

	assert!(!response.validated);
	assert_eq!(response.abstain_reason.as_deref(), Some("timeout:n2_retrieval"));
	assert!(response.classification.is_none());
	assert_eq!(response.confidence, 0.0);
	assert!(response.metrics.contains_key("n0_ms"));
	assert!(response.metrics.contains_key("total_ms"));
}

#[tokio::test]
async fn slow_request_times_out_as_a_whole() {
	let mut cfg = test_config();

	cfg.performance.request_timeout_ms = 50;

	let store = Arc::new(SlowVectorStore { delay: Duration::from_millis(500) });
	let h = harness(cfg, store);
	let response = h.classifier.classify(request("yogur griego")).await;

	assert_eq!(response.abstain_reason.as_deref(), Some("timeout:request"));
	assert!(response.top_k.is_empty());
}

#[tokio::test]
async fn store_failure_is_reported_as_retrieval_error() {
	let store = Arc::new(FailingVectorStore { message: "connection refused".to_string() });
	let h = harness(test_config(), store);
	let response = h.classifier.classify(request("yogur griego")).await;
	let reason = response.abstain_reason.as_deref().unwrap_or_default();

	assert!(!response.validated);
	assert!(reason.starts_with("retrieval_error:n2_retrieval:"), "reason was {reason}");
	assert!(reason.ends_with("connection refused"));
}

#[tokio::test]
async fn embedding_dimension_mismatch_fails_query_vectors() {
	let mut cfg = test_config();

	cfg.embedding.embedding_dim = TEST_VECTOR_DIM * 2;

	let h = harness(cfg, Arc::new(dairy_store()));
	let response = h.classifier.classify(request("yogur griego")).await;
	let reason = response.abstain_reason.as_deref().unwrap_or_default();

	assert!(reason.starts_with("retrieval_error:n1_queryvecs:"), "reason was {reason}");
}

#[tokio::test]
async fn blank_text_is_invalid_input() {
	let h = harness(test_config(), Arc::new(dairy_store()));
	let response = h.classifier.classify(request("   \n\t ")).await;
	let reason = response.abstain_reason.as_deref().unwrap_or_default();

	assert!(!response.validated);
	assert!(reason.starts_with("invalid_input:"), "reason was {reason}");
	assert_eq!(h.embedding.calls(), 0);
}

#[tokio::test]
async fn total_ms_is_sum_of_stage_durations() {
	let h = harness(test_config(), Arc::new(dairy_store()));
	let response = h.classifier.classify(request("yogur")).await;
	let total = response.metrics.get("total_ms").copied().expect("Expected total_ms.");
	let sum: f64 = response
		.metrics
		.iter()
		.filter(|(key, _)| key.as_str() != "total_ms")
		.map(|(_, elapsed)| *elapsed)
		.sum();

	assert!((total - sum).abs() < 1e-9);

	for key in ["n0_ms", "n1_ms", "n2_ms", "n3_ms", "n4_ms", "n5_ms", "n7_ms", "n8_ms", "n9_ms"] {
		assert!(response.metrics.contains_key(key), "missing {key}");
	}
}

#[tokio::test]
async fn telemetry_receives_the_outcome() {
	let h = harness(test_config(), Arc::new(dairy_store()));
	let response = h.classifier.classify(request("yogur griego natural 0% grasa")).await;
	let records = h.sink.wait_for(1).await;
	let record = records.first().expect("Expected a telemetry record.");

	assert_eq!(record.trace_id, response.trace_id);
	assert_eq!(record.outcome.validated, response.validated);
	assert_eq!(record.outcome.classification_uri, classified_uri(&response));
	assert_eq!(record.metrics.get("total_ms"), response.metrics.get("total_ms"));
}

#[tokio::test]
async fn telemetry_failure_does_not_change_the_result() {
	let embedding = Arc::new(FixedEmbedding::new(TEST_VECTOR_DIM));
	let failing: Arc<dyn TelemetrySink> = Arc::new(FailingSink);
	let providers = Providers::new(
		embedding,
		Arc::new(dairy_store()),
		Arc::new(ScriptedCrossEncoder::default()),
		failing,
	);
	let classifier = SkosClassifier::with_providers(test_config(), providers);
	let baseline = harness(test_config(), Arc::new(dairy_store()));
	let with_failure = classifier.classify(request("yogur griego natural 0% grasa")).await;
	let expected = baseline.classifier.classify(request("yogur griego natural 0% grasa")).await;

	tokio::time::sleep(Duration::from_millis(20)).await;

	assert_eq!(with_failure.validated, expected.validated);
	assert_eq!(classified_uri(&with_failure), classified_uri(&expected));
	assert_eq!(with_failure.confidence, expected.confidence);
}

#[tokio::test]
async fn disabled_telemetry_sends_nothing() {
	let mut cfg = test_config();

	cfg.observability.telemetry_enabled = false;

	let h = harness(cfg, Arc::new(dairy_store()));

	h.classifier.classify(request("yogur")).await;
	tokio::time::sleep(Duration::from_millis(20)).await;

	assert!(h.sink.records().is_empty());
}

#[tokio::test]
async fn cache_serves_repeated_embeddings() {
	let h = harness(test_config(), Arc::new(dairy_store()));

	h.classifier.classify(request("yogur griego")).await;

	assert_eq!(h.embedding.calls(), 4);

	h.classifier.classify(request("  Yogur   Griego ")).await;

	assert_eq!(h.embedding.calls(), 4);

	let mut cfg = test_config();

	cfg.embedding.use_cache = false;

	let uncached = harness(cfg, Arc::new(dairy_store()));

	uncached.classifier.classify(request("yogur griego")).await;
	uncached.classifier.classify(request("yogur griego")).await;

	assert_eq!(uncached.embedding.calls(), 8);
}

#[tokio::test]
async fn batch_keeps_input_order() {
	let h = harness(test_config(), Arc::new(dairy_store()));
	let classifier = Arc::new(h.classifier);
	let texts = ["queso fresco de cabra", "  ", "yogur griego natural 0% grasa", "jabón"];
	let responses =
		classifier.classify_batch(texts.iter().map(|text| request(text)).collect()).await;

	assert_eq!(responses.len(), texts.len());
	assert!(
		responses[1].abstain_reason.as_deref().unwrap_or_default().starts_with("invalid_input:")
	);
	assert_eq!(classified_uri(&responses[2]), Some(concept_uri("yogur")));

	for response in &responses {
		assert!((0.0..=1.0).contains(&response.confidence));
	}
}

#[tokio::test]
async fn concurrency_bound_of_one_still_completes_batches() {
	let mut cfg = test_config();

	cfg.performance.max_concurrent_requests = 1;

	let h = harness(cfg, Arc::new(dairy_store()));
	let classifier = Arc::new(h.classifier);
	let requests = (0..8).map(|_| request("yogur")).collect();
	let responses = classifier.classify_batch(requests).await;

	assert_eq!(responses.len(), 8);
	assert!(responses.iter().all(|response| response.validated));
}

#[tokio::test]
async fn response_serializes_to_json() {
	let h = harness(test_config(), Arc::new(dairy_store()));
	let response = h.classifier.classify(request("yogur")).await;
	let json = serde_json::to_value(&response).expect("Response should serialize.");

	assert_eq!(json["validated"], serde_json::json!(true));
	assert!(json["metrics"]["total_ms"].is_number());
	assert!(json["top_k"][0]["scores"].get("ce").is_none());
}

struct PanickingEmbedding;
impl EmbeddingProvider for PanickingEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		_text: &'a str,
		_mode: EmbeddingMode,
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(async move { panic!("embedding backend crashed") })
	}
}

#[tokio::test]
async fn failed_batch_task_answers_with_its_own_trace_id() {
	let sink = RecordingSink::default();
	let providers = Providers::new(
		Arc::new(PanickingEmbedding),
		Arc::new(dairy_store()),
		Arc::new(ScriptedCrossEncoder::default()),
		Arc::new(sink),
	);
	let classifier = Arc::new(SkosClassifier::with_providers(test_config(), providers));
	let responses =
		classifier.classify_batch(vec![request("yogur"), request("queso fresco")]).await;

	assert_eq!(responses.len(), 2);

	for response in &responses {
		assert_eq!(response.abstain_reason.as_deref(), Some("internal_error:task failed"));
		assert!(!response.trace_id.is_nil());
	}

	assert_ne!(responses[0].trace_id, responses[1].trace_id);
}
