use std::{
	collections::BTreeMap,
	fs,
	path::{Path, PathBuf},
	time::Instant,
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use skos_classifier::{ClassifyRequest, ClassifyResponse, SkosClassifier};
use skos_config::Config;

#[derive(Debug, Parser)]
#[command(
	version = skos_cli::VERSION,
	rename_all = "kebab",
	styles = skos_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(
		long,
		short = 'd',
		value_name = "FILE",
		required_unless_present = "text",
		conflicts_with = "text"
	)]
	pub dataset: Option<PathBuf>,
	#[arg(long, value_name = "TEXT")]
	pub text: Option<String>,
	#[arg(long, value_name = "URI")]
	pub scheme: Option<String>,
	#[arg(long, value_name = "LANG")]
	pub lang: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EvalDataset {
	name: Option<String>,
	defaults: Option<EvalDefaults>,
	queries: Vec<EvalQuery>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct EvalDefaults {
	scheme_uri: Option<String>,
	lang: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct EvalQuery {
	id: Option<String>,
	text: String,
	scheme_uri: Option<String>,
	lang: Option<String>,
	hint_type: Option<String>,
	ancestor_filter: Option<String>,
	expected_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct EvalOutput {
	dataset: EvalDatasetInfo,
	summary: EvalSummary,
	queries: Vec<QueryReport>,
}

#[derive(Debug, Serialize)]
struct EvalDatasetInfo {
	name: String,
	query_count: usize,
}

#[derive(Debug, Serialize)]
struct QueryReport {
	id: String,
	text: String,
	trace_id: Uuid,
	classification_uri: Option<String>,
	confidence: f32,
	validated: bool,
	abstain_reason: Option<String>,
	latency_ms: f64,
	#[serde(skip_serializing_if = "Option::is_none")]
	expected_uri: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	correct: Option<bool>,
}

#[derive(Debug, Serialize)]
struct EvalSummary {
	labelled_count: usize,
	accuracy: Option<f64>,
	validated_rate: f64,
	abstentions: BTreeMap<String, usize>,
	latency_ms_p50: f64,
	latency_ms_p95: f64,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = skos_config::load_with_env(&args.config)?;
	let filter = EnvFilter::try_new(&config.service.log_level)
		.unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	let dataset = match (&args.dataset, &args.text) {
		(Some(path), _) => load_dataset(path)?,
		(None, Some(text)) => single_text_dataset(text),
		(None, None) => return Err(eyre::eyre!("Either --dataset or --text is required.")),
	};
	let output = eval_dataset(config, &dataset, &args).await?;
	let json = serde_json::to_string_pretty(&output)?;

	println!("{json}");

	Ok(())
}

fn load_dataset(path: &Path) -> color_eyre::Result<EvalDataset> {
	let raw = fs::read_to_string(path)?;
	let dataset: EvalDataset = serde_json::from_str(&raw)?;

	if dataset.queries.is_empty() {
		return Err(eyre::eyre!("Dataset must include at least one query."));
	}

	Ok(dataset)
}

fn single_text_dataset(text: &str) -> EvalDataset {
	EvalDataset {
		name: Some("text".to_string()),
		defaults: None,
		queries: vec![EvalQuery { text: text.to_string(), ..Default::default() }],
	}
}

async fn eval_dataset(
	config: Config,
	dataset: &EvalDataset,
	args: &Args,
) -> color_eyre::Result<EvalOutput> {
	let classifier = SkosClassifier::new(config)?;
	let defaults = dataset.defaults.clone().unwrap_or_default();

	let mut reports = Vec::with_capacity(dataset.queries.len());
	let mut latencies_ms = Vec::with_capacity(dataset.queries.len());

	for (index, query) in dataset.queries.iter().enumerate() {
		let request = build_request(&defaults, query, args);
		let start = Instant::now();
		let response = classifier.classify(request).await;
		let latency_ms = start.elapsed().as_secs_f64() * 1_000.0;

		tracing::debug!(
			trace_id = %response.trace_id,
			latency_ms,
			validated = response.validated,
			"Query classified."
		);

		reports.push(report(index, query, response, latency_ms));
		latencies_ms.push(latency_ms);
	}

	let summary = summarize(&reports, &latencies_ms);

	Ok(EvalOutput {
		dataset: EvalDatasetInfo {
			name: dataset.name.clone().unwrap_or_else(|| "eval".to_string()),
			query_count: reports.len(),
		},
		summary,
		queries: reports,
	})
}

/// Query fields win over dataset defaults, which win over command-line flags.
fn build_request(defaults: &EvalDefaults, query: &EvalQuery, args: &Args) -> ClassifyRequest {
	let scheme_uri = query
		.scheme_uri
		.clone()
		.or_else(|| defaults.scheme_uri.clone())
		.or_else(|| args.scheme.clone())
		.unwrap_or_default();
	let lang =
		query.lang.clone().or_else(|| defaults.lang.clone()).or_else(|| args.lang.clone());

	ClassifyRequest {
		text: query.text.clone(),
		scheme_uri,
		lang,
		hint_type: query.hint_type.clone(),
		ancestor_filter: query.ancestor_filter.clone(),
	}
}

fn report(
	index: usize,
	query: &EvalQuery,
	response: ClassifyResponse,
	latency_ms: f64,
) -> QueryReport {
	let classification_uri = response.classification.map(|classification| classification.uri);
	// An abstention on a labelled query counts as a miss.
	let correct = query.expected_uri.as_ref().map(|expected| {
		response.validated && classification_uri.as_deref() == Some(expected.as_str())
	});

	QueryReport {
		id: query.id.clone().unwrap_or_else(|| format!("q{}", index + 1)),
		text: query.text.clone(),
		trace_id: response.trace_id,
		classification_uri,
		confidence: response.confidence,
		validated: response.validated,
		abstain_reason: response.abstain_reason,
		latency_ms,
		expected_uri: query.expected_uri.clone(),
		correct,
	}
}

fn summarize(reports: &[QueryReport], latencies_ms: &[f64]) -> EvalSummary {
	let labelled: Vec<bool> = reports.iter().filter_map(|r| r.correct).collect();
	let accuracy = (!labelled.is_empty()).then(|| {
		labelled.iter().filter(|correct| **correct).count() as f64 / labelled.len() as f64
	});
	let validated = reports.iter().filter(|r| r.validated).count();
	let validated_rate = validated as f64 / reports.len().max(1) as f64;

	let mut abstentions = BTreeMap::new();

	for reason in reports.iter().filter_map(|r| r.abstain_reason.as_deref()) {
		*abstentions.entry(abstention_bucket(reason).to_string()).or_insert(0) += 1;
	}

	let mut sorted = latencies_ms.to_vec();

	sorted.sort_by(|a, b| a.total_cmp(b));

	EvalSummary {
		labelled_count: labelled.len(),
		accuracy,
		validated_rate,
		abstentions,
		latency_ms_p50: percentile(&sorted, 0.50),
		latency_ms_p95: percentile(&sorted, 0.95),
	}
}

/// Error reasons carry a free-form message after the stage; only the kind and stage are grouped.
fn abstention_bucket(reason: &str) -> &str {
	match reason.split_once(':') {
		Some(("retrieval_error", rest)) => {
			let stage_len = rest.find(':').unwrap_or(rest.len());

			&reason[..("retrieval_error:".len() + stage_len)]
		},
		Some((kind @ ("invalid_input" | "internal_error"), _)) => kind,
		_ => reason,
	}
}

fn percentile(values: &[f64], percentile: f64) -> f64 {
	if values.is_empty() {
		return 0.0;
	}

	let clamped = percentile.clamp(0.0, 1.0);
	let pos = clamped * (values.len() as f64 - 1.0);
	let lower = pos.floor() as usize;
	let upper = pos.ceil() as usize;

	if lower == upper {
		values[lower]
	} else {
		let weight = pos - lower as f64;

		values[lower] * (1.0 - weight) + values[upper] * weight
	}
}
