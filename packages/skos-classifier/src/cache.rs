use std::{sync::Arc, time::Duration};

use moka::sync::Cache;

use crate::EmbeddingMode;

/// Query embeddings shared by every in-flight request, bounded by entry count and expired by
/// time-to-live.
#[derive(Clone)]
pub struct EmbeddingCache {
	inner: Cache<blake3::Hash, Arc<[f32]>>,
}
impl EmbeddingCache {
	pub fn new(capacity: u64, ttl: Duration) -> Self {
		Self { inner: Cache::builder().max_capacity(capacity).time_to_live(ttl).build() }
	}

	pub fn from_config(cfg: &skos_config::Embedding) -> Self {
		Self::new(cfg.cache_size, Duration::from_secs(cfg.cache_ttl))
	}

	pub fn key(mode: EmbeddingMode, text: &str) -> blake3::Hash {
		let mut hasher = blake3::Hasher::new();

		hasher.update(mode.as_str().as_bytes());
		hasher.update(&[0]);
		hasher.update(text.as_bytes());

		hasher.finalize()
	}

	pub fn get(&self, mode: EmbeddingMode, text: &str) -> Option<Vec<f32>> {
		self.inner.get(&Self::key(mode, text)).map(|vector| vector.to_vec())
	}

	pub fn insert(&self, mode: EmbeddingMode, text: &str, vector: &[f32]) {
		self.inner.insert(Self::key(mode, text), Arc::from(vector));
	}

	pub fn entry_count(&self) -> u64 {
		self.inner.run_pending_tasks();

		self.inner.entry_count()
	}
}
