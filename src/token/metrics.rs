// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-manager counters for token lookups that never reach the token endpoint.
///
/// Exchanges themselves are counted by the `token_refresh` operation series in
/// [`crate::obs`]; these counters show how much work the cache and the single-flight
/// guard saved.
#[derive(Debug, Default)]
pub struct TokenMetrics {
	cache_hits: AtomicU64,
	coalesced: AtomicU64,
	replayed_failures: AtomicU64,
}
impl TokenMetrics {
	/// Lookups answered from a cached token.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Callers that waited on another caller's exchange and received its outcome.
	pub fn coalesced(&self) -> u64 {
		self.coalesced.load(Ordering::Relaxed)
	}

	/// Lookups answered with a stored failure under the sticky policy.
	pub fn replayed_failures(&self) -> u64 {
		self.replayed_failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_coalesced(&self) {
		self.coalesced.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_replayed_failure(&self) {
		self.replayed_failures.fetch_add(1, Ordering::Relaxed);
	}
}
