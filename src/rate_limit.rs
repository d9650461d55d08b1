//! Per-credential request budgets shared across client instances.
//!
//! A [`RateLimiterRegistry`] is owned by the application's composition root and handed to
//! every client. Clients constructed with the same credential key receive the same
//! [`RateLimiter`], so they throttle each other rather than only themselves. Registering
//! settings for a key that already exists overwrites them in place: the last client
//! constructed with a key decides its budget.
//!
//! Each limiter is a reservoir: a call takes one unit, calls queue in FIFO order once the
//! reservoir is empty, and the reservoir is restored to the refresh amount at every window
//! boundary. A call still queued after [`RateLimitSettings::timeout`] fails with
//! [`RateLimitTimeoutError`].

mod settings;

pub use settings::*;

// std
use std::time::Duration;
// crates.io
use tokio::{sync::Mutex as FifoMutex, time::Instant};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, RateLimitTimeoutError},
	http::{HttpTransport, OutboundRequest, TransportFuture},
	obs::{OpKind, OpOutcome, OpRecord, OpSpan},
};

/// Table of per-key limiters.
#[derive(Debug)]
pub struct RateLimiterRegistry {
	defaults: RateLimitSettings,
	limiters: Mutex<HashMap<String, Arc<RateLimiter>>>,
}
impl RateLimiterRegistry {
	/// Creates a registry whose limiters start from `defaults` unless a client supplies its
	/// own settings.
	pub fn new(defaults: RateLimitSettings) -> Result<Self, ConfigError> {
		defaults.validate()?;

		Ok(Self { defaults, limiters: Default::default() })
	}

	/// Settings applied to keys registered without explicit settings.
	pub fn defaults(&self) -> RateLimitSettings {
		self.defaults
	}

	/// Returns the limiter for `key`, creating it on first use.
	///
	/// Explicit `settings` overwrite the existing configuration of the key; `None` keeps
	/// whatever the key already has (or the registry defaults for a new key).
	pub fn register(
		&self,
		key: &str,
		settings: Option<RateLimitSettings>,
	) -> Result<Arc<RateLimiter>, ConfigError> {
		if let Some(settings) = settings.as_ref() {
			settings.validate()?;
		}

		let mut limiters = self.limiters.lock();

		if let Some(existing) = limiters.get(key) {
			if let Some(settings) = settings {
				existing.update_settings(settings);
			}

			return Ok(existing.clone());
		}

		let limiter = Arc::new(RateLimiter::new(key, settings.unwrap_or(self.defaults)));

		limiters.insert(key.to_owned(), limiter.clone());

		Ok(limiter)
	}

	/// Overwrites the settings of `key`, creating the limiter when missing.
	pub fn update_settings(
		&self,
		key: &str,
		settings: RateLimitSettings,
	) -> Result<Arc<RateLimiter>, ConfigError> {
		self.register(key, Some(settings))
	}

	/// Routes `transport` through the limiter registered for `key`.
	///
	/// The returned transport has the same interface as the wrapped one; every `send` waits
	/// for a reservoir unit first.
	pub fn wrap<T>(
		&self,
		key: &str,
		settings: Option<RateLimitSettings>,
		transport: T,
	) -> Result<ThrottledTransport<T>, ConfigError>
	where
		T: HttpTransport,
	{
		let limiter = self.register(key, settings)?;

		Ok(ThrottledTransport { limiter, inner: transport })
	}

	/// Looks up an existing limiter.
	pub fn get(&self, key: &str) -> Option<Arc<RateLimiter>> {
		self.limiters.lock().get(key).cloned()
	}

	/// Number of registered keys.
	pub fn len(&self) -> usize {
		self.limiters.lock().len()
	}

	/// Returns `true` when no key has been registered yet.
	pub fn is_empty(&self) -> bool {
		self.limiters.lock().is_empty()
	}
}
impl Default for RateLimiterRegistry {
	fn default() -> Self {
		Self { defaults: RateLimitSettings::DEFAULT, limiters: Default::default() }
	}
}

/// Reservoir limiter shared by every client using one credential key.
pub struct RateLimiter {
	key: String,
	state: Mutex<ReservoirState>,
	queue: FifoMutex<()>,
}
impl RateLimiter {
	fn new(key: &str, settings: RateLimitSettings) -> Self {
		Self {
			key: key.to_owned(),
			state: Mutex::new(ReservoirState::new(settings, Instant::now())),
			queue: FifoMutex::new(()),
		}
	}

	/// Credential key this limiter is registered under.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Current settings.
	pub fn settings(&self) -> RateLimitSettings {
		self.state.lock().settings
	}

	/// Units left in the current window.
	pub fn available(&self) -> u32 {
		let mut state = self.state.lock();

		state.refill(Instant::now());

		state.reservoir
	}

	/// Overwrites the settings in place.
	///
	/// Identical settings are a no-op so re-registering a key never tops the reservoir up;
	/// changed settings restart the window with the new capacity.
	pub fn update_settings(&self, settings: RateLimitSettings) {
		let mut state = self.state.lock();

		if state.settings != settings {
			*state = ReservoirState::new(settings, Instant::now());
		}
	}

	/// Waits (FIFO) for one reservoir unit, failing once the queue timeout elapses.
	pub async fn acquire(&self) -> Result<(), RateLimitTimeoutError> {
		let timeout = self.settings().timeout();
		let deadline = Instant::now() + timeout;
		let span = OpSpan::new(OpKind::RateLimitWait, "acquire");
		let record = OpRecord::start(OpKind::RateLimitWait);
		let result = span
			.instrument(tokio::time::timeout_at(deadline, self.wait_for_unit()))
			.await
			.map_err(|_| RateLimitTimeoutError { key: self.key.clone(), timeout });

		if record.finish(&result) == OpOutcome::Failure {
			#[cfg(feature = "tracing")]
			tracing::warn!(key = %self.key, ?timeout, "rate limited call timed out in queue");
		}

		result
	}

	/// Builds and runs the call produced by `call` once a reservoir unit is available.
	///
	/// `call` is not invoked when the wait times out.
	pub async fn schedule<F, Fut, T>(&self, call: F) -> Result<T>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		self.acquire().await?;

		call().await
	}

	async fn wait_for_unit(&self) {
		let _turn = self.queue.lock().await;

		loop {
			let next_refill = {
				let mut state = self.state.lock();

				if state.try_take(Instant::now()) {
					return;
				}

				state.next_refill()
			};

			tokio::time::sleep_until(next_refill).await;
		}
	}
}
impl Debug for RateLimiter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("RateLimiter")
			.field("key", &self.key)
			.field("settings", &state.settings)
			.field("reservoir", &state.reservoir)
			.finish()
	}
}

#[derive(Debug)]
struct ReservoirState {
	settings: RateLimitSettings,
	reservoir: u32,
	window_started: Instant,
}
impl ReservoirState {
	fn new(settings: RateLimitSettings, now: Instant) -> Self {
		Self { settings, reservoir: settings.reservoir, window_started: now }
	}

	fn refill(&mut self, now: Instant) {
		let interval = self.settings.refresh_interval();
		let elapsed = now.saturating_duration_since(self.window_started);

		if elapsed < interval {
			return;
		}

		let windows = elapsed.as_millis() / interval.as_millis().max(1);
		let advance = u64::try_from(windows.saturating_mul(interval.as_millis()))
			.unwrap_or(u64::MAX);

		self.reservoir = self.settings.reservoir_refresh_amount;
		self.window_started += Duration::from_millis(advance);
	}

	fn try_take(&mut self, now: Instant) -> bool {
		self.refill(now);

		if self.reservoir == 0 {
			return false;
		}

		self.reservoir -= 1;

		true
	}

	fn next_refill(&self) -> Instant {
		self.window_started + self.settings.refresh_interval()
	}
}

/// Transport wrapper that waits on a shared [`RateLimiter`] before every request.
#[derive(Debug)]
pub struct ThrottledTransport<T> {
	limiter: Arc<RateLimiter>,
	inner: T,
}
impl<T> ThrottledTransport<T> {
	/// Limiter gating this transport.
	pub fn limiter(&self) -> &Arc<RateLimiter> {
		&self.limiter
	}

	/// Unthrottled transport underneath.
	pub fn inner(&self) -> &T {
		&self.inner
	}
}
impl<T> HttpTransport for ThrottledTransport<T>
where
	T: HttpTransport,
{
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_> {
		Box::pin(self.limiter.schedule(move || self.inner.send(request)))
	}
}
