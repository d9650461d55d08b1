//! Bearer token cache with single-flight refresh.
//!
//! Each client owns a [`TokenManager`] holding one slot per [`TokenKind`]. A slot moves
//! from [`TokenState::Unset`] to [`TokenState::Pending`] when the first caller starts an
//! exchange and settles as [`TokenState::Resolved`] or [`TokenState::Failed`]. Callers that
//! arrive while an exchange is in flight wait on the slot's flight guard and receive that
//! exchange's outcome; they never start a second request.
//!
//! Every settlement bumps the slot's generation. A waiter compares the generation it saw
//! before queueing with the one it finds after acquiring the guard, which is how it tells
//! "the flight I waited for finished" apart from "nobody has tried yet".

mod metrics;

pub use metrics::TokenMetrics;

// self
use crate::{
	_prelude::*,
	auth::{Secret, TokenKind},
	error::AuthError,
	obs::{OpKind, OpRecord, OpSpan},
};

/// What happens to a slot after an exchange fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshFailurePolicy {
	/// The slot keeps the failure; later callers receive the same error until
	/// [`TokenManager::reset`] is called.
	#[default]
	Sticky,
	/// The next caller after a failed flight starts a fresh exchange.
	Retry,
}

/// Observable state of a token slot.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenState {
	/// No token and no exchange yet.
	Unset,
	/// An exchange is in flight.
	Pending,
	/// A token is cached.
	Resolved(Secret),
	/// The last exchange failed.
	Failed(AuthError),
}

#[derive(Debug)]
struct TokenSlot {
	inner: Mutex<SlotInner>,
	flight: AsyncMutex<()>,
}
impl TokenSlot {
	fn new(state: TokenState) -> Self {
		Self { inner: Mutex::new(SlotInner { state, generation: 0 }), flight: AsyncMutex::new(()) }
	}
}

#[derive(Debug)]
struct SlotInner {
	state: TokenState,
	generation: u64,
}
impl SlotInner {
	fn settle(&mut self, state: TokenState) {
		self.state = state;
		self.generation += 1;
	}
}

/// Per-client token cache keyed by [`TokenKind`].
#[derive(Debug)]
pub struct TokenManager {
	supplier: TokenSlot,
	fulfillment: TokenSlot,
	policy: RefreshFailurePolicy,
	metrics: Arc<TokenMetrics>,
}
impl TokenManager {
	/// Creates a manager with every slot unset.
	pub fn new(policy: RefreshFailurePolicy) -> Self {
		Self {
			supplier: TokenSlot::new(TokenState::Unset),
			fulfillment: TokenSlot::new(TokenState::Unset),
			policy,
			metrics: Default::default(),
		}
	}

	/// Seeds `kind` with a preset token.
	pub fn with_token(self, kind: TokenKind, token: Secret) -> Self {
		self.slot(kind).inner.lock().settle(TokenState::Resolved(token));

		self
	}

	/// Failure policy in effect.
	pub fn policy(&self) -> RefreshFailurePolicy {
		self.policy
	}

	/// Cache and single-flight counters.
	pub fn metrics(&self) -> &Arc<TokenMetrics> {
		&self.metrics
	}

	/// Snapshot of the slot for `kind`.
	pub fn state(&self, kind: TokenKind) -> TokenState {
		self.slot(kind).inner.lock().state.clone()
	}

	/// Clears the slot for `kind` so the next caller exchanges again.
	pub fn reset(&self, kind: TokenKind) {
		self.slot(kind).inner.lock().settle(TokenState::Unset);
	}

	/// Returns the cached token, waiting for an in-flight exchange or starting one through
	/// `exchange` when nothing usable is cached.
	pub async fn get_token<F, Fut>(&self, kind: TokenKind, exchange: F) -> Result<Secret, AuthError>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Secret, AuthError>>,
	{
		let observed = {
			let inner = self.slot(kind).inner.lock();

			match &inner.state {
				TokenState::Resolved(token) => {
					self.metrics.record_cache_hit();

					return Ok(token.clone());
				},
				TokenState::Failed(err) if self.policy == RefreshFailurePolicy::Sticky => {
					self.metrics.record_replayed_failure();

					return Err(err.clone());
				},
				_ => inner.generation,
			}
		};

		self.single_flight(kind, observed, exchange).await
	}

	/// Starts a new exchange for `kind`, replacing any cached token.
	///
	/// When another exchange settles while the caller waits for the flight guard, the
	/// caller receives that outcome instead of issuing a second request.
	pub async fn refresh<F, Fut>(&self, kind: TokenKind, exchange: F) -> Result<Secret, AuthError>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Secret, AuthError>>,
	{
		let observed = self.slot(kind).inner.lock().generation;

		self.single_flight(kind, observed, exchange).await
	}

	/// Runs `exchange` under the slot's flight guard unless a flight settled after the
	/// caller observed generation `observed`.
	async fn single_flight<F, Fut>(
		&self,
		kind: TokenKind,
		observed: u64,
		exchange: F,
	) -> Result<Secret, AuthError>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Secret, AuthError>>,
	{
		let slot = self.slot(kind);
		let _flight = slot.flight.lock().await;

		{
			let mut inner = slot.inner.lock();

			if inner.generation != observed {
				let settled = match &inner.state {
					TokenState::Resolved(token) => Some(Ok(token.clone())),
					TokenState::Failed(err) => Some(Err(err.clone())),
					TokenState::Unset | TokenState::Pending => None,
				};

				if let Some(settled) = settled {
					self.metrics.record_coalesced();

					return settled;
				}
			}

			inner.state = TokenState::Pending;
		}

		let span = OpSpan::new(OpKind::TokenRefresh, kind.as_str());
		let record = OpRecord::start(OpKind::TokenRefresh);
		let result = span.instrument(exchange()).await;

		record.finish(&result);
		slot.inner.lock().settle(match &result {
			Ok(token) => TokenState::Resolved(token.clone()),
			Err(err) => TokenState::Failed(err.clone()),
		});

		result
	}

	fn slot(&self, kind: TokenKind) -> &TokenSlot {
		match kind {
			TokenKind::Supplier => &self.supplier,
			TokenKind::Fulfillment => &self.fulfillment,
		}
	}
}
impl Default for TokenManager {
	fn default() -> Self {
		Self::new(RefreshFailurePolicy::default())
	}
}
