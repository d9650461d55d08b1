//! Marketplace client: resolved credentials, token cache, and the (possibly throttled)
//! transport every request goes through.

pub mod dispatch;
pub mod query;

mod token_exchange;

pub use dispatch::*;
pub use query::*;

// self
use crate::{
	_prelude::*,
	auth::{AuthScheme, CredentialResolver, Credentials, ResolvedAuth, Secret, TokenKind},
	config::ClientConfig,
	error::ConfigError,
	http::HttpTransport,
	rate_limit::{RateLimiter, RateLimiterRegistry},
	token::{RefreshFailurePolicy, TokenManager},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Authenticated client bound to one set of credentials.
///
/// The active scheme is fixed at construction. Bearer-derived clients route every request,
/// token exchanges included, through the limiter registered for their credential key, so
/// all clients built with that key draw from one reservoir. Clones share the token cache.
#[derive(Clone)]
pub struct Client {
	config: Arc<ClientConfig>,
	auth: ResolvedAuth,
	credentials: Option<Arc<Credentials>>,
	tokens: Arc<TokenManager>,
	transport: Arc<dyn HttpTransport>,
	unthrottled: Arc<dyn HttpTransport>,
	limiter: Option<Arc<RateLimiter>>,
}
impl Client {
	/// Starts a builder for a client sharing `config` and `registry`.
	pub fn builder(config: Arc<ClientConfig>, registry: Arc<RateLimiterRegistry>) -> ClientBuilder {
		ClientBuilder::new(config, registry)
	}

	/// Creates a reqwest-backed client for `hint` + `credentials`.
	#[cfg(feature = "reqwest")]
	pub fn new(
		config: Arc<ClientConfig>,
		registry: Arc<RateLimiterRegistry>,
		hint: AuthScheme,
		credentials: Option<Credentials>,
	) -> Result<Self> {
		let mut builder = Self::builder(config, registry).auth(hint);

		if let Some(credentials) = credentials {
			builder = builder.credentials(credentials);
		}

		builder.build()
	}

	/// Scheme applied when a call does not override it.
	pub fn scheme(&self) -> AuthScheme {
		self.auth.scheme()
	}

	/// Resolved credential material.
	pub fn resolved_auth(&self) -> &ResolvedAuth {
		&self.auth
	}

	/// Static configuration shared with other clients.
	pub fn config(&self) -> &Arc<ClientConfig> {
		&self.config
	}

	/// Token cache owned by this client.
	pub fn tokens(&self) -> &Arc<TokenManager> {
		&self.tokens
	}

	/// Shared limiter, present for bearer-derived clients.
	pub fn limiter(&self) -> Option<&Arc<RateLimiter>> {
		self.limiter.as_ref()
	}

	/// Token kind used when callers do not name one.
	fn default_token_kind(&self) -> TokenKind {
		self.scheme().token_kind().unwrap_or_default()
	}

	/// Returns the token for the client's scheme, exchanging credentials on first use.
	pub async fn get_token(&self) -> Result<Secret> {
		self.token(self.default_token_kind()).await
	}

	/// Returns the token of `kind`, exchanging credentials on first use.
	pub async fn token(&self, kind: TokenKind) -> Result<Secret> {
		Ok(self.tokens.get_token(kind, || self.exchange_token(kind)).await?)
	}

	/// Forces a new exchange for `kind`.
	pub async fn refresh_token(&self, kind: TokenKind) -> Result<Secret> {
		Ok(self.tokens.refresh(kind, || self.exchange_token(kind)).await?)
	}
}
impl Debug for Client {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("base_url", &self.config.base_url)
			.field("scheme", &self.scheme())
			.field("limiter_key", &self.limiter.as_ref().map(|limiter| limiter.key()))
			.finish()
	}
}

/// Builder for [`Client`] values.
pub struct ClientBuilder {
	config: Arc<ClientConfig>,
	registry: Arc<RateLimiterRegistry>,
	auth: AuthScheme,
	credentials: Option<Credentials>,
	transport: Option<Arc<dyn HttpTransport>>,
	failure_policy: RefreshFailurePolicy,
}
impl ClientBuilder {
	/// Creates a builder with no credentials and [`AuthScheme::None`].
	pub fn new(config: Arc<ClientConfig>, registry: Arc<RateLimiterRegistry>) -> Self {
		Self {
			config,
			registry,
			auth: AuthScheme::None,
			credentials: None,
			transport: None,
			failure_policy: RefreshFailurePolicy::default(),
		}
	}

	/// Sets the scheme hint; an `auth` field inside the credentials still wins.
	pub fn auth(mut self, auth: AuthScheme) -> Self {
		self.auth = auth;

		self
	}

	/// Sets the constructor credentials.
	pub fn credentials(mut self, credentials: Credentials) -> Self {
		self.credentials = Some(credentials);

		self
	}

	/// Overrides the HTTP transport (defaults to reqwest).
	pub fn transport(mut self, transport: impl HttpTransport) -> Self {
		self.transport = Some(Arc::new(transport));

		self
	}

	/// Overrides what happens after a failed token exchange.
	pub fn refresh_failure_policy(mut self, policy: RefreshFailurePolicy) -> Self {
		self.failure_policy = policy;

		self
	}

	/// Resolves credentials, registers the shared limiter, and builds the client.
	pub fn build(self) -> Result<Client> {
		let auth = CredentialResolver::resolve(self.auth, self.credentials.as_ref(), &self.config)?;
		let unthrottled = match self.transport {
			Some(transport) => transport,
			None => default_transport()?,
		};
		let mut tokens = TokenManager::new(self.failure_policy);
		let mut transport = unthrottled.clone();
		let mut limiter = None;

		if let ResolvedAuth::Bearer(bearer) = &auth {
			let throttled =
				self.registry.wrap(bearer.limiter_key(), bearer.rate_limit, unthrottled.clone())?;

			limiter = Some(throttled.limiter().clone());
			transport = Arc::new(throttled);

			if let Some(token) = bearer.token.clone() {
				tokens = tokens.with_token(bearer.kind, token);
			}
		}

		Ok(Client {
			config: self.config,
			auth,
			credentials: self.credentials.map(Arc::new),
			tokens: Arc::new(tokens),
			transport,
			unthrottled,
			limiter,
		})
	}
}
impl Debug for ClientBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientBuilder")
			.field("base_url", &self.config.base_url)
			.field("auth", &self.auth)
			.field("credentials_set", &self.credentials.is_some())
			.field("transport_set", &self.transport.is_some())
			.field("failure_policy", &self.failure_policy)
			.finish()
	}
}

#[cfg(feature = "reqwest")]
fn default_transport() -> Result<Arc<dyn HttpTransport>, ConfigError> {
	Ok(Arc::new(ReqwestTransport::default()))
}

#[cfg(not(feature = "reqwest"))]
fn default_transport() -> Result<Arc<dyn HttpTransport>, ConfigError> {
	Err(ConfigError::MissingTransport)
}
