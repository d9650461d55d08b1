//! Constructor credentials and the resolver that turns them into an active scheme.
//!
//! A client is created from an [`AuthScheme`] hint plus optional [`Credentials`]. The
//! [`CredentialResolver`] applies the override rules (an explicit `auth` field beats the
//! hint), validates the fields each scheme needs, and produces a [`ResolvedAuth`] that the
//! client keeps for its whole lifetime.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
// self
use crate::{
	_prelude::*,
	auth::{AuthScheme, Secret, TokenKind},
	config::ClientConfig,
	error::ValidationError,
	rate_limit::RateLimitSettings,
};

/// Raw credentials supplied when constructing a client.
///
/// Field names follow the marketplace's camelCase configuration shape, so values can be
/// deserialized straight from JSON.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
	/// Explicit scheme that overrides the constructor hint.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub auth: Option<AuthScheme>,
	/// Consumer key exchanged for a bearer token; also the rate limit key.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub key: Option<String>,
	/// Consumer secret paired with [`Credentials::key`].
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub secret: Option<Secret>,
	/// Preset bearer token that skips the first exchange.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token: Option<Secret>,
	/// Basic-auth username.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user: Option<String>,
	/// Basic-auth password.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pass: Option<Secret>,
	/// Per-credential request budget.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub api_rate_limit: Option<RateLimitSettings>,
}
impl Credentials {
	/// Consumer key + secret pair for bearer schemes.
	pub fn consumer(key: impl Into<String>, secret: impl Into<Secret>) -> Self {
		Self { key: Some(key.into()), secret: Some(secret.into()), ..Default::default() }
	}

	/// Preset bearer token.
	pub fn token(token: impl Into<Secret>) -> Self {
		Self { token: Some(token.into()), ..Default::default() }
	}

	/// Basic-auth username + password.
	pub fn basic(user: impl Into<String>, pass: impl Into<Secret>) -> Self {
		Self { user: Some(user.into()), pass: Some(pass.into()), ..Default::default() }
	}

	/// Sets the explicit scheme override.
	pub fn with_auth(mut self, auth: AuthScheme) -> Self {
		self.auth = Some(auth);

		self
	}

	/// Attaches a preset token alongside other fields.
	pub fn with_token(mut self, token: impl Into<Secret>) -> Self {
		self.token = Some(token.into());

		self
	}

	/// Attaches a per-credential request budget.
	pub fn with_rate_limit(mut self, settings: RateLimitSettings) -> Self {
		self.api_rate_limit = Some(settings);

		self
	}
}

/// Basic-auth pair resolved from configuration or credentials.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicCredentials {
	/// Username.
	pub user: String,
	/// Password.
	pub pass: Secret,
}
impl BasicCredentials {
	/// Renders the `Authorization` header value.
	pub fn header_value(&self) -> String {
		let encoded = STANDARD.encode(format!("{}:{}", self.user, self.pass.expose()));

		format!("Basic {encoded}")
	}
}

/// Bearer material resolved from credentials.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BearerCredentials {
	/// Token kind exchanged by default.
	pub kind: TokenKind,
	/// Consumer key, when present.
	pub key: Option<String>,
	/// Consumer secret, when present.
	pub secret: Option<Secret>,
	/// Preset token, when present.
	pub token: Option<Secret>,
	/// Requested request budget for the credential key.
	pub rate_limit: Option<RateLimitSettings>,
}
impl BearerCredentials {
	/// Key the shared rate limiter is registered under: the consumer key, else the token.
	pub fn limiter_key(&self) -> &str {
		match (&self.key, &self.token) {
			(Some(key), _) => key,
			(None, Some(token)) => token.expose(),
			(None, None) => "",
		}
	}
}

/// Scheme-specific material selected by [`CredentialResolver::resolve`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedAuth {
	/// Requests carry no `Authorization` header by default.
	None,
	/// Requests use HTTP basic auth.
	Basic(BasicCredentials),
	/// Requests use a bearer token of the contained kind.
	Bearer(BearerCredentials),
}
impl ResolvedAuth {
	/// Scheme this resolution corresponds to.
	pub fn scheme(&self) -> AuthScheme {
		match self {
			Self::None => AuthScheme::None,
			Self::Basic(_) => AuthScheme::Basic,
			Self::Bearer(bearer) => match bearer.kind {
				TokenKind::Supplier => AuthScheme::Bearer,
				TokenKind::Fulfillment => AuthScheme::BearerFulfillment,
			},
		}
	}
}

/// Validates constructor input and selects the active scheme.
#[derive(Clone, Copy, Debug, Default)]
pub struct CredentialResolver;
impl CredentialResolver {
	/// Resolves `hint` + `credentials` against the static `config`.
	pub fn resolve(
		hint: AuthScheme,
		credentials: Option<&Credentials>,
		config: &ClientConfig,
	) -> Result<ResolvedAuth, ValidationError> {
		let scheme = credentials.and_then(|creds| creds.auth).unwrap_or(hint);

		match scheme {
			AuthScheme::None => Ok(ResolvedAuth::None),
			AuthScheme::Basic =>
				Self::resolve_basic(credentials, config).map(ResolvedAuth::Basic),
			AuthScheme::Bearer | AuthScheme::BearerFulfillment => {
				let kind = scheme.token_kind().unwrap_or_default();

				Self::resolve_bearer(kind, credentials).map(ResolvedAuth::Bearer)
			},
		}
	}

	/// Resolves the basic pair.
	///
	/// Either the static config or the credentials must hold both a username and a
	/// password. Each field is then taken from the config when set there and from the
	/// credentials otherwise, so a config that only names a user still lends that user to
	/// a complete credential pair.
	pub fn resolve_basic(
		credentials: Option<&Credentials>,
		config: &ClientConfig,
	) -> Result<BasicCredentials, ValidationError> {
		let config_user = non_empty(config.basic_user.as_deref());
		let config_pass = config.basic_pass.as_ref().filter(|pass| !pass.is_empty());
		let creds_user = credentials.and_then(|creds| non_empty(creds.user.as_deref()));
		let creds_pass =
			credentials.and_then(|creds| creds.pass.as_ref()).filter(|pass| !pass.is_empty());
		let complete = (config_user.is_some() && config_pass.is_some())
			|| (creds_user.is_some() && creds_pass.is_some());

		match (config_user.or(creds_user), config_pass.or(creds_pass)) {
			(Some(user), Some(pass)) if complete =>
				Ok(BasicCredentials { user: user.to_owned(), pass: pass.clone() }),
			_ => Err(ValidationError::MissingBasicCredentials),
		}
	}

	fn resolve_bearer(
		kind: TokenKind,
		credentials: Option<&Credentials>,
	) -> Result<BearerCredentials, ValidationError> {
		let creds = credentials.ok_or(ValidationError::MissingBearerCredentials)?;
		let key = creds.key.clone().filter(|key| !key.is_empty());
		let secret = creds.secret.clone().filter(|secret| !secret.is_empty());
		let token = creds.token.clone().filter(|token| !token.is_empty());

		if (key.is_none() || secret.is_none()) && token.is_none() {
			return Err(ValidationError::MissingBearerCredentials);
		}

		Ok(BearerCredentials { kind, key, secret, token, rate_limit: creds.api_rate_limit })
	}
}

fn non_empty(value: Option<&str>) -> Option<&str> {
	value.filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config() -> ClientConfig {
		ClientConfig::builder("https://marketplace.test")
			.build()
			.expect("Test config should build successfully.")
	}

	fn config_with_basic() -> ClientConfig {
		ClientConfig::builder("https://marketplace.test")
			.basic_auth("config-user", "config-pass")
			.build()
			.expect("Test config with basic auth should build successfully.")
	}

	#[test]
	fn bearer_requires_key_and_secret_or_token() {
		let config = config();

		for creds in [
			None,
			Some(Credentials::default()),
			Some(Credentials { key: Some("key".into()), ..Default::default() }),
			Some(Credentials { secret: Some("secret".into()), ..Default::default() }),
			Some(Credentials::consumer("", "secret")),
		] {
			for scheme in [AuthScheme::Bearer, AuthScheme::BearerFulfillment] {
				assert_eq!(
					CredentialResolver::resolve(scheme, creds.as_ref(), &config),
					Err(ValidationError::MissingBearerCredentials),
				);
			}
		}

		let resolved = CredentialResolver::resolve(
			AuthScheme::Bearer,
			Some(&Credentials::token("preset")),
			&config,
		)
		.expect("A preset token should satisfy bearer validation.");

		assert_eq!(resolved.scheme(), AuthScheme::Bearer);
	}

	#[test]
	fn basic_requires_user_and_pass_from_config_or_credentials() {
		let config = config();

		assert_eq!(
			CredentialResolver::resolve(AuthScheme::Basic, None, &config),
			Err(ValidationError::MissingBasicCredentials),
		);
		assert_eq!(
			CredentialResolver::resolve(
				AuthScheme::Basic,
				Some(&Credentials { user: Some("u".into()), ..Default::default() }),
				&config,
			),
			Err(ValidationError::MissingBasicCredentials),
		);

		let from_creds = CredentialResolver::resolve(
			AuthScheme::Basic,
			Some(&Credentials::basic("u", "p")),
			&config,
		)
		.expect("Credential-supplied basic pair should resolve.");

		assert!(matches!(from_creds, ResolvedAuth::Basic(ref pair) if pair.user == "u"));

		let from_config = CredentialResolver::resolve(
			AuthScheme::Basic,
			Some(&Credentials::basic("u", "p")),
			&config_with_basic(),
		)
		.expect("Config-supplied basic pair should resolve.");

		assert!(matches!(from_config, ResolvedAuth::Basic(ref pair) if pair.user == "config-user"));
	}

	#[test]
	fn basic_fields_fall_back_one_by_one() {
		let mut config = config();

		config.basic_user = Some("config-user".into());

		let resolved = CredentialResolver::resolve_basic(Some(&Credentials::basic("u", "p")), &config)
			.expect("A complete credential pair should resolve.");

		assert_eq!(resolved.user, "config-user");
		assert_eq!(resolved.pass.expose(), "p");
		assert_eq!(
			CredentialResolver::resolve_basic(
				Some(&Credentials { pass: Some("p".into()), ..Default::default() }),
				&config,
			),
			Err(ValidationError::MissingBasicCredentials),
		);
	}

	#[test]
	fn explicit_auth_field_overrides_hint() {
		let creds = Credentials::consumer("key", "secret").with_auth(AuthScheme::BearerFulfillment);
		let resolved = CredentialResolver::resolve(AuthScheme::Basic, Some(&creds), &config())
			.expect("Explicit bearer override should resolve.");

		assert_eq!(resolved.scheme(), AuthScheme::BearerFulfillment);
	}

	#[test]
	fn limiter_key_falls_back_to_token() {
		let bearer = CredentialResolver::resolve_bearer(
			TokenKind::Supplier,
			Some(&Credentials::token("preset-token")),
		)
		.expect("Token-only credentials should resolve.");

		assert_eq!(bearer.limiter_key(), "preset-token");

		let bearer = CredentialResolver::resolve_bearer(
			TokenKind::Supplier,
			Some(&Credentials::consumer("consumer", "secret").with_token("preset-token")),
		)
		.expect("Key + secret credentials should resolve.");

		assert_eq!(bearer.limiter_key(), "consumer");
	}

	#[test]
	fn basic_header_is_base64_encoded() {
		let pair = BasicCredentials { user: "user".into(), pass: Secret::new("pass") };

		assert_eq!(pair.header_value(), "Basic dXNlcjpwYXNz");
	}
}
