//! Consumer key + secret exchange against the marketplace token endpoints.

// self
use crate::{
	_prelude::*,
	auth::{ResolvedAuth, Secret, TokenKind},
	client::{Client, DispatchOptions, dispatch},
	error::AuthError,
	http::Method,
};

#[derive(Serialize)]
struct TokenRequest<'a> {
	key: &'a str,
	secret: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
	user: TokenUser,
}

#[derive(Deserialize)]
struct TokenUser {
	token: Secret,
}

impl Client {
	/// Exchanges the consumer key + secret for a token of `kind`.
	///
	/// The request carries no `Authorization` header and goes through the client's
	/// (throttled) transport, so it consumes a unit of the credential key's budget.
	pub(super) async fn exchange_token(&self, kind: TokenKind) -> Result<Secret, AuthError> {
		let (key, secret) = match &self.auth {
			ResolvedAuth::Bearer(bearer) => match (&bearer.key, &bearer.secret) {
				(Some(key), Some(secret)) => (key.as_str(), secret.expose()),
				_ => return Err(AuthError::MissingCredentials),
			},
			_ => return Err(AuthError::MissingCredentials),
		};
		let endpoint = kind.endpoint();

		#[cfg(feature = "tracing")]
		tracing::debug!(kind = %kind, endpoint, "exchanging consumer credentials for a token");

		let token = self
			.request_token(endpoint, &TokenRequest { key, secret })
			.await
			.map_err(AuthError::from_exchange)?;

		if token.is_empty() {
			return Err(AuthError::MalformedResponse {
				message: format!("`user.token` returned by `{endpoint}` is empty"),
			});
		}

		Ok(token)
	}

	async fn request_token(&self, endpoint: &str, payload: &TokenRequest<'_>) -> Result<Secret> {
		let options = DispatchOptions::new().json(payload)?;
		let request = self.build_request(Method::Post, endpoint, &options, None)?;
		let response = self.transport.send(request).await?;
		let body = dispatch::normalize(endpoint, response)?;
		let TokenResponse { user } = dispatch::decode(endpoint, body)?;

		Ok(user.token)
	}
}
