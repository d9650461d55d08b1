//! Client-level error types shared across credential resolution, token exchange, rate
//! limiting, and dispatch.

// std
use std::time::Duration;
// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credentials are missing required fields.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token exchange failed; shared by every caller awaiting the same exchange.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Upstream answered with a non-2xx status.
	#[error(transparent)]
	Http(#[from] HttpError),
	/// A queued call waited longer than the limiter allows.
	#[error(transparent)]
	RateLimitTimeout(#[from] RateLimitTimeoutError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Successful response body could not be decoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),
}
impl Error {
	/// Returns the upstream error payload when the failure came from a non-2xx response.
	pub fn http_body(&self) -> Option<&Value> {
		match self {
			Self::Http(err) => Some(&err.body),
			_ => None,
		}
	}
}

/// Credential validation failures raised while constructing a client.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	/// Bearer schemes need a key + secret pair or a preset token.
	#[error("Not a valid consumerKey, consumerSecret, or token")]
	MissingBearerCredentials,
	/// Basic scheme needs a username and password from config or credentials.
	#[error("No valid Username or Password")]
	MissingBasicCredentials,
	/// The requested scheme label is not recognized.
	#[error("Unknown authentication scheme `{label}`.")]
	UnknownScheme {
		/// Label that failed to parse.
		label: String,
	},
}

/// Configuration failures raised by builders and request assembly.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// No transport was supplied and the `reqwest` feature is disabled.
	#[error("No HTTP transport is configured.")]
	MissingTransport,
	/// Base URL or composed request URL cannot be parsed.
	#[error("URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL text.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL does not use HTTP(S).
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Offending URL text.
		url: String,
	},
	/// Header name or value is not valid HTTP.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Header name as supplied.
		name: String,
	},
	/// Rate limit settings cannot drive a limiter.
	#[error("Rate limit settings are invalid: {reason}.")]
	InvalidRateLimit {
		/// Human-readable reason.
		reason: &'static str,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	BodySerialize(#[source] serde_json::Error),
}

/// Token exchange failures.
///
/// The error is cloned to every caller waiting on the same exchange, so it only carries
/// owned, clonable data.
#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum AuthError {
	/// The client has no consumer key + secret to exchange.
	#[error("Token exchange requires a consumer key and secret.")]
	MissingCredentials,
	/// Token endpoint answered with a non-2xx status.
	#[error("Token endpoint rejected the exchange: {0}")]
	Rejected(HttpError),
	/// Token endpoint answered 2xx without a `user.token` string.
	#[error("Token endpoint returned a malformed body: {message}.")]
	MalformedResponse {
		/// Path-aware decoding failure.
		message: String,
	},
	/// The exchange never produced a response (transport failure or limiter timeout).
	#[error("Token exchange failed: {message}.")]
	Exchange {
		/// Rendered underlying failure.
		message: String,
	},
}
impl AuthError {
	pub(crate) fn from_exchange(err: Error) -> Self {
		match err {
			Error::Auth(inner) => inner,
			Error::Http(inner) => Self::Rejected(inner),
			Error::Decode(inner) => Self::MalformedResponse { message: inner.to_string() },
			other => Self::Exchange { message: other.to_string() },
		}
	}
}

/// Non-2xx response carrying the parsed upstream body verbatim.
#[derive(Clone, Debug, PartialEq, ThisError)]
#[error("Upstream responded with status {status}: {body}.")]
pub struct HttpError {
	/// HTTP status code.
	pub status: u16,
	/// Parsed JSON body; non-JSON bodies are carried as a JSON string.
	pub body: Value,
}

/// Raised when a call stays queued behind the rate limiter past its timeout.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Call for rate limit key `{key}` stayed queued longer than {timeout:?}.")]
pub struct RateLimitTimeoutError {
	/// Limiter key the call was queued against.
	pub key: String,
	/// Timeout that elapsed.
	pub timeout: Duration,
}

/// Successful response body could not be decoded into the requested shape.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// Body is not valid JSON.
	#[error("Response from `{path}` is not valid JSON.")]
	Json {
		/// Request path that produced the body.
		path: String,
		/// Underlying parser failure.
		#[source]
		source: serde_json::Error,
	},
	/// Body is JSON but does not match the requested type.
	#[error("Response from `{path}` does not match the expected shape.")]
	Shape {
		/// Request path that produced the body.
		path: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Transport-level failures.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the marketplace API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn validation_messages_match_upstream_wording() {
		assert_eq!(
			ValidationError::MissingBearerCredentials.to_string(),
			"Not a valid consumerKey, consumerSecret, or token"
		);
		assert_eq!(
			ValidationError::MissingBasicCredentials.to_string(),
			"No valid Username or Password"
		);
	}

	#[test]
	fn exchange_errors_collapse_into_auth_errors() {
		let http = HttpError { status: 401, body: serde_json::json!({ "error": "bad key" }) };

		assert_eq!(AuthError::from_exchange(http.clone().into()), AuthError::Rejected(http));

		let timeout = RateLimitTimeoutError {
			key: "consumer".into(),
			timeout: Duration::from_millis(30),
		};

		assert!(matches!(
			AuthError::from_exchange(timeout.into()),
			AuthError::Exchange { message } if message.contains("consumer")
		));
		assert_eq!(
			AuthError::from_exchange(AuthError::MissingCredentials.into()),
			AuthError::MissingCredentials
		);
	}

	#[test]
	fn http_body_is_exposed_only_for_http_errors() {
		let err = Error::from(HttpError { status: 500, body: serde_json::json!({ "error": "bad" }) });

		assert_eq!(err.http_body(), Some(&serde_json::json!({ "error": "bad" })));
		assert!(Error::from(ValidationError::MissingBasicCredentials).http_body().is_none());
	}
}
