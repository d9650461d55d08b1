//! Static client configuration: base URL, default headers, and optional basic-auth pair.

// self
use crate::{_prelude::*, auth::Secret, error::ConfigError, http::Headers};

/// Validated configuration shared by every client talking to the same deployment.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
	/// Base URL without a trailing slash; request paths are appended verbatim.
	pub base_url: String,
	/// Baseline headers sent with every request.
	#[serde(default = "ClientConfig::default_headers")]
	pub headers: Headers,
	/// Static basic-auth username that takes precedence over credentials.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub basic_user: Option<String>,
	/// Static basic-auth password that takes precedence over credentials.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub basic_pass: Option<Secret>,
}
impl ClientConfig {
	/// Starts a builder for the provided base URL.
	pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// JSON `accept` + `content-type` headers.
	pub fn default_headers() -> Headers {
		Headers::new().with("accept", "application/json").with("content-type", "application/json")
	}

	/// Re-runs builder validation, e.g. after deserializing from a file.
	pub fn validated(self) -> Result<Self, ConfigError> {
		ClientConfigBuilder {
			base_url: self.base_url,
			headers: self.headers,
			basic_user: self.basic_user,
			basic_pass: self.basic_pass,
		}
		.build()
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Base URL as supplied.
	pub base_url: String,
	/// Headers accumulated so far.
	pub headers: Headers,
	/// Optional basic-auth username.
	pub basic_user: Option<String>,
	/// Optional basic-auth password.
	pub basic_pass: Option<Secret>,
}
impl ClientConfigBuilder {
	/// Creates a builder seeded with [`ClientConfig::default_headers`].
	pub fn new(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into(),
			headers: ClientConfig::default_headers(),
			basic_user: None,
			basic_pass: None,
		}
	}

	/// Adds or replaces a default header.
	pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Replaces the whole default header set.
	pub fn headers(mut self, headers: Headers) -> Self {
		self.headers = headers;

		self
	}

	/// Sets the static basic-auth pair.
	pub fn basic_auth(mut self, user: impl Into<String>, pass: impl Into<Secret>) -> Self {
		self.basic_user = Some(user.into());
		self.basic_pass = Some(pass.into());

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let trimmed = self.base_url.trim().trim_end_matches('/').to_owned();
		let parsed = Url::parse(&trimmed)
			.map_err(|source| ConfigError::InvalidUrl { url: trimmed.clone(), source })?;

		if !matches!(parsed.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { url: trimmed });
		}

		for (name, value) in &self.headers {
			validate_header(name, value)?;
		}

		Ok(ClientConfig {
			base_url: trimmed,
			headers: self.headers,
			basic_user: self.basic_user,
			basic_pass: self.basic_pass,
		})
	}
}

/// Rejects header names/values that cannot be sent over HTTP/1.1.
pub(crate) fn validate_header(name: &str, value: &str) -> Result<(), ConfigError> {
	let name_ok = !name.is_empty()
		&& name.bytes().all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));
	let value_ok = value.bytes().all(|b| b == b'\t' || (b' '..=b'~').contains(&b) || b >= 0x80);

	if name_ok && value_ok { Ok(()) } else { Err(ConfigError::InvalidHeader { name: name.into() }) }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builder_trims_trailing_slash_and_keeps_defaults() {
		let config = ClientConfig::builder("https://mp.example.com/api/")
			.header("X-Client", "tests")
			.build()
			.expect("Config should build for a valid base URL.");

		assert_eq!(config.base_url, "https://mp.example.com/api");
		assert_eq!(config.headers.get("accept"), Some("application/json"));
		assert_eq!(config.headers.get("x-client"), Some("tests"));
	}

	#[test]
	fn builder_rejects_invalid_urls_and_headers() {
		assert!(matches!(
			ClientConfig::builder("not a url").build(),
			Err(ConfigError::InvalidUrl { .. })
		));
		assert!(matches!(
			ClientConfig::builder("ftp://mp.example.com").build(),
			Err(ConfigError::UnsupportedScheme { .. })
		));
		assert!(matches!(
			ClientConfig::builder("https://mp.example.com").header("bad header", "x").build(),
			Err(ConfigError::InvalidHeader { name }) if name == "bad header"
		));
		assert!(matches!(
			ClientConfig::builder("https://mp.example.com").header("x-ok", "line\nbreak").build(),
			Err(ConfigError::InvalidHeader { .. })
		));
	}

	#[test]
	fn config_deserializes_from_camel_case() {
		let config: ClientConfig = serde_json::from_value(serde_json::json!({
			"baseUrl": "https://mp.example.com/",
			"basicUser": "user",
			"basicPass": "pass",
		}))
		.expect("Config should deserialize from camelCase JSON.");
		let config = config.validated().expect("Deserialized config should validate.");

		assert_eq!(config.base_url, "https://mp.example.com");
		assert_eq!(config.headers.get("content-type"), Some("application/json"));
		assert_eq!(config.basic_pass.as_ref().map(Secret::expose), Some("pass"));
	}
}
