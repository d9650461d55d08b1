//! Transport primitives for marketplace requests.
//!
//! The module exposes [`HttpTransport`] so downstream crates can plug in custom HTTP
//! stacks (or fakes) without touching the dispatcher. Requests arrive fully assembled:
//! the URL already carries the query string and the header set already contains the
//! computed `Authorization` value, so transports only move bytes.

// std
use std::{collections::btree_map, ops::Deref};
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<RawResponse>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing marketplace requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared across
/// client instances and wrapped by the rate limiter registry.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and returns the raw status + body.
	///
	/// Non-2xx statuses are **not** errors at this layer; the dispatcher normalizes them.
	/// Failures are reported as [`Error::Transport`], or [`Error::RateLimitTimeout`] for
	/// throttled transports.
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_>;
}
impl<T> HttpTransport for Arc<T>
where
	T: ?Sized + HttpTransport,
{
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_> {
		(**self).send(request)
	}
}

/// HTTP methods used by the marketplace API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the uppercase method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Patch => "PATCH",
			Self::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Header name carrying credentials.
pub const AUTHORIZATION: &str = "authorization";

/// Case-insensitive header set with lowercase names.
///
/// Later inserts replace earlier ones, which is how defaults, the computed
/// `Authorization` value, and per-call overrides are layered.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct Headers(BTreeMap<String, String>);
impl Headers {
	/// Creates an empty header set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts or replaces a header.
	pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
		self.0.insert(name.as_ref().to_ascii_lowercase(), value.into())
	}

	/// Builder-style [`Headers::insert`].
	pub fn with(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.insert(name, value);

		self
	}

	/// Removes a header, returning its value.
	pub fn remove(&mut self, name: &str) -> Option<String> {
		self.0.remove(&name.to_ascii_lowercase())
	}

	/// Looks up a header value.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Layers `other` on top of `self`; entries in `other` win.
	pub fn merged(&self, other: &Headers) -> Headers {
		let mut merged = self.clone();

		merged.0.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));

		merged
	}
}
impl Deref for Headers {
	type Target = BTreeMap<String, String>;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl From<BTreeMap<String, String>> for Headers {
	fn from(value: BTreeMap<String, String>) -> Self {
		value.into_iter().collect()
	}
}
impl From<Headers> for BTreeMap<String, String> {
	fn from(value: Headers) -> Self {
		value.0
	}
}
impl<K, V> FromIterator<(K, V)> for Headers
where
	K: AsRef<str>,
	V: Into<String>,
{
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
	{
		let mut headers = Self::new();

		for (name, value) in iter {
			headers.insert(name, value);
		}

		headers
	}
}
impl<'a> IntoIterator for &'a Headers {
	type IntoIter = btree_map::Iter<'a, String, String>;
	type Item = (&'a String, &'a String);

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}
impl Debug for Headers {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_map()
			.entries(self.0.iter().map(|(name, value)| {
				let shown = if name == AUTHORIZATION { "<redacted>" } else { value.as_str() };

				(name.as_str(), shown)
			}))
			.finish()
	}
}

/// Fully assembled outbound request.
#[derive(Clone, Debug)]
pub struct OutboundRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL including the query string.
	pub url: Url,
	/// Final header set.
	pub headers: Headers,
	/// Pre-serialized request body.
	pub body: Option<String>,
}

/// Raw response handed back by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl RawResponse {
	/// Creates a response from a status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	fn build(&self, request: OutboundRequest) -> Result<reqwest::Request, TransportError> {
		let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
			.map_err(TransportError::network)?;
		let mut builder = self.0.request(method, request.url);

		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}
		if let Some(body) = request.body {
			builder = builder.body(body);
		}

		Ok(builder.build()?)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let request = self.build(request)?;
			let response = self.0.execute(request).await.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(RawResponse { status, body })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn headers_are_case_insensitive_and_layered() {
		let defaults = Headers::new().with("Accept", "application/json").with("X-Trace", "a");
		let overrides = Headers::new().with("x-trace", "b");
		let merged = defaults.merged(&overrides);

		assert_eq!(merged.get("ACCEPT"), Some("application/json"));
		assert_eq!(merged.get("x-trace"), Some("b"));
		assert_eq!(defaults.get("x-trace"), Some("a"));
	}

	#[test]
	fn headers_debug_redacts_authorization() {
		let headers = Headers::new().with("Authorization", "Bearer secret-token");
		let rendered = format!("{headers:?}");

		assert!(rendered.contains("<redacted>"));
		assert!(!rendered.contains("secret-token"));
	}

	#[test]
	fn raw_response_success_covers_2xx_only() {
		assert!(RawResponse::new(204, "").is_success());
		assert!(!RawResponse::new(302, "").is_success());
		assert!(!RawResponse::new(404, "{}").is_success());
	}
}
