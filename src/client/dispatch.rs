//! Request dispatch: per-call auth, URL + query assembly, header layering, and response
//! normalization.
//!
//! Every call computes a fresh header set from the configured defaults, the
//! `Authorization` value of the effective scheme, and the call's own overrides, in that
//! order. Nothing on the client is mutated, so concurrent calls with different auth
//! overrides cannot observe each other's headers.

// self
use crate::{
	_prelude::*,
	auth::{AuthScheme, CredentialResolver, ResolvedAuth},
	client::{Client, QueryParams},
	config,
	error::{ConfigError, DecodeError, HttpError},
	http::{AUTHORIZATION, Headers, HttpTransport, Method, OutboundRequest, RawResponse},
	obs::{OpKind, OpRecord, OpSpan},
};

/// Per-call options for [`Client::dispatch`].
#[derive(Clone, Debug, Default)]
pub struct DispatchOptions {
	/// Scheme override for this call; [`AuthScheme::None`] sends no `Authorization`.
	pub auth: Option<AuthScheme>,
	/// Query parameters appended to the URL.
	pub query: QueryParams,
	/// Header overrides layered on top of the defaults.
	pub headers: Headers,
	/// Pre-serialized body.
	pub body: Option<String>,
}
impl DispatchOptions {
	/// Empty options: client scheme, no query, no overrides, no body.
	pub fn new() -> Self {
		Self::default()
	}

	/// Overrides the scheme for this call.
	pub fn auth(mut self, auth: AuthScheme) -> Self {
		self.auth = Some(auth);

		self
	}

	/// Replaces the query parameters.
	pub fn query(mut self, query: QueryParams) -> Self {
		self.query = query;

		self
	}

	/// Adds a header override.
	pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Sets a pre-serialized body.
	pub fn body(mut self, body: impl Into<String>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `payload` as the JSON body.
	pub fn json<T>(self, payload: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		let body = serde_json::to_string(payload).map_err(ConfigError::BodySerialize)?;

		Ok(self.body(body))
	}
}

impl Client {
	/// Sends `method path` with the client's credentials and returns the parsed JSON body.
	///
	/// Bearer-derived clients wait for a reservoir unit of their credential key first.
	/// Non-2xx responses fail with [`Error::Http`] carrying the parsed body.
	pub async fn dispatch(
		&self,
		method: Method,
		path: &str,
		options: DispatchOptions,
	) -> Result<Value> {
		self.dispatch_via(self.transport.as_ref(), method, path, options).await
	}

	/// Same as [`Client::dispatch`] but the request itself does not wait for a reservoir
	/// unit.
	///
	/// A bearer client that still has to exchange its credentials for a token sends that
	/// exchange through the limiter, so the call can consume one unit and queue behind it.
	pub async fn dispatch_unthrottled(
		&self,
		method: Method,
		path: &str,
		options: DispatchOptions,
	) -> Result<Value> {
		self.dispatch_via(self.unthrottled.as_ref(), method, path, options).await
	}

	/// Dispatches and deserializes the success body into `T`.
	pub async fn dispatch_json<T>(
		&self,
		method: Method,
		path: &str,
		options: DispatchOptions,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let value = self.dispatch(method, path, options).await?;

		decode(path, value)
	}

	async fn dispatch_via(
		&self,
		transport: &dyn HttpTransport,
		method: Method,
		path: &str,
		options: DispatchOptions,
	) -> Result<Value> {
		let span = OpSpan::new(OpKind::Dispatch, "dispatch");
		let record = OpRecord::start(OpKind::Dispatch);
		let result = span
			.instrument(async move {
				let scheme = options.auth.unwrap_or_else(|| self.scheme());
				let authorization = self.authorization(scheme).await?;
				let request = self.build_request(method, path, &options, authorization)?;
				let response = transport.send(request).await?;

				normalize(path, response)
			})
			.await;

		record.finish(&result);

		result
	}

	/// Computes the `Authorization` value for `scheme`, exchanging a token if needed.
	async fn authorization(&self, scheme: AuthScheme) -> Result<Option<String>> {
		match scheme {
			AuthScheme::None => Ok(None),
			AuthScheme::Basic => {
				let pair = match &self.auth {
					ResolvedAuth::Basic(pair) => pair.clone(),
					_ => CredentialResolver::resolve_basic(self.credentials.as_deref(), &self.config)?,
				};

				Ok(Some(pair.header_value()))
			},
			AuthScheme::Bearer | AuthScheme::BearerFulfillment => {
				let token = self.token(scheme.token_kind().unwrap_or_default()).await?;

				Ok(Some(format!("Bearer {}", token.expose())))
			},
		}
	}

	/// Assembles the outbound request; headers are layered as defaults, computed
	/// `Authorization`, then call overrides.
	pub(crate) fn build_request(
		&self,
		method: Method,
		path: &str,
		options: &DispatchOptions,
		authorization: Option<String>,
	) -> Result<OutboundRequest> {
		let raw = format!("{}{path}", self.config.base_url);
		let mut url =
			Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { url: raw.clone(), source })?;

		options.query.append_to(&mut url);

		for (name, value) in &options.headers {
			config::validate_header(name, value)?;
		}

		let mut headers = self.config.headers.clone();

		match authorization {
			Some(value) => headers.insert(AUTHORIZATION, value),
			None => headers.remove(AUTHORIZATION),
		};

		Ok(OutboundRequest {
			method,
			url,
			headers: headers.merged(&options.headers),
			body: options.body.clone(),
		})
	}
}

/// Turns a raw response into the parsed body or an [`HttpError`].
pub(crate) fn normalize(path: &str, response: RawResponse) -> Result<Value> {
	let success = response.is_success();
	let RawResponse { status, body } = response;

	if success {
		if body.iter().all(u8::is_ascii_whitespace) {
			return Ok(Value::Null);
		}

		return serde_json::from_slice(&body)
			.map_err(|source| DecodeError::Json { path: path.to_owned(), source }.into());
	}

	let body = if body.iter().all(u8::is_ascii_whitespace) {
		Value::Null
	} else {
		serde_json::from_slice(&body)
			.unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
	};

	Err(HttpError { status, body }.into())
}

/// Deserializes a parsed body into `T` with path-aware errors.
pub(crate) fn decode<T>(path: &str, value: Value) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(value)
		.map_err(|source| DecodeError::Shape { path: path.to_owned(), source }.into())
}
