//! Authenticated, rate-limited HTTP client for the marketplace API: credential resolution,
//! single-flight token exchange, and per-key request budgets shared across clients.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod rate_limit;
pub mod token;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fakes for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// self
	use crate::{
		client::Client,
		config::ClientConfig,
		http::{HttpTransport, OutboundRequest, RawResponse, TransportFuture},
		rate_limit::RateLimiterRegistry,
	};

	/// Base URL used by fixtures that never touch the network.
	pub const FAKE_BASE_URL: &str = "https://marketplace.test";

	/// In-memory transport that replays queued responses and records every request.
	///
	/// When the queue runs dry the transport answers with the fallback response (`200 {}`
	/// unless overridden via [`FakeTransport::with_fallback`]).
	#[derive(Clone, Debug, Default)]
	pub struct FakeTransport {
		inner: Arc<Mutex<FakeTransportState>>,
	}
	#[derive(Debug, Default)]
	struct FakeTransportState {
		queued: VecDeque<RawResponse>,
		fallback: Option<RawResponse>,
		recorded: Vec<OutboundRequest>,
	}
	impl FakeTransport {
		/// Queues a JSON response that will be returned by the next unanswered request.
		pub fn push_json(&self, status: u16, body: serde_json::Value) -> &Self {
			self.inner.lock().queued.push_back(RawResponse::new(status, body.to_string()));

			self
		}

		/// Replaces the response returned once the queue is empty.
		pub fn with_fallback(self, status: u16, body: serde_json::Value) -> Self {
			self.inner.lock().fallback = Some(RawResponse::new(status, body.to_string()));

			self
		}

		/// Returns a snapshot of every request observed so far.
		pub fn requests(&self) -> Vec<OutboundRequest> {
			self.inner.lock().recorded.clone()
		}

		/// Returns the number of requests whose URL path equals `path`.
		pub fn calls_to(&self, path: &str) -> usize {
			self.inner.lock().recorded.iter().filter(|req| req.url.path() == path).count()
		}
	}
	impl HttpTransport for FakeTransport {
		fn send(&self, request: OutboundRequest) -> TransportFuture<'_> {
			let mut state = self.inner.lock();

			state.recorded.push(request);

			let response = state
				.queued
				.pop_front()
				.or_else(|| state.fallback.clone())
				.unwrap_or_else(|| RawResponse::new(200, "{}"));

			Box::pin(async move { Ok(response) })
		}
	}

	/// Builds a config pointing at [`FAKE_BASE_URL`].
	pub fn fake_config() -> Arc<ClientConfig> {
		Arc::new(
			ClientConfig::builder(FAKE_BASE_URL)
				.build()
				.expect("Fake client config should build successfully."),
		)
	}

	/// Builds a client over the provided fake transport.
	pub fn fake_client(
		transport: &FakeTransport,
		registry: &Arc<RateLimiterRegistry>,
		hint: crate::auth::AuthScheme,
		credentials: crate::auth::Credentials,
	) -> Client {
		Client::builder(fake_config(), registry.clone())
			.auth(hint)
			.credentials(credentials)
			.transport(transport.clone())
			.build()
			.expect("Fake client should build successfully.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use serde_json;
pub use url;
#[cfg(test)] use httpmock as _;
