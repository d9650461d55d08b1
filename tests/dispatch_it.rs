// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use marketplace_client::{
	auth::{AuthScheme, Credentials},
	client::{Client, DispatchOptions, QueryParams},
	config::ClientConfig,
	error::{Error, TransportError},
	http::Method,
	rate_limit::RateLimiterRegistry,
};

fn config(server: &MockServer) -> Arc<ClientConfig> {
	Arc::new(
		ClientConfig::builder(server.base_url())
			.header("x-client", "marketplace-it")
			.build()
			.expect("Mock server config should build successfully."),
	)
}

fn client(server: &MockServer, hint: AuthScheme, credentials: Credentials) -> Client {
	Client::new(config(server), Arc::new(RateLimiterRegistry::default()), hint, Some(credentials))
		.expect("Client should build against the mock server.")
}

#[tokio::test]
async fn basic_dispatch_sends_defaults_auth_and_query() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/products")
				.query_param("a", "1")
				.query_param("d", "x")
				.header("authorization", "Basic dTpw")
				.header("accept", "application/json")
				.header("x-client", "marketplace-it");
			then.status(200).json_body(json!({ "items": [{ "sku": "A-1" }] }));
		})
		.await;
	let body = client(&server, AuthScheme::Basic, Credentials::basic("u", "p"))
		.dispatch(
			Method::Get,
			"/products",
			DispatchOptions::new()
				.query(QueryParams::new().with("a", 1).with("b", serde_json::Value::Null).with("d", "x")),
		)
		.await
		.expect("Basic dispatch should succeed.");

	assert_eq!(body, json!({ "items": [{ "sku": "A-1" }] }));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn bearer_dispatch_exchanges_once_for_concurrent_callers() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").json_body(json!({ "key": "consumer", "secret": "secret" }));
			then.status(200)
				.delay(std::time::Duration::from_millis(100))
				.json_body(json!({ "user": { "token": "minted" } }));
		})
		.await;
	let catalog = server
		.mock_async(|when, then| {
			when.method(GET).path("/catalog").header("authorization", "Bearer minted");
			then.status(200).json_body(json!({ "ok": true }));
		})
		.await;
	let client = client(&server, AuthScheme::Bearer, Credentials::consumer("consumer", "secret"));
	let call = || client.dispatch(Method::Get, "/catalog", DispatchOptions::new());
	let (a, b, c) = tokio::join!(call(), call(), call());

	for result in [a, b, c] {
		assert_eq!(result.expect("Every concurrent call should succeed."), json!({ "ok": true }));
	}

	token.assert_calls_async(1).await;
	catalog.assert_calls_async(3).await;
}

#[tokio::test]
async fn fulfillment_scheme_uses_fulfillment_endpoint() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/fulfillment/token");
			then.status(200).json_body(json!({ "user": { "token": "ship" } }));
		})
		.await;
	let orders = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/orders/1/ship")
				.header("authorization", "Bearer ship")
				.json_body(json!({ "carrier": "ups" }));
			then.status(204);
		})
		.await;
	let body = client(
		&server,
		AuthScheme::None,
		Credentials::consumer("consumer", "secret").with_auth(AuthScheme::BearerFulfillment),
	)
	.dispatch(
		Method::Post,
		"/orders/1/ship",
		DispatchOptions::new()
			.json(&json!({ "carrier": "ups" }))
			.expect("Body should serialize."),
	)
	.await
	.expect("Fulfillment dispatch should succeed.");

	assert_eq!(body, serde_json::Value::Null);

	token.assert_calls_async(1).await;
	orders.assert_calls_async(1).await;
}

#[tokio::test]
async fn error_responses_surface_status_and_body() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(DELETE).path("/products/9");
			then.status(404).json_body(json!({ "error": "not found" }));
		})
		.await;

	let err = client(&server, AuthScheme::Basic, Credentials::basic("u", "p"))
		.dispatch(Method::Delete, "/products/9", DispatchOptions::new())
		.await
		.expect_err("404 should fail the dispatch.");

	match &err {
		Error::Http(http) => assert_eq!(http.status, 404),
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert_eq!(err.http_body(), Some(&json!({ "error": "not found" })));
}

#[tokio::test]
async fn unthrottled_dispatch_skips_auth_when_overridden() {
	let server = MockServer::start_async().await;
	let health = server
		.mock_async(|when, then| {
			when.method(GET).path("/health");
			then.status(200).body("");
		})
		.await;
	let client = client(&server, AuthScheme::Bearer, Credentials::token("preset"));
	let body = client
		.dispatch_unthrottled(Method::Get, "/health", DispatchOptions::new().auth(AuthScheme::None))
		.await
		.expect("Health check should succeed.");

	assert_eq!(body, serde_json::Value::Null);
	assert_eq!(client.limiter().map(|limiter| limiter.available()), Some(30));

	health.assert_calls_async(1).await;
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
	let config = Arc::new(
		ClientConfig::builder("http://127.0.0.1:9")
			.build()
			.expect("Loopback config should build successfully."),
	);
	let client = Client::new(
		config,
		Arc::new(RateLimiterRegistry::default()),
		AuthScheme::None,
		None,
	)
	.expect("Client should build.");
	let err = client
		.dispatch(Method::Get, "/products", DispatchOptions::new())
		.await
		.expect_err("Nothing listens on the discard port.");

	assert!(matches!(err, Error::Transport(TransportError::Network { .. })), "{err:?}");
}
