#![cfg(feature = "reqwest")]

// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use futures_util::future::join_all;
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use marketplace_http::{
	auth::TokenPair,
	client::{ApiClient, LoginRequest, ReqwestApiClient},
	config::ClientConfig,
	error::Error,
	request::ApiRequest,
	store::{MemoryStore, TokenStore},
	url::Url,
};

const TOKEN_EXPIRED: &str =
	"{\"detail\":\"Given token not valid for any token type\",\"code\":\"token_not_valid\"}";

fn build_client(
	server: &MockServer,
	pair: Option<TokenPair>,
) -> (ReqwestApiClient, Arc<MemoryStore>) {
	let store_backend = Arc::new(pair.map(MemoryStore::with_pair).unwrap_or_default());
	let store: Arc<dyn TokenStore> = store_backend.clone();
	let config = ClientConfig::builder(
		Url::parse(&server.url("/api")).expect("Mock server base URL should parse successfully."),
	)
	.build()
	.expect("Failed to build client config for tests.");

	(ApiClient::new(store, config), store_backend)
}

#[tokio::test]
async fn expired_access_token_is_refreshed_and_request_replayed() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, Some(TokenPair::new("access-old", "refresh-1")));
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/profile/").header("authorization", "Bearer access-old");
			then.status(401).header("content-type", "application/json").body(TOKEN_EXPIRED);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/accounts/refresh/")
				.header("content-type", "application/json")
				.json_body(json!({ "refresh": "refresh-1" }));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access\":\"access-new\"}");
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/profile/").header("authorization", "Bearer access-new");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"username\":\"seller\"}");
		})
		.await;
	let profile: Value =
		client.get_json("v1/profile/").await.expect("Replayed request should succeed.");

	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
	accepted.assert_calls_async(1).await;

	assert_eq!(profile["username"], "seller");

	let pair = store.load().expect("Session should survive a successful refresh.");

	assert_eq!(pair.access.expose(), "access-new");
	assert_eq!(pair.refresh.expose(), "refresh-1");
}

#[tokio::test]
async fn concurrent_401s_trigger_a_single_refresh_call() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, Some(TokenPair::new("access-old", "refresh-1")));
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer access-old");
			then.status(401).header("content-type", "application/json").body(TOKEN_EXPIRED);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/accounts/refresh/");
			then.status(200)
				.header("content-type", "application/json")
				.delay(StdDuration::from_millis(500))
				.body("{\"access\":\"access-new\",\"refresh\":\"refresh-2\"}");
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer access-new");
			then.status(200).header("content-type", "application/json").body("{\"ok\":true}");
		})
		.await;
	let requests = (1..=5).map(|id| client.send(ApiRequest::get(format!("v1/products/{id}/"))));
	let results = join_all(requests).await;

	for result in results {
		let response = result.expect("Every stalled request should be replayed.");

		assert_eq!(response.status, 200);
	}

	rejected.assert_calls_async(5).await;
	refresh.assert_calls_async(1).await;
	accepted.assert_calls_async(5).await;

	assert_eq!(client.refresh_metrics.attempts(), 1);
	assert_eq!(
		store.refresh_token().map(|token| token.expose().to_owned()),
		Some("refresh-2".into())
	);
}

#[tokio::test]
async fn rejected_refresh_clears_session_and_surfaces_original_401() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, Some(TokenPair::new("access-old", "refresh-old")));
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/orders/");
			then.status(401).header("content-type", "application/json").body(TOKEN_EXPIRED);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/accounts/refresh/");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"detail\":\"Token is blacklisted\",\"code\":\"token_not_valid\"}");
		})
		.await;
	let err = client
		.send(ApiRequest::get("v1/orders/"))
		.await
		.expect_err("A rejected refresh must fail the stalled request.");

	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;

	match err {
		Error::Api(api) => {
			assert_eq!(api.status, 401);
			assert!(api.url.ends_with("/api/v1/orders/"));
			assert_eq!(api.detail().as_deref(), Some("Given token not valid for any token type"));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert!(store.access_token().is_none());
	assert!(store.refresh_token().is_none());
}

#[tokio::test]
async fn refresh_timeout_ends_session_and_returns_original_401() {
	let server = MockServer::start_async().await;
	let store = Arc::new(MemoryStore::with_pair(TokenPair::new("access-old", "refresh-1")));
	let config = ClientConfig::builder(
		Url::parse(&server.url("/api")).expect("Mock server base URL should parse successfully."),
	)
	.refresh_timeout(Some(time::Duration::milliseconds(200)))
	.build()
	.expect("Failed to build client config for tests.");
	let client: ReqwestApiClient = ApiClient::new(store.clone(), config);
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/orders/");
			then.status(401).header("content-type", "application/json").body(TOKEN_EXPIRED);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/accounts/refresh/");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access\":\"access-late\"}")
				.delay(StdDuration::from_secs(1));
		})
		.await;
	let err = client
		.send(ApiRequest::get("v1/orders/"))
		.await
		.expect_err("A timed-out refresh must fail the stalled request.");

	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;

	match err {
		Error::Api(api) => assert_eq!(api.status, 401),
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert!(store.load().is_none());
	assert_eq!(client.refresh_metrics.failures(), 1);
	assert_eq!(client.refresh_metrics.successes(), 0);
}

#[tokio::test]
async fn missing_refresh_token_skips_refresh_endpoint() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, None);
	let rejected = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/api/v1/cart/");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"detail\":\"Authentication credentials were not provided.\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/accounts/refresh/");
			then.status(200).header("content-type", "application/json").body("{\"access\":\"x\"}");
		})
		.await;
	let err =
		client.delete("v1/cart/").await.expect_err("Anonymous deletes must surface the 401.");

	assert_eq!(err.status(), Some(401));

	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	assert!(store.load().is_none());
}

#[tokio::test]
async fn already_retried_request_is_rejected_without_refresh() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, Some(TokenPair::new("access-1", "refresh-1")));
	let rejected = server
		.mock_async(|when, then| {
			when.method(PATCH).path("/api/v1/profile/");
			then.status(401).header("content-type", "application/json").body(TOKEN_EXPIRED);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/accounts/refresh/");
			then.status(200).header("content-type", "application/json").body("{\"access\":\"x\"}");
		})
		.await;
	let request = ApiRequest::patch("v1/profile/").json(json!({ "bio": "hi" })).mark_retried();
	let err = client.send(request).await.expect_err("Retried requests must not be requeued.");

	assert!(err.is_unauthorized());

	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	assert!(!client.is_refreshing());
	assert!(store.load().is_some());
}

#[tokio::test]
async fn login_stores_pair_and_bypasses_refresh_on_bad_credentials() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, None);
	let login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/v1/login/")
				.json_body(json!({ "username": "seller", "password": "hunter2" }));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access\":\"access-1\",\"refresh\":\"refresh-1\",\"user\":{\"id\":7}}");
		})
		.await;
	let bad_login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/v1/login/")
				.json_body(json!({ "username": "seller", "password": "wrong" }));
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"detail\":\"No active account found with the given credentials\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/accounts/refresh/");
			then.status(200).header("content-type", "application/json").body("{\"access\":\"x\"}");
		})
		.await;
	let pair = client
		.login(&LoginRequest::new("seller", "hunter2"))
		.await
		.expect("Login with valid credentials should succeed.");

	assert_eq!(pair.access.expose(), "access-1");
	assert_eq!(store.load(), Some(pair));
	assert!(client.is_authenticated());

	let err = client
		.login(&LoginRequest::new("seller", "wrong"))
		.await
		.expect_err("Login with bad credentials must fail.");

	assert!(err.is_unauthorized());

	login.assert_calls_async(1).await;
	bad_login.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	assert!(store.load().is_some(), "A failed login must not end the existing session.");
}

#[tokio::test]
async fn google_login_stores_returned_pair() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, None);
	let google = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/v1/google-login/")
				.json_body(json!({ "access_token": "google-token" }));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access\":\"access-g\",\"refresh\":\"refresh-g\"}");
		})
		.await;

	client.google_login("google-token").await.expect("Google login should succeed.");

	google.assert_async().await;

	assert_eq!(store.load(), Some(TokenPair::new("access-g", "refresh-g")));
}

#[tokio::test]
async fn logout_clears_session_even_when_server_fails() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, Some(TokenPair::new("access-1", "refresh-1")));
	let logout = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/v1/logout/")
				.header("authorization", "Bearer access-1")
				.json_body(json!({ "refresh": "refresh-1" }));
			then.status(500).body("upstream unavailable");
		})
		.await;

	client.logout().await.expect("Logout should only fail on storage errors.");

	logout.assert_async().await;

	assert!(store.load().is_none());
	assert!(!client.is_authenticated());

	client.logout().await.expect("Logging out without a session should be a no-op.");

	logout.assert_calls_async(1).await;
}
