//! Demonstrates a full session against a mock marketplace API: login, a call that hits an
//! expired access token and is transparently replayed after a refresh, then logout.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use marketplace_http::{
	client::{ApiClient, LoginRequest},
	config::ClientConfig,
	store::{MemoryStore, TokenStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/login/");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access\":\"demo-access-1\",\"refresh\":\"demo-refresh\"}");
		})
		.await;
	let expired_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/profile/").header("authorization", "Bearer demo-access-1");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"detail\":\"Given token not valid for any token type\"}");
		})
		.await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/accounts/refresh/");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access\":\"demo-access-2\"}");
		})
		.await;
	let profile_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/profile/").header("authorization", "Bearer demo-access-2");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"username\":\"demo-seller\",\"role\":\"seller\"}");
		})
		.await;
	let logout_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/logout/");
			then.status(205);
		})
		.await;
	let store: Arc<dyn TokenStore> = Arc::new(MemoryStore::default());
	let config = ClientConfig::builder(Url::parse(&server.url("/api"))?).build()?;
	let client = ApiClient::new(store, config);

	client.login(&LoginRequest::new("demo-seller", "demo-password")).await?;

	let profile: serde_json::Value = client.get_json("v1/profile/").await?;

	println!(
		"Signed in as {} after {} refresh call(s).",
		profile["username"],
		client.refresh_metrics.attempts()
	);

	client.logout().await?;

	println!("Authenticated after logout: {}.", client.is_authenticated());

	login_mock.assert_async().await;
	expired_mock.assert_async().await;
	refresh_mock.assert_async().await;
	profile_mock.assert_async().await;
	logout_mock.assert_async().await;

	Ok(())
}
