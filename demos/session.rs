//! Demonstrates logging in, calling a protected endpoint after the access token expires, and
//! letting the client refresh through the httpOnly cookie before replaying the call.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::{Value, json};
use url::Url;
// self
use hanazoom_client::{
	auth::LoginCredentials,
	client::ApiClient,
	config::ClientConfig,
	store::MemoryTokenStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/members/login");
			then.status(200)
				.header("content-type", "application/json")
				.header("set-cookie", "refreshToken=demo-refresh; Path=/; HttpOnly")
				.json_body(json!({ "data": { "accessToken": "short-lived", "nickname": "demo" } }));
		})
		.await;
	let expired_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/watchlist").header("authorization", "Bearer short-lived");
			then.status(401);
		})
		.await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/members/refresh-token");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "data": { "accessToken": "renewed" } }));
		})
		.await;
	let watchlist_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/watchlist").header("authorization", "Bearer renewed");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!([{ "stockCode": "005930", "stockName": "Samsung Electronics" }]));
		})
		.await;
	let config = ClientConfig::builder(Url::parse(&server.base_url())?)
		.user_agent("hanazoom-client-demo")
		.timeout_secs(10)
		.build()?;
	let store = Arc::new(MemoryTokenStore::default());
	let client = ApiClient::with_store(config, store.clone())?;
	let session = client.login(&LoginCredentials::new("demo@hanazoom.com", "demo-password")).await?;

	println!("Logged in with access token {}.", session.access_token);

	let watchlist: Value = client.get_json("/watchlist").await?;

	println!("Watchlist after transparent refresh: {watchlist}.");
	println!(
		"Refresh attempts: {}, replays: {}.",
		client.refresh_metrics().attempts(),
		client.refresh_metrics().replays()
	);

	login_mock.assert_async().await;
	expired_mock.assert_async().await;
	refresh_mock.assert_async().await;
	watchlist_mock.assert_async().await;

	Ok(())
}
