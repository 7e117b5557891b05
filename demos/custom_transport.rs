//! Demonstrates plugging a non-reqwest [`HttpTransport`] and a file-backed token store into the
//! client.
//!
//! 1. Implement [`HttpTransport`] so the transport returns every HTTP status as a response and
//!    reserves the error channel for genuine transport failures.
//! 2. Wrap the transport in `Arc` and pass it to [`ApiClient::with_transport`]; the built-in
//!    refresher reuses the same transport for the refresh endpoint.
//! 3. Persist the session with [`FileTokenStore`] so it survives restarts.

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};
// crates.io
use color_eyre::Result;
use serde_json::{Value, json};
use url::Url;
// self
use hanazoom_client::{
	auth::TokenSecret,
	client::ApiClient,
	config::ClientConfig,
	error::TransportError,
	http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	store::{FileTokenStore, TokenStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let path = std::env::temp_dir().join("hanazoom-client-demo").join("session.json");
	let store = Arc::new(FileTokenStore::open(&path)?);

	store.save(TokenSecret::new("expired-access")).await?;

	let config = ClientConfig::builder(Url::parse("https://api.hanazoom.test")?).build()?;
	let client: ApiClient<InProcessBackend> = ApiClient::with_transport(
		config.clone(),
		Arc::new(InProcessBackend::default()),
		store.clone(),
	);
	let quote: Value = client.get_json("/stocks/005930").await?;

	println!("Quote served after an in-process refresh: {quote}.");
	println!("Session persisted to {} at {:?}.", path.display(), store.saved_at());

	let offline: ApiClient<InProcessBackend> =
		ApiClient::with_transport(config, Arc::new(InProcessBackend::offline()), store.clone());

	match offline.get("/stocks/005930").await {
		Ok(_) => println!("Offline transport unexpectedly answered."),
		Err(e) => println!("Transport failure surfaced unchanged: {e}."),
	}

	store.clear().await?;

	Ok(())
}

#[derive(Debug)]
struct BackendUnreachable;
impl Display for BackendUnreachable {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Backend is unreachable")
	}
}
impl StdError for BackendUnreachable {}

/// Simulates the HanaZoom backend: the first protected call sees an expired token.
#[derive(Default)]
struct InProcessBackend {
	offline: bool,
	refreshed: AtomicBool,
}
impl InProcessBackend {
	fn offline() -> Self {
		Self { offline: true, ..Default::default() }
	}
}
impl HttpTransport for InProcessBackend {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			if self.offline {
				return Err(TransportError::network(BackendUnreachable));
			}

			let path = request.url.path();

			if path.ends_with("/members/refresh-token") {
				self.refreshed.store(true, Ordering::SeqCst);

				return Ok(HttpResponse::json(
					200,
					&json!({ "success": true, "data": { "accessToken": "renewed-access" } }),
				));
			}

			Ok(match request.bearer() {
				Some("renewed-access") if self.refreshed.load(Ordering::SeqCst) => HttpResponse::json(
					200,
					&json!({ "stockCode": "005930", "currentPrice": 71_500 }),
				),
				_ => HttpResponse::new(401, Vec::new()),
			})
		})
	}
}
