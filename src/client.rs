//! Authenticated API client with transparent single-flight token refresh.
//!
//! [`ApiClient::send`] attaches the stored access token (unless the path is auth-exempt), and
//! when the backend answers 401 (or 403, per [`EndpointPolicy`](crate::endpoint::EndpointPolicy))
//! it joins or starts a refresh cycle on the shared [`RefreshCoordinator`], then replays the
//! request exactly once with the refreshed token. Login and refresh endpoints are never retried.

mod session;

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::ClientConfig,
	http::{ApiRequest, ApiResponse, HttpResponse, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	refresh::{HttpTokenRefresher, RefreshCoordinator, RefreshMetrics, TokenRefresher},
	store::TokenStore,
};
#[cfg(feature = "reqwest")]
use crate::{error::ConfigError, http::ReqwestTransport, store::MemoryTokenStore};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Issues API calls with bearer attachment and single-flight refresh.
///
/// Cloning is cheap; clones share the transport, token store, refresher, and refresh
/// coordinator, so a refresh started through one clone queues requests from every other.
pub struct ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// HTTP transport used for every outbound request.
	pub transport: Arc<T>,
	/// Store holding the current access token.
	pub store: Arc<dyn TokenStore>,
	/// Collaborator that performs the refresh call.
	pub refresher: Arc<dyn TokenRefresher>,
	/// Validated client configuration.
	pub config: Arc<ClientConfig>,
	coordinator: Arc<RefreshCoordinator>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client from fully caller-provided parts.
	pub fn with_parts(
		config: ClientConfig,
		transport: impl Into<Arc<T>>,
		store: Arc<dyn TokenStore>,
		refresher: Arc<dyn TokenRefresher>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			refresher,
			config: Arc::new(config),
			coordinator: Default::default(),
		}
	}

	/// Creates a client whose refresher calls the configured refresh endpoint over `transport`.
	pub fn with_transport(
		config: ClientConfig,
		transport: impl Into<Arc<T>>,
		store: Arc<dyn TokenStore>,
	) -> Self {
		let config = Arc::new(config);
		let transport = transport.into();
		let refresher =
			Arc::new(HttpTokenRefresher::new(transport.clone(), store.clone(), config.clone()));

		Self { transport, store, refresher, config, coordinator: Default::default() }
	}

	/// Returns the coordinator shared by every clone of this client.
	pub fn coordinator(&self) -> &RefreshCoordinator {
		&self.coordinator
	}

	/// Returns the refresh counters.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		self.coordinator.metrics()
	}

	/// Sends `request`, refreshing the access token and replaying once on 401/403.
	///
	/// Non-2xx responses surface as [`Error::Status`]; authentication failures that cannot be
	/// recovered surface as [`Error::Unauthorized`] or [`Error::RefreshFailed`].
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::for_request("send", &request);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.send_with_refresh(&request)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Sends a `GET` request.
	pub async fn get(&self, path: &str) -> Result<ApiResponse> {
		self.send(ApiRequest::get(path)).await
	}

	/// Sends a `POST` request with a JSON body.
	pub async fn post<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::post(path).with_json(body)?).await
	}

	/// Sends a `PUT` request with a JSON body.
	pub async fn put<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::put(path).with_json(body)?).await
	}

	/// Sends a `PATCH` request with a JSON body.
	pub async fn patch<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::patch(path).with_json(body)?).await
	}

	/// Sends a `DELETE` request.
	pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
		self.send(ApiRequest::delete(path)).await
	}

	/// Sends a `GET` request and decodes the JSON response.
	pub async fn get_json<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.get(path).await?.json()
	}

	/// Sends a `POST` request and decodes the JSON response.
	pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.post(path, body).await?.json()
	}

	/// Sends a `PUT` request and decodes the JSON response.
	pub async fn put_json<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.put(path, body).await?.json()
	}

	/// Sends a `PATCH` request and decodes the JSON response.
	pub async fn patch_json<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.patch(path, body).await?.json()
	}

	/// Sends a `DELETE` request and decodes the JSON response.
	pub async fn delete_json<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.delete(path).await?.json()
	}

	async fn send_with_refresh(&self, request: &ApiRequest) -> Result<ApiResponse> {
		let policy = &self.config.endpoints;
		let path = request.path.as_str();
		let exempt = policy.is_auth_exempt(path);
		let token = if exempt { None } else { self.store.access_token().await? };
		let response = self.dispatch(request, token.as_ref()).await?;

		if !policy.triggers_refresh(response.status) {
			return ApiResponse::from_success(path, response);
		}

		obs::record_auth_rejection(response.status, false);

		if policy.is_retry_exempt(path) {
			return Err(unauthorized(path, &response, false));
		}

		let token = self.coordinator.refresh_with(self.refresher.as_ref()).await?;
		let replay = self.dispatch(request, (!exempt).then_some(&token)).await?;

		self.coordinator.metrics().record_replay();
		obs::record_flow_outcome(FlowKind::Request, FlowOutcome::Replayed);

		if policy.triggers_refresh(replay.status) {
			obs::record_auth_rejection(replay.status, true);

			return Err(unauthorized(path, &replay, true));
		}

		ApiResponse::from_success(path, replay)
	}

	async fn dispatch(
		&self,
		request: &ApiRequest,
		token: Option<&TokenSecret>,
	) -> Result<HttpResponse> {
		let resolved = request.resolve(&self.config, token)?;

		Ok(self.transport.execute(resolved).await?)
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a reqwest-backed client with an in-memory token store.
	pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
		Self::with_store(config, Arc::new(MemoryTokenStore::default()))
	}

	/// Creates a reqwest-backed client over the provided token store.
	pub fn with_store(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self, ConfigError> {
		let transport = ReqwestTransport::from_config(&config)?;

		Ok(Self::with_transport(config, Arc::new(transport), store))
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			refresher: self.refresher.clone(),
			config: self.config.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("api_prefix", &self.config.api_prefix)
			.field("coordinator", &self.coordinator)
			.finish()
	}
}

fn unauthorized(path: &str, response: &HttpResponse, retried: bool) -> Error {
	Error::Unauthorized {
		path: path.to_owned(),
		status: response.status,
		retried,
		body: String::from_utf8_lossy(&response.body).into_owned(),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::{
		_preludet::build_test_client,
		http::{HttpRequest, TransportFuture},
	};

	/// Answers 200 to everything and remembers the bearer of each request.
	#[derive(Default)]
	struct Recorder(Mutex<Vec<(String, Option<String>)>>);
	impl HttpTransport for Recorder {
		fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
			self.0.lock().push((request.url.path().to_owned(), request.bearer().map(str::to_owned)));

			Box::pin(async { Ok(HttpResponse::json(200, &json!({ "success": true }))) })
		}
	}

	#[tokio::test]
	async fn bearer_is_attached_only_outside_exempt_paths() {
		let recorder = Arc::new(Recorder::default());
		let (client, store) = build_test_client("https://api.hanazoom.test", recorder.clone());

		store.save(TokenSecret::new("access-1")).await.expect("Seeding should succeed.");
		client.get("/members/me").await.expect("Protected call should succeed.");
		client
			.signup(&json!({ "email": "new@hanazoom.com" }))
			.await
			.expect("Signup should succeed.");

		assert_eq!(
			recorder.0.lock().clone(),
			vec![
				("/api/v1/members/me".to_owned(), Some("access-1".to_owned())),
				("/api/v1/members/signup".to_owned(), None),
			]
		);
		assert_eq!(client.refresh_metrics().attempts(), 0);
	}

	#[tokio::test]
	async fn missing_token_sends_request_without_bearer() {
		let recorder = Arc::new(Recorder::default());
		let (client, _store) = build_test_client("https://api.hanazoom.test", recorder.clone());
		let body: serde_json::Value =
			client.get_json("/stocks/ranking").await.expect("Anonymous call should succeed.");

		assert_eq!(body, json!({ "success": true }));
		assert_eq!(recorder.0.lock()[0].1, None);
		assert!(!client.is_authenticated().await.expect("Store fetch should succeed."));
	}

	#[test]
	fn clones_share_one_coordinator() {
		let (client, _store) =
			build_test_client("https://api.hanazoom.test", Arc::new(Recorder::default()));
		let clone = client.clone();

		assert!(std::ptr::eq(client.coordinator(), clone.coordinator()));
		assert!(format!("{client:?}").contains("api.hanazoom.test"));
	}
}
