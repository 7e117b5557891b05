// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{AuthSession, LoginCredentials, SocialLoginRequest, payload},
	client::ApiClient,
	http::{ApiRequest, ApiResponse, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Logs in with email/password and stores the issued access token.
	///
	/// The refresh credential arrives as an httpOnly cookie and stays in the transport.
	pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthSession> {
		let path = self.config.endpoints.login.clone();

		self.open_session("login", ApiRequest::post(&path).with_json(credentials)?).await
	}

	/// Completes a Kakao social login and stores the issued access token.
	pub async fn kakao_login(&self, request: &SocialLoginRequest) -> Result<AuthSession> {
		let path = self.config.endpoints.social_login.clone();

		self.open_session("kakao_login", ApiRequest::post(&path).with_json(request)?).await
	}

	/// Registers a new member; signup does not open a session.
	pub async fn signup<B>(&self, payload: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.post(&self.config.endpoints.signup, payload).await
	}

	/// Discards the stored access token.
	pub async fn logout(&self) -> Result<()> {
		let span = FlowSpan::new(FlowKind::Session, "logout");

		span.instrument(async { self.store.clear().await.map_err(Error::from) }).await
	}

	/// Returns `true` when an access token is currently stored.
	pub async fn is_authenticated(&self) -> Result<bool> {
		Ok(self.store.access_token().await?.is_some_and(|token| !token.is_blank()))
	}

	async fn open_session(&self, stage: &'static str, request: ApiRequest) -> Result<AuthSession> {
		const KIND: FlowKind = FlowKind::Session;

		let span = FlowSpan::new(KIND, stage).with_target(request.method, &request.path);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let response = self.send(request).await?;
				let body: Value = response.json()?;
				let session = payload::parse_auth_session(&response.path, body)?;

				self.store.save(session.access_token.clone()).await?;

				Ok(session)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
