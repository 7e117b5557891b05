// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, payload},
	config::ClientConfig,
	http::{ApiRequest, ApiResponse, HttpTransport},
	obs::{FlowKind, FlowSpan},
	refresh::{RefreshFuture, TokenRefresher},
	store::TokenStore,
};

/// [`TokenRefresher`] that calls the backend refresh endpoint through an [`HttpTransport`].
///
/// The request carries no bearer token; the transport's cookie jar supplies the refresh cookie.
/// A successful exchange saves the new access token to the store, a failed one clears it.
pub struct HttpTokenRefresher<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	store: Arc<dyn TokenStore>,
	config: Arc<ClientConfig>,
}
impl<T> HttpTokenRefresher<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a refresher sharing the client's transport, store, and configuration.
	pub fn new(transport: Arc<T>, store: Arc<dyn TokenStore>, config: Arc<ClientConfig>) -> Self {
		Self { transport, store, config }
	}

	async fn exchange(&self) -> Result<TokenSecret> {
		let path = self.config.endpoints.refresh.as_str();
		let request = ApiRequest::post(path).resolve(&self.config, None)?;
		let response = self.transport.execute(request).await?;
		let body: Value = ApiResponse::from_success(path, response)?.json()?;

		Ok(payload::parse_auth_session(path, body)?.access_token)
	}
}
impl<T> TokenRefresher for HttpTokenRefresher<T>
where
	T: ?Sized + HttpTransport,
{
	fn refresh_access_token(&self) -> RefreshFuture<'_> {
		let span = FlowSpan::new(FlowKind::Refresh, "refresh_access_token");

		Box::pin(span.instrument(async move {
			match self.exchange().await {
				Ok(token) => {
					self.store.save(token.clone()).await?;

					Ok(token)
				},
				Err(err) => {
					if let Err(_clear) = self.store.clear().await {
						#[cfg(feature = "tracing")]
						tracing::warn!(error = %_clear, "failed to discard access token");
					}

					Err(err)
				},
			}
		}))
	}
}
impl<T> Debug for HttpTokenRefresher<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpTokenRefresher").field("endpoint", &self.config.endpoints.refresh).finish()
	}
}
