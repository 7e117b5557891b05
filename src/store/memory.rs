//! Thread-safe in-memory [`TokenStore`] implementation.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	store::{StoreFuture, TokenStore},
};

/// Keeps the access token in process memory; lost when the process exits.
#[derive(Clone, Debug, Default)]
pub struct MemoryTokenStore(Arc<RwLock<Option<TokenSecret>>>);
impl MemoryTokenStore {
	/// Creates a store seeded with an access token.
	pub fn with_token(token: impl Into<String>) -> Self {
		Self(Arc::new(RwLock::new(Some(TokenSecret::new(token)))))
	}

	/// Returns the current token without going through the async contract.
	pub fn current(&self) -> Option<TokenSecret> {
		self.0.read().clone()
	}
}
impl TokenStore for MemoryTokenStore {
	fn access_token(&self) -> StoreFuture<'_, Option<TokenSecret>> {
		let token = self.current();

		Box::pin(async move { Ok(token) })
	}

	fn save(&self, token: TokenSecret) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = Some(token);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			slot.write().take();

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn save_fetch_and_clear() {
		let store = MemoryTokenStore::default();

		assert!(store.access_token().await.expect("Fetch should succeed.").is_none());

		store.save(TokenSecret::new("first")).await.expect("Save should succeed.");

		let shared = store.clone();

		assert_eq!(shared.current().map(|t| t.expose().to_owned()).as_deref(), Some("first"));

		store.clear().await.expect("Clear should succeed.");

		assert!(shared.access_token().await.expect("Fetch should succeed.").is_none());
	}
}
