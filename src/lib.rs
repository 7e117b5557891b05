//! Authenticated HanaZoom API client: bearer injection, single-flight token refresh, and queued
//! request replay over a pluggable HTTP transport.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod obs;
pub mod refresh;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{client::ApiClient, config::ClientConfig, store::MemoryTokenStore};

	/// Builds a [`ClientConfig`] rooted at the provided base URL (typically an `httpmock`
	/// server address).
	pub fn test_config(base_url: &str) -> ClientConfig {
		let url = Url::parse(base_url).expect("Test base URL should parse successfully.");

		ClientConfig::builder(url).build().expect("Test client config should build successfully.")
	}

	/// Constructs a reqwest-backed [`ApiClient`] with an in-memory token store, returning the
	/// store so tests can seed and inspect access tokens.
	#[cfg(feature = "reqwest")]
	pub fn build_reqwest_test_client(
		base_url: &str,
	) -> (ApiClient<crate::http::ReqwestTransport>, Arc<MemoryTokenStore>) {
		let config = test_config(base_url);
		let transport = crate::http::ReqwestTransport::from_config(&config)
			.expect("Reqwest transport should build for tests.");
		let store = Arc::new(MemoryTokenStore::default());
		let client = ApiClient::with_transport(config, Arc::new(transport), store.clone());

		(client, store)
	}

	/// Constructs an [`ApiClient`] over a caller-supplied transport with an in-memory store.
	pub fn build_test_client<T>(
		base_url: &str,
		transport: Arc<T>,
	) -> (ApiClient<T>, Arc<MemoryTokenStore>)
	where
		T: crate::http::HttpTransport,
	{
		let store = Arc::new(MemoryTokenStore::default());
		let client = ApiClient::with_transport(test_config(base_url), transport, store.clone());

		(client, store)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
