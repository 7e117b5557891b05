//! Client-level error types shared across the transport, store, refresh, and request layers.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Token store failure.
	#[error("{0}")]
	Store(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Backend answered with a non-success status that is not an authentication failure.
	#[error("Request to {path} failed with HTTP {status}.")]
	Status {
		/// API path the request targeted.
		path: String,
		/// HTTP status code.
		status: u16,
		/// Lossy UTF-8 rendering of the response body.
		body: String,
	},
	/// Backend rejected the credentials and no further refresh is attempted.
	#[error("Request to {path} was rejected with HTTP {status}.")]
	Unauthorized {
		/// API path the request targeted.
		path: String,
		/// HTTP status code (401 or 403).
		status: u16,
		/// Whether the rejection happened on the single replay after a refresh.
		retried: bool,
		/// Lossy UTF-8 rendering of the rejection body.
		body: String,
	},
	/// The refresh cycle this request waited on failed; every waiter observes the same error.
	#[error("Access token refresh failed: {0}")]
	RefreshFailed(#[source] Arc<Error>),
	/// The refresh initiator was dropped before settling the cycle.
	#[error("Access token refresh was abandoned before it settled.")]
	RefreshAbandoned,
	/// Response body could not be decoded into the requested type.
	#[error("Response body from {path} could not be decoded.")]
	Decode {
		/// API path the response came from.
		path: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Response body carried data after a complete JSON document.
	#[error("Response body from {path} has trailing data after the JSON document.")]
	TrailingData {
		/// API path the response came from.
		path: String,
		/// Underlying parser failure.
		#[source]
		source: serde_json::Error,
	},
	/// Request payload could not be encoded as JSON.
	#[error("Request body could not be encoded as JSON.")]
	Encode(#[source] serde_json::Error),
}
impl Error {
	/// Returns the HTTP status carried by the error, if any.
	///
	/// Refresh failures report the status of the underlying refresh response.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } | Self::Unauthorized { status, .. } => Some(*status),
			Self::RefreshFailed(inner) => inner.status(),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL is unusable for API calls.
	#[error("Base URL {url} is invalid: {reason}.")]
	InvalidBaseUrl {
		/// Offending URL.
		url: String,
		/// Why the URL was rejected.
		reason: &'static str,
	},
	/// A configured path does not start with `/`.
	#[error("The {name} path must start with '/': {path}.")]
	InvalidPath {
		/// Which path failed validation.
		name: &'static str,
		/// Path value that failed validation.
		path: String,
	},
	/// Joining the base URL with a request path failed.
	#[error("Request URL could not be built.")]
	InvalidRequestUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Configuration document could not be parsed.
	#[error("Client configuration could not be parsed.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Configuration document carried data after the JSON object.
	#[error("Client configuration has trailing data after the JSON document.")]
	TrailingData {
		/// Underlying parser failure.
		#[source]
		source: serde_json::Error,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
