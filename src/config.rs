//! Validated client configuration and its builder.

// self
use crate::{_prelude::*, endpoint::EndpointPolicy, error::ConfigError};

/// Default API prefix appended to the base URL.
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

/// Immutable configuration consumed by [`ApiClient`](crate::client::ApiClient) and transports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Backend origin, e.g. `https://api.hanazoom.com`.
	pub base_url: Url,
	/// Prefix inserted between the origin and every request path.
	#[serde(default = "default_api_prefix")]
	pub api_prefix: String,
	/// Authentication endpoints and refresh trigger policy.
	#[serde(default)]
	pub endpoints: EndpointPolicy,
	/// Optional `User-Agent` override for the default transport.
	#[serde(default)]
	pub user_agent: Option<String>,
	/// Optional per-request timeout, in seconds, for the default transport.
	#[serde(default)]
	pub timeout_secs: Option<u64>,
}
impl ClientConfig {
	/// Creates a new builder for the provided backend origin.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Parses and validates a JSON configuration document.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let de = &mut serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(&mut *de)
			.map_err(|source| ConfigError::Parse { source })?;

		de.end().map_err(|source| ConfigError::TrailingData { source })?;
		config.validate()?;

		Ok(config)
	}

	/// Returns the request timeout as a std duration.
	pub fn timeout(&self) -> Option<std::time::Duration> {
		self.timeout_secs.map(std::time::Duration::from_secs)
	}

	/// Resolves an API path (relative to the prefix) into an absolute URL.
	pub fn endpoint_url(&self, path: &str) -> Result<Url, ConfigError> {
		let origin = self.base_url.as_str().trim_end_matches('/');
		let prefix = self.api_prefix.trim_end_matches('/');
		let path = if path.starts_with('/') { path.to_owned() } else { format!("/{path}") };

		Url::parse(&format!("{origin}{prefix}{path}"))
			.map_err(|source| ConfigError::InvalidRequestUrl { source })
	}

	/// Re-runs builder validation on an already constructed configuration.
	pub fn validate(&self) -> Result<(), ConfigError> {
		validate_base_url(&self.base_url)?;
		validate_path("api_prefix", &self.api_prefix)?;

		for (name, path) in self.endpoints.paths() {
			validate_path(name, path)?;
		}

		Ok(())
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Backend origin.
	pub base_url: Url,
	/// Prefix inserted before every request path.
	pub api_prefix: String,
	/// Authentication endpoint policy.
	pub endpoints: EndpointPolicy,
	/// Optional `User-Agent` override.
	pub user_agent: Option<String>,
	/// Optional request timeout in seconds.
	pub timeout_secs: Option<u64>,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with the provided origin and default endpoints.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			api_prefix: DEFAULT_API_PREFIX.into(),
			endpoints: EndpointPolicy::default(),
			user_agent: None,
			timeout_secs: None,
		}
	}

	/// Overrides the API prefix (defaults to `/api/v1`).
	pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.api_prefix = prefix.into();

		self
	}

	/// Replaces the endpoint policy.
	pub fn endpoints(mut self, endpoints: EndpointPolicy) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Controls whether HTTP 403 triggers a refresh like 401 does.
	pub fn refresh_on_forbidden(mut self, enabled: bool) -> Self {
		self.endpoints.refresh_on_forbidden = enabled;

		self
	}

	/// Sets the `User-Agent` header used by the default transport.
	pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
		self.user_agent = Some(agent.into());

		self
	}

	/// Sets the per-request timeout used by the default transport.
	pub fn timeout_secs(mut self, secs: u64) -> Self {
		self.timeout_secs = Some(secs);

		self
	}

	/// Validates and builds the configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let config = ClientConfig {
			base_url: self.base_url,
			api_prefix: self.api_prefix,
			endpoints: self.endpoints,
			user_agent: self.user_agent,
			timeout_secs: self.timeout_secs,
		};

		config.validate()?;

		Ok(config)
	}
}

fn default_api_prefix() -> String {
	DEFAULT_API_PREFIX.into()
}

fn validate_base_url(url: &Url) -> Result<(), ConfigError> {
	let reject = |reason| ConfigError::InvalidBaseUrl { url: url.to_string(), reason };

	if !matches!(url.scheme(), "http" | "https") {
		return Err(reject("scheme must be http or https"));
	}
	if url.host_str().is_none() {
		return Err(reject("host is missing"));
	}
	if url.query().is_some() || url.fragment().is_some() {
		return Err(reject("query and fragment are not allowed"));
	}

	Ok(())
}

fn validate_path(name: &'static str, path: &str) -> Result<(), ConfigError> {
	if path.starts_with('/') {
		Ok(())
	} else {
		Err(ConfigError::InvalidPath { name, path: path.to_owned() })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse test URL.")
	}

	#[test]
	fn endpoint_url_joins_origin_prefix_and_path() {
		let config = ClientConfig::builder(url("https://api.hanazoom.com/"))
			.build()
			.expect("Default config should build.");

		assert_eq!(
			config.endpoint_url("/members/login").expect("Login URL should resolve.").as_str(),
			"https://api.hanazoom.com/api/v1/members/login",
		);
		assert_eq!(
			config.endpoint_url("stocks/005930").expect("Relative path should resolve.").as_str(),
			"https://api.hanazoom.com/api/v1/stocks/005930",
		);
	}

	#[test]
	fn builder_rejects_bad_origins_and_paths() {
		let err = ClientConfig::builder(url("ftp://files.example.com"))
			.build()
			.expect_err("Non-HTTP schemes should be rejected.");

		assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));

		let err = ClientConfig::builder(url("https://api.example.com/?debug=1"))
			.build()
			.expect_err("Query strings on the origin should be rejected.");

		assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));

		let err = ClientConfig::builder(url("https://api.example.com"))
			.api_prefix("api/v2")
			.build()
			.expect_err("Prefixes without a leading slash should be rejected.");

		assert!(matches!(err, ConfigError::InvalidPath { name: "api_prefix", .. }));
	}

	#[test]
	fn json_config_applies_defaults_and_validates() {
		let config = ClientConfig::from_json_str(
			"{\"base_url\":\"http://localhost:8080\",\"timeout_secs\":5}",
		)
		.expect("Minimal JSON config should parse.");

		assert_eq!(config.api_prefix, DEFAULT_API_PREFIX);
		assert_eq!(config.endpoints, EndpointPolicy::default());
		assert_eq!(config.timeout(), Some(std::time::Duration::from_secs(5)));

		let err = ClientConfig::from_json_str(
			"{\"base_url\":\"http://localhost:8080\",\"endpoints\":{\"refresh\":\"refresh\"}}",
		)
		.expect_err("Endpoint paths without a leading slash should be rejected.");

		assert!(matches!(err, ConfigError::InvalidPath { name: "refresh", .. }));

		let err = ClientConfig::from_json_str("{\"base_url\":42}")
			.expect_err("Malformed documents should be rejected.");

		match err {
			ConfigError::Parse { source } => assert_eq!(source.path().to_string(), "base_url"),
			other => panic!("Unexpected error variant: {other:?}."),
		}

		let err = ClientConfig::from_json_str("{\"base_url\":\"http://localhost:8080\"} junk")
			.expect_err("Trailing data after the document should be rejected.");

		assert!(matches!(err, ConfigError::TrailingData { .. }));
	}
}
