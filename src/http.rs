//! Transport primitives for API calls.
//!
//! The module exposes [`HttpTransport`] as the client's only dependency on an HTTP stack,
//! together with the caller-facing [`ApiRequest`]/[`ApiResponse`] pair and the resolved
//! [`HttpRequest`]/[`HttpResponse`] pair a transport actually executes. The default
//! [`ReqwestTransport`] keeps a cookie jar so the httpOnly refresh cookie set by the login
//! endpoint is replayed to the refresh endpoint without the client ever reading it.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::ClientConfig,
	error::{ConfigError, TransportError},
};

/// Lower-case `Authorization` header name.
pub const AUTHORIZATION: &str = "authorization";
/// Lower-case `Content-Type` header name.
pub const CONTENT_TYPE: &str = "content-type";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing resolved API requests.
///
/// Implementations report only transport failures through the error channel; every HTTP status,
/// including 401/403, must come back as an [`HttpResponse`] so the client can run its refresh
/// policy.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes the request and returns the raw response.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// HTTP verbs used by the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical upper-case verb.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Caller-facing request addressed by a path relative to the API prefix.
///
/// Requests are cheap to clone so the client can replay them after a refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
	/// HTTP verb.
	pub method: Method,
	/// Path relative to the API prefix, e.g. `/stocks/005930`.
	pub path: String,
	/// Query parameters appended in order.
	pub query: Vec<(String, String)>,
	/// Extra headers keyed by lower-case name.
	pub headers: BTreeMap<String, String>,
	/// Raw request body.
	pub body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Creates a request for the provided verb and path.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			headers: BTreeMap::new(),
			body: None,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::Patch, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Appends a query parameter.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Sets a header; names are stored lower-case.
	pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Serializes `payload` as the JSON body.
	pub fn with_json<T>(mut self, payload: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let body = serde_json::to_vec(payload).map_err(Error::Encode)?;

		self.headers.insert(CONTENT_TYPE.into(), JSON_CONTENT_TYPE.into());
		self.body = Some(body);

		Ok(self)
	}

	/// Resolves the request against `config`, attaching `token` as a bearer credential.
	///
	/// A caller-supplied `authorization` header is replaced when a token is given.
	pub fn resolve(
		&self,
		config: &ClientConfig,
		token: Option<&TokenSecret>,
	) -> Result<HttpRequest, ConfigError> {
		let mut url = config.endpoint_url(&self.path)?;

		if !self.query.is_empty() {
			url.query_pairs_mut().extend_pairs(&self.query);
		}

		let mut headers = self.headers.clone();

		if let Some(token) = token {
			headers.insert(AUTHORIZATION.into(), token.bearer());
		}

		Ok(HttpRequest { method: self.method, url, headers, body: self.body.clone() })
	}
}

/// Fully resolved request handed to an [`HttpTransport`].
#[derive(Clone, PartialEq, Eq)]
pub struct HttpRequest {
	/// HTTP verb.
	pub method: Method,
	/// Absolute URL including query parameters.
	pub url: Url,
	/// Headers keyed by lower-case name.
	pub headers: BTreeMap<String, String>,
	/// Raw request body.
	pub body: Option<Vec<u8>>,
}
impl HttpRequest {
	/// Returns the bearer token carried by the request, if any.
	pub fn bearer(&self) -> Option<&str> {
		self.headers.get(AUTHORIZATION).and_then(|value| value.strip_prefix("Bearer "))
	}
}
impl Debug for HttpRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("authorized", &self.headers.contains_key(AUTHORIZATION))
			.field("body_len", &self.body.as_ref().map(Vec::len))
			.finish()
	}
}

/// Raw response produced by an [`HttpTransport`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Headers keyed by lower-case name.
	pub headers: BTreeMap<String, String>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Creates a response with the provided status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: BTreeMap::new(), body: body.into() }
	}

	/// Creates a JSON response from a JSON value.
	pub fn json(status: u16, payload: &serde_json::Value) -> Self {
		let mut response = Self::new(status, payload.to_string());

		response.headers.insert(CONTENT_TYPE.into(), JSON_CONTENT_TYPE.into());

		response
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Successful response returned to callers, tagged with the path it answered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
	/// API path the request targeted.
	pub path: String,
	/// HTTP status code.
	pub status: u16,
	/// Headers keyed by lower-case name.
	pub headers: BTreeMap<String, String>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	pub(crate) fn new(path: &str, response: HttpResponse) -> Self {
		Self {
			path: path.to_owned(),
			status: response.status,
			headers: response.headers,
			body: response.body,
		}
	}

	/// Accepts 2xx responses and converts anything else into [`Error::Status`].
	pub(crate) fn from_success(path: &str, response: HttpResponse) -> Result<Self> {
		if response.is_success() {
			Ok(Self::new(path, response))
		} else {
			Err(Error::Status {
				path: path.to_owned(),
				status: response.status,
				body: String::from_utf8_lossy(&response.body).into_owned(),
			})
		}
	}

	/// Decodes the body as JSON, reporting the failing field path on error.
	///
	/// An empty body decodes as JSON `null`.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let body: &[u8] = if self.body.is_empty() { b"null" } else { &self.body };
		let de = &mut serde_json::Deserializer::from_slice(body);
		let value = serde_path_to_error::deserialize(&mut *de)
			.map_err(|source| Error::Decode { path: self.path.clone(), source })?;

		de.end().map_err(|source| Error::TrailingData { path: self.path.clone(), source })?;

		Ok(value)
	}

	/// Returns the body as lossy UTF-8 text.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Reqwest-backed [`HttpTransport`] with a cookie jar for the refresh cookie.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	///
	/// The client should enable its cookie store, otherwise the refresh endpoint never sees the
	/// refresh cookie.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a cookie-enabled client honouring the configured user agent and timeout.
	pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
		let mut builder = ReqwestClient::builder().cookie_store(true);

		if let Some(agent) = &config.user_agent {
			builder = builder.user_agent(agent.as_str());
		}
		if let Some(timeout) = config.timeout() {
			builder = builder.timeout(timeout);
		}

		builder.build().map(Self).map_err(ConfigError::http_client_build)
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
				Method::Put => reqwest::Method::PUT,
				Method::Patch => reqwest::Method::PATCH,
				Method::Delete => reqwest::Method::DELETE,
			};
			let mut builder = client.request(method, request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await?.to_vec();

			Ok(HttpResponse { status, headers, body })
		})
	}
}
