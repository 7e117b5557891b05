//! Request and response payloads exchanged with the member authentication endpoints.

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, auth::TokenSecret};

const ENVELOPE_DATA_KEY: &str = "data";
const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Email/password credentials posted to the login endpoint.
#[derive(Clone, Serialize)]
pub struct LoginCredentials {
	/// Member email address.
	pub email: String,
	/// Plain-text password; never printed by `Debug`.
	pub password: String,
}
impl LoginCredentials {
	/// Creates a credential pair.
	pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
		Self { email: email.into(), password: password.into() }
	}
}
impl Debug for LoginCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginCredentials")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Authorization code posted to the social (Kakao) login endpoint.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLoginRequest {
	/// Authorization code returned by the social provider.
	pub code: String,
	/// Redirect URI used when the code was issued, if the backend needs it echoed.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub redirect_uri: Option<String>,
}
impl SocialLoginRequest {
	/// Creates a request for the provided authorization code.
	pub fn new(code: impl Into<String>) -> Self {
		Self { code: code.into(), redirect_uri: None }
	}

	/// Attaches the redirect URI used during authorization.
	pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
		self.redirect_uri = Some(uri.into());

		self
	}
}

/// Token-bearing payload returned by login, social login, and refresh endpoints.
///
/// Any extra member fields returned alongside the token land in [`AuthSession::profile`]. A
/// `refreshToken` field, if the backend echoes one, is dropped; refresh credentials stay in the
/// transport's cookie jar.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Remaining member fields (id, nickname, region, ...).
	#[serde(flatten)]
	pub profile: BTreeMap<String, Value>,
}

/// Decodes an [`AuthSession`] from either the `{ "data": { .. } }` envelope or a bare object.
pub(crate) fn parse_auth_session(path: &str, body: Value) -> Result<AuthSession> {
	let inner = match body {
		Value::Object(mut map) => match map.remove(ENVELOPE_DATA_KEY) {
			Some(data @ Value::Object(_)) => data,
			Some(other) => {
				map.insert(ENVELOPE_DATA_KEY.into(), other);

				Value::Object(map)
			},
			None => Value::Object(map),
		},
		other => other,
	};
	let mut session: AuthSession = serde_path_to_error::deserialize(inner)
		.map_err(|source| Error::Decode { path: path.to_owned(), source })?;

	session.profile.remove(REFRESH_TOKEN_KEY);

	Ok(session)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn enveloped_and_bare_payloads_decode() {
		let wrapped = serde_json::json!({
			"success": true,
			"message": "ok",
			"data": { "accessToken": "wrapped-token", "memberId": 7, "refreshToken": "leak" }
		});
		let session = parse_auth_session("/members/login", wrapped)
			.expect("Enveloped payload should decode.");

		assert_eq!(session.access_token.expose(), "wrapped-token");
		assert_eq!(session.profile.get("memberId"), Some(&serde_json::json!(7)));
		assert!(!session.profile.contains_key("refreshToken"));

		let bare = serde_json::json!({ "accessToken": "bare-token", "data": "unrelated" });
		let session =
			parse_auth_session("/members/refresh-token", bare).expect("Bare payload should decode.");

		assert_eq!(session.access_token.expose(), "bare-token");
		assert_eq!(session.profile.get("data"), Some(&serde_json::json!("unrelated")));
	}

	#[test]
	fn missing_token_reports_decode_error() {
		let err = parse_auth_session(
			"/members/refresh-token",
			serde_json::json!({ "data": { "nickname": "zoomer" } }),
		)
		.expect_err("Payloads without an access token should fail.");

		assert!(matches!(err, Error::Decode { ref path, .. } if path == "/members/refresh-token"));
	}

	#[test]
	fn credentials_redact_password_and_serialize_fields() {
		let credentials = LoginCredentials::new("user@hanazoom.com", "hunter2");

		assert!(!format!("{credentials:?}").contains("hunter2"));
		assert_eq!(
			serde_json::to_value(&credentials).expect("Credentials should serialize."),
			serde_json::json!({ "email": "user@hanazoom.com", "password": "hunter2" }),
		);

		let social = SocialLoginRequest::new("kakao-code").with_redirect_uri("https://app/cb");

		assert_eq!(
			serde_json::to_value(&social).expect("Social login request should serialize."),
			serde_json::json!({ "code": "kakao-code", "redirectUri": "https://app/cb" }),
		);
	}
}
