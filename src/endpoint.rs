//! Endpoint classification for bearer attachment and refresh eligibility.
//!
//! Paths are compared relative to the configured API prefix, with any query string and trailing
//! slash ignored, so `/members/login?next=/` and `/members/login/` both classify as the login
//! endpoint.

// self
use crate::_prelude::*;

/// Default login path.
pub const LOGIN_PATH: &str = "/members/login";
/// Default signup path.
pub const SIGNUP_PATH: &str = "/members/signup";
/// Default Kakao social login path.
pub const SOCIAL_LOGIN_PATH: &str = "/members/kakao-login";
/// Default access-token refresh path.
pub const REFRESH_PATH: &str = "/members/refresh-token";

/// Authentication endpoints and the refresh trigger policy used by the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointPolicy {
	/// Credential login endpoint.
	pub login: String,
	/// Member signup endpoint.
	pub signup: String,
	/// Social (Kakao) login endpoint.
	pub social_login: String,
	/// Access-token refresh endpoint.
	pub refresh: String,
	/// Treat HTTP 403 like 401 and attempt a refresh.
	///
	/// Enabled by default. Backends that use 403 strictly for authorization failures should turn
	/// it off so forbidden responses are not mistaken for token expiry.
	pub refresh_on_forbidden: bool,
}
impl EndpointPolicy {
	/// Returns `true` when requests to `path` must not carry a bearer token.
	pub fn is_auth_exempt(&self, path: &str) -> bool {
		let path = normalize(path);

		[&self.login, &self.signup, &self.social_login, &self.refresh]
			.into_iter()
			.any(|candidate| normalize(candidate) == path)
	}

	/// Returns `true` when an authentication failure on `path` must surface immediately.
	///
	/// Retrying these endpoints would loop back into the refresh flow.
	pub fn is_retry_exempt(&self, path: &str) -> bool {
		let path = normalize(path);

		normalize(&self.login) == path || normalize(&self.refresh) == path
	}

	/// Returns `true` when `status` should trigger the refresh flow.
	pub fn triggers_refresh(&self, status: u16) -> bool {
		status == 401 || (self.refresh_on_forbidden && status == 403)
	}

	pub(crate) fn paths(&self) -> [(&'static str, &str); 4] {
		[
			("login", &self.login),
			("signup", &self.signup),
			("social_login", &self.social_login),
			("refresh", &self.refresh),
		]
	}
}
impl Default for EndpointPolicy {
	fn default() -> Self {
		Self {
			login: LOGIN_PATH.into(),
			signup: SIGNUP_PATH.into(),
			social_login: SOCIAL_LOGIN_PATH.into(),
			refresh: REFRESH_PATH.into(),
			refresh_on_forbidden: true,
		}
	}
}

fn normalize(path: &str) -> &str {
	let path = path.split(['?', '#']).next().unwrap_or_default();
	let trimmed = path.trim_end_matches('/');

	if trimmed.is_empty() { "/" } else { trimmed }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn auth_endpoints_are_exempt_from_bearer() {
		let policy = EndpointPolicy::default();

		assert!(policy.is_auth_exempt("/members/login"));
		assert!(policy.is_auth_exempt("/members/signup/"));
		assert!(policy.is_auth_exempt("/members/kakao-login?code=abc"));
		assert!(policy.is_auth_exempt("/members/refresh-token"));
		assert!(!policy.is_auth_exempt("/members/login-history"));
		assert!(!policy.is_auth_exempt("/stocks/005930"));
	}

	#[test]
	fn only_login_and_refresh_skip_retry() {
		let policy = EndpointPolicy::default();

		assert!(policy.is_retry_exempt("/members/login"));
		assert!(policy.is_retry_exempt("/members/refresh-token?x=1"));
		assert!(!policy.is_retry_exempt("/members/signup"));
		assert!(!policy.is_retry_exempt("/members/kakao-login"));
		assert!(!policy.is_retry_exempt("/watchlist"));
	}

	#[test]
	fn forbidden_toggle_controls_refresh_trigger() {
		let mut policy = EndpointPolicy::default();

		assert!(policy.triggers_refresh(401));
		assert!(policy.triggers_refresh(403));
		assert!(!policy.triggers_refresh(404));

		policy.refresh_on_forbidden = false;

		assert!(policy.triggers_refresh(401));
		assert!(!policy.triggers_refresh(403));
	}

	#[test]
	fn policy_deserializes_with_defaults() {
		let policy: EndpointPolicy = serde_json::from_str("{\"refresh_on_forbidden\":false}")
			.expect("Partial endpoint policy should deserialize.");

		assert_eq!(policy.login, LOGIN_PATH);
		assert_eq!(policy.refresh, REFRESH_PATH);
		assert!(!policy.refresh_on_forbidden);
	}
}
