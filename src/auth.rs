//! Access-token model and authentication payloads.

pub mod payload;
pub mod secret;

pub use payload::{AuthSession, LoginCredentials, SocialLoginRequest};
pub use secret::*;
