//! Shared secret wrapper that redacts key material.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
// self
use crate::_prelude::*;

/// Redacted HMAC key shared between a tenant and the application.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SharedSecret(String);
impl SharedSecret {
	const GENERATED_LEN: usize = 48;

	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Generates a random URL-safe secret, used for locally provisioned tenants.
	pub fn generate() -> Self {
		let mut bytes = [0_u8; Self::GENERATED_LEN];

		rand::rng().fill(&mut bytes[..]);

		Self(URL_SAFE_NO_PAD.encode(bytes))
	}

	/// Returns the inner secret. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for SharedSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SharedSecret").field(&"<redacted>").finish()
	}
}
impl Display for SharedSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
