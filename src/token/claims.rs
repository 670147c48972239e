//! Token header and claim set.

// self
use crate::_prelude::*;

/// JOSE header; always `{"typ":"JWT","alg":"HS256"}` for issued tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
	/// Token type.
	pub typ: String,
	/// Signature algorithm.
	pub alg: String,
}
impl TokenHeader {
	/// Only supported signature algorithm.
	pub const ALGORITHM: &'static str = "HS256";
	/// Token type emitted in every header.
	pub const TYPE: &'static str = "JWT";

	/// Header for HMAC-SHA256 signed tokens.
	pub fn hs256() -> Self {
		Self { typ: Self::TYPE.into(), alg: Self::ALGORITHM.into() }
	}
}
impl Default for TokenHeader {
	fn default() -> Self {
		Self::hs256()
	}
}

/// Claim set carried by every token.
///
/// Issued tokens serialize `iss`, `iat`, `exp`, `qsh` in that order. Inbound platform tokens may
/// also carry `sub` and a free-form `context`; both are decoded but never required.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
	/// Issuer: the tenant client key inbound, the add-on key outbound.
	pub iss: String,
	/// Issued-at, unix seconds.
	pub iat: i64,
	/// Expiry, unix seconds.
	pub exp: i64,
	/// Query string hash of the request the token is bound to.
	#[serde(default)]
	pub qsh: String,
	/// Subject (user key) when the platform acts for a user.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sub: Option<String>,
	/// Platform-supplied context object.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub context: Option<serde_json::Value>,
}
impl TokenClaims {
	/// Builds the minimal claim set.
	pub fn new(iss: impl Into<String>, iat: i64, exp: i64, qsh: impl Into<String>) -> Self {
		Self { iss: iss.into(), iat, exp, qsh: qsh.into(), sub: None, context: None }
	}

	/// Issued-at as a timestamp, if representable.
	pub fn issued_at(&self) -> Option<OffsetDateTime> {
		OffsetDateTime::from_unix_timestamp(self.iat).ok()
	}

	/// Expiry as a timestamp, if representable.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		OffsetDateTime::from_unix_timestamp(self.exp).ok()
	}

	/// Whether the token is expired at `now` (`exp <= now`).
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.exp <= now.unix_timestamp()
	}
}
