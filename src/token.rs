//! Token issuance, decoding, and verification.
//!
//! Tokens are compact HS256 JWTs whose claims bind issuer, timestamps, and the [`Qsh`] of the
//! request they were issued for.

pub mod claims;
pub mod codec;
pub mod secret;

pub use claims::*;
pub use codec::*;
pub use secret::SharedSecret;

// self
use crate::{
	_prelude::*,
	error::TokenError,
	qsh::{Qsh, QshCanonicalizer},
};

/// Issues tokens bound to a specific request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenIssuer {
	canonicalizer: QshCanonicalizer,
	ttl: Duration,
}
impl TokenIssuer {
	/// Default token lifetime.
	pub const DEFAULT_TTL: Duration = Duration::hours(24);

	/// Creates an issuer using `canonicalizer` and the default lifetime.
	pub fn new(canonicalizer: QshCanonicalizer) -> Self {
		Self { canonicalizer, ttl: Self::DEFAULT_TTL }
	}

	/// Overrides the token lifetime.
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;

		self
	}

	/// Canonicalizer used to compute the QSH claim.
	pub fn canonicalizer(&self) -> &QshCanonicalizer {
		&self.canonicalizer
	}

	/// Token lifetime.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Issues a token for `method` + `url`, valid from now.
	pub fn issue(
		&self,
		url: &str,
		method: &str,
		issuer: &str,
		secret: &SharedSecret,
	) -> Result<SignedToken, TokenError> {
		self.issue_at(url, method, issuer, secret, OffsetDateTime::now_utc())
	}

	/// Issues a token for `method` + `url` with `iat = now`.
	pub fn issue_at(
		&self,
		url: &str,
		method: &str,
		issuer: &str,
		secret: &SharedSecret,
		now: OffsetDateTime,
	) -> Result<SignedToken, TokenError> {
		let qsh = self.qsh(method, url);
		let iat = now.unix_timestamp();
		let claims = TokenClaims::new(issuer, iat, iat.saturating_add(self.ttl.whole_seconds()), qsh);

		encode(&TokenHeader::hs256(), &claims, secret)
	}

	/// QSH of `method` + `url` under this issuer's canonicalizer.
	pub fn qsh(&self, method: &str, url: &str) -> Qsh {
		self.canonicalizer.qsh(method, url)
	}
}
impl Default for TokenIssuer {
	fn default() -> Self {
		Self::new(QshCanonicalizer::default())
	}
}
