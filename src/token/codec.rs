//! Compact HS256 token encoding, structural decoding, and signature verification.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use sha2::Sha256;
use subtle::ConstantTimeEq;
// self
use crate::{
	_prelude::*,
	error::TokenError,
	token::{SharedSecret, TokenClaims, TokenHeader},
};

type HmacSha256 = Hmac<Sha256>;

/// Compact `header.claims.signature` token.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedToken(String);
impl SignedToken {
	/// Compact token text.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Value for an `Authorization` header (`JWT <token>`).
	pub fn authorization_value(&self) -> String {
		format!("JWT {}", self.0)
	}

	/// Consumes the wrapper, returning the compact token.
	pub fn into_string(self) -> String {
		self.0
	}
}
impl AsRef<str> for SignedToken {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Debug for SignedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SignedToken").field(&"<redacted>").finish()
	}
}
impl Display for SignedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Structurally parsed token. The signature is carried but not checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedToken {
	/// Decoded header.
	pub header: TokenHeader,
	/// Decoded claims.
	pub claims: TokenClaims,
	/// Raw base64url signature segment.
	pub signature: String,
	/// Raw `header.claims` bytes the signature covers.
	pub signing_input: String,
}
impl DecodedToken {
	/// Checks the signature against `secret` in constant time.
	pub fn verify(&self, secret: &SharedSecret) -> bool {
		signature_matches(&self.signing_input, &self.signature, secret)
	}
}

/// Serializes and signs `header` + `claims` with HMAC-SHA256.
pub fn encode(
	header: &TokenHeader,
	claims: &TokenClaims,
	secret: &SharedSecret,
) -> Result<SignedToken, TokenError> {
	let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header)?);
	let claims = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
	let signing_input = format!("{header}.{claims}");
	let signature = URL_SAFE_NO_PAD.encode(sign(signing_input.as_bytes(), secret)?);

	Ok(SignedToken(format!("{signing_input}.{signature}")))
}

/// Parses a compact token without verifying its signature.
///
/// Fails unless the token has exactly three segments whose first two are base64url JSON.
/// Trailing `=` padding is tolerated.
pub fn decode(token: &str) -> Result<DecodedToken, TokenError> {
	let mut segments = token.split('.');
	let (Some(raw_header), Some(raw_claims), Some(signature), None) =
		(segments.next(), segments.next(), segments.next(), segments.next())
	else {
		return Err(TokenError::malformed("expected three dot-separated segments"));
	};
	let header = decode_segment::<TokenHeader>(raw_header, "header")?;
	let claims = decode_segment::<TokenClaims>(raw_claims, "claims")?;

	Ok(DecodedToken {
		header,
		claims,
		signature: signature.to_owned(),
		signing_input: format!("{raw_header}.{raw_claims}"),
	})
}

/// Recomputes the HMAC over the token's raw `header.claims` bytes and compares it to the
/// signature segment in constant time. Expiry is not checked.
pub fn verify(token: &str, secret: &SharedSecret) -> bool {
	let Some((signing_input, signature)) = token.rsplit_once('.') else {
		return false;
	};

	if signing_input.matches('.').count() != 1 {
		return false;
	}

	signature_matches(signing_input, signature, secret)
}

fn signature_matches(signing_input: &str, signature: &str, secret: &SharedSecret) -> bool {
	let Ok(expected) = sign(signing_input.as_bytes(), secret) else {
		return false;
	};
	let expected = URL_SAFE_NO_PAD.encode(expected);

	expected.as_bytes().ct_eq(signature.trim_end_matches('=').as_bytes()).into()
}

fn sign(input: &[u8], secret: &SharedSecret) -> Result<Vec<u8>, TokenError> {
	let mut mac = HmacSha256::new_from_slice(secret.expose().as_bytes())
		.map_err(|_| TokenError::InvalidKey)?;

	mac.update(input);

	Ok(mac.finalize().into_bytes().to_vec())
}

fn decode_segment<T>(segment: &str, name: &str) -> Result<T, TokenError>
where
	T: DeserializeOwned,
{
	let bytes = URL_SAFE_NO_PAD
		.decode(segment.trim_end_matches('='))
		.map_err(|_| TokenError::malformed(format!("{name} segment is not base64url")))?;

	serde_json::from_slice(&bytes)
		.map_err(|_| TokenError::malformed(format!("{name} segment is not a JSON object")))
}
