//! Crate-level error types shared across the canonicalizer, token codec, guard, client, and
//! paginator.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Tenant storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::tenant::TenantStoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (network, non-2xx, undecodable body).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token could not be built or parsed.
	#[error(transparent)]
	Token(#[from] TokenError),
	/// Inbound request failed authentication.
	#[error(transparent)]
	Auth(#[from] AuthRejection),
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A URL could not be parsed.
	#[error("URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Configuration document could not be parsed.
	#[error("Configuration document is invalid.")]
	InvalidDocument {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Configuration value could not be parsed.
	#[error("Configuration value `{key}` is invalid: {reason}.")]
	InvalidValue {
		/// Configuration key.
		key: &'static str,
		/// Human-readable reason.
		reason: String,
	},
	/// Token lifetime must be positive.
	#[error("Token lifetime must be positive.")]
	NonPositiveTokenTtl,
	/// Path prefixes must be absolute.
	#[error("Path prefix `{prefix}` must start with `/`.")]
	InvalidPathPrefix {
		/// Offending prefix.
		prefix: String,
	},

	/// Paginator was built without a transport.
	#[error("Paginator requires an HTTP transport.")]
	MissingTransport,
	/// Paginator was built without a request URL.
	#[error("Paginator requires a request URL.")]
	MissingUrl,
	/// Paginator was built without a strategy.
	#[error("Paginator requires a pagination strategy.")]
	MissingStrategy,
	/// Strategy name is not one of `page`, `offset`, or `next`.
	#[error("Pagination strategy `{name}` is not recognized.")]
	UnknownStrategy {
		/// Unrecognized strategy name.
		name: String,
	},
	/// Product type has no pagination preset.
	#[error("No paginator is registered for product type `{product}`.")]
	UnknownProduct {
		/// Unrecognized product type.
		product: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Builds an [`ConfigError::InvalidUrl`] for the provided input.
	pub fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
		Self::InvalidUrl { url: url.into(), source }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures raised by outbound requests.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling `{url}`.")]
	Network {
		/// Request URL.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Remote endpoint answered with a non-2xx status.
	#[error("Request to `{url}` failed with HTTP {status}.")]
	Status {
		/// Request URL.
		url: String,
		/// HTTP status code.
		status: u16,
		/// Raw response body for caller inspection.
		body: String,
	},
	/// Response body could not be decoded as JSON.
	#[error("Response from `{url}` is not valid JSON.")]
	Decode {
		/// Request URL.
		url: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Outbound request could not be signed.
	#[error("Request could not be signed.")]
	Sign(#[source] TokenError),
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: impl Into<String>, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { url: url.into(), source: Box::new(src) }
	}

	/// HTTP status attached to the failure, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Token construction and structural parsing failures.
#[derive(Debug, ThisError)]
pub enum TokenError {
	/// Token is not a three-segment base64url JSON structure.
	#[error("Token is malformed: {reason}.")]
	Malformed {
		/// Human-readable reason.
		reason: String,
	},
	/// Header or claims could not be serialized.
	#[error("Token segment could not be serialized.")]
	Encode(#[from] serde_json::Error),
	/// Shared secret was rejected as an HMAC key.
	#[error("Shared secret cannot key HMAC-SHA256.")]
	InvalidKey,
}
impl TokenError {
	pub(crate) fn malformed(reason: impl Into<String>) -> Self {
		Self::Malformed { reason: reason.into() }
	}
}

/// Reasons an inbound request is rejected by [`AuthGuard`](crate::guard::AuthGuard).
///
/// Every variant maps to HTTP 401 at the boundary. The variant is meant for logs; clients should
/// only ever see [`AuthRejection::public_message`].
#[derive(Debug, ThisError)]
pub enum AuthRejection {
	/// No token in the query string or `Authorization` header.
	#[error("Request carries no token.")]
	MissingToken,
	/// Local mode could not find a fallback tenant to self-sign with.
	#[error("No fallback tenant is available to sign local requests.")]
	NoCredentialAvailable,
	/// Token failed structural parsing.
	#[error("Token is malformed.")]
	MalformedToken(#[source] TokenError),
	/// Token issuer does not match any tenant.
	#[error("Token issuer `{issuer}` is not a known tenant.")]
	UnknownTenant {
		/// Issuer claimed by the token.
		issuer: String,
	},
	/// Token QSH does not match the request it was presented with.
	#[error("Token query string hash does not match the request.")]
	SignatureMismatch,
	/// Token signature does not verify with the tenant secret.
	#[error("Token signature is invalid.")]
	InvalidSignature,
	/// Token expiry lies in the past.
	#[error("Token expired at {expires_at}.")]
	TokenExpired {
		/// Expiry claim, unix seconds.
		expires_at: i64,
	},
	/// Tenant lookup failed.
	#[error("Tenant lookup failed.")]
	Storage(#[source] crate::tenant::TenantStoreError),
}
impl AuthRejection {
	/// HTTP status every rejection maps to.
	pub const fn status_code(&self) -> u16 {
		401
	}

	/// Response text safe to send to clients; identical for every reason.
	pub const fn public_message(&self) -> &'static str {
		"Unauthorized."
	}

	/// Stable label suitable for span or metric fields.
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::MissingToken => "missing_token",
			Self::NoCredentialAvailable => "no_credential_available",
			Self::MalformedToken(_) => "malformed_token",
			Self::UnknownTenant { .. } => "unknown_tenant",
			Self::SignatureMismatch => "signature_mismatch",
			Self::InvalidSignature => "invalid_signature",
			Self::TokenExpired { .. } => "token_expired",
			Self::Storage(_) => "storage",
		}
	}
}
