//! Inbound request authentication.
//!
//! [`AuthGuard`] resolves the tenant behind a signed request. The token comes from the `jwt`
//! query parameter first, then from the `Authorization` header. Checks run in a fixed order and
//! the first failure wins: decode, issuer lookup, QSH binding, signature, expiry.
//!
//! In [`Environment::Local`], a request without a token is self-signed with the store's fallback
//! tenant before the checks run, so local development works without a platform in front.

// self
use crate::{
	_prelude::*,
	config::{ConnectConfig, Environment},
	error::AuthRejection,
	obs::{self, OpSpan, Operation, Outcome},
	tenant::{TenantCredential, TenantStore},
	token::{self, SignedToken, TokenClaims, TokenIssuer},
};

/// Query parameter that carries an inbound token, matched without regard to ASCII case.
pub const TOKEN_QUERY_PARAM: &str = "jwt";

/// Minimal view of an inbound HTTP request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundRequest {
	/// Request method as received.
	pub method: String,
	/// Full request URL, including the query string.
	pub url: String,
	/// Raw `Authorization` header value, if present.
	pub authorization: Option<String>,
}
impl InboundRequest {
	/// Creates a request view without an `Authorization` header.
	pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
		Self { method: method.into(), url: url.into(), authorization: None }
	}

	/// Attaches an `Authorization` header value.
	pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
		self.authorization = Some(value.into());

		self
	}

	/// Extracts the presented token: query parameter first, header second.
	///
	/// The header accepts `JWT <token>` with any scheme casing, or a bare token.
	pub fn token(&self) -> Option<String> {
		self.query_token().or_else(|| self.header_token())
	}

	fn query_token(&self) -> Option<String> {
		let (_, query) = self.url.split_once('?')?;
		let query = query.split_once('#').map_or(query, |(query, _)| query);

		url::form_urlencoded::parse(query.as_bytes())
			.find(|(key, value)| key.eq_ignore_ascii_case(TOKEN_QUERY_PARAM) && !value.is_empty())
			.map(|(_, value)| value.into_owned())
	}

	fn header_token(&self) -> Option<String> {
		let value = self.authorization.as_deref()?.trim();
		let token = match value.split_once(char::is_whitespace) {
			Some((scheme, rest)) if scheme.eq_ignore_ascii_case("jwt") => rest.trim(),
			_ => value,
		};

		(!token.is_empty()).then(|| token.to_owned())
	}
}

/// Progress of one authentication attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthState {
	/// Nothing inspected yet.
	Unauthenticated,
	/// A token was found or synthesized.
	TokenExtracted,
	/// The token decoded and its issuer matched a tenant.
	IssuerResolved,
	/// Every check passed.
	Verified,
	/// A check failed.
	Rejected,
}
impl AuthState {
	/// Returns a stable label suitable for span or log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Unauthenticated => "unauthenticated",
			Self::TokenExtracted => "token_extracted",
			Self::IssuerResolved => "issuer_resolved",
			Self::Verified => "verified",
			Self::Rejected => "rejected",
		}
	}
}
impl Display for AuthState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Tenant resolved for an accepted request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedTenant {
	/// Credential of the issuing tenant.
	pub tenant: TenantCredential,
	/// Verified claims of the presented token.
	pub claims: TokenClaims,
	/// Whether the token was self-signed for a local request.
	pub synthesized: bool,
}
impl AuthenticatedTenant {
	/// Key of the user the platform acted for, from `sub` or `context.user.userKey`.
	pub fn user_key(&self) -> Option<&str> {
		self.claims.sub.as_deref().or_else(|| {
			self.claims.context.as_ref()?.pointer("/user/userKey")?.as_str()
		})
	}
}

/// Authenticates inbound requests against a [`TenantStore`].
#[derive(Clone, Debug)]
pub struct AuthGuard<S> {
	store: S,
	environment: Environment,
	issuer: TokenIssuer,
}
impl<S> AuthGuard<S>
where
	S: TenantStore,
{
	/// Builds a guard from `config`.
	pub fn new(store: S, config: &ConnectConfig) -> Self {
		Self { store, environment: config.environment, issuer: config.issuer() }
	}

	/// Underlying tenant store.
	pub fn store(&self) -> &S {
		&self.store
	}

	/// Environment the guard runs in.
	pub fn environment(&self) -> Environment {
		self.environment
	}

	/// Authenticates `request` at the current time.
	pub async fn authenticate(
		&self,
		request: &InboundRequest,
	) -> Result<AuthenticatedTenant, AuthRejection> {
		self.authenticate_at(request, OffsetDateTime::now_utc()).await
	}

	/// Authenticates `request`, evaluating expiry against `now`.
	pub async fn authenticate_at(
		&self,
		request: &InboundRequest,
		now: OffsetDateTime,
	) -> Result<AuthenticatedTenant, AuthRejection> {
		const KIND: Operation = Operation::Authenticate;

		obs::record(KIND, Outcome::Attempt);

		let span = OpSpan::new(KIND, "authenticate");
		let mut state = AuthState::Unauthenticated;
		let result = span.instrument(self.run(request, now, &mut state)).await;

		match &result {
			Ok(authenticated) => {
				obs::record(KIND, Outcome::Success);
				tracing::debug!(
					issuer = %authenticated.tenant.client_key,
					synthesized = authenticated.synthesized,
					"inbound request authenticated"
				);
			},
			Err(rejection) => {
				let reached = state;

				advance(&mut state, AuthState::Rejected);
				obs::record(KIND, Outcome::Failure);
				obs::record_rejection(rejection.as_str());
				tracing::warn!(
					reason = rejection.as_str(),
					reached = reached.as_str(),
					method = %request.method,
					"inbound request rejected"
				);
			},
		}

		result
	}

	async fn run(
		&self,
		request: &InboundRequest,
		now: OffsetDateTime,
		state: &mut AuthState,
	) -> Result<AuthenticatedTenant, AuthRejection> {
		let (raw, synthesized) = match request.token() {
			Some(raw) => (raw, false),
			None if self.environment == Environment::Local =>
				(self.synthesize(request, now).await?, true),
			None => return Err(AuthRejection::MissingToken),
		};

		advance(state, AuthState::TokenExtracted);

		let decoded = token::decode(&raw).map_err(AuthRejection::MalformedToken)?;
		let tenant = self
			.store
			.lookup(&decoded.claims.iss)
			.await
			.map_err(AuthRejection::Storage)?
			.ok_or_else(|| AuthRejection::UnknownTenant { issuer: decoded.claims.iss.clone() })?;

		advance(state, AuthState::IssuerResolved);

		if self.issuer.qsh(&request.method, &request.url) != decoded.claims.qsh.as_str() {
			return Err(AuthRejection::SignatureMismatch);
		}
		if !decoded.verify(&tenant.shared_secret) {
			return Err(AuthRejection::InvalidSignature);
		}
		if decoded.claims.is_expired_at(now) {
			return Err(AuthRejection::TokenExpired { expires_at: decoded.claims.exp });
		}

		advance(state, AuthState::Verified);

		Ok(AuthenticatedTenant { tenant, claims: decoded.claims, synthesized })
	}

	async fn synthesize(
		&self,
		request: &InboundRequest,
		now: OffsetDateTime,
	) -> Result<String, AuthRejection> {
		let tenant = self
			.store
			.lookup_fallback()
			.await
			.map_err(AuthRejection::Storage)?
			.ok_or(AuthRejection::NoCredentialAvailable)?;

		tracing::debug!(issuer = %tenant.client_key, "self-signing local request");

		self.issuer
			.issue_at(&request.url, &request.method, &tenant.client_key, &tenant.shared_secret, now)
			.map(SignedToken::into_string)
			.map_err(AuthRejection::MalformedToken)
	}
}

fn advance(state: &mut AuthState, next: AuthState) {
	tracing::trace!(from = state.as_str(), to = next.as_str(), "auth state advanced");

	*state = next;
}
