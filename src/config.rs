//! Runtime configuration shared by the canonicalizer, token issuer, and auth guard.

// self
use crate::{_prelude::*, error::ConfigError, qsh::QshCanonicalizer, token::TokenIssuer};

/// Deployment environment the guard runs in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
	/// Locally run integration; unsigned requests are self-signed with the fallback tenant.
	Local,
	#[default]
	/// Every inbound request must carry a token.
	Production,
}
impl FromStr for Environment {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"local" | "dev" | "development" => Ok(Self::Local),
			"production" | "prod" => Ok(Self::Production),
			other => Err(ConfigError::InvalidValue {
				key: "environment",
				reason: format!("unknown environment `{other}`"),
			}),
		}
	}
}

/// Application configuration.
///
/// Every field has a default, so partial documents deserialize cleanly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectConfig {
	/// Base URL the application itself is served from; stripped from inbound URLs before
	/// canonicalizing.
	pub app_url: String,
	/// Deployment environment.
	pub environment: Environment,
	/// Mount prefixes removed (at most one) from canonical paths.
	pub path_prefixes: Vec<String>,
	/// Lifetime of issued tokens, in seconds.
	pub token_ttl_secs: u64,
}
impl ConnectConfig {
	/// Default token lifetime (24 hours).
	pub const DEFAULT_TOKEN_TTL_SECS: u64 = 86_400;

	const ENV_APP_URL: &'static str = "CONNECT_APP_URL";
	const ENV_ENVIRONMENT: &'static str = "CONNECT_ENV";
	const ENV_PATH_PREFIXES: &'static str = "CONNECT_PATH_PREFIXES";
	const ENV_TOKEN_TTL_SECS: &'static str = "CONNECT_TOKEN_TTL_SECS";

	/// Parses a JSON document, reporting the failing field path on error.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ConfigError::InvalidDocument { source })?;

		config.validate()?;

		Ok(config)
	}

	/// Reads configuration through an arbitrary key lookup; unset keys keep their defaults.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut config = Self::default();

		if let Some(app_url) = lookup(Self::ENV_APP_URL) {
			config.app_url = app_url;
		}
		if let Some(environment) = lookup(Self::ENV_ENVIRONMENT) {
			config.environment = environment.parse()?;
		}
		if let Some(prefixes) = lookup(Self::ENV_PATH_PREFIXES) {
			config.path_prefixes = prefixes
				.split(',')
				.map(str::trim)
				.filter(|prefix| !prefix.is_empty())
				.map(ToOwned::to_owned)
				.collect();
		}
		if let Some(ttl) = lookup(Self::ENV_TOKEN_TTL_SECS) {
			config.token_ttl_secs = ttl.trim().parse().map_err(|e| ConfigError::InvalidValue {
				key: "token_ttl_secs",
				reason: format!("{e}"),
			})?;
		}

		config.validate()?;

		Ok(config)
	}

	/// Reads configuration from `CONNECT_*` process environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Checks cross-field invariants.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.token_ttl_secs == 0 {
			return Err(ConfigError::NonPositiveTokenTtl);
		}

		if let Some(prefix) = self.path_prefixes.iter().find(|prefix| !prefix.starts_with('/')) {
			return Err(ConfigError::InvalidPathPrefix { prefix: prefix.clone() });
		}

		Ok(())
	}

	/// Overrides the application base URL.
	pub fn with_app_url(mut self, app_url: impl Into<String>) -> Self {
		self.app_url = app_url.into();

		self
	}

	/// Overrides the environment.
	pub fn with_environment(mut self, environment: Environment) -> Self {
		self.environment = environment;

		self
	}

	/// Replaces the mount prefix list.
	pub fn with_path_prefixes<I, S>(mut self, prefixes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.path_prefixes = prefixes.into_iter().map(Into::into).collect();

		self
	}

	/// Token lifetime as a [`Duration`].
	pub fn token_ttl(&self) -> Duration {
		Duration::seconds(i64::try_from(self.token_ttl_secs).unwrap_or(i64::MAX))
	}

	/// Builds the canonicalizer described by this configuration.
	pub fn canonicalizer(&self) -> QshCanonicalizer {
		QshCanonicalizer::new(self.app_url.clone()).with_prefixes(self.path_prefixes.clone())
	}

	/// Builds the token issuer described by this configuration.
	pub fn issuer(&self) -> TokenIssuer {
		TokenIssuer::new(self.canonicalizer()).with_ttl(self.token_ttl())
	}
}
impl Default for ConnectConfig {
	fn default() -> Self {
		Self {
			app_url: String::new(),
			environment: Environment::default(),
			path_prefixes: vec![QshCanonicalizer::DEFAULT_PREFIX.to_owned()],
			token_ttl_secs: Self::DEFAULT_TOKEN_TTL_SECS,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn partial_documents_keep_defaults() {
		let config = ConnectConfig::from_json_str(r#"{"app_url":"https://app.example.com"}"#)
			.expect("Partial configuration should parse.");

		assert_eq!(config.app_url, "https://app.example.com");
		assert_eq!(config.environment, Environment::Production);
		assert_eq!(config.path_prefixes, vec!["/wiki".to_owned()]);
		assert_eq!(config.token_ttl(), Duration::hours(24));
	}

	#[test]
	fn document_errors_report_field_path() {
		let err = ConnectConfig::from_json_str(r#"{"token_ttl_secs":"soon"}"#)
			.expect_err("String TTL must be rejected.");

		match err {
			ConfigError::InvalidDocument { source } =>
				assert_eq!(source.path().to_string(), "token_ttl_secs"),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn lookup_reads_connect_variables() {
		let vars = HashMap::from([
			("CONNECT_APP_URL", "http://localhost:8000"),
			("CONNECT_ENV", "local"),
			("CONNECT_PATH_PREFIXES", "/wiki, /jira"),
			("CONNECT_TOKEN_TTL_SECS", "600"),
		]);
		let config = ConnectConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_owned()))
			.expect("Lookup-based configuration should parse.");

		assert_eq!(config.app_url, "http://localhost:8000");
		assert_eq!(config.environment, Environment::Local);
		assert_eq!(config.path_prefixes, vec!["/wiki".to_owned(), "/jira".to_owned()]);
		assert_eq!(config.token_ttl_secs, 600);
	}

	#[test]
	fn validation_rejects_bad_values() {
		assert!(matches!(
			ConnectConfig::from_lookup(|key| (key == "CONNECT_TOKEN_TTL_SECS").then(|| "0".into())),
			Err(ConfigError::NonPositiveTokenTtl)
		));
		assert!(matches!(
			ConnectConfig::from_lookup(|key| (key == "CONNECT_ENV").then(|| "staging".into())),
			Err(ConfigError::InvalidValue { key: "environment", .. })
		));

		let err = ConnectConfig::default()
			.with_path_prefixes(["wiki"])
			.validate()
			.expect_err("Relative prefixes must be rejected.");

		assert!(matches!(err, ConfigError::InvalidPathPrefix { .. }));
	}
}
