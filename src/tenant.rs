//! Tenant credentials and the lookup contract the guard and client depend on.

pub mod id;
pub mod memory;

pub use id::*;
pub use memory::MemoryTenantStore;

// self
use crate::{_prelude::*, error::ConfigError, token::SharedSecret};

/// Future returned by [`TenantStore`] operations.
pub type StoreFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, TenantStoreError>> + 'a + Send>>;

/// Tenant lookup backend.
pub trait TenantStore
where
	Self: Send + Sync,
{
	/// Fetches the tenant whose client key equals `client_key`.
	fn lookup<'a>(&'a self, client_key: &'a str) -> StoreFuture<'a, Option<TenantCredential>>;

	/// Fetches the fallback (dummy) tenant used to self-sign local requests.
	fn lookup_fallback(&self) -> StoreFuture<'_, Option<TenantCredential>>;
}
impl<T> TenantStore for Arc<T>
where
	T: ?Sized + TenantStore,
{
	fn lookup<'a>(&'a self, client_key: &'a str) -> StoreFuture<'a, Option<TenantCredential>> {
		(**self).lookup(client_key)
	}

	fn lookup_fallback(&self) -> StoreFuture<'_, Option<TenantCredential>> {
		(**self).lookup_fallback()
	}
}

/// Error type produced by [`TenantStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TenantStoreError {
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Platform product a tenant was installed into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
	/// Issue tracker.
	Jira,
	/// Wiki.
	Confluence,
}
impl ProductType {
	/// Stable lowercase label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Jira => "jira",
			Self::Confluence => "confluence",
		}
	}
}
impl Display for ProductType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ProductType {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"jira" => Ok(Self::Jira),
			"confluence" => Ok(Self::Confluence),
			_ => Err(ConfigError::UnknownProduct { product: s.to_owned() }),
		}
	}
}

/// Credential of one installation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantCredential {
	/// Installation key; inbound tokens use it as `iss`.
	pub client_key: ClientKey,
	/// Add-on key; outbound tokens use it as `iss`.
	pub app_key: AppKey,
	/// HMAC key shared with the platform.
	pub shared_secret: SharedSecret,
	/// Base URL of the tenant's platform instance.
	pub base_url: Url,
	/// Product the add-on was installed into, as reported by the platform.
	#[serde(default)]
	pub product_type: Option<String>,
	/// Marks the fallback tenant used to sign local requests.
	#[serde(default)]
	pub is_dummy: bool,
}
impl TenantCredential {
	/// Creates a non-dummy credential without a product type.
	pub fn new(
		client_key: ClientKey,
		app_key: AppKey,
		shared_secret: SharedSecret,
		base_url: Url,
	) -> Self {
		Self { client_key, app_key, shared_secret, base_url, product_type: None, is_dummy: false }
	}

	/// Provisions a fallback tenant with a freshly generated secret for local development.
	pub fn local_dummy(client_key: ClientKey, app_key: AppKey, base_url: Url) -> Self {
		Self::new(client_key, app_key, SharedSecret::generate(), base_url).into_dummy()
	}

	/// Sets the reported product type.
	pub fn with_product_type(mut self, product_type: impl Into<String>) -> Self {
		self.product_type = Some(product_type.into());

		self
	}

	/// Marks the credential as the fallback tenant.
	pub fn into_dummy(mut self) -> Self {
		self.is_dummy = true;

		self
	}

	/// Parsed product type, if one was reported.
	pub fn product(&self) -> Option<Result<ProductType, ConfigError>> {
		self.product_type.as_deref().map(str::parse)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn credential() -> TenantCredential {
		TenantCredential::new(
			ClientKey::new("tenant-1").expect("Client key fixture should be valid."),
			AppKey::new("com.example.addon").expect("App key fixture should be valid."),
			SharedSecret::new("secret"),
			Url::parse("https://tenant.example.net").expect("Base URL fixture should parse."),
		)
	}

	#[test]
	fn product_types_parse_case_insensitively() {
		assert_eq!("JIRA".parse::<ProductType>().ok(), Some(ProductType::Jira));
		assert_eq!(" confluence ".parse::<ProductType>().ok(), Some(ProductType::Confluence));
		assert!(matches!(
			"bitbucket".parse::<ProductType>(),
			Err(ConfigError::UnknownProduct { product }) if product == "bitbucket"
		));
	}

	#[test]
	fn credential_product_and_dummy_flags() {
		let plain = credential();

		assert!(plain.product().is_none());
		assert!(!plain.is_dummy);

		let jira = plain.with_product_type("jira").into_dummy();

		assert!(matches!(jira.product(), Some(Ok(ProductType::Jira))));
		assert!(jira.is_dummy);
	}

	#[test]
	fn local_dummy_generates_secret() {
		let client_key = ClientKey::new("local-dummy").expect("Client key fixture should be valid.");
		let app_key = AppKey::new("com.example.addon").expect("App key fixture should be valid.");
		let base_url = Url::parse("http://localhost:2990").expect("Base URL fixture should parse.");
		let a = TenantCredential::local_dummy(client_key.clone(), app_key.clone(), base_url.clone());
		let b = TenantCredential::local_dummy(client_key, app_key, base_url);

		assert!(a.is_dummy);
		assert_eq!(&*a.client_key, "local-dummy");
		assert_ne!(a.shared_secret, b.shared_secret);
	}

	#[test]
	fn credential_round_trips_through_install_json() {
		let stored = serde_json::to_value(credential().with_product_type("confluence"))
			.expect("Credential should serialize.");

		assert_eq!(stored["base_url"], "https://tenant.example.net/");
		assert_eq!(stored["shared_secret"], "secret");

		let parsed: TenantCredential = serde_json::from_value(serde_json::json!({
			"client_key": "tenant-1",
			"app_key": "com.example.addon",
			"shared_secret": "secret",
			"base_url": "https://tenant.example.net",
		}))
		.expect("Install payload should deserialize.");

		assert_eq!(parsed, credential());
		assert!(
			serde_json::from_value::<TenantCredential>(serde_json::json!({
				"client_key": "tenant-1",
				"app_key": "com.example.addon",
				"shared_secret": "secret",
				"base_url": "not a url",
			}))
			.is_err()
		);
	}

	#[test]
	fn credential_debug_redacts_secret() {
		let rendered = format!("{:?}", credential());

		assert!(rendered.contains("<redacted>"));
		assert!(!rendered.contains("\"secret\""));
	}
}
