//! Thread-safe in-memory [`TenantStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	tenant::{ClientKey, StoreFuture, TenantCredential, TenantStore},
};

type TenantMap = Arc<RwLock<HashMap<ClientKey, TenantCredential>>>;

/// Storage backend that keeps tenant credentials in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryTenantStore(TenantMap);
impl MemoryTenantStore {
	/// Inserts or replaces the tenant keyed by its client key, returning the previous entry.
	pub fn upsert(&self, tenant: TenantCredential) -> Option<TenantCredential> {
		self.0.write().insert(tenant.client_key.clone(), tenant)
	}

	/// Removes a tenant.
	pub fn remove(&self, client_key: &str) -> Option<TenantCredential> {
		self.0.write().remove(client_key)
	}

	/// Flags an existing tenant as the fallback tenant; returns `false` when it is unknown.
	pub fn mark_dummy(&self, client_key: &str) -> bool {
		match self.0.write().get_mut(client_key) {
			Some(tenant) => {
				tenant.is_dummy = true;

				true
			},
			None => false,
		}
	}

	/// Every tenant not flagged as dummy, ordered by client key.
	pub fn reals(&self) -> Vec<TenantCredential> {
		let mut tenants = self
			.0
			.read()
			.values()
			.filter(|tenant| !tenant.is_dummy)
			.cloned()
			.collect::<Vec<_>>();

		tenants.sort_by(|a, b| a.client_key.cmp(&b.client_key));

		tenants
	}

	/// Number of stored tenants.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Whether the store is empty.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn fallback_now(map: &TenantMap) -> Option<TenantCredential> {
		map.read()
			.values()
			.filter(|tenant| tenant.is_dummy)
			.min_by(|a, b| a.client_key.cmp(&b.client_key))
			.cloned()
	}
}
impl TenantStore for MemoryTenantStore {
	fn lookup<'a>(&'a self, client_key: &'a str) -> StoreFuture<'a, Option<TenantCredential>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(client_key).cloned()) })
	}

	fn lookup_fallback(&self) -> StoreFuture<'_, Option<TenantCredential>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::fallback_now(&map)) })
	}
}
