//! Stateless QSH-bound token authentication for platform add-ons: verify inbound signed
//! requests, sign outbound calls, and walk paginated APIs with guaranteed termination.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod http;
pub mod obs;
pub mod pagination;
pub mod qsh;
pub mod tenant;
pub mod token;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fixtures for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// self
	#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;
	use crate::{
		error::TransportError,
		http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
		tenant::{AppKey, ClientKey, TenantCredential},
		token::SharedSecret,
	};

	/// Add-on key used by tenant fixtures.
	pub const TEST_APP_KEY: &str = "com.example.addon";

	/// In-process transport answering from a queue of canned responses and recording every
	/// request it receives.
	#[derive(Clone, Debug, Default)]
	pub struct ScriptedTransport {
		responses: Arc<Mutex<VecDeque<HttpResponse>>>,
		requests: Arc<Mutex<Vec<HttpRequest>>>,
	}
	impl ScriptedTransport {
		/// Queues a raw response.
		pub fn push(&self, response: HttpResponse) -> &Self {
			self.responses.lock().push_back(response);

			self
		}

		/// Queues a `200 OK` JSON response.
		pub fn push_json(&self, body: serde_json::Value) -> &Self {
			self.push(HttpResponse::json(200, &body))
		}

		/// Requests received so far, in dispatch order.
		pub fn requests(&self) -> Vec<HttpRequest> {
			self.requests.lock().clone()
		}

		/// Number of requests received so far.
		pub fn request_count(&self) -> usize {
			self.requests.lock().len()
		}

		/// Number of queued responses not yet served.
		pub fn remaining(&self) -> usize {
			self.responses.lock().len()
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn dispatch(&self, request: HttpRequest) -> TransportFuture<'_, HttpResponse> {
			Box::pin(async move {
				self.requests.lock().push(request);

				self.responses.lock().pop_front().ok_or_else(|| {
					TransportError::Io(std::io::Error::other(
						"Scripted transport has no response queued.",
					))
				})
			})
		}
	}

	/// Builds a tenant credential fixture.
	pub fn tenant_fixture(client_key: &str, secret: &str, base_url: &str) -> TenantCredential {
		TenantCredential::new(
			ClientKey::new(client_key).expect("Client key fixture should be valid."),
			AppKey::new(TEST_APP_KEY).expect("App key fixture should be valid."),
			SharedSecret::new(secret),
			Url::parse(base_url).expect("Base URL fixture should parse."),
		)
	}

	/// Builds a Jira tenant fixture.
	pub fn jira_tenant(client_key: &str, secret: &str, base_url: &str) -> TenantCredential {
		tenant_fixture(client_key, secret, base_url).with_product_type("jira")
	}

	/// Builds a reqwest transport that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_transport() -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestTransport::with_client(client)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
