//! Outbound client that signs every request on behalf of one tenant.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TokenError, TransportError},
	http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, MultipartFile, RequestBody, TransportFuture},
	obs::{self, OpSpan, Operation, Outcome},
	pagination::{self, Paginator, PaginatorBuilder, PaginatorPreset},
	tenant::TenantCredential,
	token::TokenIssuer,
};

const ATTACHMENT_FIELD: &str = "file";
const XSRF_HEADER: &str = "X-Atlassian-Token";

/// Extra query parameters and headers attached to a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
	/// Query parameters; a name already present in the URL is replaced.
	pub query: Vec<(String, String)>,
	/// Headers appended after the authorization header.
	pub headers: Vec<(String, String)>,
}
impl RequestOptions {
	/// Adds a query parameter.
	pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((name.into(), value.into()));

		self
	}

	/// Adds a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}
}

/// Decoded response payload.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
	/// Zero-length body.
	Empty,
	/// Body served with a JSON content type that parsed.
	Json(Value),
	/// Any other body.
	Text(String),
}
impl ResponseBody {
	/// Classifies a response body by content type.
	pub fn from_response(response: &HttpResponse) -> Self {
		if response.body.is_empty() {
			return Self::Empty;
		}
		match response.is_json().then(|| serde_json::from_slice(&response.body).ok()).flatten() {
			Some(value) => Self::Json(value),
			None => Self::Text(response.text()),
		}
	}

	/// JSON view, if the body was JSON.
	pub fn as_json(&self) -> Option<&Value> {
		match self {
			Self::Json(value) => Some(value),
			_ => None,
		}
	}

	/// Text view, if the body was not JSON.
	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Text(text) => Some(text),
			_ => None,
		}
	}

	/// Whether the body was empty.
	pub fn is_empty(&self) -> bool {
		matches!(self, Self::Empty)
	}
}

/// Client bound to one tenant; each request carries a fresh token for its exact URL.
#[derive(Clone, Debug)]
pub struct SignedClient<T> {
	transport: T,
	tenant: TenantCredential,
	issuer: TokenIssuer,
}
impl<T> SignedClient<T>
where
	T: HttpTransport,
{
	/// Creates a client with the default token issuer.
	pub fn new(transport: T, tenant: TenantCredential) -> Self {
		Self { transport, tenant, issuer: TokenIssuer::default() }
	}

	/// Overrides the token issuer (canonicalizer prefixes, token lifetime).
	pub fn with_issuer(mut self, issuer: TokenIssuer) -> Self {
		self.issuer = issuer;

		self
	}

	/// Tenant the client acts for.
	pub fn tenant(&self) -> &TenantCredential {
		&self.tenant
	}

	/// Resolves `url` against the tenant base URL, keeping the base URL's own path.
	/// Absolute `http(s)://` URLs are returned as is.
	pub fn resolve_url(&self, url: &str) -> Result<Url, ConfigError> {
		let lowered = url.trim_start().to_ascii_lowercase();
		let full = if lowered.starts_with("http://") || lowered.starts_with("https://") {
			url.trim().to_owned()
		} else {
			format!(
				"{}/{}",
				self.tenant.base_url.as_str().trim_end_matches('/'),
				url.trim().trim_start_matches('/')
			)
		};

		Url::parse(&full).map_err(|e| ConfigError::invalid_url(&full, e))
	}

	/// Sends a signed request and decodes the response.
	pub async fn send(
		&self,
		method: HttpMethod,
		url: &str,
		body: RequestBody,
		options: &RequestOptions,
	) -> Result<ResponseBody> {
		let span = OpSpan::new(Operation::SignedRequest, "send");

		obs::record(Operation::SignedRequest, Outcome::Attempt);

		let result = span
			.instrument(async {
				let mut resolved = self.resolve_url(url)?;

				pagination::set_query_params(&mut resolved, &options.query);

				let url_text = resolved.to_string();
				let request = options
					.headers
					.iter()
					.fold(HttpRequest::new(method, resolved), |request, (name, value)| {
						request.with_header(name.as_str(), value.as_str())
					})
					.with_body(body);
				let response = self
					.transport
					.dispatch(self.sign(request)?)
					.await?
					.error_for_status(&url_text)?;

				tracing::debug!(method = %method, url = %url_text, status = response.status, "signed request completed");

				Ok::<_, Error>(ResponseBody::from_response(&response))
			})
			.await;
		obs::record(Operation::SignedRequest, Outcome::of(&result));

		result
	}

	/// `GET url`.
	pub async fn get(&self, url: &str) -> Result<ResponseBody> {
		self.send(HttpMethod::Get, url, RequestBody::Empty, &RequestOptions::default()).await
	}

	/// `GET url` with extra query parameters and headers.
	pub async fn get_with(&self, url: &str, options: &RequestOptions) -> Result<ResponseBody> {
		self.send(HttpMethod::Get, url, RequestBody::Empty, options).await
	}

	/// `POST url` with a JSON body.
	pub async fn post(&self, url: &str, data: Value) -> Result<ResponseBody> {
		self.send(HttpMethod::Post, url, RequestBody::Json(data), &RequestOptions::default()).await
	}

	/// `PUT url` with a JSON body.
	pub async fn put(&self, url: &str, data: Value) -> Result<ResponseBody> {
		self.send(HttpMethod::Put, url, RequestBody::Json(data), &RequestOptions::default()).await
	}

	/// `DELETE url`.
	pub async fn delete(&self, url: &str) -> Result<ResponseBody> {
		self.send(HttpMethod::Delete, url, RequestBody::Empty, &RequestOptions::default()).await
	}

	/// Uploads a file as the multipart field `file`.
	pub async fn send_file(
		&self,
		url: &str,
		file_name: impl Into<String>,
		bytes: Vec<u8>,
	) -> Result<ResponseBody> {
		let file = MultipartFile::new(ATTACHMENT_FIELD, file_name, bytes);

		self.send(HttpMethod::Post, url, RequestBody::Multipart(file), &RequestOptions::default())
			.await
	}

	/// Collects every item behind `url` using the preset registered for the tenant's product.
	pub async fn paginate(&self, url: &str, options: RequestOptions) -> Result<Vec<Value>> {
		let preset = match self.tenant.product() {
			Some(product) => PaginatorPreset::for_product(product?),
			None => return Err(ConfigError::UnknownProduct { product: "<unset>".into() }.into()),
		};

		self.paginate_with(preset, url, options).await
	}

	/// Collects every item behind `url` using `preset`.
	pub async fn paginate_with(
		&self,
		preset: PaginatorPreset,
		url: &str,
		options: RequestOptions,
	) -> Result<Vec<Value>> {
		self.paginator(preset, url, options)?.build()?.collect_items().await
	}

	/// Paginator builder over `url`, preloaded with `preset` and signing each page request.
	///
	/// Page size, start position and response keys can still be overridden before `build`.
	pub fn paginator(
		&self,
		preset: PaginatorPreset,
		url: &str,
		options: RequestOptions,
	) -> Result<PaginatorBuilder<&Self>, ConfigError> {
		Ok(Paginator::builder()
			.transport(self)
			.url(self.resolve_url(url)?)
			.preset(preset)
			.options(options))
	}

	fn sign(&self, request: HttpRequest) -> Result<HttpRequest, TokenError> {
		let token = self.issuer.issue(
			request.url.as_str(),
			request.method.as_str(),
			&self.tenant.app_key,
			&self.tenant.shared_secret,
		)?;
		let request = request.with_header("Authorization", token.authorization_value());

		if matches!(request.body, RequestBody::Multipart(_)) {
			Ok(request.with_header(XSRF_HEADER, "nocheck"))
		} else {
			Ok(request)
		}
	}
}
impl<T> HttpTransport for SignedClient<T>
where
	T: HttpTransport,
{
	fn dispatch(&self, request: HttpRequest) -> TransportFuture<'_, HttpResponse> {
		Box::pin(async move {
			let request = self.sign(request).map_err(TransportError::Sign)?;

			self.transport.dispatch(request).await
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::{
		_preludet::{ScriptedTransport, jira_tenant, tenant_fixture},
		qsh,
		token,
	};

	fn client(transport: &ScriptedTransport, base_url: &str) -> SignedClient<ScriptedTransport> {
		SignedClient::new(transport.clone(), tenant_fixture("tenant-a", "shared-secret", base_url))
	}

	#[test]
	fn relative_urls_keep_base_path() {
		let client = client(&ScriptedTransport::default(), "https://x.example.net/wiki/");

		assert_eq!(
			client.resolve_url("/rest/api/content").expect("URL should resolve.").as_str(),
			"https://x.example.net/wiki/rest/api/content"
		);
		assert_eq!(
			client.resolve_url("rest/api/content?limit=1").expect("URL should resolve.").as_str(),
			"https://x.example.net/wiki/rest/api/content?limit=1"
		);
		assert_eq!(
			client.resolve_url("HTTPS://other.example.org/a").expect("URL should resolve.").as_str(),
			"https://other.example.org/a"
		);
	}

	#[test]
	fn response_bodies_classify_by_content_type() {
		assert_eq!(ResponseBody::from_response(&HttpResponse::new(204, "")), ResponseBody::Empty);
		assert_eq!(
			ResponseBody::from_response(&HttpResponse::json(200, &json!({ "a": 1 }))),
			ResponseBody::Json(json!({ "a": 1 }))
		);
		assert_eq!(
			ResponseBody::from_response(
				&HttpResponse::new(200, "not json").with_header("content-type", "application/json")
			),
			ResponseBody::Text("not json".into())
		);
		assert_eq!(
			ResponseBody::from_response(&HttpResponse::new(200, "{\"a\":1}")),
			ResponseBody::Text("{\"a\":1}".into())
		);
	}

	#[tokio::test]
	async fn requests_carry_a_token_for_their_exact_url() {
		let transport = ScriptedTransport::default();

		transport.push_json(json!({ "key": "ISSUE-1" }));

		let client = client(&transport, "https://x.example.net");
		let options = RequestOptions::default().with_query("expand", "names").with_header("Accept", "application/json");
		let body = client.get_with("/rest/api/2/issue/ISSUE-1", &options).await.expect("Request should succeed.");

		assert_eq!(body.as_json(), Some(&json!({ "key": "ISSUE-1" })));

		let request = &transport.requests()[0];
		let header = request.header("authorization").expect("Authorization header should be set.");
		let compact = header.strip_prefix("JWT ").expect("Authorization should use the JWT scheme.");
		let decoded = token::decode(compact).expect("Attached token should decode.");

		assert_eq!(request.url.as_str(), "https://x.example.net/rest/api/2/issue/ISSUE-1?expand=names");
		assert_eq!(request.header("accept"), Some("application/json"));
		assert_eq!(decoded.claims.iss, crate::_preludet::TEST_APP_KEY);
		assert_eq!(
			decoded.claims.qsh,
			qsh::canonicalize("GET", "/rest/api/2/issue/ISSUE-1?expand=names", "").as_str()
		);
		assert!(token::verify(compact, &client.tenant().shared_secret));
	}

	#[tokio::test]
	async fn non_success_statuses_become_errors() {
		let transport = ScriptedTransport::default();

		transport.push(HttpResponse::new(403, "denied"));

		let err = client(&transport, "https://x.example.net")
			.delete("/rest/api/2/issue/ISSUE-1")
			.await
			.expect_err("403 must surface as an error.");

		assert!(matches!(
			err,
			Error::Transport(TransportError::Status { status: 403, ref body, .. }) if body == "denied"
		));
	}

	#[tokio::test]
	async fn file_uploads_disable_xsrf_checks() {
		let transport = ScriptedTransport::default();

		transport.push(HttpResponse::new(200, ""));

		client(&transport, "https://x.example.net")
			.send_file("/rest/api/2/issue/ISSUE-1/attachments", "notes.txt", b"hello".to_vec())
			.await
			.expect("Upload should succeed.");

		let request = &transport.requests()[0];

		assert_eq!(request.header("x-atlassian-token"), Some("nocheck"));
		assert!(matches!(
			&request.body,
			RequestBody::Multipart(file) if file.field == "file" && file.file_name == "notes.txt"
		));
	}

	#[tokio::test]
	async fn paginate_uses_product_preset() {
		let transport = ScriptedTransport::default();

		transport.push_json(json!({ "startAt": 0, "total": 3, "values": [1, 2] }));
		transport.push_json(json!({ "startAt": 2, "total": 3, "values": [3] }));

		let client = SignedClient::new(
			transport.clone(),
			jira_tenant("tenant-a", "shared-secret", "https://x.example.net"),
		);
		let items = client
			.paginate("/rest/api/2/project/search", RequestOptions::default())
			.await
			.expect("Pagination should succeed.");

		assert_eq!(items, vec![json!(1), json!(2), json!(3)]);

		let requests = transport.requests();

		assert_eq!(requests.len(), 2);
		assert_eq!(requests[1].url.query(), Some("startAt=2"));
		assert!(requests.iter().all(|request| request.header("authorization").is_some()));
	}

	#[tokio::test]
	async fn preset_paginator_accepts_page_size_and_start() {
		let transport = ScriptedTransport::default();

		transport.push_json(json!({ "startAt": 10, "total": 12, "values": [11, 12] }));
		transport.push_json(json!({ "startAt": 12, "total": 12, "values": [] }));

		let client = SignedClient::new(
			transport.clone(),
			jira_tenant("tenant-a", "shared-secret", "https://x.example.net"),
		);
		let options = RequestOptions::default().with_query("jql", "project=A");
		let items = client
			.paginator(PaginatorPreset::Jira, "/rest/api/2/search", options)
			.expect("Paginator URL should resolve.")
			.per_page(50)
			.start(10)
			.build()
			.expect("Paginator should build.")
			.collect_items()
			.await
			.expect("Pagination should succeed.");

		assert_eq!(items, vec![json!(11), json!(12)]);

		let request = &transport.requests()[0];
		let header = request.header("authorization").expect("Authorization header should be set.");
		let compact = header.strip_prefix("JWT ").expect("Authorization should use the JWT scheme.");

		assert_eq!(request.url.query(), Some("jql=project%3DA&startAt=10&maxResults=50"));
		assert_eq!(
			transport.requests()[1].url.query(),
			Some("jql=project%3DA&startAt=12&maxResults=50")
		);
		assert_eq!(
			token::decode(compact).expect("Attached token should decode.").claims.qsh,
			qsh::canonicalize("GET", "/rest/api/2/search?jql=project%3DA&startAt=10&maxResults=50", "")
				.as_str()
		);
	}

	#[tokio::test]
	async fn confluence_page_size_is_not_a_total() {
		let transport = ScriptedTransport::default();

		transport.push_json(json!({ "start": 0, "limit": 2, "size": 2, "results": ["a", "b"] }));
		transport.push_json(json!({ "start": 2, "limit": 2, "size": 1, "results": ["c"] }));
		transport.push_json(json!({ "start": 3, "limit": 2, "size": 0, "results": [] }));

		let client = SignedClient::new(
			transport.clone(),
			tenant_fixture("tenant-a", "shared-secret", "https://x.example.net/wiki")
				.with_product_type("confluence"),
		);
		let items = client
			.paginate("/rest/api/content", RequestOptions::default())
			.await
			.expect("Pagination should succeed.");

		assert_eq!(items, vec![json!("a"), json!("b"), json!("c")]);
		assert_eq!(transport.request_count(), 3);
		assert_eq!(transport.requests()[1].url.query(), Some("start=2"));
	}

	#[tokio::test]
	async fn paginate_requires_a_known_product() {
		let transport = ScriptedTransport::default();
		let err = client(&transport, "https://x.example.net")
			.paginate("/rest/api/content", RequestOptions::default())
			.await
			.expect_err("Tenants without a product type cannot pick a preset.");

		assert!(matches!(err, Error::Config(ConfigError::UnknownProduct { .. })));

		let err = SignedClient::new(
			transport.clone(),
			tenant_fixture("tenant-b", "s", "https://x.example.net").with_product_type("bitbucket"),
		)
		.paginate("/rest/api/content", RequestOptions::default())
		.await
		.expect_err("Unknown product types must be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::UnknownProduct { ref product }) if product == "bitbucket"));
		assert_eq!(transport.request_count(), 0);
	}
}
