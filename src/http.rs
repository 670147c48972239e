//! Transport primitives for outbound platform calls.
//!
//! [`HttpTransport`] is the crate's only dependency on an HTTP stack. The signed client and the
//! paginator dispatch plain [`HttpRequest`] values through it and receive the raw
//! [`HttpResponse`]; status handling happens above the transport, so implementations should
//! return non-2xx responses as `Ok`.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

/// Future returned by [`HttpTransport::dispatch`].
pub type TransportFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks able to execute one request.
pub trait HttpTransport
where
	Self: Send + Sync,
{
	/// Executes `request`, resolving to the response regardless of its status.
	fn dispatch(&self, request: HttpRequest) -> TransportFuture<'_, HttpResponse>;
}
impl<T> HttpTransport for Arc<T>
where
	T: ?Sized + HttpTransport,
{
	fn dispatch(&self, request: HttpRequest) -> TransportFuture<'_, HttpResponse> {
		(**self).dispatch(request)
	}
}
impl<T> HttpTransport for &T
where
	T: ?Sized + HttpTransport,
{
	fn dispatch(&self, request: HttpRequest) -> TransportFuture<'_, HttpResponse> {
		(**self).dispatch(request)
	}
}

/// HTTP methods used against platform REST APIs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
	/// `GET`
	#[default]
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
	/// `HEAD`
	Head,
}
impl HttpMethod {
	/// Uppercase method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Patch => "PATCH",
			Self::Delete => "DELETE",
			Self::Head => "HEAD",
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for HttpMethod {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"GET" => Ok(Self::Get),
			"POST" => Ok(Self::Post),
			"PUT" => Ok(Self::Put),
			"PATCH" => Ok(Self::Patch),
			"DELETE" => Ok(Self::Delete),
			"HEAD" => Ok(Self::Head),
			other => Err(ConfigError::InvalidValue {
				key: "method",
				reason: format!("HTTP method `{other}` is not supported"),
			}),
		}
	}
}

/// File attached as a multipart form part.
#[derive(Clone, PartialEq, Eq)]
pub struct MultipartFile {
	/// Form field name.
	pub field: String,
	/// File name reported to the server.
	pub file_name: String,
	/// MIME type of the content, if known.
	pub content_type: Option<String>,
	/// File content.
	pub bytes: Vec<u8>,
}
impl MultipartFile {
	/// Creates a file part for `field`.
	pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
		Self { field: field.into(), file_name: file_name.into(), content_type: None, bytes }
	}

	/// Sets the part's MIME type.
	pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
		self.content_type = Some(content_type.into());

		self
	}
}
impl Debug for MultipartFile {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MultipartFile")
			.field("field", &self.field)
			.field("file_name", &self.file_name)
			.field("content_type", &self.content_type)
			.field("len", &self.bytes.len())
			.finish()
	}
}

/// Request payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
	/// No body.
	#[default]
	Empty,
	/// JSON document sent as `application/json`.
	Json(serde_json::Value),
	/// Multipart form with a single file part.
	Multipart(MultipartFile),
}

/// Outbound request handed to a transport.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
	/// Method.
	pub method: HttpMethod,
	/// Absolute URL, query included.
	pub url: Url,
	/// Header pairs in insertion order.
	pub headers: Vec<(String, String)>,
	/// Payload.
	pub body: RequestBody,
}
impl HttpRequest {
	/// Creates a request without headers or body.
	pub fn new(method: HttpMethod, url: Url) -> Self {
		Self { method, url, headers: Vec::new(), body: RequestBody::Empty }
	}

	/// Appends a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Replaces the payload.
	pub fn with_body(mut self, body: RequestBody) -> Self {
		self.body = body;

		self
	}

	/// First header named `name` (case-insensitive).
	pub fn header(&self, name: &str) -> Option<&str> {
		find_header(&self.headers, name)
	}
}

/// Raw response returned by a transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
	/// Status code.
	pub status: u16,
	/// Header pairs in wire order.
	pub headers: Vec<(String, String)>,
	/// Body bytes.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Creates a response without headers.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: Vec::new(), body: body.into() }
	}

	/// Creates an `application/json` response.
	pub fn json(status: u16, body: &serde_json::Value) -> Self {
		Self::new(status, body.to_string()).with_header("content-type", "application/json")
	}

	/// Appends a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// First header named `name` (case-insensitive).
	pub fn header(&self, name: &str) -> Option<&str> {
		find_header(&self.headers, name)
	}

	/// Whether the status is 2xx.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Whether the `Content-Type` header names a JSON media type.
	pub fn is_json(&self) -> bool {
		self.header("content-type")
			.and_then(|value| value.split(';').next())
			.map(|media| {
				let media = media.trim().to_ascii_lowercase();

				media == "application/json" || media.ends_with("+json")
			})
			.unwrap_or(false)
	}

	/// Body as text, replacing invalid UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Parses the body as JSON, reporting the failing field path.
	pub fn json_body<T>(&self, url: &str) -> Result<T, TransportError>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| TransportError::Decode { url: url.to_owned(), source })
	}

	/// Converts non-2xx responses into [`TransportError::Status`].
	pub fn error_for_status(self, url: &str) -> Result<Self, TransportError> {
		if self.is_success() {
			Ok(self)
		} else {
			Err(TransportError::Status { url: url.to_owned(), status: self.status, body: self.text() })
		}
	}
}

/// Thin wrapper around [`ReqwestClient`] implementing [`HttpTransport`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	fn build(
		&self,
		request: HttpRequest,
		url: &str,
	) -> Result<reqwest::RequestBuilder, TransportError> {
		let mut builder = self.0.request(request.method.into(), request.url);

		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}

		let builder = match request.body {
			RequestBody::Empty => builder,
			RequestBody::Json(value) => builder
				.header(reqwest::header::CONTENT_TYPE, "application/json")
				.body(value.to_string()),
			RequestBody::Multipart(file) => {
				let mut part = reqwest::multipart::Part::bytes(file.bytes).file_name(file.file_name);

				if let Some(content_type) = file.content_type.as_deref() {
					part = part.mime_str(content_type).map_err(|e| TransportError::network(url, e))?;
				}

				builder.multipart(reqwest::multipart::Form::new().part(file.field, part))
			},
		};

		Ok(builder)
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn dispatch(&self, request: HttpRequest) -> TransportFuture<'_, HttpResponse> {
		Box::pin(async move {
			let url = request.url.to_string();
			let response = self
				.build(request, &url)?
				.send()
				.await
				.map_err(|e| TransportError::network(&url, e))?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await.map_err(|e| TransportError::network(&url, e))?.to_vec();

			Ok(HttpResponse { status, headers, body })
		})
	}
}
#[cfg(feature = "reqwest")]
impl From<HttpMethod> for reqwest::Method {
	fn from(method: HttpMethod) -> Self {
		match method {
			HttpMethod::Get => Self::GET,
			HttpMethod::Post => Self::POST,
			HttpMethod::Put => Self::PUT,
			HttpMethod::Patch => Self::PATCH,
			HttpMethod::Delete => Self::DELETE,
			HttpMethod::Head => Self::HEAD,
		}
	}
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
	headers
		.iter()
		.find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
		.map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn methods_parse_case_insensitively() {
		assert_eq!("get".parse::<HttpMethod>().ok(), Some(HttpMethod::Get));
		assert_eq!("Delete".parse::<HttpMethod>().ok(), Some(HttpMethod::Delete));
		assert!("TRACE".parse::<HttpMethod>().is_err());
		assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
	}

	#[test]
	fn json_detection_ignores_parameters_and_case() {
		let response = HttpResponse::new(200, "{}").with_header("Content-Type", "Application/JSON; charset=utf-8");

		assert!(response.is_json());
		assert!(HttpResponse::new(200, "{}").with_header("content-type", "application/vnd.api+json").is_json());
		assert!(!HttpResponse::new(200, "<p/>").with_header("content-type", "text/html").is_json());
		assert!(!HttpResponse::new(200, "{}").is_json());
	}

	#[test]
	fn error_for_status_keeps_body() {
		let ok = HttpResponse::new(204, "").error_for_status("https://x.example.net");

		assert!(ok.is_ok());

		let err = HttpResponse::new(404, "missing")
			.error_for_status("https://x.example.net/rest")
			.expect_err("404 must become an error.");

		match err {
			TransportError::Status { status, body, .. } => {
				assert_eq!(status, 404);
				assert_eq!(body, "missing");
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn decode_errors_report_field_path() {
		#[derive(Debug, Deserialize)]
		struct Page {
			#[allow(dead_code)]
			total: u32,
		}

		let err = HttpResponse::json(200, &serde_json::json!({ "total": "many" }))
			.json_body::<Page>("https://x.example.net")
			.expect_err("String total must fail to decode.");

		match err {
			TransportError::Decode { source, .. } => assert_eq!(source.path().to_string(), "total"),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}
}
