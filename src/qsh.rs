//! Query String Hash (QSH) canonicalization.
//!
//! A QSH binds a token to one request: the method, the relative path, and the query string are
//! normalized into
//!
//! ```text
//! METHOD&canonical-path&canonical-query
//! ```
//!
//! and hashed with SHA-256. Parameter order and percent-encoding style never change the result;
//! the `jwt` parameter (the token itself) is excluded.

// crates.io
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, percent_encode};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// RFC 3986 component encoding: everything but `A-Z a-z 0-9 - . _ ~` is escaped.
const COMPONENT_ENCODE_SET: &AsciiSet =
	&NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

const TOKEN_PARAM: &str = "jwt";

/// Computes the QSH for `method` + `url` with the default mount prefixes.
///
/// `instance_base_url` is stripped from the front of `url` first; pass `""` to skip that step.
pub fn canonicalize(method: &str, url: &str, instance_base_url: &str) -> Qsh {
	QshCanonicalizer::new(instance_base_url).qsh(method, url)
}

/// Lowercase hex SHA-256 digest of a canonical request (64 characters).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Qsh(String);
impl Qsh {
	/// Hashes a canonical request string.
	pub fn digest(canonical: &str) -> Self {
		Self(format!("{:x}", Sha256::digest(canonical.as_bytes())))
	}

	/// Hex digest view.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for Qsh {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl PartialEq<str> for Qsh {
	fn eq(&self, other: &str) -> bool {
		self.0 == other
	}
}
impl PartialEq<&str> for Qsh {
	fn eq(&self, other: &&str) -> bool {
		self.0 == *other
	}
}
impl From<Qsh> for String {
	fn from(value: Qsh) -> Self {
		value.0
	}
}
impl Debug for Qsh {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Qsh({})", self.0)
	}
}
impl Display for Qsh {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Normalized form a QSH is computed over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalRequest {
	/// Uppercase HTTP method.
	pub method: String,
	/// Canonical path (relative, prefix stripped, `&` escaped, no trailing slash).
	pub path: String,
	/// Encoded parameter names mapped to their encoded values in request order.
	pub query: BTreeMap<String, Vec<String>>,
}
impl CanonicalRequest {
	/// Canonical path component.
	pub fn canonical_uri(&self) -> &str {
		&self.path
	}

	/// Canonical query component: names sorted by encoded bytes, repeated values sorted by their
	/// decoded bytes and joined with `,`.
	pub fn canonical_query(&self) -> String {
		self.query
			.iter()
			.map(|(name, values)| {
				if values.is_empty() {
					return name.clone();
				}

				let mut decoded = values
					.iter()
					.map(|value| percent_decode_str(value).collect::<Vec<u8>>())
					.collect::<Vec<_>>();

				decoded.sort();

				let joined = decoded
					.iter()
					.map(|value| percent_encode(value, COMPONENT_ENCODE_SET).to_string())
					.collect::<Vec<_>>()
					.join(",");

				format!("{name}={joined}")
			})
			.filter(|piece| !piece.is_empty())
			.collect::<Vec<_>>()
			.join("&")
	}

	/// Full `METHOD&path&query` string.
	pub fn canonical_string(&self) -> String {
		format!("{}&{}&{}", self.method, self.path, self.canonical_query())
	}

	/// Hash of [`canonical_string`](Self::canonical_string).
	pub fn qsh(&self) -> Qsh {
		Qsh::digest(&self.canonical_string())
	}
}

/// Canonicalizer configured with the deployment's own base URL and mount prefixes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QshCanonicalizer {
	instance_base_url: String,
	prefixes: Vec<String>,
}
impl QshCanonicalizer {
	/// Mount prefix the platform adds in front of some products' REST paths.
	pub const DEFAULT_PREFIX: &'static str = "/wiki";

	/// Creates a canonicalizer stripping `instance_base_url` and the default prefixes.
	pub fn new(instance_base_url: impl Into<String>) -> Self {
		Self {
			instance_base_url: instance_base_url.into(),
			prefixes: vec![Self::DEFAULT_PREFIX.to_owned()],
		}
	}

	/// Replaces the mount prefix list; trailing slashes are ignored.
	pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.prefixes = prefixes
			.into_iter()
			.map(|prefix| prefix.into().trim_end_matches('/').to_owned())
			.filter(|prefix| !prefix.is_empty())
			.collect();

		self
	}

	/// Base URL stripped from incoming URLs.
	pub fn instance_base_url(&self) -> &str {
		&self.instance_base_url
	}

	/// Configured mount prefixes.
	pub fn prefixes(&self) -> &[String] {
		&self.prefixes
	}

	/// Builds the canonical request for `method` + `url`.
	pub fn canonical_request(&self, method: &str, url: &str) -> CanonicalRequest {
		let url = if self.instance_base_url.is_empty() {
			url
		} else {
			url.strip_prefix(self.instance_base_url.as_str()).unwrap_or(url)
		};
		let (path, query) = split_url(url);

		CanonicalRequest {
			method: method.to_ascii_uppercase(),
			path: self.canonical_path(path),
			query: parse_query(query),
		}
	}

	/// Computes the QSH for `method` + `url`.
	pub fn qsh(&self, method: &str, url: &str) -> Qsh {
		self.canonical_request(method, url).qsh()
	}

	fn canonical_path(&self, path: &str) -> String {
		if path.is_empty() {
			return "/".into();
		}

		let stripped = self
			.prefixes
			.iter()
			.find_map(|prefix| {
				path.strip_prefix(prefix.as_str())
					.filter(|rest| rest.is_empty() || rest.starts_with('/'))
			})
			.unwrap_or(path);
		let escaped = stripped.replace('&', "%26");

		if escaped == "/" {
			return escaped;
		}

		match escaped.trim_end_matches('/') {
			"" => "/".into(),
			trimmed => trimmed.to_owned(),
		}
	}
}
impl Default for QshCanonicalizer {
	fn default() -> Self {
		Self::new("")
	}
}

/// Splits a URL into its raw path and query, dropping scheme, authority, and fragment.
fn split_url(url: &str) -> (&str, &str) {
	let rest = match url.find("://") {
		Some(idx)
			if idx > 0
				&& url[..idx]
					.chars()
					.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) =>
		{
			let after = &url[idx + 3..];
			let end = after.find(['/', '?', '#']).unwrap_or(after.len());

			&after[end..]
		},
		_ => url,
	};
	let rest = rest.split_once('#').map_or(rest, |(head, _)| head);

	rest.split_once('?').unwrap_or((rest, ""))
}

fn parse_query(query: &str) -> BTreeMap<String, Vec<String>> {
	let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();

	for pair in query.split('&').filter(|pair| !pair.is_empty()) {
		let (raw_name, raw_value) = match pair.split_once('=') {
			Some((name, value)) => (name, Some(value)),
			None => (pair, None),
		};
		let name = encode_component(raw_name);

		if name.eq_ignore_ascii_case(TOKEN_PARAM) {
			continue;
		}

		let values = params.entry(name).or_default();

		if let Some(value) = raw_value {
			values.push(encode_component(value));
		}
	}

	params
}

/// Decodes `+` and percent escapes, then re-encodes per RFC 3986.
fn encode_component(raw: &str) -> String {
	let spaced = raw.replace('+', " ");
	let bytes = percent_decode_str(&spaced).collect::<Vec<u8>>();

	percent_encode(&bytes, COMPONENT_ENCODE_SET).to_string()
}
