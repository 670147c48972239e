//! Lazy, terminating pagination over JSON REST responses.
//!
//! A [`Paginator`] pulls one page at a time through an [`HttpTransport`] and yields items
//! individually. Iteration always ends: on reaching the reported total, on an empty page, when a
//! next-link response has no further link, or when a page body repeats byte for byte.

pub mod strategy;

pub use strategy::*;

// std
use std::collections::HashSet;
// crates.io
use serde_json::Value;
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	client::RequestOptions,
	error::{ConfigError, TransportError},
	http::{HttpMethod, HttpRequest, HttpTransport},
	obs::{self, OpSpan, Operation, Outcome},
};

/// Lifecycle of a [`Paginator`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PaginatorState {
	/// No page requested yet.
	#[default]
	NotStarted,
	/// A page request is in flight.
	Fetching,
	/// Items from the latest page are available.
	Buffered,
	/// The sequence ended; no further requests are made.
	Exhausted,
	/// A fetch failed; no further requests are made.
	Errored,
}

/// Builder for [`Paginator`]; validation happens in [`build`](Self::build) before any request.
#[derive(Debug)]
pub struct PaginatorBuilder<T> {
	transport: Option<T>,
	url: Option<String>,
	strategy: Option<PaginationStrategy>,
	items_key: String,
	total_key: Option<String>,
	per_page: Option<u64>,
	start: Option<u64>,
	options: RequestOptions,
}
impl<T> PaginatorBuilder<T>
where
	T: HttpTransport,
{
	/// Sets the transport pages are fetched through.
	pub fn transport(mut self, transport: T) -> Self {
		self.transport = Some(transport);

		self
	}

	/// Sets the absolute URL of the first page.
	pub fn url(mut self, url: impl Into<String>) -> Self {
		self.url = Some(url.into());

		self
	}

	/// Sets the strategy.
	pub fn strategy(mut self, strategy: PaginationStrategy) -> Self {
		self.strategy = Some(strategy);

		self
	}

	/// Applies a product preset's strategy, items key, and total key.
	pub fn preset(self, preset: PaginatorPreset) -> Self {
		self.strategy(preset.strategy()).items_key(preset.items_key()).total_key(preset.total_key())
	}

	/// Sets the response key (dotted path) holding each page's items.
	pub fn items_key(mut self, key: impl Into<String>) -> Self {
		self.items_key = key.into();

		self
	}

	/// Sets the response key (dotted path) holding the total item count.
	pub fn total_key(mut self, key: impl Into<String>) -> Self {
		self.total_key = Some(key.into());

		self
	}

	/// Sets the page size sent with page and offset strategies.
	pub fn per_page(mut self, per_page: u64) -> Self {
		self.per_page = Some(per_page);

		self
	}

	/// Sets the first page number or offset.
	pub fn start(mut self, start: u64) -> Self {
		self.start = Some(start);

		self
	}

	/// Sets extra query parameters and headers sent with every page request.
	pub fn options(mut self, options: RequestOptions) -> Self {
		self.options = options;

		self
	}

	/// Validates the configuration and creates the paginator.
	pub fn build(self) -> Result<Paginator<T>, ConfigError> {
		let transport = self.transport.ok_or(ConfigError::MissingTransport)?;
		let raw_url = self.url.filter(|url| !url.trim().is_empty()).ok_or(ConfigError::MissingUrl)?;
		let strategy = self.strategy.ok_or(ConfigError::MissingStrategy)?;
		let url = Url::parse(&raw_url).map_err(|e| ConfigError::invalid_url(&raw_url, e))?;
		let cursor = self.start.unwrap_or_else(|| strategy.default_start());

		Ok(Paginator {
			transport,
			strategy,
			url,
			options: self.options,
			items_key: self.items_key,
			total_key: self.total_key,
			per_page: self.per_page,
			cursor,
			total: None,
			items: Vec::new(),
			position: 0,
			last_response: None,
			seen_pages: HashSet::new(),
			fetch_count: 0,
			state: PaginatorState::NotStarted,
		})
	}
}
impl<T> Default for PaginatorBuilder<T> {
	fn default() -> Self {
		Self {
			transport: None,
			url: None,
			strategy: None,
			items_key: Self::DEFAULT_ITEMS_KEY.into(),
			total_key: None,
			per_page: None,
			start: None,
			options: RequestOptions::default(),
		}
	}
}
impl<T> PaginatorBuilder<T> {
	/// Response key used for items when none is configured.
	pub const DEFAULT_ITEMS_KEY: &'static str = "values";
}

/// Single-pass sequence of items collected across pages.
#[derive(Debug)]
pub struct Paginator<T> {
	transport: T,
	strategy: PaginationStrategy,
	url: Url,
	options: RequestOptions,
	items_key: String,
	total_key: Option<String>,
	per_page: Option<u64>,
	cursor: u64,
	total: Option<u64>,
	items: Vec<Value>,
	position: usize,
	last_response: Option<Value>,
	seen_pages: HashSet<Vec<u8>>,
	fetch_count: usize,
	state: PaginatorState,
}
impl<T> Paginator<T>
where
	T: HttpTransport,
{
	/// Starts configuring a paginator.
	pub fn builder() -> PaginatorBuilder<T> {
		PaginatorBuilder::default()
	}

	/// Yields the next item, fetching a page when the buffer is drained.
	///
	/// Returns `Ok(None)` once the sequence has ended. A transport failure is returned once;
	/// afterwards the paginator stays [`PaginatorState::Errored`] and yields nothing.
	pub async fn next_item(&mut self) -> Result<Option<Value>> {
		loop {
			if let Some(item) = self.items.get(self.position) {
				self.position += 1;

				return Ok(Some(item.clone()));
			}
			if matches!(self.state, PaginatorState::Exhausted | PaginatorState::Errored) {
				return Ok(None);
			}
			if self.reached_end() {
				self.state = PaginatorState::Exhausted;

				return Ok(None);
			}
			if self.fetch_page().await? == 0 {
				self.state = PaginatorState::Exhausted;

				return Ok(None);
			}
		}
	}

	/// Drains the sequence and returns every item fetched, including ones already yielded.
	pub async fn collect_items(&mut self) -> Result<Vec<Value>> {
		while self.next_item().await?.is_some() {}

		Ok(self.items.clone())
	}

	/// Items accumulated so far.
	pub fn items(&self) -> &[Value] {
		&self.items
	}

	/// Body of the most recent page.
	pub fn last_response(&self) -> Option<&Value> {
		self.last_response.as_ref()
	}

	/// Total item count reported by the first page that carried one.
	pub fn total(&self) -> Option<u64> {
		self.total
	}

	/// Number of page requests made.
	pub fn fetch_count(&self) -> usize {
		self.fetch_count
	}

	/// Current lifecycle state.
	pub fn state(&self) -> PaginatorState {
		self.state
	}

	/// Strategy in use.
	pub fn strategy(&self) -> &PaginationStrategy {
		&self.strategy
	}

	fn reached_end(&self) -> bool {
		if self.total.is_some_and(|total| self.position as u64 >= total) {
			return true;
		}

		matches!(self.strategy, PaginationStrategy::NextLink { .. })
			&& self.fetch_count > 0
			&& self.next_link().is_none()
	}

	fn next_link(&self) -> Option<&str> {
		let PaginationStrategy::NextLink { next_key } = &self.strategy else {
			return None;
		};

		self.last_response
			.as_ref()
			.and_then(|response| lookup(response, next_key))
			.and_then(Value::as_str)
			.filter(|link| !link.is_empty())
	}

	fn request_url(&self) -> Url {
		let mut url = self.url.clone();
		let (cursor_key, per_page_key) = match &self.strategy {
			PaginationStrategy::NextLink { .. } => {
				if self.fetch_count == 0 {
					set_query_params(&mut url, &self.options.query);
				}

				return url;
			},
			PaginationStrategy::Page { page_key, per_page_key } => (page_key, per_page_key),
			PaginationStrategy::Offset { offset_key, per_page_key } => (offset_key, per_page_key),
		};
		let mut params = vec![(cursor_key.clone(), self.cursor.to_string())];

		if let Some(per_page) = self.per_page {
			params.push((per_page_key.clone(), per_page.to_string()));
		}

		set_query_params(&mut url, &self.options.query);
		set_query_params(&mut url, &params);

		url
	}

	async fn fetch_page(&mut self) -> Result<usize> {
		let url = self.request_url();
		let url_text = url.to_string();
		let request = self
			.options
			.headers
			.iter()
			.fold(HttpRequest::new(HttpMethod::Get, url), |request, (name, value)| {
				request.with_header(name.as_str(), value.as_str())
			});
		let span = OpSpan::new(Operation::PageFetch, "fetch_page");

		self.state = PaginatorState::Fetching;
		obs::record(Operation::PageFetch, Outcome::Attempt);

		let fetched = span
			.instrument(self.transport.dispatch(request))
			.await
			.and_then(|response| response.error_for_status(&url_text))
			.and_then(|response| {
				let value = response.json_body::<Value>(&url_text)?;

				Ok::<_, TransportError>((response.body, value))
			});
		let (body, value) = match fetched {
			Ok(page) => page,
			Err(e) => {
				self.state = PaginatorState::Errored;
				obs::record(Operation::PageFetch, Outcome::Failure);
				tracing::debug!(url = %url_text, error = %e, "page fetch failed");

				return Err(e.into());
			},
		};

		self.fetch_count += 1;
		obs::record(Operation::PageFetch, Outcome::Success);

		if !self.seen_pages.insert(Sha256::digest(&body).to_vec()) {
			tracing::warn!(
				url = %url_text,
				fetch = self.fetch_count,
				"duplicate page body received; ending pagination"
			);

			self.last_response = Some(value);
			self.state = PaginatorState::Exhausted;

			return Ok(0);
		}

		let items = lookup(&value, &self.items_key)
			.and_then(Value::as_array)
			.cloned()
			.unwrap_or_default();
		let count = items.len();

		self.items.extend(items);

		if self.total.is_none() {
			self.total = self.total_key.as_deref().and_then(|key| lookup(&value, key)).and_then(as_count);
		}

		self.last_response = Some(value);

		if let Err(e) = self.advance(count) {
			self.state = PaginatorState::Errored;

			return Err(e.into());
		}

		self.state = if count == 0 { PaginatorState::Exhausted } else { PaginatorState::Buffered };

		tracing::debug!(
			url = %url_text,
			strategy = self.strategy.as_str(),
			count,
			total = ?self.total,
			"page fetched"
		);

		Ok(count)
	}

	fn advance(&mut self, count: usize) -> Result<(), ConfigError> {
		match &self.strategy {
			PaginationStrategy::Page { .. } => self.cursor += 1,
			PaginationStrategy::Offset { .. } => self.cursor += count as u64,
			PaginationStrategy::NextLink { .. } =>
				if let Some(link) = self.next_link() {
					let next = self.url.join(link).map_err(|e| ConfigError::invalid_url(link, e))?;

					self.url = next;
				},
		}

		Ok(())
	}
}

/// Replaces (or appends) query parameters, keeping unrelated ones in place.
pub(crate) fn set_query_params(url: &mut Url, params: &[(String, String)]) {
	if params.is_empty() {
		return;
	}

	let kept = url
		.query_pairs()
		.filter(|(name, _)| !params.iter().any(|(key, _)| key == name))
		.map(|(name, value)| (name.into_owned(), value.into_owned()))
		.collect::<Vec<_>>();
	let mut pairs = url.query_pairs_mut();

	pairs.clear();
	pairs.extend_pairs(kept.iter().chain(params.iter()));
}

/// Resolves a key that may be a dotted path (`page.values`); a literal key wins over a path.
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
	if let Some(found) = value.get(path) {
		return Some(found);
	}

	path.split('.').try_fold(value, |current, segment| match current {
		Value::Array(entries) => segment.parse::<usize>().ok().and_then(|idx| entries.get(idx)),
		_ => current.get(segment),
	})
}

fn as_count(value: &Value) -> Option<u64> {
	value.as_u64().or_else(|| value.as_str().and_then(|raw| raw.trim().parse().ok()))
}
