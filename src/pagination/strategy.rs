//! Pagination strategies and product presets.

// self
use crate::{_prelude::*, error::ConfigError, tenant::ProductType};

/// How successive pages are requested.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaginationStrategy {
	/// 1-based page number incremented by one per fetch.
	Page {
		/// Query parameter carrying the page number.
		page_key: String,
		/// Query parameter carrying the page size.
		per_page_key: String,
	},
	/// Item offset advanced by the number of items each fetch returned.
	Offset {
		/// Query parameter carrying the offset.
		offset_key: String,
		/// Query parameter carrying the page size.
		per_page_key: String,
	},
	/// Absolute or relative link to the next page found in each response.
	NextLink {
		/// Response key (dotted path) holding the next link.
		next_key: String,
	},
}
impl PaginationStrategy {
	/// `page` + `perPage` query parameters.
	pub fn page() -> Self {
		Self::Page { page_key: "page".into(), per_page_key: "perPage".into() }
	}

	/// `offset` + `perPage` query parameters.
	pub fn offset() -> Self {
		Self::Offset { offset_key: "offset".into(), per_page_key: "perPage".into() }
	}

	/// Next link under the `next` response key.
	pub fn next_link() -> Self {
		Self::NextLink { next_key: "next".into() }
	}

	/// Stable label suitable for span fields.
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::Page { .. } => "page",
			Self::Offset { .. } => "offset",
			Self::NextLink { .. } => "next",
		}
	}

	/// First cursor value when none is configured.
	pub(crate) const fn default_start(&self) -> u64 {
		match self {
			Self::Page { .. } => 1,
			_ => 0,
		}
	}
}
impl FromStr for PaginationStrategy {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"page" => Ok(Self::page()),
			"offset" => Ok(Self::offset()),
			"next" | "next_link" => Ok(Self::next_link()),
			_ => Err(ConfigError::UnknownStrategy { name: s.to_owned() }),
		}
	}
}

/// Response layout of a platform product's REST API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaginatorPreset {
	/// `startAt`/`maxResults` offsets, `total` count, items under `values`.
	Jira,
	/// `start`/`limit` offsets, `size` count, items under `results`.
	Confluence,
}
impl PaginatorPreset {
	/// Preset registered for `product`.
	pub const fn for_product(product: ProductType) -> Self {
		match product {
			ProductType::Jira => Self::Jira,
			ProductType::Confluence => Self::Confluence,
		}
	}

	/// Preset registered for a product type name; unknown names fail.
	pub fn for_product_name(product: &str) -> Result<Self, ConfigError> {
		product.parse().map(Self::for_product)
	}

	/// Strategy with this product's parameter names.
	pub fn strategy(self) -> PaginationStrategy {
		match self {
			Self::Jira => PaginationStrategy::Offset {
				offset_key: "startAt".into(),
				per_page_key: "maxResults".into(),
			},
			Self::Confluence => PaginationStrategy::Offset {
				offset_key: "start".into(),
				per_page_key: "limit".into(),
			},
		}
	}

	/// Response key holding the page's items.
	pub const fn items_key(self) -> &'static str {
		match self {
			Self::Jira => "values",
			Self::Confluence => "results",
		}
	}

	/// Response key holding the total item count.
	///
	/// Confluence's `size` counts the current page only, so it cannot end iteration. `totalSize`
	/// is reported by search endpoints; elsewhere the first empty page ends iteration.
	pub const fn total_key(self) -> &'static str {
		match self {
			Self::Jira => "total",
			Self::Confluence => "totalSize",
		}
	}
}
