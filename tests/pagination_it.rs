#![cfg(feature = "test")]

// crates.io
use serde_json::{Value, json};
// self
use connect_core::{
	_preludet::*,
	client::RequestOptions,
	error::ConfigError,
	pagination::{PaginationStrategy, Paginator, PaginatorState},
};

const BASE_URL: &str = "https://api.example.net/";

fn scripted(pages: &[Value]) -> ScriptedTransport {
	let transport = ScriptedTransport::default();

	for page in pages {
		transport.push_json(page.clone());
	}

	transport
}

fn collapse(pages: &[Value], key: &str) -> Vec<Value> {
	pages
		.iter()
		.filter_map(|page| page.get(key).and_then(Value::as_array))
		.flatten()
		.cloned()
		.collect()
}

fn query_of(transport: &ScriptedTransport) -> Vec<HashMap<String, String>> {
	transport
		.requests()
		.iter()
		.map(|request| request.url.query_pairs().into_owned().collect())
		.collect()
}

#[tokio::test]
async fn page_strategy_walks_until_an_empty_page() {
	let pages = [
		json!({ "page": 1, "pagelen": 1, "values": [{ "id": 1, "name": "Joe" }] }),
		json!({ "page": 2, "pagelen": 1, "values": [{ "id": 2, "name": "Cocker" }] }),
		json!({ "page": 3, "pagelen": 2, "values": [
			{ "id": 3, "name": "Taylor" },
			{ "id": 4, "name": "Otwell" }
		] }),
		json!({ "page": 4, "pagelen": 0 }),
	];
	let transport = scripted(&pages);
	let mut paginator = Paginator::builder()
		.transport(transport.clone())
		.url(BASE_URL)
		.strategy(PaginationStrategy::Page { page_key: "page".into(), per_page_key: "pagelen".into() })
		.items_key("values")
		.build()
		.expect("Page paginator should build.");
	let items = paginator.collect_items().await.expect("Pagination should succeed.");

	assert_eq!(items, collapse(&pages, "values"));
	assert_eq!(paginator.fetch_count(), 4);
	assert_eq!(paginator.state(), PaginatorState::Exhausted);

	let pages_requested = query_of(&transport)
		.into_iter()
		.map(|query| query.get("page").cloned().unwrap_or_default())
		.collect::<Vec<_>>();

	assert_eq!(pages_requested, ["1", "2", "3", "4"]);
}

#[tokio::test]
async fn offset_strategy_stops_at_the_reported_total() {
	let pages = [
		json!({ "offset": 0, "perPage": 2, "total": 5, "items": [{ "id": 1 }, { "id": 2 }] }),
		json!({ "offset": 2, "perPage": 2, "total": 5, "items": [{ "id": 3 }, { "id": 4 }] }),
		json!({ "offset": 4, "perPage": 2, "total": 5, "items": [{ "id": 5 }] }),
	];
	let transport = scripted(&pages);
	let mut paginator = Paginator::builder()
		.transport(transport.clone())
		.url(BASE_URL)
		.strategy(PaginationStrategy::offset())
		.items_key("items")
		.total_key("total")
		.per_page(2)
		.build()
		.expect("Offset paginator should build.");
	let items = paginator.collect_items().await.expect("Pagination should succeed.");

	assert_eq!(items, collapse(&pages, "items"));
	assert_eq!(paginator.total(), Some(5));
	assert_eq!(paginator.fetch_count(), 3);
	assert_eq!(transport.remaining(), 0);

	let offsets = query_of(&transport)
		.into_iter()
		.map(|query| (query["offset"].clone(), query["perPage"].clone()))
		.collect::<Vec<_>>();

	assert_eq!(
		offsets,
		[("0".into(), "2".into()), ("2".into(), "2".into()), ("4".into(), "2".into())]
	);
}

#[tokio::test]
async fn next_link_strategy_follows_links_verbatim() {
	let pages = [
		json!({ "results": [{ "id": 1 }, { "id": 2 }], "next": "/page/2?cursor=b" }),
		json!({ "results": [{ "id": 3 }, { "id": 4 }], "next": "/page/3?cursor=c" }),
		json!({ "results": [{ "id": 5 }, { "id": 6 }, { "id": 7 }] }),
	];
	let transport = scripted(&pages);
	let mut paginator = Paginator::builder()
		.transport(transport.clone())
		.url(BASE_URL)
		.strategy(PaginationStrategy::next_link())
		.items_key("results")
		.options(RequestOptions::default().with_query("expand", "body"))
		.build()
		.expect("Next-link paginator should build.");
	let items = paginator.collect_items().await.expect("Pagination should succeed.");
	let expected = collapse(&pages, "results");

	assert_eq!(items, expected);
	assert_eq!(paginator.items(), expected.as_slice());
	assert_eq!(paginator.last_response(), pages.last());

	let urls = transport.requests().iter().map(|request| request.url.to_string()).collect::<Vec<_>>();

	assert_eq!(
		urls,
		[
			"https://api.example.net/?expand=body",
			"https://api.example.net/page/2?cursor=b",
			"https://api.example.net/page/3?cursor=c",
		]
	);
}

#[tokio::test]
async fn repeated_page_bodies_end_a_cycling_next_link() {
	let page = json!({ "results": [{ "id": 1 }], "next": "/again" });
	let transport = scripted(&[page.clone(), page.clone(), page]);
	let mut paginator = Paginator::builder()
		.transport(transport.clone())
		.url(BASE_URL)
		.strategy(PaginationStrategy::next_link())
		.items_key("results")
		.build()
		.expect("Next-link paginator should build.");
	let items = paginator.collect_items().await.expect("Loop detection should not error.");

	assert_eq!(items, vec![json!({ "id": 1 })]);
	assert_eq!(paginator.fetch_count(), 2);
	assert_eq!(paginator.state(), PaginatorState::Exhausted);
	assert_eq!(transport.remaining(), 1);
}

#[tokio::test]
async fn dotted_keys_reach_nested_items_and_totals() {
	let pages = [
		json!({ "page": { "values": [{ "id": 1 }, { "id": 2 }], "meta": { "total": "2" } } }),
	];
	let transport = scripted(&pages);
	let mut paginator = Paginator::builder()
		.transport(transport.clone())
		.url(BASE_URL)
		.strategy(PaginationStrategy::offset())
		.items_key("page.values")
		.total_key("page.meta.total")
		.build()
		.expect("Offset paginator should build.");
	let first = paginator.next_item().await.expect("First fetch should succeed.");

	assert_eq!(first, Some(json!({ "id": 1 })));
	assert_eq!(paginator.total(), Some(2));
	assert_eq!(paginator.state(), PaginatorState::Buffered);
	assert_eq!(paginator.next_item().await.expect("Buffered item."), Some(json!({ "id": 2 })));
	assert_eq!(paginator.next_item().await.expect("Total reached."), None);
	assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn missing_configuration_fails_before_any_request() {
	let transport = ScriptedTransport::default();
	let missing_url = Paginator::builder()
		.transport(transport.clone())
		.strategy(PaginationStrategy::page())
		.build()
		.expect_err("A URL is required.");
	let missing_transport = Paginator::<ScriptedTransport>::builder()
		.url(BASE_URL)
		.strategy(PaginationStrategy::page())
		.build()
		.expect_err("A transport is required.");
	let unknown_strategy =
		"cursor".parse::<PaginationStrategy>().expect_err("Unknown strategies should fail.");

	assert!(matches!(missing_url, ConfigError::MissingUrl));
	assert!(matches!(missing_transport, ConfigError::MissingTransport));
	assert!(matches!(unknown_strategy, ConfigError::UnknownStrategy { .. }));
	assert_eq!(transport.request_count(), 0);
}
