mod util;

use catalog_search::model::types::{Constraint, LegalSearchRequest, SearchRequest};
use util::{TestTracing, fixture_client};

#[tokio::test]
async fn search_logs_request_shape() {
    let tracing = TestTracing::new();
    let _guard = tracing.install();

    let client = fixture_client();
    let request = SearchRequest::text("rust")
        .with_filter("language", Constraint::equals("Rust"))
        .with_sort("price_desc");
    let result = client.search(&request).await.expect("search succeeds");
    assert_eq!(result.total, 2);

    tracing.assert_contains("search_start");
    tracing.assert_contains("query=\"rust\"");
    tracing.assert_contains("sort=\"price_desc\"");
    tracing.assert_contains("search_done");
}

#[tokio::test]
async fn unknown_filter_key_is_logged_and_dropped() {
    let tracing = TestTracing::new();
    let _guard = tracing.install();

    let client = fixture_client();
    let request = SearchRequest::default().with_filter("publisher", Constraint::equals("ACME"));
    let result = client.search(&request).await.expect("search succeeds");
    assert_eq!(result.total, 12);
    tracing.assert_contains("publisher");
}

#[tokio::test]
async fn legal_and_facet_calls_log_their_start() {
    let tracing = TestTracing::new();
    let _guard = tracing.install();

    let client = fixture_client();
    client
        .legal_search(&LegalSearchRequest::new("victim", 5))
        .await
        .expect("legal search succeeds");
    client
        .facets(&Default::default())
        .await
        .expect("facets succeed");

    tracing.assert_contains("legal_search_start");
    tracing.assert_contains("facets_start");
}
