//! Client tests: wiremock for the full HTTP path, a mocked transport for
//! rate-limit retries under a paused clock.

use async_trait::async_trait;
use integrations_github_paging::config::{PaginationConfig, RateLimitConfig};
use integrations_github_paging::mocks::{fixtures, link_header, MockResponse};
use integrations_github_paging::{
    GitHubClient, GitHubConfig, GitHubErrorKind, GitHubResult, HttpRequest, HttpTransport,
    IssueState, IssueStateFilter, ResponseMeta,
};
use mockall::mock;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mock! {
    pub Transport {}

    #[async_trait]
    impl HttpTransport for Transport {
        async fn send(&self, request: HttpRequest) -> GitHubResult<ResponseMeta>;
    }
}

const ISSUES_PATH: &str = "/repos/octo/widgets/issues";

fn client_for(server: &MockServer, per_page: u32) -> GitHubClient {
    let config = GitHubConfig::builder()
        .base_url(server.uri())
        .token("ghp_test")
        .pagination(PaginationConfig {
            default_per_page: per_page,
        })
        .build()
        .unwrap();
    GitHubClient::new(config).unwrap()
}

/// Serves `pages` of issues on `ISSUES_PATH`, with Link headers.
async fn mount_issue_pages(
    server: &MockServer,
    pages: &[Vec<serde_json::Value>],
    per_page: u32,
) {
    let total = pages.len() as u32;
    let base = format!("{}{}", server.uri(), ISSUES_PATH);

    for (idx, items) in pages.iter().enumerate() {
        let page = idx as u32 + 1;
        let mut template = ResponseTemplate::new(200).set_body_json(items);
        if let Some(link) = link_header(&base, page, total, per_page) {
            template = template.insert_header("link", link.as_str());
        }

        Mock::given(method("GET"))
            .and(path(ISSUES_PATH))
            .and(query_param("page", page.to_string()))
            .and(query_param("per_page", per_page.to_string()))
            .respond_with(template)
            .mount(server)
            .await;
    }
}

fn issue(number: u32, title: &str, labels: &[&str]) -> serde_json::Value {
    serde_json::to_value(fixtures::issue(number, title, labels)).unwrap()
}

fn three_pages() -> Vec<Vec<serde_json::Value>> {
    vec![
        vec![issue(1, "a", &[]), issue(2, "b", &["bug"])],
        vec![issue(3, "c", &[]), issue(4, "d", &["bug", "ci"])],
        vec![issue(5, "e", &[]), issue(6, "f", &["ci"])],
    ]
}

#[tokio::test]
async fn test_list_all_issues_across_pages() {
    let server = MockServer::start().await;
    mount_issue_pages(&server, &three_pages(), 2).await;
    let client = client_for(&server, 2);

    let issues = client
        .issues()
        .list_all("octo", "widgets", IssueStateFilter::Open)
        .await
        .unwrap();

    let titles: Vec<_> = issues.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["a", "b", "c", "d", "e", "f"]);
    assert_eq!(client.metrics().snapshot().pages_fetched, 3);
}

#[tokio::test]
async fn test_find_by_title_stops_at_match() {
    let server = MockServer::start().await;
    mount_issue_pages(&server, &three_pages(), 2).await;
    let client = client_for(&server, 2);

    let found = client
        .issues()
        .find_by_title("octo", "widgets", "f")
        .await
        .unwrap()
        .expect("issue f exists");

    assert_eq!(found.number, 6);

    let missing = client
        .issues()
        .find_by_title("octo", "widgets", "zzz")
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_list_with_label_filters_all_pages() {
    let server = MockServer::start().await;
    mount_issue_pages(&server, &three_pages(), 2).await;
    let client = client_for(&server, 2);

    let issues = client
        .issues()
        .list_with_label("octo", "widgets", "ci")
        .await
        .unwrap();

    let numbers: Vec<_> = issues.iter().map(|i| i.number).collect();
    assert_eq!(numbers, vec![4, 6]);
}

#[tokio::test]
async fn test_not_found_page_surfaces_unchanged() {
    let server = MockServer::start().await;
    let base = format!("{}{}", server.uri(), ISSUES_PATH);

    Mock::given(method("GET"))
        .and(path(ISSUES_PATH))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vec![issue(1, "a", &[])])
                .insert_header("link", link_header(&base, 1, 2, 1).unwrap().as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ISSUES_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Not Found",
            "documentation_url": "https://docs.github.com/rest"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, 1);
    let err = client
        .issues()
        .list_all("octo", "widgets", IssueStateFilter::All)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), GitHubErrorKind::NotFound);
    assert_eq!(err.message(), "Not Found");
    assert_eq!(err.status_code(), Some(404));
}

#[tokio::test]
async fn test_malformed_page_is_wrapped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/labels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"not": "a list"})))
        .mount(&server)
        .await;

    let client = client_for(&server, 100);
    let err = client.labels().list_all("octo", "widgets").await.unwrap_err();

    assert_eq!(err.kind(), GitHubErrorKind::Pagination);
}

#[tokio::test]
async fn test_sends_auth_and_api_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/issues/7"))
        .and(header("authorization", "Bearer ghp_test"))
        .and(header("accept", "application/vnd.github+json"))
        .and(header("x-github-api-version", "2022-11-28"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issue(7, "seven", &[])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 100);
    let issue = client.issues().get("octo", "widgets", 7).await.unwrap();

    assert_eq!(issue.title, "seven");
}

#[tokio::test]
async fn test_add_labels_posts_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/octo/widgets/issues/3/labels"))
        .and(body_json(json!({"labels": ["bug", "ci"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![
            fixtures::label("bug"),
            fixtures::label("ci"),
        ]))
        .expect(1)
        .mount(&server)
        .await;
    let remaining = vec![fixtures::label("bug")];
    Mock::given(method("DELETE"))
        .and(path("/repos/octo/widgets/issues/3/labels/ci"))
        .respond_with(ResponseTemplate::new(200).set_body_json(remaining))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 100);
    let labels = client
        .labels()
        .add_to_issue("octo", "widgets", 3, &["bug", "ci"])
        .await
        .unwrap();
    assert_eq!(labels.len(), 2);

    client
        .labels()
        .remove_from_issue("octo", "widgets", 3, "ci")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_remove_label_encodes_name_as_one_segment() {
    let server = MockServer::start().await;
    let remaining: Vec<serde_json::Value> = Vec::new();
    Mock::given(method("DELETE"))
        .and(path("/repos/octo/widgets/issues/3/labels/needs%2Ftriage%3F%23"))
        .respond_with(ResponseTemplate::new(200).set_body_json(remaining))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 100);
    client
        .labels()
        .remove_from_issue("octo", "widgets", 3, "needs/triage?#")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_replace_labels_puts_json() {
    let server = MockServer::start().await;
    let replaced = vec![fixtures::label("docs")];
    Mock::given(method("PUT"))
        .and(path("/repos/octo/widgets/issues/3/labels"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"labels": ["docs"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(replaced))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 100);
    let labels = client
        .labels()
        .replace_on_issue("octo", "widgets", 3, &["docs"])
        .await
        .unwrap();

    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].name, "docs");
}

#[tokio::test]
async fn test_update_state_patches_json() {
    let server = MockServer::start().await;
    let mut closed = fixtures::issue(3, "three", &[]);
    closed.state = IssueState::Closed;
    Mock::given(method("PATCH"))
        .and(path("/repos/octo/widgets/issues/3"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"state": "closed"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(closed))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 100);
    let issue = client
        .issues()
        .update_state("octo", "widgets", 3, IssueState::Closed)
        .await
        .unwrap();

    assert_eq!(issue.state, IssueState::Closed);
}

#[tokio::test]
async fn test_secondary_limit_is_retried_transparently() {
    let server = MockServer::start().await;
    let throttled = json!({"message": "You have exceeded a secondary rate limit"});
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/issues/1"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("retry-after", "1")
                .set_body_json(throttled),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/issues/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issue(1, "one", &[])))
        .mount(&server)
        .await;

    let client = client_for(&server, 100);
    let started = std::time::Instant::now();
    let issue = client.issues().get("octo", "widgets", 1).await.unwrap();

    assert_eq!(issue.number, 1);
    assert!(started.elapsed() >= Duration::from_secs(1));
    let metrics = client.metrics().snapshot();
    assert_eq!(metrics.requests_total, 2);
    assert_eq!(metrics.secondary_waits, 1);
    assert_eq!(metrics.rate_limit_retries, 1);
}

fn mocked_client(transport: MockTransport, rate_limit: RateLimitConfig) -> GitHubClient {
    GitHubClient::builder()
        .token("ghp_test")
        .rate_limit(rate_limit)
        .transport(Arc::new(transport))
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_primary_limit_waits_then_resends() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut transport = MockTransport::new();
    transport.expect_send().times(2).returning(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(MockResponse::rate_limited().into_meta())
        } else {
            Ok(MockResponse::ok_json(&fixtures::issue(9, "nine", &[])).into_meta())
        }
    });

    let client = mocked_client(transport, RateLimitConfig::default());
    let started = tokio::time::Instant::now();
    let issue = client.issues().get("octo", "widgets", 9).await.unwrap();

    assert_eq!(issue.number, 9);
    assert!(started.elapsed() >= Duration::from_secs(60));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(client.rate_limit_monitor().current_backoff(), Duration::from_secs(72));
    assert_eq!(client.rate_limit_monitor().in_flight(), 0);

    let metrics = client.metrics().snapshot();
    assert_eq!(metrics.primary_waits, 1);
    assert_eq!(metrics.rate_limit_retries, 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_cap_surfaces_rate_limit_error() {
    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .times(2)
        .returning(|_| Ok(MockResponse::rate_limited().into_meta()));

    let client = mocked_client(
        transport,
        RateLimitConfig {
            max_rate_limit_retries: Some(1),
            ..Default::default()
        },
    );

    let err = client.issues().get("octo", "widgets", 1).await.unwrap_err();
    assert_eq!(err.kind(), GitHubErrorKind::PrimaryRateLimitExceeded);
    assert!(err.rate_limit().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_service_resets_backoff_before_operation() {
    let empty_page = MockResponse::ok_json(&Vec::<serde_json::Value>::new()).into_meta();
    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .returning(move |_| Ok(empty_page.clone()));

    let client = mocked_client(transport, RateLimitConfig::default());
    client
        .rate_limit_monitor()
        .inspect(&MockResponse::rate_limited().into_meta())
        .await
        .unwrap();
    assert_eq!(client.rate_limit_monitor().current_backoff(), Duration::from_secs(72));

    let labels = client.labels().list_all("octo", "widgets").await.unwrap();

    assert!(labels.is_empty());
    assert_eq!(client.rate_limit_monitor().current_backoff(), Duration::from_secs(60));
}

#[tokio::test]
async fn test_transport_error_passes_through_engine() {
    let mut transport = MockTransport::new();
    transport.expect_send().returning(|_| {
        Err(integrations_github_paging::GitHubError::timeout(
            "Request timed out",
        ))
    });

    let client = mocked_client(transport, RateLimitConfig::default());
    let err = client
        .issues()
        .list_all("octo", "widgets", IssueStateFilter::Open)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), GitHubErrorKind::Timeout);
    assert_eq!(client.metrics().snapshot().requests_failed, 1);
}
