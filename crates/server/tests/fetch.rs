mod common;

use axum::{
    Router,
    extract::Path,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect},
    routing::get,
};
use common::{FakeLlm, PASSWORD, TestAppBuilder};
use serde_json::json;

const PAGE: &str = r#"<!doctype html><html><head>
<title>Example Domain</title>
<meta property="og:description" content="An illustrative page">
</head><body><nav>skip</nav><main><h1>Example</h1>
<p>This domain is for use in   illustrative examples.</p>
<script>track()</script></main></body></html>"#;

async fn serve_pages() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let by_name = format!("http://localhost:{}/page", addr.port());

    let router = Router::new()
        .route("/page", get(|| async { Html(PAGE) }))
        .route("/moved", get(|| async { Redirect::temporary("/page") }))
        .route(
            "/hop/{remaining}",
            get(|Path(remaining): Path<u32>| async move {
                if remaining == 0 {
                    Html(PAGE).into_response()
                } else {
                    Redirect::temporary(&format!("/hop/{}", remaining - 1)).into_response()
                }
            }),
        )
        .route(
            "/to-localhost",
            get(move || async move { Redirect::temporary(&by_name) }),
        )
        .route(
            "/agent",
            get(|headers: axum::http::HeaderMap| async move {
                let agent = headers
                    .get(header::USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Html(format!("<title>{agent}</title>"))
            }),
        )
        .route(
            "/gone",
            get(|| async { (StatusCode::NOT_FOUND, Html("<title>Missing</title>")) }),
        )
        .route(
            "/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response() }),
        );
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn fetch_extracts_metadata_without_summary() {
    let base = serve_pages().await;
    let app = TestAppBuilder::new().llm(FakeLlm::configured()).build();

    let response = app
        .post_json("/api/fetch", json!({ "url": format!("{base}/page") }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], 200);
    assert_eq!(body["title"], "Example Domain");
    assert_eq!(body["desc"], "An illustrative page");
    assert_eq!(body["about"], json!(null));
    assert!(body["preview"].as_str().unwrap().starts_with("<!doctype html>"));
    assert!(body["headers"]["content-type"].as_str().unwrap().starts_with("text/html"));
    assert_eq!(app.llm.call_count(), 0);
}

#[tokio::test]
async fn fetch_follows_redirects_and_accepts_not_found() {
    let base = serve_pages().await;
    let app = TestAppBuilder::new().build();

    let response = app
        .post_json("/api/fetch", json!({ "url": format!("{base}/moved") }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["title"], "Example Domain");

    let response = app
        .post_json("/api/fetch", json!({ "url": format!("{base}/gone") }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], 404);
    assert_eq!(response.json()["title"], "Missing");
}

#[tokio::test]
async fn fetch_sends_the_callers_user_agent() {
    let base = serve_pages().await;
    let app = TestAppBuilder::new().build();
    let response = app
        .post_json(
            "/api/fetch",
            json!({ "url": format!("{base}/agent"), "userAgent": "talk-mode-test/1.0" }),
        )
        .await;
    assert_eq!(response.json()["title"], "talk-mode-test/1.0");
}

#[tokio::test]
async fn summary_is_requested_with_the_extracted_page() {
    let base = serve_pages().await;
    let app = TestAppBuilder::new().llm(FakeLlm::configured()).build();

    let url = format!("{base}/page");
    let response = app
        .post_json("/api/fetch", json!({ "url": url, "summarize": true }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["about"], "pong");

    let sent = app.llm.chat_requests.lock().unwrap().pop().unwrap();
    assert_eq!(sent.messages[0].role, "system");
    let prompt = sent.messages[1].text().unwrap();
    assert!(prompt.contains(&url));
    assert!(prompt.contains("Example Domain"));
    assert!(prompt.contains("This domain is for use in illustrative examples."));
    assert!(!prompt.contains("track()"));
}

#[tokio::test]
async fn summary_is_skipped_without_credentials() {
    let base = serve_pages().await;
    let app = TestAppBuilder::new().build();
    let response = app
        .post_json(
            "/api/fetch",
            json!({ "url": format!("{base}/page"), "summarize": true }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["about"], json!(null));
}

#[tokio::test]
async fn missing_url_is_invalid() {
    let app = TestAppBuilder::new().build();
    for body in [json!({}), json!({ "url": "" }), json!({ "url": "   " })] {
        let response = app.post_json("/api/fetch", body).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json(), json!({ "error": "Invalid URL" }));
    }
}

#[tokio::test]
async fn upstream_errors_fail_the_whole_fetch() {
    let base = serve_pages().await;
    let app = TestAppBuilder::new().build();
    let response = app
        .post_json("/api/fetch", json!({ "url": format!("{base}/broken") }))
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json();
    assert_eq!(body["error"], "fetch_failed");
    assert!(body.get("title").is_none());
}

#[tokio::test]
async fn blocked_domains_are_refused_before_any_request() {
    let app = TestAppBuilder::new()
        .config(|c| c.blocked_domains = vec!["blocked.test".into()])
        .build();
    let response = app
        .post_json("/api/fetch", json!({ "url": "docs.blocked.test/page" }))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.json()["error"], "domain_blocked");
}

#[tokio::test]
async fn redirect_chains_stop_after_five_hops() {
    let base = serve_pages().await;
    let app = TestAppBuilder::new().build();

    let response = app
        .post_json("/api/fetch", json!({ "url": format!("{base}/hop/5") }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["title"], "Example Domain");

    let response = app
        .post_json("/api/fetch", json!({ "url": format!("{base}/hop/6") }))
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["error"], "fetch_failed");
}

#[tokio::test]
async fn redirects_into_a_blocked_domain_are_refused() {
    let base = serve_pages().await;
    let app = TestAppBuilder::new()
        .config(|c| c.blocked_domains = vec!["localhost".into()])
        .build();

    let response = app
        .post_json("/api/fetch", json!({ "url": format!("{base}/to-localhost") }))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.json()["error"], "domain_blocked");
}

#[tokio::test]
async fn hosts_outside_the_allow_list_need_approval() {
    let base = serve_pages().await;
    let app = TestAppBuilder::new()
        .config(|c| c.allowed_domains = vec!["example.com".into()])
        .build();
    let url = format!("{base}/page");

    let response = app.post_json("/api/fetch", json!({ "url": url })).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.json(),
        json!({
            "error": "needs_approval",
            "needsApproval": true,
            "domain": "127.0.0.1",
            "url": url
        })
    );

    let response = app
        .post_json("/api/fetch", json!({ "url": url, "approve": true }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["title"], "Example Domain");

    let response = app
        .post_json(
            "/api/allow",
            json!({ "password": PASSWORD, "domain": "127.0.0.1" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({ "ok": true, "allowed": ["127.0.0.1", "example.com"] })
    );

    let response = app.post_json("/api/fetch", json!({ "url": url })).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn approval_never_overrides_the_blocklist() {
    let app = TestAppBuilder::new()
        .config(|c| {
            c.blocked_domains = vec!["blocked.test".into()];
            c.allowed_domains = vec!["example.com".into()];
        })
        .build();
    let response = app
        .post_json(
            "/api/fetch",
            json!({ "url": "https://blocked.test/", "approve": true }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.json()["error"], "domain_blocked");
}
