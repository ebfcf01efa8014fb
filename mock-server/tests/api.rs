use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, router, MockCdn, Purge};
use serde_json::Value;
use tower::ServiceExt;

const AUTH: &str = r#"OAuth oauth_consumer_key="token", oauth_signature="sig""#;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes: bytes::Bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn signed(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, AUTH)
        .header(
            http::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body(body.to_string())
        .unwrap()
}

// --- auth ---

#[tokio::test]
async fn unsigned_request_is_rejected() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/alias/account.json")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "unauthorized");
}

#[tokio::test]
async fn bearer_token_is_not_enough() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/alias/account.json")
                .header(http::header::AUTHORIZATION, "Bearer abc")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- account ---

#[tokio::test]
async fn get_account() {
    let resp = app()
        .oneshot(signed("GET", "/alias/account.json", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["code"], 200);
    assert_eq!(body["data"]["account"]["alias"], "alias");
}

#[tokio::test]
async fn unknown_alias_returns_error_envelope() {
    let resp = app()
        .oneshot(signed("GET", "/someone-else/account.json", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "not_found");
}

#[tokio::test]
async fn put_account_updates_name() {
    let cdn = MockCdn::default();
    let resp = router(cdn.clone())
        .oneshot(signed("PUT", "/alias/account.json", "name=foo"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["account"]["name"], "foo");
    assert_eq!(cdn.account().name, "foo");
}

// --- zones ---

#[tokio::test]
async fn create_zone_returns_201() {
    let cdn = MockCdn::default();
    let resp = router(cdn.clone())
        .oneshot(signed("POST", "/alias/zones/pull.json", "name=foo"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["code"], 201);
    assert_eq!(body["data"]["pullzone"]["name"], "foo");
    assert_eq!(cdn.zones().len(), 1);
}

#[tokio::test]
async fn create_zone_without_name_is_validation_error() {
    let resp = app()
        .oneshot(signed("POST", "/alias/zones/pull.json", "url=http%3A%2F%2Fx"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "validation_error");
}

#[tokio::test]
async fn get_unknown_zone_is_not_found() {
    let resp = app()
        .oneshot(signed("GET", "/alias/zones/pull.json/404", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["message"], "pull zone 404 does not exist");
}

#[tokio::test]
async fn update_and_delete_zone() {
    let cdn = MockCdn::default().with_zone(123456, "static");

    let resp = router(cdn.clone())
        .oneshot(signed(
            "PUT",
            "/alias/zones/pull.json/123456",
            "url=http%3A%2F%2Forigin.example.com",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(cdn.zones()[0].url, "http://origin.example.com");

    let resp = router(cdn.clone())
        .oneshot(signed("DELETE", "/alias/zones/pull.json/123456", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(cdn.zones().is_empty());
}

// --- purge ---

#[tokio::test]
async fn purge_whole_zone() {
    let cdn = MockCdn::default().with_zone(123456, "static");
    let resp = router(cdn.clone())
        .oneshot(signed("DELETE", "/alias/zones/pull.json/123456/cache", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        cdn.purges(),
        vec![Purge {
            zone: 123456,
            files: Vec::new()
        }]
    );
}

#[tokio::test]
async fn purge_single_and_multiple_files() {
    let cdn = MockCdn::default().with_zone(123456, "static");

    router(cdn.clone())
        .oneshot(signed(
            "DELETE",
            "/alias/zones/pull.json/123456/cache",
            "file=%2Fmaster.css",
        ))
        .await
        .unwrap();
    router(cdn.clone())
        .oneshot(signed(
            "DELETE",
            "/alias/zones/pull.json/123456/cache",
            "files%5B%5D=%2Fmaster.js&files%5B%5D=%2Findex.html",
        ))
        .await
        .unwrap();

    let purges = cdn.purges();
    assert_eq!(purges.len(), 2);
    assert_eq!(purges[0].files, ["/master.css"]);
    assert_eq!(purges[1].files, ["/master.js", "/index.html"]);
}

#[tokio::test]
async fn purge_unknown_zone_is_not_recorded() {
    let cdn = MockCdn::default();
    let resp = router(cdn.clone())
        .oneshot(signed("DELETE", "/alias/zones/pull.json/1/cache", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(cdn.purges().is_empty());
}
