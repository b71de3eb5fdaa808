use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use relay_liveness::{ALIVE_BODY, router};
use tower::ServiceExt;

async fn get(path: &str) -> (StatusCode, String) {
    let response = router()
        .oneshot(Request::builder().uri(path).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    (status, String::from_utf8(bytes.to_vec()).expect("utf8"))
}

#[tokio::test]
async fn root_and_health_return_ok() {
    for path in ["/", "/health"] {
        let (status, body) = get(path).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, ALIVE_BODY);
    }
}

#[tokio::test]
async fn unknown_path_returns_ok() {
    let (status, _) = get("/anything/else").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn serve_reports_bind_failure() {
    let err = relay_liveness::serve("not-an-address").await.expect_err("bind");
    assert!(!err.to_string().is_empty());
}
