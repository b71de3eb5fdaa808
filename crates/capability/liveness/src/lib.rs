//! 存活探针：托管平台要求进程监听一个 HTTP 端口并返回 200。

use axum::{Router, http::StatusCode, routing::get};
use tower_http::trace::TraceLayer;
use tracing::info;

pub const ALIVE_BODY: &str = "relay is running";

/// 任何路径都返回 200。
pub fn router() -> Router {
    Router::new()
        .route("/health", get(alive))
        .fallback(alive)
        .layer(TraceLayer::new_for_http())
}

async fn alive() -> (StatusCode, &'static str) {
    (StatusCode::OK, ALIVE_BODY)
}

/// 绑定端口并提供服务；绑定失败返回错误。
pub async fn serve(addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "liveness_listening");
    axum::serve(listener, router()).await
}
