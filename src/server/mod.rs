// 静态托管模块
//
// 只负责把发布目录原样暴露出去，清单和资源的内容由同步编排器维护

use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::path::Path;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// 发布目录挂载路径
pub const CACHE_ROUTE: &str = "/cache";

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "solar-station",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// 构建路由：`/health` + `/cache/*` 静态文件
pub fn build_router(cache_dir: &Path) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest_service(CACHE_ROUTE, ServeDir::new(cache_dir))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
