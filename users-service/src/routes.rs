//! 路由模块

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::get,
    Json, Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use common::middleware::request_id_middleware;

use crate::handlers;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "使用者服务 API",
        version = "0.1.0",
        description = "返回 users 表全部记录的微服务"
    ),
    paths(
        handlers::list_users,
        handlers::health_check,
    ),
    components(schemas(
        common::models::UserRecord,
        common::response::ResponseStatus,
        handlers::HealthResponse,
    )),
    tags(
        (name = "users", description = "使用者查询端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(handlers::list_users))
        .route("/api/health", get(handlers::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
}

/// Builds the full application: routes, request IDs, tracing and a CORS
/// policy admitting only `allowed_origin`.
pub fn create_router(state: AppState, allowed_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([allowed_origin]))
        .allow_methods([Method::GET])
        .allow_headers(Any);

    router()
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
