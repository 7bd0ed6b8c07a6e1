use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::error::PipelineError;
use crate::pipeline::NewsPipeline;

pub const CACHE_HEADER: &str = "x-cache";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<NewsPipeline>,
}

impl AppState {
    pub fn new(pipeline: NewsPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/news", get(news))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Intermediaries may treat the body as fresh for the cache TTL; browsers revalidate.
fn cache_control(ttl_secs: u64) -> HeaderValue {
    HeaderValue::from_str(&format!("max-age=0, s-maxage={ttl_secs}"))
        .unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
}

async fn news(State(state): State<AppState>) -> Result<Response, PipelineError> {
    let (payload, status) = state.pipeline.handle().await?;
    let ttl = state.pipeline.cache().ttl_secs();

    let mut resp = Json(payload.as_ref()).into_response();
    let headers = resp.headers_mut();
    headers.insert(header::CACHE_CONTROL, cache_control(ttl));
    headers.insert(
        CACHE_HEADER,
        HeaderValue::from_static(status.as_header_value()),
    );
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_control_advertises_shared_cache_ttl() {
        assert_eq!(cache_control(600), "max-age=0, s-maxage=600");
    }
}
