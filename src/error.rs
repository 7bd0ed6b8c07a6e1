use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::ingest::types::FeedError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Upstream(#[from] FeedError),
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        error!(error = %self, "news request failed");

        let status = self.status();
        let payload = Json(json!({ "error": self.to_string() }));

        (status, payload).into_response()
    }
}
