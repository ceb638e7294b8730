//! Error types for gnosis-cs
//!
//! [`PipelineError`] is what the dataset pipeline and signaling relay return.
//! [`ApiError`] is what HTTP handlers return; it renders as
//! `{"error": {"code": ..., "message": ...}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::services::engine::EngineError;
use crate::services::file_store::StoreError;

/// Coarse failure category, enough for a caller to choose between
/// fixing the request, retrying later, or reporting a bug
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Group, profile or image absent
    NotFound,
    /// Nothing to do: no images, empty group, empty dataset
    EmptyInput,
    /// File store or analytics engine unreachable or erroring
    RemoteUnavailable,
    /// Invariant violation (coded image without a token)
    InconsistentState,
    /// Upload or database write failed after an otherwise successful step
    PersistFailed,
}

/// Failures of the encoding pipeline, dataset builder and signaling relay
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Group not found: {0}")]
    GroupNotFound(Uuid),

    #[error("Profile not found: {0}")]
    ProfileNotFound(Uuid),

    #[error("No images to encode for profile {0}")]
    NoImagesToEncode(Uuid),

    #[error("Group {0} has no member profiles")]
    EmptyGroup(Uuid),

    #[error("Group {0} has no coded images to build a dataset from")]
    EmptyDataset(Uuid),

    #[error("Group {0} has no built dataset")]
    DatasetMissing(Uuid),

    #[error("Image {0} is marked coded but has no embedding")]
    InconsistentState(Uuid),

    #[error("Encoding service error: {0}")]
    Encoding(EngineError),

    #[error("Signaling engine error: {0}")]
    Signaling(EngineError),

    #[error("File store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to persist dataset for group {group_id}: {source}")]
    DatasetPersistFailed {
        group_id: Uuid,
        #[source]
        source: StoreError,
    },

    #[error("Failed to download dataset {path}: {source}")]
    DatasetDownloadFailed {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to serialize dataset: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] gnosis_common::Error),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::GroupNotFound(_)
            | PipelineError::ProfileNotFound(_)
            | PipelineError::DatasetMissing(_)
            | PipelineError::DatasetDownloadFailed { .. } => ErrorKind::NotFound,

            PipelineError::NoImagesToEncode(_)
            | PipelineError::EmptyGroup(_)
            | PipelineError::EmptyDataset(_) => ErrorKind::EmptyInput,

            PipelineError::Encoding(_) | PipelineError::Signaling(_) => {
                ErrorKind::RemoteUnavailable
            }

            PipelineError::Store(err) => match err {
                StoreError::RemoteNotFound(_) | StoreError::NotFound(_) => ErrorKind::NotFound,
                StoreError::Unavailable(_) | StoreError::InvalidPath(_) => {
                    ErrorKind::RemoteUnavailable
                }
            },

            PipelineError::InconsistentState(_) => ErrorKind::InconsistentState,

            PipelineError::DatasetPersistFailed { .. }
            | PipelineError::Serialize(_)
            | PipelineError::Database(_) => ErrorKind::PersistFailed,
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Pipeline failure, status chosen by [`ErrorKind`]
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// gnosis-common error
    #[error("Common error: {0}")]
    Common(#[from] gnosis_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Pipeline(err) => match err.kind() {
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                ErrorKind::EmptyInput => (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_INPUT"),
                ErrorKind::RemoteUnavailable => (StatusCode::BAD_GATEWAY, "REMOTE_UNAVAILABLE"),
                ErrorKind::InconsistentState => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INCONSISTENT_STATE")
                }
                ErrorKind::PersistFailed => (StatusCode::INTERNAL_SERVER_ERROR, "PERSIST_FAILED"),
            },
            ApiError::Common(gnosis_common::Error::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            ApiError::Common(gnosis_common::Error::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            ApiError::Common(_) => (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
