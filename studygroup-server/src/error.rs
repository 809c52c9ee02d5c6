//! HTTP error type.
//!
//! Every handler returns `Result<_, ApiError>`. Business-rule violations
//! keep their reason text; store failures are logged and rendered as a
//! generic 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use studygroup_core::{ErrorKind, GroupError};

use crate::repository::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(&'static str),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// Failure outside the store that is not the client's fault.
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
    kind: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Group(e) => match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::BadRequest | ErrorKind::CapacityExceeded => StatusCode::BAD_REQUEST,
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Repository(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Group(e) => e.kind().as_str(),
            Self::Unauthorized(_) => "unauthorized",
            Self::BadRequest(_) => ErrorKind::BadRequest.as_str(),
            Self::Conflict(_) => ErrorKind::Conflict.as_str(),
            Self::Repository(_) | Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = match &self {
            Self::Repository(e) => {
                error!("Store failure: {}", e);
                "Internal server error".to_string()
            }
            Self::Internal(e) => {
                error!("Internal failure: {}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            detail,
            kind: self.kind(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_exceeded_is_a_distinguishable_400() {
        let err = ApiError::from(GroupError::GroupFull);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), "capacity_exceeded");
        assert_eq!(err.to_string(), "Study group is full");
    }

    #[test]
    fn test_group_error_statuses() {
        assert_eq!(
            ApiError::from(GroupError::GroupNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(GroupError::AlreadyMember).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(GroupError::PrivateGroup).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(GroupError::CannotKickOwner).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_store_failure_hides_detail() {
        let err = ApiError::from(RepositoryError::storage("load group", "disk I/O error"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind(), "internal");
    }
}
