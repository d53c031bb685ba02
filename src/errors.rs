use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failure of a paste request, mapped onto a bare status line.
///
/// Each variant is logged where it originates; the response carries no body.
#[derive(Debug, Error)]
pub enum PasteError {
    /// Malformed or missing input.
    #[error("bad request: {0}")]
    Client(String),

    /// Delete secret did not match.
    #[error("forbidden: {0}")]
    Authorization(String),

    /// A referenced object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store or the renderer failed.
    #[error("dependency failure: {0}")]
    Dependency(String),

    /// The randomness source failed while deriving keys.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),
}

impl PasteError {
    pub fn client(msg: impl Into<String>) -> Self {
        Self::Client(msg.into())
    }

    pub fn dependency(err: impl std::fmt::Display) -> Self {
        Self::Dependency(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Client(_) => StatusCode::BAD_REQUEST,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Dependency(_) | Self::KeyGeneration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PasteError {
    fn into_response(self) -> Response {
        self.status().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(PasteError::client("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            PasteError::Authorization("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(PasteError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            PasteError::dependency("x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            PasteError::KeyGeneration("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
