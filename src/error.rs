use actix_web::http::StatusCode;
use actix_web::ResponseError;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Application error taxonomy.
///
/// Storage constraint violations never reach this layer raw: the repositories
/// remap them (duplicate email, slug race) before returning. Anything mapped
/// to an internal error keeps its detail in tracing, not in the response body.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input, surfaced per-field to the submitter
    #[error("{0}")]
    Validation(String),

    /// Surfaced as a single message; never reveals which record conflicts
    #[error("This email address is already subscribed")]
    DuplicateSubscription,

    #[error("Not Found")]
    NotFound,

    #[error("Internal Server Error")]
    Database(#[from] sqlx::Error),

    #[error("Internal Server Error")]
    GenerateUrl(#[from] actix_web::error::UrlGenerationError),

    #[error("Internal Server Error")]
    Other(#[from] anyhow::Error),
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateSubscription => StatusCode::CONFLICT,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::GenerateUrl(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
