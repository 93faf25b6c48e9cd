use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tutorlink_core::{AuthError, BookingError, DatabaseError, ReviewError, TutorError};

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    Forbidden(String),
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<HashMap<String, String>>,
    },
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

/// Every error leaves the server as this body
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<HashMap<String, String>>,
}

impl ServerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
        }
    }

    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.as_status_code();

        let details = match &self {
            Self::Validation { details, .. } => details.clone(),
            _ => None,
        };

        let body = ErrorBody {
            error: self.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials => Self::Unauthorized("Invalid credentials"),
            AuthError::Banned => Self::Forbidden("This account is banned".to_string()),
            AuthError::Db(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<BookingError> for ServerError {
    fn from(value: BookingError) -> Self {
        match value {
            BookingError::DurationTooShort | BookingError::EmptySubject => {
                Self::validation(value.to_string())
            }
            BookingError::NotOwner(_)
            | BookingError::TransitionNotAllowed { .. }
            | BookingError::InvalidRole => Self::Forbidden(value.to_string()),
            BookingError::Db(e) => e.into(),
        }
    }
}

impl From<ReviewError> for ServerError {
    fn from(value: ReviewError) -> Self {
        match value {
            ReviewError::RatingOutOfRange | ReviewError::NotCompleted => {
                Self::validation(value.to_string())
            }
            ReviewError::AlreadyReviewed => Self::Conflict {
                resource: "review",
                field: "booking_id",
                value: "already reviewed".to_string(),
            },
            ReviewError::Db(e) => e.into(),
        }
    }
}

impl From<TutorError> for ServerError {
    fn from(value: TutorError) -> Self {
        match value {
            TutorError::InvalidDecision => Self::validation(value.to_string()),
            TutorError::Db(e) => e.into(),
        }
    }
}
