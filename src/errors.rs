//! # Error Handling for Admin Endpoints
//!
//! Every failure an admin endpoint can produce is an [`ApiError`]. Each variant
//! maps to one HTTP status and renders the shared response envelope:
//!
//! ```json
//! {"status": 422, "msg": "Key already exists", "data": null}
//! ```
//!
//! Storage errors are logged through `tracing` before being turned into a
//! response, so the detailed `DbErr` is available server-side while the wire
//! only carries a short description.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use admincrate::ApiError;
//!
//! async fn my_handler() -> Result<Json<Value>, ApiError> {
//!     let rows = select.into_json().all(db).await?; // DbErr converts automatically
//!     if rows.is_empty() {
//!         return Err(ApiError::not_found("Article", Some("7".into())));
//!     }
//!     Ok(Json(json!(rows)))
//! }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use std::fmt;

use crate::models::ApiResponse;
use crate::validation::ValidationErrors;

/// Message used for unique and foreign-key violations.
pub const INTEGRITY_MESSAGE: &str = "Key already exists";

/// API error type with automatic logging and enveloped responses
#[derive(Debug)]
pub enum ApiError {
    /// 401 Unauthorized - a permission hook refused the operation
    Unauthorized {
        /// User-facing error message
        message: String,
    },

    /// 400 Bad Request - well-formed but unusable input (e.g. an empty update)
    BadRequest {
        /// User-facing error message
        message: String,
    },

    /// 404 Not Found - no visible row for the requested id(s)
    NotFound {
        /// Resource type (e.g., "Article")
        resource: String,
        /// Optional id that wasn't found
        id: Option<String>,
    },

    /// 422 Unprocessable Entity - payload failed schema coercion
    ValidationFailed {
        /// One message per offending field
        errors: Vec<String>,
    },

    /// 422 Unprocessable Entity - unique or foreign-key violation
    Integrity {
        /// Storage error (logged, not sent to user)
        internal: DbErr,
    },

    /// 500 Internal Server Error - unclassified storage failure
    Database {
        /// Storage error, logged in full
        internal: DbErr,
    },

    /// 500 Internal Server Error - any other failure
    Internal {
        /// User-facing generic message
        message: String,
        /// Internal error details (logged, not sent to user)
        internal: Option<String>,
    },
}

impl ApiError {
    /// Create a 401 Unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a 400 Bad Request error
    ///
    /// # Example
    /// ```rust,ignore
    /// return Err(ApiError::bad_request("error data handle"));
    /// ```
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create a 404 Not Found error
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    /// Create a 422 Validation Failed error
    #[must_use]
    pub const fn validation_failed(errors: Vec<String>) -> Self {
        Self::ValidationFailed { errors }
    }

    /// Classify a storage error: constraint violations become 422, the rest 500.
    #[must_use]
    pub fn database(err: DbErr) -> Self {
        if matches!(
            err.sql_err(),
            Some(SqlErr::UniqueConstraintViolation(_) | SqlErr::ForeignKeyConstraintViolation(_))
        ) {
            Self::Integrity { internal: err }
        } else {
            Self::Database { internal: err }
        }
    }

    /// Create a 500 Internal Server Error with optional details
    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    /// HTTP status for this error; also used as the envelope `status`.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::ValidationFailed { .. } | Self::Integrity { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Database { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The user-facing message placed in the envelope's `msg`
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("{resource} with ID '{id}' not found"),
                None => format!("{resource} not found"),
            },
            Self::Unauthorized { message }
            | Self::BadRequest { message }
            | Self::Internal { message, .. } => message.clone(),
            Self::ValidationFailed { errors } => {
                if errors.len() == 1 {
                    errors[0].clone()
                } else {
                    format!("Validation failed: {}", errors.join(", "))
                }
            }
            Self::Integrity { .. } => INTEGRITY_MESSAGE.to_string(),
            Self::Database { internal } => format!("A database error occurred: {internal}"),
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Database { internal } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Integrity { internal } => {
                tracing::warn!(error = %internal, "Integrity constraint violated");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            Self::Unauthorized { message } => {
                tracing::warn!(reason = %message, "Permission denied");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let body = ApiResponse::<()>::error(status.as_u16(), self.user_message());
        (status, Json(body)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

/// `RecordNotFound` becomes 404; constraint violations 422; everything else 500.
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::RecordNotFound(msg) => {
                let resource = msg.split_whitespace().next().unwrap_or("Resource");
                Self::NotFound {
                    resource: resource.to_string(),
                    id: None,
                }
            }
            _ => Self::database(err),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::ValidationFailed {
            errors: errors.errors().iter().map(ToString::to_string).collect(),
        }
    }
}
