//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! It centralizes error management, providing a consistent way to handle and represent
//! the failure conditions the service can produce: duplicate registrations, bad
//! credentials, missing resources, federation problems and unexpected internal errors.
//!
//! `AppError` implements `actix_web::error::ResponseError` to seamlessly convert
//! application errors into appropriate HTTP responses with JSON bodies.
//! It also provides `From` trait implementations for `sqlx::Error`,
//! `validator::ValidationErrors`, `jsonwebtoken::errors::Error`,
//! `bcrypt::BcryptError` and `reqwest::Error`, allowing conversion with `?`.
//! Store-layer detail is logged, never echoed to clients.

use actix_web::{error::ResponseError, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Represents all possible failures a core operation can report.
///
/// Every handler either succeeds or returns exactly one of these variants;
/// lower-level errors are converted at the operation boundary.
#[derive(Debug)]
pub enum AppError {
    /// Registration attempted with an email that already has an account (HTTP 400).
    DuplicateEmail,
    /// Login failed. Deliberately does not say whether the email exists (HTTP 401).
    InvalidCredentials,
    /// A tag name that is already taken by the same user (HTTP 400).
    DuplicateName(String),
    /// The requested resource does not exist, or is owned by someone else (HTTP 404).
    /// Ownership failures use this variant so existence is never confirmed.
    NotFound(String),
    /// Missing, malformed or expired bearer credential (HTTP 401).
    Unauthorized(String),
    /// The third-party identity handshake could not be completed (HTTP 502).
    /// No local account is created or mutated when this is returned.
    FederationFailed(String),
    /// Input failed field-level validation (HTTP 422). Carries the per-field map.
    Validation(ValidationErrors),
    /// A malformed or unacceptable request outside field validation (HTTP 400).
    BadRequest(String),
    /// Unexpected internal failure (HTTP 500). The detail is logged server-side
    /// and replaced with a generic message in the response.
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::DuplicateEmail => write!(f, "User with this email already exists"),
            AppError::InvalidCredentials => write!(f, "Invalid email or password"),
            AppError::DuplicateName(msg) => write!(f, "Duplicate name: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::FederationFailed(msg) => write!(f, "Federation failed: {}", msg),
            AppError::Validation(errors) => write!(f, "Validation failed: {}", errors),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
///
/// Duplicates and malformed requests map to the 4xx client family,
/// ownership/missing resources to 404, credential problems to 401 and
/// everything unexpected to a generic 500.
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::DuplicateEmail => HttpResponse::BadRequest().json(json!({
                "error": "User with this email already exists"
            })),
            AppError::InvalidCredentials => HttpResponse::Unauthorized().json(json!({
                "error": "Invalid email or password"
            })),
            AppError::DuplicateName(msg) => HttpResponse::BadRequest().json(json!({
                "error": msg
            })),
            AppError::NotFound(msg) => HttpResponse::NotFound().json(json!({
                "error": msg
            })),
            AppError::Unauthorized(msg) => HttpResponse::Unauthorized().json(json!({
                "error": msg
            })),
            AppError::FederationFailed(msg) => {
                log::warn!("federation attempt failed: {}", msg);
                HttpResponse::BadGateway().json(json!({
                    "error": "Federated sign-in failed"
                }))
            }
            AppError::Validation(errors) => HttpResponse::UnprocessableEntity().json(json!({
                "error": "Validation failed",
                "fields": errors
            })),
            AppError::BadRequest(msg) => HttpResponse::BadRequest().json(json!({
                "error": msg
            })),
            AppError::Internal(detail) => {
                log::error!("internal error: {}", detail);
                HttpResponse::InternalServerError().json(json!({
                    "error": "Internal server error"
                }))
            }
        }
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `RowNotFound` maps to `NotFound`, unique-constraint violations to a
/// duplicate-style `BadRequest` (the store is the last line of defense for
/// the (email) and (name, user_id) constraints), everything else to
/// `Internal` carrying the detail for the log only.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match &error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::BadRequest("Resource already exists".into())
            }
            _ => AppError::Internal(error.to_string()),
        }
    }
}

/// Converts `validator::ValidationErrors` into `AppError::Validation`,
/// preserving the per-field error map for the response body.
impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> AppError {
        AppError::Validation(errors)
    }
}

/// Converts `jsonwebtoken::errors::Error` into `AppError::Unauthorized`.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(format!("Invalid token: {}", error))
    }
}

/// Converts `bcrypt::BcryptError` into `AppError::Internal`.
impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::Internal(error.to_string())
    }
}

/// Converts `reqwest::Error` into `AppError::FederationFailed`.
///
/// The only outbound HTTP the core performs is the provider exchange.
impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> AppError {
        AppError::FederationFailed(error.to_string())
    }
}
