use actix_web::{
    HttpResponse,
    http::{StatusCode, header},
};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Custom error types for the Slotbook API
#[derive(Error, Debug)]
pub enum SlotbookError {
    #[error("Internal server error")]
    InternalError,
    #[error("Invalid data provided: Error message: `{0}`")]
    BadClientData(String),
    #[error("The slot is no longer available. Error message: `{0}`")]
    SlotTaken(String),
    #[error("Unauthorized request. Error message: `{0}`")]
    Unauthorized(String),
    #[error("404 Not found. Error message: `{0}`")]
    NotFound(String),
    #[error("Rate limit exceeded, retry after {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },
    #[error("An upstream calendar service is unavailable. Error message: `{0}`")]
    UpstreamUnavailable(String),
}

/// Implement the ResponseError trait (from Actix) for the custom error types
/// This allows to automatically convert the error types to HTTP responses
impl actix_web::error::ResponseError for SlotbookError {
    fn status_code(&self) -> StatusCode {
        match *self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadClientData(_) => StatusCode::BAD_REQUEST,
            Self::SlotTaken(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        builder.insert_header((header::CONTENT_TYPE, "text/html; charset=utf-8"));

        if let Self::RateLimited { reset_at } = self {
            builder.insert_header(("x-ratelimit-reset", reset_at.to_rfc3339()));
        }

        // Internal errors carry no detail past the boundary
        match self {
            Self::InternalError => builder.body("Internal server error"),
            other => builder.body(other.to_string()),
        }
    }
}
