use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use qrcode::EcLevel;
use thiserror::Error;

use crate::logos::Logo;

/// Failures of the QR raster producer and its PNG serialisation.
#[derive(Debug, Error)]
pub enum QrError {
    #[error("payload cannot be encoded at error correction level {level:?}: {reason}")]
    Encoding { level: EcLevel, reason: String },

    #[error("failed to encode PNG: {0}")]
    Png(#[from] image::ImageError),
}

/// Failures while turning a validated request into a finished raster.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Qr(#[from] QrError),

    #[error("{} logo is not loaded", .0.display_name())]
    MissingLogo(Logo),

    #[error("failed to decode overlay image: {0}")]
    Decode(#[source] image::ImageError),
}

impl GenerateError {
    /// Message shown to the client. Internal detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            GenerateError::Qr(QrError::Encoding { .. }) => "Failed to generate QR code".to_string(),
            GenerateError::Qr(QrError::Png(_)) => "Failed to encode image".to_string(),
            GenerateError::MissingLogo(logo) => format!("Failed to open {} logo", logo.display_name()),
            GenerateError::Decode(_) => "Failed to decode image".to_string(),
        }
    }
}

/// Errors returned from HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Error reading form: {0}")]
    BadForm(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Generation timed out")]
    Timeout,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }
}

impl From<GenerateError> for ApiError {
    fn from(e: GenerateError) -> Self {
        ApiError::Internal(e.public_message())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadForm(_) => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.to_string())
    }
}
