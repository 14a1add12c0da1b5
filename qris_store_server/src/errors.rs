use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use qris_store_engine::{StoreError, VerifierError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    StoreError(#[from] StoreError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::StoreError(e) => match e {
                StoreError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
                StoreError::InvalidImage(_) => StatusCode::BAD_REQUEST,
                StoreError::InvalidCart(_) => StatusCode::BAD_REQUEST,
                StoreError::InvalidProduct(_) => StatusCode::BAD_REQUEST,
                StoreError::ParseFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
                StoreError::ManipulationDetected(_) => StatusCode::UNPROCESSABLE_ENTITY,
                StoreError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                StoreError::InsufficientStock(_) => StatusCode::CONFLICT,
                StoreError::InvalidStatus { .. } => StatusCode::CONFLICT,
                StoreError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                StoreError::ProductNotFound(_) => StatusCode::NOT_FOUND,
                StoreError::Forbidden(_) => StatusCode::FORBIDDEN,
                StoreError::RenderError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                StoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                StoreError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<VerifierError> for ServerError {
    fn from(e: VerifierError) -> Self {
        Self::ConfigurationError(format!("{e}. Set QRS_PAYMENT_SECRET."))
    }
}
