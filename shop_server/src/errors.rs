use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use shop_engine::ShopError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("{0}")]
    ShopError(#[from] ShopError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::SigningError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::ShopError(e) => shop_error_status(e),
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("💻️ {self}");
        }
        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

fn shop_error_status(e: &ShopError) -> StatusCode {
    match e {
        ShopError::ValidationError(_) => StatusCode::BAD_REQUEST,
        ShopError::EmptyCart => StatusCode::BAD_REQUEST,
        ShopError::EmptyOrder => StatusCode::BAD_REQUEST,
        ShopError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
        ShopError::InvalidSignature(_) => StatusCode::BAD_REQUEST,
        ShopError::MissingCorrelation => StatusCode::BAD_REQUEST,
        ShopError::OrderNotPayable(..) => StatusCode::BAD_REQUEST,
        ShopError::ProductNotFound(_) => StatusCode::NOT_FOUND,
        ShopError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        ShopError::CartItemNotFound(_) => StatusCode::NOT_FOUND,
        ShopError::IllegalTransition { .. } => StatusCode::CONFLICT,
        ShopError::NotOrderOwner(_) => StatusCode::FORBIDDEN,
        ShopError::PaymentProviderError(_) => StatusCode::BAD_GATEWAY,
        ShopError::PersistenceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No bearer token was provided.")]
    MissingToken,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Could not sign access token. {0}")]
    SigningError(String),
}
