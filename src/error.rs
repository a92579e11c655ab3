use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Template error: {0}")]
    TemplateError(String),
    #[error("Config error: {0}")]
    ConfigError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::DatabaseError(_) | AppError::TemplateError(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 利用者に見せる文言。内部の詳細はログにだけ残す
    fn public_message(&self) -> &'static str {
        match self {
            // 他人のノートと存在しないノートは区別しない
            AppError::NotFound(_) => "Something went wrong.",
            AppError::Unauthorized(_) => "Access Denied",
            AppError::ValidationError(_) => "Bad request.",
            _ => "Something went wrong. Please try again later.",
        }
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(e: mongodb::error::Error) -> Self {
        AppError::DatabaseError(e.to_string())
    }
}

impl From<minijinja::Error> for AppError {
    fn from(e: minijinja::Error) -> Self {
        AppError::TemplateError(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        let body = format!(
            "<!DOCTYPE html><html><head><title>{code}</title></head><body><p>{msg}</p></body></html>",
            code = status.as_u16(),
            msg = self.public_message(),
        );
        (status, Html(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
