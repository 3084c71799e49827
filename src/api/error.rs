use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::fmt;

use crate::core::EcfError;

#[derive(Debug)]
pub struct ApiError {
    message: String,
    code: &'static str,
    status_code: StatusCode,
}

impl ApiError {
    pub fn new(message: impl Into<String>, code: &'static str, status_code: StatusCode) -> Self {
        ApiError {
            message: message.into(),
            code,
            status_code,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, "invalid-argument", StatusCode::BAD_REQUEST)
    }

    pub fn too_many_requests() -> Self {
        Self::new(
            "Demasiadas solicitudes, intente más tarde",
            "resource-exhausted",
            StatusCode::TOO_MANY_REQUESTS,
        )
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code).json(serde_json::json!({
            "success": false,
            "error": self.message,
            "code": self.code,
            "status": self.status_code.as_u16()
        }))
    }

    fn status_code(&self) -> StatusCode {
        self.status_code
    }
}

impl From<EcfError> for ApiError {
    fn from(err: EcfError) -> Self {
        let status = match &err {
            EcfError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            EcfError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            EcfError::NotFound(_) => StatusCode::NOT_FOUND,
            EcfError::FailedPrecondition(_) => StatusCode::PRECONDITION_FAILED,
            EcfError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("Error interno: {}", err);
        }

        ApiError::new(err.to_string(), err.code(), status)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_http_status() {
        let cases = [
            (EcfError::unauthenticated("x"), 401),
            (EcfError::invalid_argument("x"), 400),
            (EcfError::not_found("x"), 404),
            (EcfError::failed_precondition("x"), 412),
            (EcfError::internal("x"), 500),
        ];

        for (err, status) in cases {
            let code = err.code();
            let api: ApiError = err.into();
            assert_eq!(api.status_code().as_u16(), status);
            assert_eq!(api.code(), code);
        }
    }
}
