use thiserror::Error;

/// Errores de las operaciones de facturación, clasificados por causa.
///
/// Cada variante corresponde a un código estable (`code()`) que viaja al
/// cliente junto con el mensaje legible.
#[derive(Debug, Error)]
pub enum EcfError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    FailedPrecondition(String),

    #[error("{0}")]
    Internal(String),
}

impl EcfError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        EcfError::Unauthenticated(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        EcfError::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        EcfError::NotFound(message.into())
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        EcfError::FailedPrecondition(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        EcfError::Internal(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            EcfError::Unauthenticated(_) => "unauthenticated",
            EcfError::InvalidArgument(_) => "invalid-argument",
            EcfError::NotFound(_) => "not-found",
            EcfError::FailedPrecondition(_) => "failed-precondition",
            EcfError::Internal(_) => "internal",
        }
    }
}

impl From<anyhow::Error> for EcfError {
    fn from(error: anyhow::Error) -> Self {
        EcfError::Internal(error.to_string())
    }
}

impl From<std::io::Error> for EcfError {
    fn from(error: std::io::Error) -> Self {
        EcfError::Internal(format!("Error de E/S: {}", error))
    }
}

impl From<serde_json::Error> for EcfError {
    fn from(error: serde_json::Error) -> Self {
        EcfError::Internal(format!("Error de serialización: {}", error))
    }
}

impl From<sqlx::Error> for EcfError {
    fn from(error: sqlx::Error) -> Self {
        EcfError::Internal(format!("Error de base de datos: {}", error))
    }
}

impl From<reqwest::Error> for EcfError {
    fn from(error: reqwest::Error) -> Self {
        EcfError::Internal(format!("Error de red: {}", error))
    }
}

pub type EcfResult<T> = Result<T, EcfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_wire_names() {
        assert_eq!(EcfError::unauthenticated("x").code(), "unauthenticated");
        assert_eq!(EcfError::invalid_argument("x").code(), "invalid-argument");
        assert_eq!(EcfError::not_found("x").code(), "not-found");
        assert_eq!(EcfError::failed_precondition("x").code(), "failed-precondition");
        assert_eq!(EcfError::internal("x").code(), "internal");
    }

    #[test]
    fn anyhow_errors_become_internal() {
        let err: EcfError = anyhow::anyhow!("bucket caído").into();
        assert_eq!(err.code(), "internal");
        assert_eq!(err.to_string(), "bucket caído");
    }
}
