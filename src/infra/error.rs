use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("http client error: {0}")]
    Http(String),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

impl InfraError {
    pub fn http(message: impl std::fmt::Display) -> Self {
        Self::Http(message.to_string())
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
