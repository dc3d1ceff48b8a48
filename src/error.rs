use thiserror::Error;

use crate::guard::Rejection;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No active session")]
    NotAuthenticated,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    // true when the guard refused the call locally (nothing reached the backend)
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::Rejected(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error_keeps_its_kind() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "report.csv").into();
        assert!(matches!(&err, Error::Io(e) if e.kind() == io::ErrorKind::NotFound));
        assert!(!err.is_rejection());
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "IO error: report.csv");
    }
}
