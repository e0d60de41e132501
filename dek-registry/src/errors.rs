use thiserror::Error;

use crate::constants::{NOT_FOUND_ERROR_CODE, NOT_FOUND_STATUS};

pub type Result<T> = std::result::Result<T, Error>;

/// Backing errors for all key registry operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Mirrors the "404/40400" REST error of the registry service.
    #[error("{message} (status {status}, code {code})")]
    NotFound {
        message: String,
        status: u16,
        code: u32,
    },
    #[error("{message}")]
    Decode { message: String },
}

impl Error {
    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound {
            message: message.into(),
            status: NOT_FOUND_STATUS,
            code: NOT_FOUND_ERROR_CODE,
        }
    }

    pub fn decode(cause: base64::DecodeError) -> Self {
        Error::Decode {
            message: format!("failed to decode base64 string: {}", cause),
        }
    }

    /// Returns the error message in "String".
    #[inline]
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Error::NotFound { message, .. } | Error::Decode { message } => message.clone(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns the HTTP-like status, if the error carries one.
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::NotFound { status, .. } => Some(*status),
            Error::Decode { .. } => None,
        }
    }

    /// Returns the registry error code, if the error carries one.
    #[inline]
    #[must_use]
    pub fn code(&self) -> Option<u32> {
        match self {
            Error::NotFound { code, .. } => Some(*code),
            Error::Decode { .. } => None,
        }
    }
}

#[test]
fn test_error() {
    let err = Error::not_found("Kek not found: k1");
    assert!(err.is_not_found());
    assert_eq!(err.message(), "Kek not found: k1");
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.code(), Some(40400));
    assert_eq!(
        err.to_string(),
        "Kek not found: k1 (status 404, code 40400)"
    );

    let err = Error::decode(base64::DecodeError::InvalidLength);
    assert!(!err.is_not_found());
    assert!(err.message().starts_with("failed to decode base64 string: "));
    assert_eq!(err.status(), None);
    assert_eq!(err.code(), None);
}
