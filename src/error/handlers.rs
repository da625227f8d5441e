//! Status-code to error mapping shared by the registry endpoints

use crate::error::FinderError;
use reqwest::StatusCode;

/// Standard error handler for registry HTTP responses
pub struct HttpErrorHandler;

impl HttpErrorHandler {
    /// Build a [`FinderError::Registry`] with a message that names what was being fetched
    pub fn status_error(status: StatusCode, context: &str) -> FinderError {
        let message = match status.as_u16() {
            401 => format!("authentication rejected while fetching {}", context),
            403 => format!("access denied for {}", context),
            404 => format!("{} not found", context),
            429 => format!("rate limited while fetching {}", context),
            500 => format!("registry server error while fetching {}", context),
            502 | 503 => format!("registry unavailable while fetching {}", context),
            _ => format!("unexpected response while fetching {}", context),
        };

        FinderError::registry(status.as_u16(), message)
    }

    /// Decode failure of an otherwise successful response
    pub fn decode_error(status: StatusCode, context: &str, err: impl std::fmt::Display) -> FinderError {
        FinderError::registry(
            status.as_u16(),
            format!("cannot decode {} response: {}", context, err),
        )
    }
}
