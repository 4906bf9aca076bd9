//! Helpers for HTTP handlers that receive arbitrary errors.

use std::error::Error as StdError;

use http::StatusCode;

use crate::{BoxError, HttpError, UNINITIALIZED_RESPONSE_CODE};

/// Convert any error into an [`HttpError`], see [`HttpError::from_error`].
pub fn to_http_error(err: impl Into<BoxError>) -> HttpError {
    HttpError::from_error(err)
}

// A foreign error converted with `to_http_error` has unset codes and is
// retriable, so only an `HttpError` can change the outcome.
fn as_http_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a HttpError> {
    err.downcast_ref::<HttpError>()
}

/// Get the response code to answer with, `500` when the error does not set one.
pub fn response_code_from_error(err: &(dyn StdError + 'static)) -> i32 {
    match as_http_error(err).map(HttpError::response_code) {
        Some(code) if code != UNINITIALIZED_RESPONSE_CODE => code,
        _ => i32::from(StatusCode::INTERNAL_SERVER_ERROR.as_u16()),
    }
}

/// Get the status to answer with. Unset or invalid codes map to
/// `500 Internal Server Error`.
pub fn response_status_from_error(err: &(dyn StdError + 'static)) -> StatusCode {
    as_http_error(err)
        .and_then(HttpError::status_code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Check if a failed request may be retried. No error, or an error that is
/// not an [`HttpError`], is retriable.
pub fn is_retriable_error(err: Option<&(dyn StdError + 'static)>) -> bool {
    err.and_then(as_http_error).map_or(true, HttpError::retriable)
}

/// The negation of [`is_retriable_error`].
pub fn is_unretriable_error(err: Option<&(dyn StdError + 'static)>) -> bool {
    !is_retriable_error(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("upstream timed out")]
    struct TimeoutError;

    #[test]
    fn test_as_http_error_borrows_from_the_argument() {
        let err = HttpError::new("x").with_error_code("missing");
        let erased: &(dyn StdError + 'static) = &err;
        assert_eq!(as_http_error(erased).map(HttpError::error_code), Some("missing"));
        assert!(as_http_error(&TimeoutError).is_none());
    }

    #[test]
    fn test_to_http_error_is_identity_for_http_errors() {
        let err = to_http_error(HttpError::new("x").with_response_code(404));
        assert_eq!(err.response_code(), 404);
        assert!(err.cause().is_none());
    }

    #[test]
    fn test_response_code_defaults_to_internal_server_error() {
        assert_eq!(response_code_from_error(&TimeoutError), 500);
        assert_eq!(response_code_from_error(&HttpError::new("x")), 500);
        assert_eq!(
            response_code_from_error(&HttpError::wrap(TimeoutError, "y")),
            500
        );
    }

    #[test]
    fn test_response_code_from_chain() {
        let err = HttpError::wrap(HttpError::new("x").with_response_code(404), "y");
        assert_eq!(response_code_from_error(&err), 404);

        let err = err.with_response_code(401);
        assert_eq!(response_code_from_error(&err), 401);
    }

    #[test]
    fn test_response_status() {
        let err = HttpError::new("x").with_status(StatusCode::NOT_FOUND);
        assert_eq!(response_status_from_error(&err), StatusCode::NOT_FOUND);

        assert_eq!(
            response_status_from_error(&TimeoutError),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let err = HttpError::new("x").with_response_code(42);
        assert_eq!(response_status_from_error(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_is_retriable_error() {
        assert!(is_retriable_error(None));
        assert!(!is_unretriable_error(None));
        assert!(is_retriable_error(Some(&TimeoutError)));
        assert!(is_retriable_error(Some(&HttpError::new("x"))));

        let err = HttpError::wrap(HttpError::new("x").with_retriable(false), "y");
        assert!(!is_retriable_error(Some(&err)));
        assert!(is_unretriable_error(Some(&err)));
    }
}
