use crate::{BoxError, HttpError};

/// Wrap the error side of a `Result` without touching the success side.
///
/// ```rust
/// use httperr::ResultExt;
///
/// let ok: Result<u8, std::io::Error> = Ok(1);
/// assert_eq!(ok.wrap_err("never used").ok(), Some(1));
///
/// let failed: Result<u8, &str> = Err("disk full");
/// let err = failed.wrap_err("cannot persist session").unwrap_err();
/// assert_eq!(err.to_string(), "cannot persist session\ndisk full");
/// ```
pub trait ResultExt<T> {
    /// Wrap the error into a new outer link.
    fn wrap_err(self, message: impl Into<String>) -> Result<T, HttpError>;

    /// Wrap the error, building the message only when there is one.
    fn wrap_err_with<M, F>(self, message: F) -> Result<T, HttpError>
    where
        M: Into<String>,
        F: FnOnce() -> M;

    /// Convert the error with [`HttpError::from_error`].
    fn into_http_error(self) -> Result<T, HttpError>;
}

// Plain matches instead of `map_err` keep closures off the captured stack.
impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<BoxError>,
{
    fn wrap_err(self, message: impl Into<String>) -> Result<T, HttpError> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(HttpError::wrap(err, message)),
        }
    }

    fn wrap_err_with<M, F>(self, message: F) -> Result<T, HttpError>
    where
        M: Into<String>,
        F: FnOnce() -> M,
    {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(HttpError::wrap(err, message())),
        }
    }

    fn into_http_error(self) -> Result<T, HttpError> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(HttpError::from_error(err)),
        }
    }
}
