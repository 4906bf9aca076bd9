//! # httperr
//!
//! Errors for request-serving code that carry an HTTP response code, a
//! machine-readable error code, a retriability flag and a captured stack trace,
//! and that can be wrapped arbitrarily deep.
//!
//! Attributes are never copied when wrapping. Every accessor walks the chain
//! from the queried link towards the root and resolves its own value:
//!
//! - [`HttpError::message`]: outermost non-empty message
//! - [`HttpError::inner_message`]: innermost message
//! - [`HttpError::response_code`] / [`HttpError::error_code`]: outermost value that was set
//! - [`HttpError::stack_trace`]: the trace captured at the root, or where a foreign error entered
//! - [`HttpError::retriable`]: the flag of the root link
//!
//! ```rust
//! use httperr::{HttpError, ResultExt};
//!
//! fn load_user(id: u32) -> httperr::Result<String> {
//!     std::fs::read_to_string(format!("/nonexistent/users/{id}"))
//!         .wrap_err("user storage unavailable")
//! }
//!
//! let err = HttpError::wrap(load_user(7).unwrap_err(), "cannot load profile")
//!     .with_response_code(503)
//!     .with_error_code("storage_unavailable");
//!
//! assert_eq!(err.message(), "cannot load profile");
//! assert_eq!(err.response_code(), 503);
//! assert!(err.retriable());
//! ```

mod cause;
mod error;
mod ext;
mod stack;
mod util;

pub use cause::{BoxError, Cause, Chain, Node};
pub use error::HttpError;
pub use ext::ResultExt;
pub use stack::MAX_STACK_FRAMES;
pub use util::{
    is_retriable_error, is_unretriable_error, response_code_from_error,
    response_status_from_error, to_http_error,
};

/// The response code of a chain in which no link set one.
pub const UNINITIALIZED_RESPONSE_CODE: i32 = -1;

/// The error code of a chain in which no link set one.
pub const UNINITIALIZED_ERROR_CODE: &str = "";

/// Message reported when no link of a chain carries any text.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Stack trace reported for links that never captured one, e.g. foreign
/// errors converted with [`to_http_error`].
pub const UNINITIALIZED_STACK_TRACE: &str = "Stack trace unavailable";

pub type Result<T> = std::result::Result<T, HttpError>;

/// Creates a root [`HttpError`] with a formatted message.
///
/// ```rust
/// let err = httperr::newf!("{} test err", "http");
/// assert_eq!(err.message(), "http test err");
/// ```
#[macro_export]
macro_rules! newf {
    ($($arg:tt)*) => {
        $crate::HttpError::newf(::std::format_args!($($arg)*))
    };
}

/// Wraps an error into a new [`HttpError`] link with a formatted message.
///
/// ```rust
/// let err = httperr::wrapf!("test error", "{} test err", "http");
/// assert_eq!(err.to_string(), "http test err\ntest error");
/// ```
#[macro_export]
macro_rules! wrapf {
    ($err:expr, $($arg:tt)*) => {
        $crate::HttpError::wrapf($err, ::std::format_args!($($arg)*))
    };
}
