use std::borrow::Cow;
use std::fmt;

use http::StatusCode;

use crate::cause::{BoxError, Cause, Chain, Node};
use crate::stack::Stack;
use crate::{UNINITIALIZED_ERROR_CODE, UNINITIALIZED_RESPONSE_CODE, UNKNOWN_ERROR_MESSAGE};

/// An error for request-serving code, and one link of a chain of wrapped errors.
///
/// Each link stores only what was set on it:
/// - `message`: this link's own text, may be empty
/// - `response_code`: HTTP status to answer with, `-1` when unset
/// - `error_code`: machine-readable code, empty when unset
/// - `retriable`: only read on the root link
/// - `stack`: captured on the root, or on the link that wrapped a foreign error
/// - `inner`: the wrapped [`Cause`]
///
/// Reading an attribute walks the chain from this link towards the root, see
/// the accessors for the rule each one applies.
///
/// # Example
///
/// ```rust
/// use httperr::HttpError;
///
/// let err = HttpError::new("row locked")
///     .with_error_code("db_locked")
///     .with_retriable(false);
/// let err = HttpError::wrap(err, "cannot update order").with_response_code(409);
///
/// assert_eq!(err.to_string(), "cannot update order\nrow locked");
/// assert_eq!(err.inner_message(), "row locked");
/// assert_eq!(err.response_code(), 409);
/// assert_eq!(err.error_code(), "db_locked");
/// assert!(!err.retriable());
/// ```
pub struct HttpError {
    message: String,
    response_code: i32,
    error_code: String,
    retriable: bool,
    stack: Stack,
    inner: Option<Cause>,
}

impl HttpError {
    fn link(message: String, inner: Option<Cause>, stack: Stack) -> Self {
        Self {
            message,
            response_code: UNINITIALIZED_RESPONSE_CODE,
            error_code: UNINITIALIZED_ERROR_CODE.to_string(),
            retriable: true,
            stack,
            inner,
        }
    }

    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a root error, capturing the current stack trace.
    pub fn new(message: impl Into<String>) -> Self {
        Self::link(message.into(), None, Stack::capture())
    }

    /// Create a root error with a formatted message. See also [`crate::newf!`].
    pub fn newf(args: fmt::Arguments<'_>) -> Self {
        Self::new(fmt::format(args))
    }

    /// Wrap an error into a new outer link.
    ///
    /// A stack trace is captured only when `err` is foreign. When `err` is
    /// already an `HttpError` its chain keeps the trace it has.
    ///
    /// An `anyhow::Error` is always foreign here, even when it carries an
    /// `HttpError`. Convert it with `HttpError::from` first to keep that
    /// error's codes and stack trace.
    pub fn wrap<E>(err: E, message: impl Into<String>) -> Self
    where
        E: Into<BoxError>,
    {
        let inner = Cause::from_boxed(err.into());
        let stack = match inner {
            Cause::Link(_) => Stack::None,
            Cause::Foreign(_) => Stack::capture(),
        };
        Self::link(message.into(), Some(inner), stack)
    }

    /// Wrap an error with a formatted message. See also [`crate::wrapf!`].
    pub fn wrapf<E>(err: E, args: fmt::Arguments<'_>) -> Self
    where
        E: Into<BoxError>,
    {
        Self::wrap(err, fmt::format(args))
    }

    /// Wrap an error if there is one. Wrapping no error gives no error.
    pub fn wrap_opt<E>(err: Option<E>, message: impl Into<String>) -> Option<Self>
    where
        E: Into<BoxError>,
    {
        match err {
            Some(err) => Some(Self::wrap(err, message)),
            None => None,
        }
    }

    /// Convert any error into an `HttpError`.
    ///
    /// An `HttpError` is returned unchanged. Anything else becomes the foreign
    /// cause of a new link with no message and unset codes. That link has no
    /// real stack trace because this call site is not where the error
    /// originated; its trace reads [`crate::UNINITIALIZED_STACK_TRACE`].
    pub fn from_error(err: impl Into<BoxError>) -> Self {
        match err.into().downcast::<HttpError>() {
            Ok(link) => *link,
            Err(foreign) => {
                tracing::debug!(error = %foreign, "converting foreign error");
                Self::link(String::new(), Some(Cause::Foreign(foreign)), Stack::Unavailable)
            }
        }
    }

    // =========================================================================
    // Setters
    // =========================================================================

    /// Set the response code of this link.
    pub fn set_response_code(&mut self, response_code: i32) -> &mut Self {
        self.response_code = response_code;
        self
    }

    /// Set the error code of this link.
    pub fn set_error_code(&mut self, error_code: impl Into<String>) -> &mut Self {
        self.error_code = error_code.into();
        self
    }

    /// Set whether this link is retriable. Only read when this link is the root.
    pub fn set_retriable(&mut self, retriable: bool) -> &mut Self {
        self.retriable = retriable;
        self
    }

    /// Builder form of [`HttpError::set_response_code`].
    pub fn with_response_code(mut self, response_code: i32) -> Self {
        self.set_response_code(response_code);
        self
    }

    /// Set the response code from a typed status.
    pub fn with_status(self, status: StatusCode) -> Self {
        self.with_response_code(i32::from(status.as_u16()))
    }

    /// Builder form of [`HttpError::set_error_code`].
    pub fn with_error_code(mut self, error_code: impl Into<String>) -> Self {
        self.set_error_code(error_code);
        self
    }

    /// Builder form of [`HttpError::set_retriable`].
    pub fn with_retriable(mut self, retriable: bool) -> Self {
        self.set_retriable(retriable);
        self
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Iterate the chain from this link towards the root.
    pub fn chain(&self) -> Chain<'_> {
        Chain::new(self)
    }

    fn links(&self) -> impl Iterator<Item = &HttpError> {
        self.chain().filter_map(Node::as_link)
    }

    fn innermost(&self) -> Node<'_> {
        self.chain().last().unwrap_or(Node::Link(self))
    }

    fn root_link(&self) -> &HttpError {
        self.links().last().unwrap_or(self)
    }

    /// Get the outermost message.
    ///
    /// Empty messages are skipped. If no link has one, the text of the
    /// foreign cause is used, and without one [`crate::UNKNOWN_ERROR_MESSAGE`].
    pub fn message(&self) -> Cow<'_, str> {
        for node in self.chain() {
            match node {
                Node::Link(link) if link.message.is_empty() => continue,
                Node::Link(link) => return Cow::Borrowed(&link.message),
                Node::Foreign(err) => return Cow::Owned(err.to_string()),
            }
        }
        Cow::Borrowed(UNKNOWN_ERROR_MESSAGE)
    }

    /// Get the innermost message: the foreign cause's text, or the root's own
    /// message.
    pub fn inner_message(&self) -> Cow<'_, str> {
        match self.innermost() {
            Node::Foreign(err) => Cow::Owned(err.to_string()),
            Node::Link(root) if root.message.is_empty() => Cow::Borrowed(UNKNOWN_ERROR_MESSAGE),
            Node::Link(root) => Cow::Borrowed(&root.message),
        }
    }

    /// Get the outermost response code that was set, or
    /// [`crate::UNINITIALIZED_RESPONSE_CODE`].
    pub fn response_code(&self) -> i32 {
        self.links()
            .map(|link| link.response_code)
            .find(|&code| code != UNINITIALIZED_RESPONSE_CODE)
            .unwrap_or(UNINITIALIZED_RESPONSE_CODE)
    }

    /// Get the resolved response code as a status, if it is a valid one.
    pub fn status_code(&self) -> Option<StatusCode> {
        u16::try_from(self.response_code())
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
    }

    /// Get the outermost error code that was set, or
    /// [`crate::UNINITIALIZED_ERROR_CODE`].
    pub fn error_code(&self) -> &str {
        self.links()
            .map(|link| link.error_code.as_str())
            .find(|code| *code != UNINITIALIZED_ERROR_CODE)
            .unwrap_or(UNINITIALIZED_ERROR_CODE)
    }

    /// Get the stack trace of the chain, held by its innermost link.
    ///
    /// Symbols are resolved on the first call.
    pub fn stack_trace(&self) -> &str {
        self.root_link().stack.as_str()
    }

    /// Check if the request that failed may be retried.
    ///
    /// Errors are retriable unless the root link says otherwise. A chain that
    /// ends in a foreign error is always retriable.
    pub fn retriable(&self) -> bool {
        match self.innermost() {
            Node::Link(root) => root.retriable,
            Node::Foreign(_) => true,
        }
    }

    /// Get the wrapped cause, if any.
    pub fn cause(&self) -> Option<&Cause> {
        self.inner.as_ref()
    }

    /// Get the wrapped cause mutably, if any.
    pub fn cause_mut(&mut self) -> Option<&mut Cause> {
        self.inner.as_mut()
    }

    /// Emit the resolved attributes of this chain as one `error` event.
    ///
    /// The event message is [`HttpError::message`]. Multi-line values are
    /// recorded with `Debug` so the event stays on one line.
    pub fn report(&self) {
        tracing::error!(
            response_code = self.response_code(),
            error_code = self.error_code(),
            retriable = self.retriable(),
            inner_message = ?self.inner_message(),
            chain = ?self.to_string(),
            stack_trace = ?self.stack_trace(),
            "{}",
            self.message()
        );
    }
}

// =============================================================================
// Display - every message of the chain, one per line
// =============================================================================

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut written = false;
        for node in self.chain() {
            match node {
                Node::Link(link) if link.message.is_empty() => continue,
                _ if written => f.write_str("\n")?,
                _ => {}
            }
            match node {
                Node::Link(link) => f.write_str(&link.message)?,
                Node::Foreign(err) => write!(f, "{err}")?,
            }
            written = true;
        }

        if !written {
            f.write_str(UNKNOWN_ERROR_MESSAGE)?;
        }
        Ok(())
    }
}

// =============================================================================
// Debug - resolved attributes and the whole chain
// =============================================================================

impl fmt::Debug for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "HttpError: {}", self.message())?;
        writeln!(f, "  Response code: {}", self.response_code())?;
        if !self.error_code().is_empty() {
            writeln!(f, "  Error code: {}", self.error_code())?;
        }
        writeln!(f, "  Retriable: {}", self.retriable())?;

        for (depth, node) in self.chain().enumerate().skip(1) {
            let indent = "  ".repeat(depth);
            match node {
                Node::Link(link) if link.message.is_empty() => {
                    writeln!(f, "  {indent}└─ <no message>")?
                }
                Node::Link(link) => writeln!(f, "  {indent}└─ {}", link.message)?,
                Node::Foreign(err) => writeln!(f, "  {indent}└─ {err}")?,
            }
        }

        let stack_trace = self.stack_trace();
        if !stack_trace.is_empty() {
            writeln!(f, "  Stack trace:")?;
            for line in stack_trace.lines() {
                writeln!(f, "    {line}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.as_ref().map(Cause::as_error)
    }
}

// =============================================================================
// Conversions at trust boundaries
// =============================================================================

impl From<std::io::Error> for HttpError {
    fn from(err: std::io::Error) -> Self {
        Self::from_error(err)
    }
}

impl From<anyhow::Error> for HttpError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<HttpError>() {
            Ok(link) => link,
            Err(err) => Self::from_error(err),
        }
    }
}
