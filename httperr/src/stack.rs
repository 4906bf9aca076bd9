//! Stack capture for the authoritative link of a chain.
//!
//! Frames are recorded unresolved when a link is created. Symbols are resolved
//! and rendered once, the first time the trace is read. The rendered text
//! starts with a thread header line and omits every frame that belongs to the
//! capture machinery or to this crate's constructors, so the first frame shown
//! is the caller that created the error.

#[cfg(feature = "backtrace")]
use std::sync::OnceLock;

use crate::UNINITIALIZED_STACK_TRACE;

/// Maximum number of frames kept in a rendered stack trace. Deeper stacks are
/// truncated silently.
pub const MAX_STACK_FRAMES: usize = 128;

#[cfg(feature = "backtrace")]
const CRATE_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::");

#[cfg(feature = "backtrace")]
const TRAIT_IMPL_PREFIX: &str = concat!(" as ", env!("CARGO_CRATE_NAME"), "::");

/// Symbol suffix of the function that records the frames. Everything up to
/// and including it is capture machinery.
#[cfg(feature = "backtrace")]
const CAPTURE_MARKER: &str = "::stack::StackTrace::capture";

pub(crate) enum Stack {
    /// The link defers to the trace of the link it wraps.
    None,
    /// The link never had a call site to capture.
    Unavailable,
    #[cfg(feature = "backtrace")]
    Captured(StackTrace),
}

impl Stack {
    /// Records the current call stack.
    #[cfg(feature = "backtrace")]
    pub(crate) fn capture() -> Self {
        Stack::Captured(StackTrace::capture())
    }

    #[cfg(not(feature = "backtrace"))]
    pub(crate) fn capture() -> Self {
        Stack::Unavailable
    }

    #[cfg(test)]
    pub(crate) fn is_none(&self) -> bool {
        matches!(self, Stack::None)
    }

    pub(crate) fn as_str(&self) -> &str {
        match self {
            Stack::None => "",
            Stack::Unavailable => UNINITIALIZED_STACK_TRACE,
            #[cfg(feature = "backtrace")]
            Stack::Captured(trace) => trace.as_str(),
        }
    }
}

#[cfg(feature = "backtrace")]
pub(crate) struct StackTrace {
    header: String,
    frames: backtrace::Backtrace,
    rendered: OnceLock<String>,
}

#[cfg(feature = "backtrace")]
impl StackTrace {
    #[inline(never)]
    fn capture() -> Self {
        let frames = backtrace::Backtrace::new_unresolved();
        tracing::trace!(frames = frames.frames().len(), "captured stack trace");

        let thread = std::thread::current();
        let header = format!("thread '{}' [running]:", thread.name().unwrap_or("<unnamed>"));

        Self {
            header,
            frames,
            rendered: OnceLock::new(),
        }
    }

    fn as_str(&self) -> &str {
        self.rendered.get_or_init(|| self.render())
    }

    fn render(&self) -> String {
        let mut resolved = self.frames.clone();
        resolved.resolve();

        let symbols: Vec<Symbol> = resolved
            .frames()
            .iter()
            .flat_map(|frame| frame.symbols())
            .map(|symbol| Symbol {
                name: symbol.name().map(|name| format!("{name:#}")),
                location: symbol.filename().map(|file| match symbol.lineno() {
                    Some(line) => format!("{}:{}", file.display(), line),
                    None => file.display().to_string(),
                }),
            })
            .collect();

        let kept = strip_library_frames(&symbols);
        tracing::trace!(
            symbols = symbols.len(),
            kept = kept.len(),
            "rendered stack trace"
        );

        let mut out = self.header.clone();
        for symbol in kept.iter().take(MAX_STACK_FRAMES) {
            out.push('\n');
            out.push_str(symbol.name.as_deref().unwrap_or("<unknown>"));
            if let Some(location) = &symbol.location {
                out.push_str("\n\t");
                out.push_str(location);
            }
        }
        out
    }
}

#[cfg(feature = "backtrace")]
struct Symbol {
    name: Option<String>,
    location: Option<String>,
}

#[cfg(feature = "backtrace")]
impl Symbol {
    fn is_capture_marker(&self) -> bool {
        self.name
            .as_deref()
            .is_some_and(|name| is_own_symbol(name) && name.ends_with(CAPTURE_MARKER))
    }

    fn is_internal(&self) -> bool {
        self.name
            .as_deref()
            .is_some_and(|name| name.starts_with("backtrace::") || is_own_symbol(name))
    }
}

/// Check if a demangled symbol is non-test code of this crate, including
/// trait impls on or for its types.
#[cfg(feature = "backtrace")]
fn is_own_symbol(name: &str) -> bool {
    let own = name.starts_with(CRATE_PREFIX)
        || name
            .strip_prefix('<')
            .is_some_and(|rest| rest.starts_with(CRATE_PREFIX))
        || name.contains(TRAIT_IMPL_PREFIX);
    own && !name.contains("::tests::")
}

/// Drops the capture machinery and the constructor frames that led to it.
#[cfg(feature = "backtrace")]
fn strip_library_frames(symbols: &[Symbol]) -> &[Symbol] {
    let start = symbols
        .iter()
        .rposition(Symbol::is_capture_marker)
        .map_or(0, |marker| marker + 1);
    let rest = &symbols[start..];
    let skip = rest.iter().take_while(|symbol| symbol.is_internal()).count();
    &rest[skip..]
}

#[cfg(all(test, feature = "backtrace"))]
mod tests {
    use super::*;

    fn symbols(names: &[&str]) -> Vec<Symbol> {
        names
            .iter()
            .map(|name| Symbol {
                name: Some(name.to_string()),
                location: None,
            })
            .collect()
    }

    fn names(symbols: &[Symbol]) -> Vec<&str> {
        symbols.iter().filter_map(|s| s.name.as_deref()).collect()
    }

    #[test]
    fn test_strips_through_marker_and_constructors() {
        let trace = symbols(&[
            "backtrace::backtrace::trace",
            "backtrace::capture::Backtrace::new_unresolved",
            "httperr::stack::StackTrace::capture",
            "httperr::stack::Stack::capture",
            "httperr::error::HttpError::new",
            "<core::result::Result<T,E> as httperr::ext::ResultExt<T>>::wrap_err",
            "service::handlers::get_user",
            "httperr::error::HttpError::message",
            "core::ops::function::FnOnce::call_once",
        ]);

        assert_eq!(
            names(strip_library_frames(&trace)),
            vec![
                "service::handlers::get_user",
                "httperr::error::HttpError::message",
                "core::ops::function::FnOnce::call_once",
            ]
        );
    }

    #[test]
    fn test_keeps_unit_test_frames() {
        let trace = symbols(&[
            "httperr::stack::StackTrace::capture",
            "httperr::error::HttpError::new",
            "httperr::error::tests::test_new",
        ]);

        assert_eq!(
            names(strip_library_frames(&trace)),
            vec!["httperr::error::tests::test_new"]
        );
    }

    #[test]
    fn test_without_marker_strips_leading_internal_frames() {
        let trace = symbols(&[
            "backtrace::backtrace::trace",
            "<httperr::error::HttpError as core::convert::From<std::io::error::Error>>::from",
            "app::main",
        ]);

        assert_eq!(names(strip_library_frames(&trace)), vec!["app::main"]);
    }

    #[test]
    fn test_unresolved_symbols_are_kept() {
        let mut trace = symbols(&["httperr::stack::StackTrace::capture"]);
        trace.push(Symbol {
            name: None,
            location: None,
        });

        assert_eq!(strip_library_frames(&trace).len(), 1);
    }

    #[test]
    fn test_rendered_trace_starts_with_thread_header() {
        let stack = Stack::capture();
        let text = stack.as_str();

        assert!(text.starts_with("thread '"));
        assert!(text.lines().next().is_some_and(|line| line.ends_with("[running]:")));
        assert!(!text.contains("StackTrace::capture"));
    }

    #[test]
    fn test_rendering_is_cached() {
        let stack = Stack::capture();
        let first = stack.as_str().as_ptr();
        let second = stack.as_str().as_ptr();

        assert_eq!(first, second);
    }

    #[test]
    fn test_none_and_unavailable_text() {
        assert_eq!(Stack::None.as_str(), "");
        assert!(Stack::None.is_none());
        assert_eq!(Stack::Unavailable.as_str(), UNINITIALIZED_STACK_TRACE);
    }
}
