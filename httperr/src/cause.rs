use std::error::Error as StdError;
use std::fmt;

use crate::HttpError;

/// A type-erased error that may be wrapped into a chain.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The value wrapped by an [`HttpError`] link.
pub enum Cause {
    /// Another link of the same chain.
    Link(Box<HttpError>),
    /// An opaque error that ends the chain.
    Foreign(BoxError),
}

impl Cause {
    /// Sorts a type-erased error into a link or a foreign leaf.
    pub(crate) fn from_boxed(err: BoxError) -> Self {
        match err.downcast::<HttpError>() {
            Ok(link) => Cause::Link(link),
            Err(foreign) => Cause::Foreign(foreign),
        }
    }

    /// Check if this cause ends the chain with a foreign error.
    pub fn is_foreign(&self) -> bool {
        matches!(self, Cause::Foreign(_))
    }

    /// Get the wrapped link, if the cause is one.
    pub fn as_link(&self) -> Option<&HttpError> {
        match self {
            Cause::Link(link) => Some(&**link),
            Cause::Foreign(_) => None,
        }
    }

    /// Get the wrapped link mutably, e.g. to set a code on it after wrapping.
    pub fn as_link_mut(&mut self) -> Option<&mut HttpError> {
        match self {
            Cause::Link(link) => Some(&mut **link),
            Cause::Foreign(_) => None,
        }
    }

    /// View the cause as a plain error.
    pub fn as_error(&self) -> &(dyn StdError + 'static) {
        match self {
            Cause::Link(link) => &**link,
            Cause::Foreign(err) => &**err,
        }
    }

    pub(crate) fn node(&self) -> Node<'_> {
        match self {
            Cause::Link(link) => Node::Link(&**link),
            Cause::Foreign(err) => Node::Foreign(&**err),
        }
    }
}

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Link(link) => f.debug_tuple("Link").field(link).finish(),
            Cause::Foreign(err) => f.debug_tuple("Foreign").field(err).finish(),
        }
    }
}

/// One node visited by a resolution walk.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    /// A link of the chain.
    Link(&'a HttpError),
    /// The foreign error at the end of the chain.
    Foreign(&'a (dyn StdError + Send + Sync + 'static)),
}

impl<'a> Node<'a> {
    /// Get the link, if the node is one.
    pub fn as_link(self) -> Option<&'a HttpError> {
        match self {
            Node::Link(link) => Some(link),
            Node::Foreign(_) => None,
        }
    }
}

/// Iterator over a chain, from the link it was created on towards the root.
///
/// Always yields at least the starting link. A [`Node::Foreign`] can only be
/// the last item.
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    next: Option<Node<'a>>,
}

impl<'a> Chain<'a> {
    pub(crate) fn new(head: &'a HttpError) -> Self {
        Self {
            next: Some(Node::Link(head)),
        }
    }
}

impl<'a> Iterator for Chain<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        if let Node::Link(link) = current {
            self.next = link.cause().map(Cause::node);
        }
        Some(current)
    }
}

impl std::iter::FusedIterator for Chain<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("connection reset")]
    struct ResetError;

    #[test]
    fn test_from_boxed_recognizes_links() {
        let cause = Cause::from_boxed(Box::new(HttpError::new("inner")));
        assert!(!cause.is_foreign());
        let message = cause.as_link().map(|link| link.message().into_owned());
        assert_eq!(message.as_deref(), Some("inner"));

        let cause = Cause::from_boxed(Box::new(ResetError));
        assert!(cause.is_foreign());
        assert!(cause.as_link().is_none());
        assert_eq!(cause.as_error().to_string(), "connection reset");
    }

    #[test]
    fn test_chain_walks_to_foreign_leaf() {
        let err = HttpError::wrap(HttpError::wrap(ResetError, "a"), "b");
        let nodes: Vec<_> = err.chain().collect();

        assert_eq!(nodes.len(), 3);
        assert!(matches!(nodes[0], Node::Link(link) if link.to_string().starts_with('b')));
        assert!(matches!(nodes[1], Node::Link(_)));
        assert!(matches!(nodes[2], Node::Foreign(leaf) if leaf.to_string() == "connection reset"));
    }

    #[test]
    fn test_chain_of_root_yields_only_root() {
        let err = HttpError::new("root");
        let mut chain = err.chain();

        assert!(matches!(chain.next(), Some(Node::Link(_))));
        assert!(chain.next().is_none());
        assert!(chain.next().is_none());
    }

    #[test]
    fn test_as_link_mut_updates_wrapped_link() {
        let mut outer = HttpError::wrap(HttpError::new("inner"), "outer");
        if let Some(inner) = outer.cause_mut().and_then(Cause::as_link_mut) {
            inner.set_response_code(500);
        }
        assert_eq!(outer.response_code(), 500);
    }
}
