//! Backend-neutral view of a MIME part tree.
//!
//! Extraction only needs a handful of facts about each part and a way to
//! reach its children, so it is written against [`MimeNode`] rather than a
//! particular parser. Containers (`multipart/*`, embedded `message/rfc822`)
//! report children; leaves report none.

/// One part of a MIME tree.
pub trait MimeNode: Sized {
    /// Lowercase `type/subtype`, `text/plain` when undeclared.
    fn mime_type(&self) -> String;

    /// Whether the part carries a `Content-Disposition` header.
    fn has_disposition(&self) -> bool;

    /// The `filename` parameter of `Content-Disposition`.
    fn disposition_filename(&self) -> Option<String>;

    /// The `name` parameter of `Content-Type`.
    fn content_type_name(&self) -> Option<String>;

    /// Decoded text of an HTML leaf. `None` for anything else.
    fn html_text(&self) -> Option<String>;

    /// Direct children in document order; empty for leaves.
    fn children(&self) -> Vec<Self>;

    /// Whether this part is a container.
    fn is_container(&self) -> bool {
        !self.children().is_empty()
    }
}

/// Pre-order depth-first iterator over a part tree, containers included.
///
/// Uses an explicit stack, so arbitrarily deep nesting cannot overflow.
pub struct Walk<N> {
    stack: Vec<N>,
}

impl<N: MimeNode> Iterator for Walk<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        let node = self.stack.pop()?;
        let mut children = node.children();
        children.reverse();
        self.stack.extend(children);
        Some(node)
    }
}

/// Walk `root` and every descendant depth-first, parents before children.
pub fn walk<N: MimeNode>(root: N) -> Walk<N> {
    Walk { stack: vec![root] }
}
