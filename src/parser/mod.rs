//! Message parsing: MIME tree traversal, body and attachment extraction, body normalization.

pub mod html;
pub mod mime;
pub mod tree;
