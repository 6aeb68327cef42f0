//! What extraction yields for one archived message.

use std::collections::BTreeSet;

use super::attachment::AttachmentId;

/// Rendered HTML body and candidate attachment ids of one message.
///
/// Produced once by [`crate::parser::mime::extract`] and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedMessage {
    /// First `text/html` part found in a depth-first walk, or empty.
    pub body: String,

    /// Convention-matching attachment filenames, sorted and deduplicated.
    pub attachments: BTreeSet<AttachmentId>,
}

impl ExtractedMessage {
    /// Whether the message had an HTML body.
    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }

    /// Attachment ids in sorted order.
    pub fn attachment_list(&self) -> Vec<AttachmentId> {
        self.attachments.iter().cloned().collect()
    }
}
