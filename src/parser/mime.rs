//! MIME message extraction: HTML body and candidate attachment ids.

use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};
use tracing::{debug, warn};

use crate::model::attachment::AttachmentId;
use crate::model::message::ExtractedMessage;
use crate::parser::tree::{walk, MimeNode};

/// Content-type prefixes that mark a part as an attachment candidate even
/// without a `Content-Disposition` header.
const BINARY_PREFIXES: [&str; 4] = ["application/", "image/", "video/", "audio/"];

/// Parse a raw message and extract its HTML body and candidate attachment ids.
///
/// Never fails: a message `mail-parser` cannot make sense of yields an empty
/// body and no attachments.
pub fn extract(raw_message: &[u8]) -> ExtractedMessage {
    let message_bytes = skip_from_line(raw_message);

    match MessageParser::default().parse(message_bytes) {
        Some(msg) => match ParsedPart::root(&msg) {
            Some(root) => extract_from_tree(root),
            None => ExtractedMessage::default(),
        },
        None => {
            warn!(len = raw_message.len(), "Unparseable message, nothing extracted");
            ExtractedMessage::default()
        }
    }
}

/// Run the extraction rules over any part tree.
///
/// * The first `text/html` part in depth-first order is the body.
/// * Any other part with a disposition header, or with a binary-ish content
///   type, is a candidate; its filename comes from the disposition
///   `filename` parameter, else the content-type `name` parameter, and is
///   kept only if it follows the attachment naming convention.
pub fn extract_from_tree<N: MimeNode>(root: N) -> ExtractedMessage {
    let mut result = ExtractedMessage::default();
    let mut body_found = false;

    for part in walk(root) {
        let mime = part.mime_type();

        if mime == "text/html" {
            if !body_found {
                if let Some(text) = part.html_text() {
                    if !text.is_empty() {
                        result.body = text;
                        body_found = true;
                    }
                }
            }
            continue;
        }

        let is_candidate =
            part.has_disposition() || BINARY_PREFIXES.iter().any(|p| mime.starts_with(p));
        if !is_candidate {
            continue;
        }

        let filename = part
            .disposition_filename()
            .filter(|f| !f.is_empty())
            .or_else(|| part.content_type_name());

        match filename.as_deref().and_then(AttachmentId::from_header_filename) {
            Some(id) => {
                result.attachments.insert(id);
            }
            None => {
                debug!(mime = %mime, filename = ?filename, "Ignoring non-candidate part");
            }
        }
    }

    result
}

/// A `mail-parser` part together with the message that owns its siblings.
#[derive(Clone, Copy)]
pub struct ParsedPart<'a, 'x> {
    message: &'a Message<'x>,
    part: &'a MessagePart<'x>,
}

impl<'a, 'x> ParsedPart<'a, 'x> {
    /// The root part of a parsed message.
    pub fn root(message: &'a Message<'x>) -> Option<Self> {
        message.parts.first().map(|part| Self { message, part })
    }

    fn charset(&self) -> Option<&str> {
        self.part.content_type().and_then(|ct| ct.attribute("charset"))
    }
}

impl MimeNode for ParsedPart<'_, '_> {
    fn mime_type(&self) -> String {
        match self.part.content_type() {
            Some(ct) => match ct.subtype() {
                Some(sub) => format!("{}/{}", ct.ctype(), sub).to_lowercase(),
                None => "text/plain".to_string(),
            },
            None => "text/plain".to_string(),
        }
    }

    fn has_disposition(&self) -> bool {
        self.part.content_disposition().is_some()
    }

    fn disposition_filename(&self) -> Option<String> {
        self.part
            .content_disposition()
            .and_then(|cd| cd.attribute("filename"))
            .map(String::from)
    }

    fn content_type_name(&self) -> Option<String> {
        self.part
            .content_type()
            .and_then(|ct| ct.attribute("name"))
            .map(String::from)
    }

    fn html_text(&self) -> Option<String> {
        match &self.part.body {
            PartType::Html(html) => Some(html.to_string()),
            PartType::Text(text) => Some(text.to_string()),
            PartType::Binary(bytes) | PartType::InlineBinary(bytes) => {
                Some(decode_payload(bytes, self.charset()))
            }
            _ => None,
        }
    }

    fn children(&self) -> Vec<Self> {
        match &self.part.body {
            PartType::Multipart(ids) => ids
                .iter()
                .filter_map(|&id| self.message.parts.get(id))
                .map(|part| Self {
                    message: self.message,
                    part,
                })
                .collect(),
            PartType::Message(inner) => Self::root(inner).into_iter().collect(),
            _ => Vec::new(),
        }
    }
}

/// Decode a payload using the declared charset, falling back to lossy UTF-8.
///
/// Undecodable bytes become U+FFFD rather than failing.
pub fn decode_payload(bytes: &[u8], charset: Option<&str>) -> String {
    if let Some(encoding) =
        charset.and_then(|label| encoding_rs::Encoding::for_label(label.trim().as_bytes()))
    {
        let (decoded, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            debug!(charset = encoding.name(), "Replaced undecodable bytes in payload");
        }
        return decoded.into_owned();
    }
    String::from_utf8_lossy(bytes).into_owned()
}

/// Skip a leading BOM and an MBOX `From ` separator line, if present.
fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    };

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}
