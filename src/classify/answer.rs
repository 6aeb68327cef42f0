//! Locating and reading the JSON object in a free-form model answer.

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Result, SiftError};
use crate::model::partition::RawAnswer;

/// Parse a model answer into a [`RawAnswer`].
///
/// The first `{` from which a complete JSON object can be read wins, so
/// commentary before or after the object is ignored. Missing or `null`
/// keys read as empty lists.
pub fn parse_answer(text: &str) -> Result<RawAnswer> {
    let object = first_object(text).ok_or_else(|| {
        SiftError::AnswerParse(format!("no JSON object in answer: {}", snippet(text)))
    })?;

    Ok(RawAnswer {
        relevant: string_list(&object, "relevant")?,
        irrelevant: string_list(&object, "irrelevant")?,
    })
}

/// The first JSON object embedded anywhere in `text`.
pub fn first_object(text: &str) -> Option<Map<String, Value>> {
    text.match_indices('{').find_map(|(start, _)| {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Object(map))) => Some(map),
            _ => None,
        }
    })
}

fn string_list(object: &Map<String, Value>, key: &str) -> Result<Vec<String>> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                other => {
                    warn!(key, value = %other, "Ignoring non-string entry in model answer");
                    None
                }
            })
            .collect()),
        Some(other) => Err(SiftError::AnswerParse(format!(
            "'{key}' is not a list: {}",
            snippet(&other.to_string())
        ))),
    }
}

/// The first 500 characters of `text`, for error messages.
fn snippet(text: &str) -> String {
    text.chars().take(500).collect()
}
