//! Pulls the authoritative JSON object out of a free-text completion.
//!
//! Models tend to wrap the object in explanations, `<think>` blocks or code
//! fences. Only the object that closes the response counts: it must be
//! followed by nothing but whitespace or a closing fence, and among the
//! objects ending there the outermost well-formed one is returned.

use crate::error::ParseError;

pub fn trailing_json_object(text: &str) -> Result<&str, ParseError> {
    let body = text.trim_end().trim_end_matches('`').trim_end();
    if !body.ends_with('}') {
        return Err(ParseError::NoJsonObject);
    }

    body.char_indices()
        .filter(|(_, c)| *c == '{')
        .map(|(start, _)| &body[start..])
        .find(|candidate| {
            serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(candidate).is_ok()
        })
        .ok_or(ParseError::NoJsonObject)
}
