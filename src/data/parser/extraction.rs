//! Hand-off from the protocol extraction service
//!
//! The extraction service answers with free text that is supposed to be a JSON
//! list of row objects, but often wraps it in Markdown code fences or a sentence
//! of prose. [`parse_extraction_reply`] recovers the rows without judging their
//! content; validation happens later, per row, in the normalizer.

use crate::data::row::RawRow;
use crate::PharmBudgetError;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// A JSON list of objects, from the first `[{` to the last `}]`
static ROW_LIST: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?s)\[\s*\{.*\}\s*\]"));

/// Parse the extraction service's reply into raw rows
///
/// Accepts a bare JSON array, an array wrapped in code fences or prose, or a
/// single object (treated as a one-row batch). Inside prose, the row list is
/// the span from the first `[` that opens an object to the last `]` that
/// closes one, so bracketed citations before the list are skipped. Array
/// entries that are not objects are kept, so that they surface as row-level
/// validation errors.
///
/// # Example
///
/// ```rust
/// use pharmbudget::data::parser::parse_extraction_reply;
///
/// let reply = "Here is the table:\n```json\n[{\"Drug Name\": \"Vincristine\", \"Total Doses\": 18}]\n```";
/// let rows = parse_extraction_reply(reply).unwrap();
/// assert_eq!(rows.len(), 1);
/// ```
pub fn parse_extraction_reply(reply: &str) -> Result<Vec<RawRow>, PharmBudgetError> {
    let trimmed = reply.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return rows_from_value(value);
    }

    let unfenced = strip_code_fences(trimmed);
    tracing::warn!("Extraction reply is not bare JSON, searching for the row list");

    let row_list = ROW_LIST
        .as_ref()
        .map_err(|err| PharmBudgetError::Extraction(err.to_string()))?;
    if let Some(found) = row_list.find(&unfenced) {
        if let Ok(value) = serde_json::from_str::<Value>(found.as_str()) {
            return rows_from_value(value);
        }
    }
    match enclosed(&unfenced, '{', '}') {
        Some(slice) => rows_from_value(serde_json::from_str::<Value>(slice)?),
        None => Err(PharmBudgetError::Extraction(
            "no JSON list of rows found in reply".to_string(),
        )),
    }
}

fn rows_from_value(value: Value) -> Result<Vec<RawRow>, PharmBudgetError> {
    match value {
        Value::Array(items) => Ok(items.into_iter().map(RawRow::from_value).collect()),
        object @ Value::Object(_) => Ok(vec![RawRow::from_value(object)]),
        other => Err(PharmBudgetError::Extraction(format!(
            "expected a list of rows, got {}",
            other
        ))),
    }
}

fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
}

/// The widest slice starting at the first `open` and ending at the last `close`
fn enclosed(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}
