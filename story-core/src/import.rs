//! JSON import and export of story graphs.
//!
//! The interchange format is a JSON object keyed by decimal page ids:
//!
//! ```json
//! {
//!   "1": {
//!     "text": "You wake up in a dark forest...",
//!     "background": "",
//!     "choices": [
//!       {"text": "Go left", "next": 2},
//!       {"text": "Go right", "next": 3}
//!     ]
//!   }
//! }
//! ```
//!
//! Imported text is untrusted, so it is checked field by field instead of
//! being deserialized straight into a [`StoryGraph`]. Pages are checked in
//! ascending id order and the first problem found is reported.

use crate::graph::{Choice, Page, PageId, StoryGraph};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a piece of story JSON was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("Invalid JSON format: {0}")]
    NotJson(String),

    #[error("Invalid JSON: must be an object")]
    NotAnObject,

    #[error("Invalid page id {0:?}: page ids must be positive integers")]
    InvalidPageId(String),

    #[error("Duplicate page id {0}")]
    DuplicatePageId(PageId),

    #[error("Invalid page {0}: missing or invalid text")]
    InvalidText(PageId),

    #[error("Invalid page {0}: choices must be an array")]
    ChoicesNotArray(PageId),

    #[error("Invalid choice {index} in page {page}: {reason}")]
    InvalidChoice {
        page: PageId,
        index: usize,
        reason: &'static str,
    },

    #[error("Invalid page {0}: background must be a string")]
    InvalidBackground(PageId),
}

impl ImportError {
    /// The page the error refers to, when there is one.
    pub fn page(&self) -> Option<PageId> {
        match self {
            ImportError::NotJson(_) | ImportError::NotAnObject | ImportError::InvalidPageId(_) => {
                None
            }
            ImportError::DuplicatePageId(page)
            | ImportError::InvalidText(page)
            | ImportError::ChoicesNotArray(page)
            | ImportError::InvalidBackground(page) => Some(*page),
            ImportError::InvalidChoice { page, .. } => Some(*page),
        }
    }
}

/// Parse and validate story JSON text.
pub fn parse_story(input: &str) -> Result<StoryGraph, ImportError> {
    let value: Value =
        serde_json::from_str(input).map_err(|e| ImportError::NotJson(e.to_string()))?;
    story_from_value(&value)
}

/// Validate an already-parsed JSON value as a story graph.
pub fn story_from_value(value: &Value) -> Result<StoryGraph, ImportError> {
    let object = value.as_object().ok_or(ImportError::NotAnObject)?;
    let entries = page_entries(object)?;

    let mut graph = StoryGraph::new();
    for (id, raw) in entries {
        graph.insert(id, page_from_value(id, raw)?);
    }
    Ok(graph)
}

/// Render a graph in the interchange format, pretty-printed.
pub fn export_story(graph: &StoryGraph) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(graph)
}

/// Resolve keys to page ids and order the entries by id.
fn page_entries(object: &Map<String, Value>) -> Result<Vec<(PageId, &Value)>, ImportError> {
    let mut entries = Vec::with_capacity(object.len());
    for (key, raw) in object {
        let id: PageId = key
            .trim()
            .parse()
            .map_err(|_| ImportError::InvalidPageId(key.clone()))?;
        entries.push((id, raw));
    }
    entries.sort_by_key(|(id, _)| *id);

    if let Some(pair) = entries.windows(2).find(|pair| pair[0].0 == pair[1].0) {
        return Err(ImportError::DuplicatePageId(pair[0].0));
    }
    Ok(entries)
}

fn page_from_value(id: PageId, raw: &Value) -> Result<Page, ImportError> {
    let text = raw
        .get("text")
        .and_then(Value::as_str)
        .ok_or(ImportError::InvalidText(id))?;

    let raw_choices = raw
        .get("choices")
        .and_then(Value::as_array)
        .ok_or(ImportError::ChoicesNotArray(id))?;

    let choices = raw_choices
        .iter()
        .enumerate()
        .map(|(index, choice)| choice_from_value(id, index, choice))
        .collect::<Result<Vec<_>, _>>()?;

    let background = match raw.get("background") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(ImportError::InvalidBackground(id)),
    };

    Ok(Page {
        text: text.to_string(),
        background,
        choices,
    })
}

fn choice_from_value(page: PageId, index: usize, raw: &Value) -> Result<Choice, ImportError> {
    let invalid = |reason| ImportError::InvalidChoice {
        page,
        index,
        reason,
    };

    let text = match raw.get("text").and_then(Value::as_str) {
        Some(text) if !text.is_empty() => text,
        _ => return Err(invalid("text required and next must be a number")),
    };

    let next = raw
        .get("next")
        .filter(|n| n.is_number())
        .ok_or_else(|| invalid("text required and next must be a number"))?;

    let next = next
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .and_then(PageId::new)
        .ok_or_else(|| invalid("next must be a positive whole page number"))?;

    Ok(Choice::new(text, next))
}
