//! Shared prompt types exchanged between the client and the backend.

use serde::{Deserialize, Serialize};

use crate::diff::{self, DiffSegment};

/// An original prompt and its revision, compared by the diff renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPair {
    pub original: String,
    pub revised: String,
}

impl TextPair {
    pub fn new(original: impl Into<String>, revised: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            revised: revised.into(),
        }
    }

    /// Render the pair with the default aligner.
    pub fn render(&self) -> Vec<DiffSegment> {
        diff::render(&self.original, &self.revised)
    }
}

/// A shared prompt pair as stored by the backend.
///
/// The backend's fetch and gallery bodies carry no `published` field, so it
/// defaults to `false`; gallery listings set it after decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRecord {
    #[serde(default)]
    pub id: String,
    pub original_prompt: String,
    pub improved_prompt: String,
    #[serde(default)]
    pub published: bool,
}

impl PromptRecord {
    pub fn pair(&self) -> TextPair {
        TextPair::new(self.original_prompt.clone(), self.improved_prompt.clone())
    }
}
