use serde::{Deserialize, Serialize};

/// A model answer grounded against a document store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<Source>,
}

impl Answer {
    /// True when the model produced neither text nor evidence.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.sources.is_empty()
    }
}

/// One piece of evidence attached to an answer.
///
/// File and citation sources are reduced to a display label and are
/// deduplicated by that label. Grounding records are positional: each ties a
/// span of the answer to retrieved material, so they are carried verbatim and
/// never deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Source {
    /// A file the model referenced: display name, URI, or id.
    File(String),
    /// A citation: URI or title.
    Citation(String),
    GroundingChunk(serde_json::Value),
    GroundingSupport(serde_json::Value),
}

impl Source {
    /// The string form of label-style sources. Grounding records have none.
    pub fn label(&self) -> Option<&str> {
        match self {
            Source::File(label) | Source::Citation(label) => Some(label),
            Source::GroundingChunk(_) | Source::GroundingSupport(_) => None,
        }
    }

    /// The structured payload of a grounding record.
    pub fn grounding(&self) -> Option<&serde_json::Value> {
        match self {
            Source::GroundingChunk(value) | Source::GroundingSupport(value) => Some(value),
            Source::File(_) | Source::Citation(_) => None,
        }
    }
}
