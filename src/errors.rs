use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every failure the core can report. Nothing in the crate panics or uses an
/// unwind as a failure channel; operations either return `Result` with one of
/// these kinds or fold the error into a per-row outcome so the surrounding run
/// keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscribeError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Option not found: {0}")]
    OptionNotFound(String),

    #[error("Row creation failed: {0}")]
    RowCreationFailure(String),

    #[error("Value injection failed: {0}")]
    ValueInjectionFailure(String),

    #[error("Date parse failed: {0}")]
    DateParseFailure(String),

    #[error("Ambiguous structure: {0}")]
    StructuralAmbiguity(String),
}

impl TranscribeError {
    /// Stable machine-readable name for run summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            TranscribeError::ElementNotFound(_) => "element_not_found",
            TranscribeError::OptionNotFound(_) => "option_not_found",
            TranscribeError::RowCreationFailure(_) => "row_creation_failure",
            TranscribeError::ValueInjectionFailure(_) => "value_injection_failure",
            TranscribeError::DateParseFailure(_) => "date_parse_failure",
            TranscribeError::StructuralAmbiguity(_) => "structural_ambiguity",
        }
    }

    /// The human-readable detail carried by the error.
    pub fn detail(&self) -> &str {
        match self {
            TranscribeError::ElementNotFound(d)
            | TranscribeError::OptionNotFound(d)
            | TranscribeError::RowCreationFailure(d)
            | TranscribeError::ValueInjectionFailure(d)
            | TranscribeError::DateParseFailure(d)
            | TranscribeError::StructuralAmbiguity(d) => d,
        }
    }
}
