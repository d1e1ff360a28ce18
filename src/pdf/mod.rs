//! PDF assembly
//!
//! - `booklet`: photo booklet built from remote images
//! - `combine`: catalog selection and page-order-preserving merge
//! - `layout`: low-level page construction with lopdf

mod booklet;
mod combine;
mod layout;

#[cfg(test)]
pub(crate) mod fixtures;

pub use booklet::{BookletGenerator, BookletOutcome, Destination, ImageRef};
pub use combine::{merge_documents, CombineOutcome, PdfCatalog, PdfCombiner, Selection, SelectionError};

use serde::Serialize;
use thiserror::Error;

/// Errors that abort building a whole document
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Malformed PDF structure: {0}")]
    Malformed(#[from] lopdf::Error),

    #[error("Failed to serialize PDF: {0}")]
    Serialize(String),

    #[error("PDF worker task failed: {0}")]
    Task(String),
}

/// One input that was left out of a document, with the reason
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SkippedItem {
    pub index: usize,
    pub source: String,
    pub reason: String,
}

impl SkippedItem {
    pub fn new(index: usize, source: impl Into<String>, reason: impl ToString) -> Self {
        let item = Self {
            index,
            source: source.into(),
            reason: reason.to_string(),
        };
        tracing::warn!(
            index = item.index,
            source = %item.source,
            "Skipping item: {}",
            item.reason
        );
        item
    }
}

impl From<tokio::task::JoinError> for PdfError {
    fn from(err: tokio::task::JoinError) -> Self {
        PdfError::Task(err.to_string())
    }
}
