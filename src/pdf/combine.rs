//! Catalog merging
//!
//! The catalog is an ordered list of remote PDFs. A request supplies one
//! flag per catalog entry; selected entries are fetched one after another and
//! all of their pages are appended in catalog order. Selection filters the
//! catalog, it never reorders it.

use std::sync::Arc;

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde_json::Value;
use thiserror::Error;

use super::layout::save_to_vec;
use super::{PdfError, SkippedItem};
use crate::fetch::Fetcher;

/// Page attributes a page may inherit from its page tree ancestors
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Ordered list of remote PDF URLs
#[derive(Debug, Clone)]
pub struct PdfCatalog {
    urls: Vec<String>,
}

impl PdfCatalog {
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Selected entries with their catalog positions, in catalog order
    pub fn selected<'a>(&'a self, selection: &'a Selection) -> impl Iterator<Item = (usize, &'a str)> + 'a {
        self.urls
            .iter()
            .enumerate()
            .zip(selection.flags.iter())
            .filter(|(_, selected)| **selected)
            .map(|((index, url), _)| (index, url.as_str()))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("Invalid input: checkboxStates should be an array of length {expected}")]
    InvalidShape { expected: usize },
}

/// Per-entry selection flags, already checked against the catalog length
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    flags: Vec<bool>,
}

impl Selection {
    /// Accepts a JSON array with exactly one flag per catalog entry. `1` and
    /// `true` select an entry; every other value leaves it out.
    pub fn parse(states: Option<&Value>, catalog: &PdfCatalog) -> Result<Self, SelectionError> {
        let invalid = || SelectionError::InvalidShape {
            expected: catalog.len(),
        };

        let states = states.and_then(Value::as_array).ok_or_else(invalid)?;
        if states.len() != catalog.len() {
            return Err(invalid());
        }

        let flags = states
            .iter()
            .map(|state| match state {
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64() == Some(1.0),
                _ => false,
            })
            .collect();

        Ok(Self { flags })
    }

    pub fn count(&self) -> usize {
        self.flags.iter().filter(|f| **f).count()
    }
}

/// Merged document plus the selected entries that contributed nothing
#[derive(Debug)]
pub struct CombineOutcome {
    pub bytes: Vec<u8>,
    /// Catalog positions whose pages made it into the output
    pub included: Vec<usize>,
    pub page_count: usize,
    pub skipped: Vec<SkippedItem>,
}

pub struct PdfCombiner {
    fetcher: Arc<dyn Fetcher>,
    catalog: PdfCatalog,
}

impl PdfCombiner {
    pub fn new(fetcher: Arc<dyn Fetcher>, catalog: PdfCatalog) -> Self {
        Self { fetcher, catalog }
    }

    pub fn catalog(&self) -> &PdfCatalog {
        &self.catalog
    }

    pub async fn combine(&self, selection: &Selection) -> Result<CombineOutcome, PdfError> {
        let mut downloads = Vec::with_capacity(selection.count());
        let mut skipped = Vec::new();

        // One fetch at a time, in catalog order
        for (index, url) in self.catalog.selected(selection) {
            match self.fetcher.fetch(url).await {
                Ok(bytes) => downloads.push((index, url.to_string(), bytes)),
                Err(e) => skipped.push(SkippedItem::new(index, url, e)),
            }
        }

        tokio::task::spawn_blocking(move || {
            let mut included = Vec::with_capacity(downloads.len());
            let mut documents = Vec::with_capacity(downloads.len());

            for (index, url, bytes) in downloads {
                match Document::load_mem(&bytes) {
                    Ok(doc) => {
                        included.push(index);
                        documents.push(doc);
                    }
                    Err(e) => skipped.push(SkippedItem::new(index, url, e)),
                }
            }
            skipped.sort_by_key(|item| item.index);

            let mut merged = merge_documents(documents)?;
            let page_count = merged.get_pages().len();
            let bytes = save_to_vec(&mut merged)?;

            Ok(CombineOutcome {
                bytes,
                included,
                page_count,
                skipped,
            })
        })
        .await?
    }
}

/// Concatenate every page of `documents`, in order, into one document.
/// An empty input yields a valid document with zero pages.
pub fn merge_documents(documents: Vec<Document>) -> Result<Document, PdfError> {
    let mut output = Document::with_version("1.5");
    let mut next_id: u32 = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();

    for mut doc in documents {
        if doc.version > output.version {
            output.version = doc.version.clone();
        }

        doc.renumber_objects_with(next_id);
        next_id = doc.max_id + 1;

        for page_id in doc.get_pages().into_values() {
            pages.push((page_id, flatten_page(&doc, page_id)?));
        }

        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or("") {
                "Catalog" | "Pages" | "Page" | "Outlines" | "Outline" => {}
                _ => {
                    output.objects.insert(object_id, object);
                }
            }
        }
    }

    output.max_id = next_id - 1;
    let pages_id = output.new_object_id();

    let mut kids = Vec::with_capacity(pages.len());
    for (page_id, mut page) in pages {
        page.set("Parent", Object::Reference(pages_id));
        output.objects.insert(page_id, Object::Dictionary(page));
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    output.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ])),
    );

    let catalog_id = output.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    output.trailer.set("Root", Object::Reference(catalog_id));

    Ok(output)
}

/// Page dictionary with inherited attributes copied down from its ancestors
fn flatten_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary, PdfError> {
    let mut page = doc.get_dictionary(page_id)?.clone();
    let mut parent = page.get(b"Parent").and_then(|p| p.as_reference()).ok();
    let mut depth = 0;

    while let Some(parent_id) = parent {
        // Malformed trees can loop
        depth += 1;
        if depth > 64 {
            break;
        }
        let Ok(node) = doc.get_dictionary(parent_id) else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }

    Ok(page)
}
