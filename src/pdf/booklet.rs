//! Photo booklet generation
//!
//! A title page followed by one page per destination image. Images are
//! downloaded concurrently (bounded), but results are kept in request order,
//! so page order never depends on which download finishes first.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::Value;

use super::layout::{DocumentBuilder, PageImage};
use super::{PdfError, SkippedItem};
use crate::config::BookletConfig;
use crate::fetch::Fetcher;

/// One booklet page request
#[derive(Debug, Clone, Deserialize)]
pub struct Destination {
    pub img: ImageRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageRef {
    pub src: String,
    #[serde(default)]
    pub alt: Option<String>,
}

/// Generated booklet plus the destinations that did not make it in
#[derive(Debug)]
pub struct BookletOutcome {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub skipped: Vec<SkippedItem>,
}

/// Destination whose image bytes were downloaded
struct FetchedImage {
    index: usize,
    src: String,
    alt: Option<String>,
    bytes: Vec<u8>,
}

pub struct BookletGenerator {
    fetcher: Arc<dyn Fetcher>,
    title: String,
    subtitle: String,
    concurrency: usize,
}

impl BookletGenerator {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &BookletConfig, concurrency: usize) -> Self {
        Self {
            fetcher,
            title: config.title.clone(),
            subtitle: config.subtitle.clone(),
            concurrency: concurrency.max(1),
        }
    }

    /// Build the booklet. Entries are raw JSON so that one malformed entry
    /// is skipped like a failed download instead of rejecting the request.
    pub async fn generate(&self, destinations: Vec<Value>) -> Result<BookletOutcome, PdfError> {
        tracing::debug!(
            "Generating booklet with {} destinations (fan-out {})",
            destinations.len(),
            self.concurrency
        );

        let fetched: Vec<Result<FetchedImage, SkippedItem>> = stream::iter(destinations.into_iter().enumerate())
            .map(|(index, raw)| self.fetch_destination(index, raw))
            .buffered(self.concurrency)
            .collect()
            .await;

        let title = self.title.clone();
        let subtitle = self.subtitle.clone();

        tokio::task::spawn_blocking(move || render(&title, &subtitle, fetched)).await?
    }

    async fn fetch_destination(&self, index: usize, raw: Value) -> Result<FetchedImage, SkippedItem> {
        let destination: Destination = serde_json::from_value(raw)
            .map_err(|e| SkippedItem::new(index, "<invalid destination>", e))?;
        let ImageRef { src, alt } = destination.img;

        match self.fetcher.fetch(&src).await {
            Ok(bytes) => Ok(FetchedImage { index, src, alt, bytes }),
            Err(e) => Err(SkippedItem::new(index, src, e)),
        }
    }
}

fn render(
    title: &str,
    subtitle: &str,
    fetched: Vec<Result<FetchedImage, SkippedItem>>,
) -> Result<BookletOutcome, PdfError> {
    let mut builder = DocumentBuilder::new();
    let mut skipped = Vec::new();

    builder.add_title_page(title, subtitle)?;

    for entry in fetched {
        let image = match entry {
            Ok(image) => image,
            Err(item) => {
                skipped.push(item);
                continue;
            }
        };

        let decoded = match PageImage::decode(&image.bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                skipped.push(SkippedItem::new(image.index, image.src, e));
                continue;
            }
        };

        if let Err(e) = builder.add_image_page(decoded, image.alt.as_deref()) {
            skipped.push(SkippedItem::new(image.index, image.src, e));
        }
    }

    let page_count = builder.page_count();
    let bytes = builder.finish()?;

    Ok(BookletOutcome {
        bytes,
        page_count,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;
    use crate::pdf::fixtures::{page_texts, sample_png, sample_rgba_png};
    use lopdf::{Document, ObjectId};
    use serde_json::json;

    fn generator(fetcher: StaticFetcher) -> BookletGenerator {
        BookletGenerator::new(Arc::new(fetcher), &BookletConfig::default(), 2)
    }

    #[tokio::test]
    async fn test_empty_booklet_has_only_title_page() {
        let outcome = generator(StaticFetcher::default()).generate(vec![]).await.unwrap();

        assert_eq!(outcome.page_count, 1);
        assert!(outcome.skipped.is_empty());
        let texts = page_texts(&outcome.bytes);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("Bucket List Adventure"));
    }

    #[tokio::test]
    async fn test_pages_follow_request_order_with_captions() {
        let fetcher = StaticFetcher::default()
            .with("http://img/paris.png", sample_png(8, 4))
            .with("http://img/rome.png", sample_png(4, 8))
            .with("http://img/oslo.png", sample_png(5, 5));

        let destinations = vec![
            json!({"img": {"src": "http://img/paris.png", "alt": "Paris"}}),
            json!({"img": {"src": "http://img/rome.png", "alt": "Rome"}}),
            json!({"img": {"src": "http://img/oslo.png"}}),
        ];

        let outcome = generator(fetcher).generate(destinations).await.unwrap();

        assert_eq!(outcome.page_count, 4);
        let texts = page_texts(&outcome.bytes);
        assert_eq!(texts.len(), 4);
        assert!(texts[1].contains("(Paris)"));
        assert!(texts[2].contains("(Rome)"));
        assert!(texts[3].contains("/Im1 Do"));
        assert!(!texts[3].contains("Tj"));
    }

    #[tokio::test]
    async fn test_failed_image_is_skipped_not_fatal() {
        let fetcher = StaticFetcher::default()
            .with("http://img/a.png", sample_png(4, 4))
            .with("http://img/c.png", sample_png(4, 4));

        let destinations = vec![
            json!({"img": {"src": "http://img/a.png", "alt": "A"}}),
            json!({"img": {"src": "http://img/missing.png", "alt": "B"}}),
            json!({"img": {"src": "http://img/c.png", "alt": "C"}}),
        ];

        let outcome = generator(fetcher).generate(destinations).await.unwrap();

        assert_eq!(outcome.page_count, 3);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].index, 1);
        assert_eq!(outcome.skipped[0].source, "http://img/missing.png");

        let texts = page_texts(&outcome.bytes);
        assert!(texts[1].contains("(A)"));
        assert!(texts[2].contains("(C)"));
    }

    #[tokio::test]
    async fn test_undecodable_and_malformed_entries_are_skipped() {
        let fetcher = StaticFetcher::default()
            .with("http://img/garbage.png", b"not an image".to_vec())
            .with("http://img/ok.png", sample_png(2, 2));

        let destinations = vec![
            json!({"img": {"src": "http://img/garbage.png"}}),
            json!({"picture": "http://img/ok.png"}),
            json!({"img": {"src": "http://img/ok.png"}}),
        ];

        let outcome = generator(fetcher).generate(destinations).await.unwrap();

        assert_eq!(outcome.page_count, 2);
        let skipped: Vec<usize> = outcome.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped.len(), 2);
        assert!(skipped.contains(&0));
        assert!(skipped.contains(&1));
    }

    /// Image XObject `Im1` drawn on the given page
    fn page_image(doc: &Document, page_id: ObjectId) -> lopdf::Dictionary {
        let image_id = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Resources")
            .and_then(|r| r.as_dict())
            .and_then(|r| r.get(b"XObject"))
            .and_then(|x| x.as_dict())
            .and_then(|x| x.get(b"Im1"))
            .and_then(|i| i.as_reference())
            .unwrap();
        doc.get_object(image_id).unwrap().as_stream().unwrap().dict.clone()
    }

    #[tokio::test]
    async fn test_transparent_image_gets_soft_mask() {
        let fetcher = StaticFetcher::default()
            .with("http://img/clear.png", sample_rgba_png(4, 4, 0))
            .with("http://img/solid.png", sample_png(4, 4));

        let destinations = vec![
            json!({"img": {"src": "http://img/clear.png"}}),
            json!({"img": {"src": "http://img/solid.png"}}),
        ];
        let outcome = generator(fetcher).generate(destinations).await.unwrap();

        let doc = Document::load_mem(&outcome.bytes).unwrap();
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        assert_eq!(pages.len(), 3);

        let clear = page_image(&doc, pages[1]);
        let mask_id = clear.get(b"SMask").and_then(|m| m.as_reference()).unwrap();
        let mask = &doc.get_object(mask_id).unwrap().as_stream().unwrap().dict;
        assert_eq!(mask.get(b"ColorSpace").and_then(|c| c.as_name()).unwrap(), b"DeviceGray");
        assert_eq!(mask.get(b"Width").and_then(|w| w.as_i64()).unwrap(), 4);

        let solid = page_image(&doc, pages[2]);
        assert!(!solid.has(b"SMask"));
    }
}
