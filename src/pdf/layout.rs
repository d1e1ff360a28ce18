//! Page construction
//!
//! Pages are US Letter with the standard Helvetica font, so no font program
//! is embedded; text is encoded as WinAnsi and measured with the Helvetica
//! AFM widths.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::PdfError;

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 72.0;

const TITLE_SIZE: f32 = 22.0;
const SUBTITLE_SIZE: f32 = 14.0;
const CAPTION_SIZE: f32 = 14.0;
const CAPTION_GAP: f32 = 20.0;
const LINE_GAP: f32 = 1.2;

/// Helvetica advance widths for U+0020..=U+007E, in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];
const DEFAULT_WIDTH: u16 = 556;

/// Decoded raster ready to become an image XObject
pub struct PageImage {
    pub width: u32,
    pub height: u32,
    rgb: Vec<u8>,
    /// One byte per pixel, present only when the source had transparency
    alpha: Option<Vec<u8>>,
}

impl PageImage {
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let decoded = image::load_from_memory(bytes)?;
        let (width, height) = (decoded.width(), decoded.height());

        if !decoded.color().has_alpha() {
            return Ok(Self {
                width,
                height,
                rgb: decoded.into_rgb8().into_raw(),
                alpha: None,
            });
        }

        let rgba = decoded.into_rgba8().into_raw();
        let pixels = rgba.len() / 4;
        let mut rgb = Vec::with_capacity(pixels * 3);
        let mut alpha = Vec::with_capacity(pixels);
        for px in rgba.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
            alpha.push(px[3]);
        }

        Ok(Self {
            width,
            height,
            rgb,
            alpha: Some(alpha),
        })
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }
}

/// Axis-aligned rectangle in PDF user space (origin bottom-left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Half-page box centered on the page
    pub fn image_box() -> Self {
        let width = PAGE_WIDTH / 2.0;
        let height = PAGE_HEIGHT / 2.0;
        Rect {
            x: (PAGE_WIDTH - width) / 2.0,
            y: (PAGE_HEIGHT - height) / 2.0,
            width,
            height,
        }
    }

    /// Largest rectangle with the given aspect ratio that fits, centered
    pub fn fit(&self, content_width: u32, content_height: u32) -> Rect {
        let (cw, ch) = (content_width.max(1) as f32, content_height.max(1) as f32);
        let scale = (self.width / cw).min(self.height / ch);
        let (width, height) = (cw * scale, ch * scale);
        Rect {
            x: self.x + (self.width - width) / 2.0,
            y: self.y + (self.height - height) / 2.0,
            width,
            height,
        }
    }
}

/// Width of `text` set in Helvetica at `size` points
pub fn text_width(text: &str, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| {
            let code = c as u32;
            if (0x20..=0x7E).contains(&code) {
                HELVETICA_WIDTHS[(code - 0x20) as usize] as u32
            } else {
                DEFAULT_WIDTH as u32
            }
        })
        .sum();
    units as f32 * size / 1000.0
}

/// WinAnsi bytes for `text`; characters outside Latin-1 become '?'
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            code @ 0x20..=0x7E | code @ 0xA0..=0xFF => code as u8,
            _ => b'?',
        })
        .collect()
}

/// Greedy word wrap so that every line fits in `max_width`. Words wider
/// than a whole line are broken between characters.
pub fn wrap_lines(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if text_width(&candidate, size) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        for c in word.chars() {
            current.push(c);
            if text_width(&current, size) > max_width && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(c);
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Wrapped, centered text starting at `baseline` and flowing downwards.
/// Returns the operations and the baseline of the line after the last one.
fn centered_text(text: &str, size: f32, baseline: f32) -> (Vec<Operation>, f32) {
    let mut operations = Vec::new();
    let mut baseline = baseline;

    for line in wrap_lines(text, size, PAGE_WIDTH - 2.0 * MARGIN) {
        let x = (PAGE_WIDTH - text_width(&line, size)) / 2.0;
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), size.into()]),
            Operation::new("Td", vec![x.into(), baseline.into()]),
            Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(&line))]),
            Operation::new("ET", vec![]),
        ]);
        baseline -= size * LINE_GAP;
    }

    (operations, baseline)
}

/// Incrementally built single-section document
pub struct DocumentBuilder {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    kids: Vec<Object>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ]));

        Self {
            doc,
            pages_id,
            font_id,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Title and subtitle centered near the top of a fresh page
    pub fn add_title_page(&mut self, title: &str, subtitle: &str) -> Result<(), PdfError> {
        let (mut operations, next_baseline) =
            centered_text(title, TITLE_SIZE, PAGE_HEIGHT - MARGIN - TITLE_SIZE);
        let (subtitle_ops, _) = centered_text(subtitle, SUBTITLE_SIZE, next_baseline);
        operations.extend(subtitle_ops);

        self.push_page(operations, None)
    }

    /// Image fitted into the centered half-page box, caption below it
    pub fn add_image_page(&mut self, image: PageImage, caption: Option<&str>) -> Result<(), PdfError> {
        let frame = Rect::image_box();
        let placed = frame.fit(image.width, image.height);

        let mut dict = image_dict(image.width, image.height, "DeviceRGB");
        if let Some(alpha) = image.alpha {
            let mask_id = self.doc.add_object(Stream::new(
                image_dict(image.width, image.height, "DeviceGray"),
                alpha,
            ));
            dict.set("SMask", Object::Reference(mask_id));
        }
        let image_id = self.doc.add_object(Stream::new(dict, image.rgb));

        let mut operations = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    placed.width.into(),
                    0.into(),
                    0.into(),
                    placed.height.into(),
                    placed.x.into(),
                    placed.y.into(),
                ],
            ),
            Operation::new("Do", vec!["Im1".into()]),
            Operation::new("Q", vec![]),
        ];

        if let Some(caption) = caption.filter(|c| !c.is_empty()) {
            let baseline = frame.y - CAPTION_GAP - CAPTION_SIZE;
            operations.extend(centered_text(caption, CAPTION_SIZE, baseline).0);
        }

        let xobjects = Dictionary::from_iter([("Im1", Object::Reference(image_id))]);
        self.push_page(operations, Some(xobjects))
    }

    fn push_page(
        &mut self,
        operations: Vec<Operation>,
        xobjects: Option<Dictionary>,
    ) -> Result<(), PdfError> {
        let content = Content { operations }.encode()?;
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), content));

        let mut resources = Dictionary::from_iter([(
            "Font",
            Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(self.font_id))])),
        )]);
        if let Some(xobjects) = xobjects {
            resources.set("XObject", Object::Dictionary(xobjects));
        }

        let page_id = self.doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(self.pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Dictionary(resources)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()]),
            ),
        ]));
        self.kids.push(Object::Reference(page_id));
        Ok(())
    }

    /// Close the page tree and serialize
    pub fn finish(mut self) -> Result<Vec<u8>, PdfError> {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(self.kids)),
                ("Count", Object::Integer(count)),
            ])),
        );

        let catalog_id = self.doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc.compress();

        save_to_vec(&mut self.doc)
    }
}

fn image_dict(width: u32, height: u32, color_space: &str) -> Dictionary {
    Dictionary::from_iter([
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(i64::from(width))),
        ("Height", Object::Integer(i64::from(height))),
        ("ColorSpace", Object::Name(color_space.as_bytes().to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
    ])
}

pub fn save_to_vec(doc: &mut Document) -> Result<Vec<u8>, PdfError> {
    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| PdfError::Serialize(e.to_string()))?;
    Ok(output)
}
