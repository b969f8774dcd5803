//! PDF rendering of store reports

use super::logo::{LogoFetcher, LogoImage};
use super::ReportData;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use tracing::warn;

/// Turns assembled report data into a downloadable document
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    /// MIME type of the rendered bytes
    fn content_type(&self) -> &'static str;

    async fn render(&self, data: &ReportData) -> Result<Vec<u8>>;
}

/// Renders a single A4 page with the built-in Helvetica fonts
#[derive(Clone, Default)]
pub struct PdfRenderer {
    logos: Option<LogoFetcher>,
}

impl PdfRenderer {
    pub fn new(logos: LogoFetcher) -> Self {
        Self { logos: Some(logos) }
    }

    /// A renderer that never downloads logos
    pub fn without_logos() -> Self {
        Self { logos: None }
    }
}

#[async_trait]
impl ReportRenderer for PdfRenderer {
    fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    async fn render(&self, data: &ReportData) -> Result<Vec<u8>> {
        let logo = match (&self.logos, data.store.logo.as_deref()) {
            (Some(fetcher), Some(url)) => fetcher.fetch(url).await,
            _ => None,
        };
        build_pdf(data, logo.as_ref(), Utc::now().date_naive())
    }
}

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const LOGO_BOX: i64 = 80;
const ROW_HEIGHT: i64 = 16;

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

/// Page content builder working top-down in PDF points
struct Page {
    ops: Vec<Operation>,
    y: i64,
}

impl Page {
    fn new() -> Self {
        Self {
            ops: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn text(&mut self, font: &str, size: i64, x: i64, text: &str) {
        self.ops.push(Operation::new("BT", vec![]));
        self.ops
            .push(Operation::new("Tf", vec![font.into(), size.into()]));
        self.ops
            .push(Operation::new("Td", vec![x.into(), self.y.into()]));
        self.ops
            .push(Operation::new("Tj", vec![latin1(text)]));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn rule(&mut self) {
        let y = self.y - 4;
        self.ops.push(Operation::new("w", vec![1.into()]));
        self.ops.push(Operation::new("m", vec![MARGIN.into(), y.into()]));
        self.ops
            .push(Operation::new("l", vec![(PAGE_WIDTH - MARGIN).into(), y.into()]));
        self.ops.push(Operation::new("S", vec![]));
    }

    fn image(&mut self, name: &str, x: i64, y: i64, width: i64, height: i64) {
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new(
            "cm",
            vec![
                width.into(),
                0.into(),
                0.into(),
                height.into(),
                x.into(),
                y.into(),
            ],
        ));
        self.ops.push(Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]));
        self.ops.push(Operation::new("Q", vec![]));
    }

    fn down(&mut self, points: i64) {
        self.y -= points;
    }

    /// Whether `points` more can be laid out above the bottom margin
    fn has_room(&self, points: i64) -> bool {
        self.y - points >= MARGIN
    }
}

/// Encode text for a WinAnsi font; characters outside Latin-1 become `?`
fn latin1(text: &str) -> Object {
    let bytes = text
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect();
    Object::String(bytes, StringFormat::Literal)
}

fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

/// Fit a logo inside the logo box, keeping its aspect ratio
fn logo_size(logo: &LogoImage) -> (i64, i64) {
    let (w, h) = (i64::from(logo.width.max(1)), i64::from(logo.height.max(1)));
    if w >= h {
        (LOGO_BOX, (LOGO_BOX * h / w).max(1))
    } else {
        ((LOGO_BOX * w / h).max(1), LOGO_BOX)
    }
}

/// Height of the author table above its first row
const AUTHOR_HEADING: i64 = 30 + 22 + ROW_HEIGHT + 2;

fn authors_table(page: &mut Page, data: &ReportData) {
    page.down(30);
    page.text(BOLD, 14, MARGIN, "Most prolific authors");
    page.down(22);
    page.text(BOLD, 10, MARGIN, "Author");
    page.text(BOLD, 10, 430, "Books in stock");
    page.rule();
    page.down(ROW_HEIGHT + 2);
    if data.prolific_authors.is_empty() {
        page.text(REGULAR, 10, MARGIN, "No authors in stock.");
    }
    for author in &data.prolific_authors {
        if !page.has_room(0) {
            warn!(rows = data.prolific_authors.len(), "Author table truncated at page end");
            break;
        }
        page.text(REGULAR, 10, MARGIN, &clip(&author.author_name, 60));
        page.text(REGULAR, 10, 430, &author.books_in_stock.to_string());
        page.down(ROW_HEIGHT);
    }
}

/// Lay out the report for `data` and serialize the document
pub fn build_pdf(data: &ReportData, logo: Option<&LogoImage>, date: NaiveDate) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut page = Page::new();
    let mut xobjects = Dictionary::new();

    if let Some(logo) = logo {
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(logo.width),
                "Height" => i64::from(logo.height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            logo.rgb.clone(),
        ));
        xobjects.set("Logo", image_id);

        let (width, height) = logo_size(logo);
        page.image(
            "Logo",
            PAGE_WIDTH - MARGIN - width,
            PAGE_HEIGHT - MARGIN - height,
            width,
            height,
        );
    }

    // Header
    page.down(20);
    page.text(BOLD, 20, MARGIN, &clip(&data.store.name, 40));
    page.down(20);
    page.text(REGULAR, 11, MARGIN, &clip(&data.store.address, 70));
    page.down(15);
    page.text(
        REGULAR,
        9,
        MARGIN,
        &format!("Generated on {}", date.format("%Y-%m-%d")),
    );
    page.down(55);

    // Priciest books
    page.text(BOLD, 14, MARGIN, "Most expensive books");
    page.down(22);
    page.text(BOLD, 10, MARGIN, "Book");
    page.text(BOLD, 10, 260, "Author");
    page.text(BOLD, 10, 430, "Price");
    page.text(BOLD, 10, 500, "Pages");
    page.rule();
    page.down(ROW_HEIGHT + 2);
    if data.priciest_books.is_empty() {
        page.text(REGULAR, 10, MARGIN, "No books in stock.");
        page.down(ROW_HEIGHT);
    }
    // Leave the author table its share of what is left of the page
    let author_section = AUTHOR_HEADING + ROW_HEIGHT * data.prolific_authors.len().max(1) as i64;
    let reserve = author_section.min((page.y - MARGIN) / 2);
    for book in &data.priciest_books {
        if !page.has_room(reserve) {
            warn!(rows = data.priciest_books.len(), "Book table truncated at page end");
            break;
        }
        page.text(REGULAR, 10, MARGIN, &clip(&book.book_name, 36));
        page.text(REGULAR, 10, 260, &clip(&book.author_name, 28));
        page.text(REGULAR, 10, 430, &format!("{:.2}", book.price));
        page.text(REGULAR, 10, 500, &book.pages.to_string());
        page.down(ROW_HEIGHT);
    }
    authors_table(&mut page, data);

    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR => regular_id,
            BOLD => bold_id,
        },
        "XObject" => xobjects,
    });

    let content = Content { operations: page.ops };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
