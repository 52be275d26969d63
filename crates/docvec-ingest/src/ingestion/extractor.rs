//! Format-specific text extractors and the registry that dispatches to them

use async_trait::async_trait;
use calamine::Reader;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{ExtractedSegment, FileType};

/// Turns the bytes of one file format into ordered text segments
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extractor name for logging
    fn name(&self) -> &str;

    /// The format this extractor handles
    fn file_type(&self) -> FileType;

    /// Extract segments in document order
    async fn extract(&self, path: &Path) -> Result<Vec<ExtractedSegment>>;
}

type ParseFn = fn(&[u8]) -> std::result::Result<Vec<ExtractedSegment>, String>;

/// Read the file asynchronously, then parse it on the blocking pool
async fn read_and_parse(path: &Path, parse: ParseFn) -> Result<Vec<ExtractedSegment>> {
    let display = path.display().to_string();
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| Error::extraction(&display, format!("failed to read file: {}", e)))?;

    // Parser crates may panic on malformed input. The release profile keeps
    // unwinding so the panic comes back here as a join error.
    let parsed = tokio::task::spawn_blocking(move || parse(&data))
        .await
        .map_err(|e| Error::extraction(&display, format!("parser aborted: {}", e)))?;

    parsed.map_err(|message| Error::extraction(display, message))
}

/// Plain text, strict UTF-8
pub struct TxtExtractor;

/// CSV, one segment per record
pub struct CsvExtractor;

/// Excel workbook, one segment per sheet
pub struct XlsxExtractor;

/// PDF, one segment per page
pub struct PdfExtractor;

/// Word document, one segment per paragraph
pub struct DocxExtractor;

#[async_trait]
impl Extractor for TxtExtractor {
    fn name(&self) -> &str {
        "txt"
    }

    fn file_type(&self) -> FileType {
        FileType::Txt
    }

    async fn extract(&self, path: &Path) -> Result<Vec<ExtractedSegment>> {
        read_and_parse(path, parse_txt).await
    }
}

#[async_trait]
impl Extractor for CsvExtractor {
    fn name(&self) -> &str {
        "csv"
    }

    fn file_type(&self) -> FileType {
        FileType::Csv
    }

    async fn extract(&self, path: &Path) -> Result<Vec<ExtractedSegment>> {
        read_and_parse(path, parse_csv).await
    }
}

#[async_trait]
impl Extractor for XlsxExtractor {
    fn name(&self) -> &str {
        "xlsx"
    }

    fn file_type(&self) -> FileType {
        FileType::Xlsx
    }

    async fn extract(&self, path: &Path) -> Result<Vec<ExtractedSegment>> {
        read_and_parse(path, parse_xlsx).await
    }
}

#[async_trait]
impl Extractor for PdfExtractor {
    fn name(&self) -> &str {
        "pdf"
    }

    fn file_type(&self) -> FileType {
        FileType::Pdf
    }

    async fn extract(&self, path: &Path) -> Result<Vec<ExtractedSegment>> {
        read_and_parse(path, parse_pdf).await
    }
}

#[async_trait]
impl Extractor for DocxExtractor {
    fn name(&self) -> &str {
        "docx"
    }

    fn file_type(&self) -> FileType {
        FileType::Docx
    }

    async fn extract(&self, path: &Path) -> Result<Vec<ExtractedSegment>> {
        read_and_parse(path, parse_docx).await
    }
}

fn parse_txt(data: &[u8]) -> std::result::Result<Vec<ExtractedSegment>, String> {
    let text = std::str::from_utf8(data)
        .map_err(|e| format!("file is not valid UTF-8: {}", e))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    Ok(vec![ExtractedSegment::text(text)])
}

fn parse_csv(data: &[u8]) -> std::result::Result<Vec<ExtractedSegment>, String> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);
    let headers = reader
        .headers()
        .map_err(|e| format!("invalid CSV header: {}", e))?
        .clone();

    let mut segments = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| format!("invalid CSV record {}: {}", i + 1, e))?;
        let mut content = String::new();
        for (j, value) in record.iter().enumerate() {
            let key = headers.get(j).unwrap_or("");
            content.push_str(key.trim());
            content.push_str(": ");
            content.push_str(value.trim());
            content.push('\n');
        }
        if !content.is_empty() {
            segments.push(ExtractedSegment::row(content, i as u64 + 1));
        }
    }
    Ok(segments)
}

fn cell_text(cell: &calamine::Data) -> String {
    match cell {
        calamine::Data::Empty => String::new(),
        calamine::Data::String(s) => s.trim().to_string(),
        calamine::Data::Float(f) => f.to_string(),
        calamine::Data::Int(i) => i.to_string(),
        calamine::Data::Bool(b) => b.to_string(),
        calamine::Data::DateTime(dt) => dt.as_f64().to_string(),
        calamine::Data::DateTimeIso(s) | calamine::Data::DurationIso(s) => s.clone(),
        _ => String::new(),
    }
}

fn parse_xlsx(data: &[u8]) -> std::result::Result<Vec<ExtractedSegment>, String> {
    let cursor = std::io::Cursor::new(data);
    let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
        .map_err(|e| format!("failed to open workbook: {}", e))?;

    let mut segments = Vec::new();
    for sheet_name in workbook.sheet_names().to_vec() {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| format!("failed to read sheet '{}': {}", sheet_name, e))?;

        let mut content = format!("Sheet: {}\n", sheet_name);
        for row in range.rows() {
            let cells: Vec<String> = row.iter().map(cell_text).collect();
            if cells.iter().all(|c| c.is_empty()) {
                continue;
            }
            content.push_str(&cells.join(" | "));
            content.push('\n');
        }
        segments.push(ExtractedSegment::sheet(content, sheet_name));
    }
    Ok(segments)
}

fn parse_docx(data: &[u8]) -> std::result::Result<Vec<ExtractedSegment>, String> {
    let doc = docx_rs::read_docx(data).map_err(|e| format!("failed to read DOCX: {}", e))?;

    let mut segments = Vec::new();
    for child in &doc.document.children {
        let text = match child {
            docx_rs::DocumentChild::Paragraph(p) => paragraph_text(&p.children),
            docx_rs::DocumentChild::Table(t) => table_text(t),
            _ => continue,
        };
        if !text.trim().is_empty() {
            segments.push(ExtractedSegment::text(text + "\n"));
        }
    }
    Ok(segments)
}

/// Run text of a paragraph, following hyperlinks
fn paragraph_text(children: &[docx_rs::ParagraphChild]) -> String {
    let mut text = String::new();
    for child in children {
        match child {
            docx_rs::ParagraphChild::Run(run) => {
                for child in &run.children {
                    match child {
                        docx_rs::RunChild::Text(t) => text.push_str(&t.text),
                        docx_rs::RunChild::Tab(_) => text.push('\t'),
                        _ => {}
                    }
                }
            }
            docx_rs::ParagraphChild::Hyperlink(link) => text.push_str(&paragraph_text(&link.children)),
            _ => {}
        }
    }
    text
}

/// One line per row, cells joined with " | "; nested tables are flattened into their cell
fn table_text(table: &docx_rs::Table) -> String {
    let mut lines = Vec::new();
    for docx_rs::TableChild::TableRow(row) in &table.rows {
        let cells: Vec<String> = row
            .cells
            .iter()
            .map(|docx_rs::TableRowChild::TableCell(cell)| {
                cell.children
                    .iter()
                    .filter_map(|content| match content {
                        docx_rs::TableCellContent::Paragraph(p) => Some(paragraph_text(&p.children)),
                        docx_rs::TableCellContent::Table(inner) => Some(table_text(inner).replace('\n', " ")),
                        _ => None,
                    })
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        if cells.iter().any(|c| !c.is_empty()) {
            lines.push(cells.join(" | "));
        }
    }
    lines.join("\n")
}

/// Glyph names some PDF fonts leak into extracted text
const GLYPH_NAMES: &[(&str, &str)] = &[
    ("uni2010", "-"),
    ("uni2011", "-"),
    ("uni2013", "-"),
    ("uni2014", "--"),
    ("uni2018", "'"),
    ("uni2019", "'"),
    ("uni201C", "\""),
    ("uni201D", "\""),
    ("uni2022", "* "),
    ("uni2026", "..."),
    ("uni00A0", " "),
    ("uni2212", "-"),
    ("f_f_i", "ffi"),
    ("f_f_l", "ffl"),
    ("f_f", "ff"),
    ("f_i", "fi"),
    ("f_l", "fl"),
];

/// Typographic characters folded to ASCII
const CHAR_FOLDS: &[(char, &str)] = &[
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2013}', "-"),
    ('\u{2014}', "--"),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2022}', "* "),
    ('\u{2026}', "..."),
    ('\u{00A0}', " "),
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Normalize one page of PDF text: glyph names, typographic characters,
/// NULs and blank lines
fn cleanup_pdf_text(text: &str) -> String {
    let mut result = text.replace('\0', "");

    for (name, replacement) in GLYPH_NAMES {
        result = result
            .replace(&format!("({})", name), replacement)
            .replace(&format!("<{}>", name), replacement);
        if name.starts_with("uni") {
            result = result.replace(name, replacement);
        }
    }
    for (ch, replacement) in CHAR_FOLDS {
        result = result.replace(*ch, replacement);
    }

    result
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_pdf(data: &[u8]) -> std::result::Result<Vec<ExtractedSegment>, String> {
    let doc = lopdf::Document::load_mem(data).map_err(|e| format!("failed to load PDF: {}", e))?;
    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err("PDF is encrypted".to_string());
    }

    let mut segments = Vec::new();
    for page_number in doc.get_pages().into_keys() {
        match doc.extract_text(&[page_number]) {
            Ok(text) => {
                let text = cleanup_pdf_text(&text);
                if !text.is_empty() {
                    segments.push(ExtractedSegment::page(text + "\n", page_number));
                }
            }
            Err(e) => tracing::debug!("Could not extract text from page {}: {}", page_number, e),
        }
    }

    if segments.is_empty() {
        tracing::warn!("Per-page extraction produced no text, trying pdf-extract");
        let text = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| format!("failed to extract PDF text: {}", e))?;
        let text = cleanup_pdf_text(&text);
        if text.is_empty() {
            return Err("PDF has no extractable text (image-based or empty)".to_string());
        }
        segments.push(ExtractedSegment::text(text + "\n"));
    }

    Ok(segments)
}

/// Maps each supported file type to its extractor
pub struct ExtractorRegistry {
    extractors: HashMap<FileType, Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Registry with no extractors
    pub fn new() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Registry with an extractor for every supported format
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TxtExtractor));
        registry.register(Arc::new(CsvExtractor));
        registry.register(Arc::new(XlsxExtractor));
        registry.register(Arc::new(PdfExtractor));
        registry.register(Arc::new(DocxExtractor));
        registry
    }

    /// Register an extractor, replacing any previous one for its format
    pub fn register(&mut self, extractor: Arc<dyn Extractor>) {
        self.extractors.insert(extractor.file_type(), extractor);
    }

    /// Remove the extractor for a format
    pub fn unregister(&mut self, file_type: FileType) -> Option<Arc<dyn Extractor>> {
        self.extractors.remove(&file_type)
    }

    /// Extractor for a file type; `None` for `Unknown`, `NotAFile` and unregistered formats
    pub fn resolve(&self, file_type: FileType) -> Option<Arc<dyn Extractor>> {
        if !file_type.is_supported() {
            return None;
        }
        self.extractors.get(&file_type).cloned()
    }

    /// Formats with a registered extractor
    pub fn supported(&self) -> Vec<FileType> {
        FileType::SUPPORTED
            .into_iter()
            .filter(|t| self.extractors.contains_key(t))
            .collect()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
