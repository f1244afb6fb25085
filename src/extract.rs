//! Text extraction for uploaded discovery documents.
//!
//! Each upload becomes one [`ModelDocument`]: extracted plain text when the
//! format is text-like or parseable (PDF, DOCX, PPTX, XLSX), otherwise the
//! raw base64 payload so the model can read the file itself. Extraction
//! failures never fail the batch; the file falls back to its raw bytes.

use std::io::Read;

use base64::Engine;

use crate::models::IncomingFile;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_PPTX: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

const XLSX_MAX_SHEETS: usize = 100;
const XLSX_MAX_CELLS_PER_SHEET: usize = 100_000;
/// Zip-bomb guard for a single OOXML part.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
/// Extracted text shorter than this is treated as a failed extraction
/// (scanned PDFs usually yield a few stray characters).
const MIN_EXTRACTED_CHARS: usize = 20;

/// Document extraction failure. Recovered locally by sending raw bytes.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedContentType(String),
    Decode(String),
    Pdf(String),
    Ooxml(String),
    TooLittleText(usize),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedContentType(ct) => {
                write!(f, "unsupported content-type: {}", ct)
            }
            ExtractError::Decode(e) => write!(f, "base64 decode failed: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Ooxml(e) => write!(f, "OOXML extraction failed: {}", e),
            ExtractError::TooLittleText(n) => {
                write!(f, "extraction produced only {} characters", n)
            }
        }
    }
}

impl std::error::Error for ExtractError {}

/// One entry of the model request's content list.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelDocument {
    /// Extracted or decoded text, already wrapped in begin/end markers.
    Text(String),
    /// Raw file for the model to read.
    Binary { media_type: String, data: String },
}

/// Guess a media type from the file extension.
pub fn infer_media_type(filename: &str) -> &'static str {
    let lower = filename.to_lowercase();
    let ext = lower.rsplit('.').next().unwrap_or("");
    match ext {
        "pdf" => MIME_PDF,
        "docx" => MIME_DOCX,
        "pptx" => MIME_PPTX,
        "xlsx" => MIME_XLSX,
        "doc" => "application/msword",
        "ppt" => "application/vnd.ms-powerpoint",
        "xls" => "application/vnd.ms-excel",
        "txt" => "text/plain",
        _ => MIME_OCTET_STREAM,
    }
}

/// Declared media type, or one inferred from the filename when blank.
pub fn effective_media_type(file: &IncomingFile) -> String {
    let declared = file.media_type.trim().to_lowercase();
    if declared.is_empty() {
        infer_media_type(&file.name).to_string()
    } else {
        declared
    }
}

/// Extracts plain text from binary OOXML/PDF content.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
    match content_type {
        MIME_PDF => extract_pdf(bytes),
        MIME_DOCX => extract_docx(bytes),
        MIME_PPTX => extract_pptx(bytes),
        MIME_XLSX => extract_xlsx(bytes),
        _ => Err(ExtractError::UnsupportedContentType(
            content_type.to_string(),
        )),
    }
}

fn is_text_like(media_type: &str, filename: &str) -> bool {
    media_type.starts_with("text/") || filename.to_lowercase().ends_with(".txt")
}

fn is_extractable(media_type: &str) -> bool {
    matches!(media_type, MIME_PDF | MIME_DOCX | MIME_PPTX | MIME_XLSX)
}

fn try_extract(file: &IncomingFile, media_type: &str) -> Result<ModelDocument, ExtractError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(file.base64_data.as_bytes())
        .map_err(|e| ExtractError::Decode(e.to_string()))?;

    if is_extractable(media_type) {
        let text = extract_text(&bytes, media_type)?;
        let text = text.trim();
        if text.chars().count() <= MIN_EXTRACTED_CHARS {
            return Err(ExtractError::TooLittleText(text.chars().count()));
        }
        return Ok(ModelDocument::Text(format!(
            "--- Begin extracted text from {} ---\n{}\n--- End extracted text ---",
            file.name, text
        )));
    }

    if is_text_like(media_type, &file.name) {
        let decoded = String::from_utf8_lossy(&bytes);
        return Ok(ModelDocument::Text(format!(
            "--- Begin text file {} ---\n{}\n--- End text file ---",
            file.name, decoded
        )));
    }

    Err(ExtractError::UnsupportedContentType(media_type.to_string()))
}

/// Convert one upload into a model content entry.
///
/// Unsupported formats and failed extractions fall back to the raw payload.
pub fn prepare_for_model(file: &IncomingFile) -> ModelDocument {
    let media_type = effective_media_type(file);
    match try_extract(file, &media_type) {
        Ok(doc) => doc,
        Err(e) => {
            if !matches!(e, ExtractError::UnsupportedContentType(_)) {
                tracing::warn!(file = %file.name, error = %e, "extraction failed, sending raw document");
            }
            ModelDocument::Binary {
                media_type: if file.media_type.trim().is_empty() {
                    MIME_OCTET_STREAM.to_string()
                } else {
                    file.media_type.clone()
                },
                data: file.base64_data.clone(),
            }
        }
    }
}

/// Convert a batch of uploads concurrently, preserving input order.
pub async fn prepare_batch(files: &[IncomingFile]) -> Vec<ModelDocument> {
    let tasks = files.iter().cloned().map(|file| async move {
        let fallback = file.clone();
        match tokio::task::spawn_blocking(move || prepare_for_model(&file)).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(file = %fallback.name, error = %e, "extraction task failed");
                ModelDocument::Binary {
                    media_type: effective_media_type(&fallback),
                    data: fallback.base64_data,
                }
            }
        }
    });
    futures::future::join_all(tasks).await
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

type Archive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

fn open_archive(bytes: &[u8]) -> Result<Archive<'_>, ExtractError> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| ExtractError::Ooxml(e.to_string()))
}

fn read_zip_entry_bounded(archive: &mut Archive<'_>, name: &str) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Ooxml(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, MAX_XML_ENTRY_BYTES
        )));
    }
    Ok(out)
}

/// Numbered parts such as `ppt/slides/slide3.xml`, sorted by number.
fn numbered_parts(archive: &Archive<'_>, prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with(prefix) && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches(prefix)
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

/// Text of every `<*:t>` run (`w:t` in Word, `a:t` in DrawingML), grouped
/// by `<*:p>` paragraph. Runs within a paragraph are joined with
/// `run_separator`, paragraphs with `paragraph_separator`.
fn collect_text_runs(
    xml: &[u8],
    run_separator: &str,
    paragraph_separator: &str,
) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut paragraphs: Vec<String> = Vec::new();
    let mut paragraph = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    // Word splits sentences across runs; the spaces at run edges matter.
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => {
                if let Ok(Event::Text(te)) = reader.read_event_into(&mut buf) {
                    if !paragraph.is_empty() {
                        paragraph.push_str(run_separator);
                    }
                    paragraph.push_str(te.unescape().unwrap_or_default().as_ref());
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"p" => {
                flush_paragraph(&mut paragraph, &mut paragraphs);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    flush_paragraph(&mut paragraph, &mut paragraphs);
    Ok(paragraphs.join(paragraph_separator))
}

fn flush_paragraph(paragraph: &mut String, paragraphs: &mut Vec<String>) {
    let text = paragraph.trim();
    if !text.is_empty() {
        paragraphs.push(text.to_string());
    }
    paragraph.clear();
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let xml = read_zip_entry_bounded(&mut archive, "word/document.xml")?;
    collect_text_runs(&xml, "", "\n")
}

fn extract_pptx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let mut slides = Vec::new();
    for name in numbered_parts(&archive, "ppt/slides/slide") {
        let xml = read_zip_entry_bounded(&mut archive, &name)?;
        let text = collect_text_runs(&xml, " ", " ")?;
        if !text.is_empty() {
            slides.push(text);
        }
    }
    Ok(slides.join("\n"))
}

fn extract_xlsx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let shared = read_shared_strings(&mut archive)?;
    let mut sheets = Vec::new();
    for name in numbered_parts(&archive, "xl/worksheets/sheet")
        .into_iter()
        .take(XLSX_MAX_SHEETS)
    {
        let xml = read_zip_entry_bounded(&mut archive, &name)?;
        let cells = shared_string_cells(&xml, &shared)?;
        if !cells.is_empty() {
            sheets.push(cells);
        }
    }
    Ok(sheets.join("\n"))
}

fn read_shared_strings(archive: &mut Archive<'_>) -> Result<Vec<String>, ExtractError> {
    use quick_xml::events::Event;

    let xml = read_zip_entry_bounded(archive, "xl/sharedStrings.xml")?;
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_si = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"si" => in_si = true,
            Ok(Event::Start(e)) if in_si && e.local_name().as_ref() == b"t" => {
                if let Ok(Event::Text(te)) = reader.read_event_into(&mut buf) {
                    strings.push(te.unescape().unwrap_or_default().into_owned());
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"si" => in_si = false,
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Text of every shared-string cell (`t="s"`) in a worksheet.
fn shared_string_cells(xml: &[u8], shared: &[String]) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut cells: Vec<&str> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_value = false;
    let mut is_shared = false;
    while cells.len() < XLSX_MAX_CELLS_PER_SHEET {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"c" => {
                    is_shared = e.attributes().flatten().any(|a| {
                        a.key.as_ref() == b"t" && a.value.as_ref() == b"s"
                    });
                }
                b"v" => in_value = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_value => {
                let raw = te.unescape().unwrap_or_default();
                if is_shared {
                    if let Some(s) = raw.trim().parse::<usize>().ok().and_then(|i| shared.get(i)) {
                        cells.push(s);
                    }
                }
                in_value = false;
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"c" => is_shared = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(cells.join(" "))
}
