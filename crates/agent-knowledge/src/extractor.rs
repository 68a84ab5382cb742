//! Plain-text extraction from uploaded files.
//!
//! Extraction never fails: unreadable input yields an empty string so one bad
//! file cannot abort an ingestion.

use std::path::{Path, PathBuf};

use lopdf::Document;

const PAGE_SEPARATOR: &str = "\n\n";

/// Extract the text of `path`. PDFs go through the PDF parser, everything
/// else is read as UTF-8 with invalid bytes dropped.
pub async fn extract_text(path: &Path) -> String {
    if is_pdf(path) {
        let owned: PathBuf = path.to_path_buf();
        match tokio::task::spawn_blocking(move || pdf_text(&owned)).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "pdf extraction task failed");
                String::new()
            }
        }
    } else {
        match tokio::fs::read(path).await {
            Ok(bytes) => decode_utf8_dropping_invalid(&bytes),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable upload");
                String::new()
            }
        }
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Page texts joined by blank lines; a page that fails to extract is empty.
fn pdf_text(path: &Path) -> String {
    let document = match Document::load(path) {
        Ok(document) => document,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "pdf could not be parsed");
            return String::new();
        }
    };

    let pages: Vec<String> = document
        .get_pages()
        .into_keys()
        .map(|page_no| {
            document
                .extract_text(&[page_no])
                .map(|text| text.trim_end().to_string())
                .unwrap_or_else(|e| {
                    tracing::debug!(page_no, error = %e, "pdf page had no extractable text");
                    String::new()
                })
        })
        .collect();

    pages.join(PAGE_SEPARATOR)
}

/// Decode UTF-8, silently skipping invalid byte sequences.
pub fn decode_utf8_dropping_invalid(mut bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                let skip = e.error_len().unwrap_or(rest.len());
                bytes = &rest[skip..];
            }
        }
    }
}
