//! Request ingestion: URL scraping fan-out and uploaded-file conversion.

use base64::Engine;

use crate::llm::Part;
use crate::scrape::{self, ScrapeOutcome};
use crate::tools::ToolRouter;

/// Per-URL text cap in the assembled context.
const URL_TEXT_LIMIT: usize = 15_000;

/// PDFs yielding less text than this are treated as scanned documents and
/// handed to the model as binary for visual/OCR reading.
const PDF_TEXT_MIN_CHARS: usize = 50;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Scrape every URL concurrently and fold the results into one context
/// block. The whole batch is awaited; failures are reported inline per URL
/// rather than dropped.
pub async fn fetch_url_context(tools: &ToolRouter, urls: &[String]) -> String {
    if urls.is_empty() {
        return String::new();
    }

    let tasks: Vec<_> = urls
        .iter()
        .map(|url| {
            let http = tools.http().clone();
            let webdriver = tools.webdriver_url().map(str::to_string);
            let url = url.clone();
            tokio::spawn(
                async move { scrape::scrape_url(&http, webdriver.as_deref(), &url).await },
            )
        })
        .collect();

    // Fan-in barrier: the whole batch is awaited before assembly proceeds.
    let joined = futures_util::future::join_all(tasks).await;

    let mut block = String::from("\n\n--- Processed Web Sources ---\n");
    for (url, result) in urls.iter().zip(joined) {
        let outcome = result.unwrap_or_else(|err| ScrapeOutcome::Failure {
            reason: format!("scrape task failed: {}", err),
        });

        match &outcome {
            ScrapeOutcome::Success { .. } => {
                let text = outcome.render();
                let truncated: String = text.chars().take(URL_TEXT_LIMIT).collect();
                block.push_str(&format!("\nSOURCE: {}\nCONTENT:\n{}\n", url, truncated));
                if text.chars().count() > URL_TEXT_LIMIT {
                    block.push_str("\n[...Content Truncated...]\n");
                }
            }
            ScrapeOutcome::Failure { reason } => {
                let head: String = reason.chars().take(100).collect();
                block.push_str(&format!(
                    "\nSOURCE: {}\nSTATUS: Failed to extract meaningful text. (Error: {})\n",
                    url, head
                ));
            }
        }
    }
    block.push_str("\n-----------------------------------\n");
    block
}

/// Convert one uploaded file into message parts by MIME type. Unsupported
/// types are silently ignored.
pub fn file_parts(file: &UploadedFile) -> Vec<Part> {
    let b64 = base64::engine::general_purpose::STANDARD;

    if file.content_type.starts_with("image/") {
        return vec![Part::InlineData {
            mime_type: file.content_type.clone(),
            data: b64.encode(&file.bytes),
        }];
    }

    if file.content_type == "application/pdf" {
        let text = pdf_extract::extract_text_from_mem(&file.bytes).unwrap_or_else(|err| {
            tracing::debug!("PDF text extraction failed for {}: {}", file.filename, err);
            String::new()
        });

        if text.trim().chars().count() < PDF_TEXT_MIN_CHARS {
            return vec![
                Part::Text {
                    text: format!(
                        "\n\n--- Document ({}) is likely SCANNED. Processing as Image-PDF... ---\n",
                        file.filename
                    ),
                },
                Part::InlineData {
                    mime_type: "application/pdf".to_string(),
                    data: b64.encode(&file.bytes),
                },
            ];
        }

        return vec![Part::Text {
            text: format!(
                "\n\n--- Document Content ({}) ---\n{}\n-----------------------------------\n",
                file.filename, text
            ),
        }];
    }

    if matches!(
        file.content_type.as_str(),
        "text/plain" | "text/csv" | "application/json"
    ) {
        let text = String::from_utf8_lossy(&file.bytes).to_string();
        return vec![Part::Text {
            text: format!(
                "\n\n--- Document Content ({}) ---\n{}\n-----------------------------------\n",
                file.filename, text
            ),
        }];
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, content_type: &str, bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            filename: name.to_string(),
            content_type: content_type.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn images_become_inline_data() {
        let parts = file_parts(&file("photo.png", "image/png", b"fakepixels"));
        assert_eq!(parts.len(), 1);
        match &parts[0] {
            Part::InlineData { mime_type, data } => {
                assert_eq!(mime_type, "image/png");
                assert!(!data.is_empty());
            }
            other => panic!("expected inline data, got {:?}", other),
        }
    }

    #[test]
    fn unextractable_pdf_routes_as_scanned_binary() {
        // Not a real PDF: extraction yields nothing, which is exactly the
        // scanned-document case.
        let parts = file_parts(&file("scan.pdf", "application/pdf", b"\x00\x01garbage"));
        assert_eq!(parts.len(), 2);
        assert!(matches!(&parts[0], Part::Text { text } if text.contains("SCANNED")));
        assert!(matches!(
            &parts[1],
            Part::InlineData { mime_type, .. } if mime_type == "application/pdf"
        ));
    }

    #[test]
    fn plain_text_files_are_inlined() {
        let parts = file_parts(&file("notes.csv", "text/csv", b"a,b\n1,2"));
        assert_eq!(parts.len(), 1);
        match &parts[0] {
            Part::Text { text } => {
                assert!(text.contains("notes.csv"));
                assert!(text.contains("a,b"));
            }
            other => panic!("expected text part, got {:?}", other),
        }
    }

    #[test]
    fn unknown_mime_types_are_ignored() {
        let parts = file_parts(&file("blob.bin", "application/octet-stream", b"data"));
        assert!(parts.is_empty());
    }
}
