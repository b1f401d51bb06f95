use anyhow::{Context, Result};
use scraper::{Html, Node};
use std::path::Path;
use tokio::fs;

/// Elements whose text never reaches the reader.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Html,
}

impl DocumentKind {
    /// Classify a path by extension; `None` for unsupported formats.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();

        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }
}

pub struct FileReader;

impl FileReader {
    pub async fn read_file(path: &Path) -> Result<String> {
        match DocumentKind::from_path(path) {
            Some(DocumentKind::Pdf) => Self::read_pdf(path).await,
            Some(DocumentKind::Html) => Self::read_html(path).await,
            None => anyhow::bail!("Unsupported file format: {:?}", path),
        }
    }

    async fn read_pdf(path: &Path) -> Result<String> {
        let bytes = fs::read(path)
            .await
            .context(format!("Failed to read file: {:?}", path))?;

        // pdf-extract is synchronous and may panic on malformed input
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .context("PDF extraction task aborted")?
            .context(format!("Failed to extract PDF text: {:?}", path))
    }

    async fn read_html(path: &Path) -> Result<String> {
        let bytes = fs::read(path)
            .await
            .context(format!("Failed to read file: {:?}", path))?;
        let markup = String::from_utf8_lossy(&bytes);

        Ok(html_to_text(&markup))
    }
}

/// Visible text of an HTML document, one text node per line.
pub fn html_to_text(markup: &str) -> String {
    let document = Html::parse_document(markup);
    let mut lines = Vec::new();

    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| match ancestor.value() {
            Node::Element(element) => SKIPPED_ELEMENTS.contains(&element.name()),
            _ => false,
        });
        if hidden {
            continue;
        }

        let collapsed = collapse_whitespace(text);
        if !collapsed.is_empty() {
            lines.push(collapsed);
        }
    }

    lines.join("\n")
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
