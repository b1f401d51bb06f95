pub mod chunker;
pub mod reader;
pub mod segment;

pub use chunker::{Chunker, ChunkerConfig};
pub use reader::{DocumentKind, FileReader};
pub use segment::Segment;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Generate a stable document ID from file path
pub fn generate_doc_id(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// A supported file that could not be turned into text.
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything loaded from one directory.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub segments: Vec<Segment>,
    pub failures: Vec<LoadFailure>,
    pub files_loaded: usize,
}

impl LoadReport {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Load and segment a single PDF or HTML file.
pub async fn ingest_file(file_path: &Path, chunker: &Chunker) -> Result<Vec<Segment>> {
    let content = FileReader::read_file(file_path).await?;
    let path_str = file_path.to_string_lossy().to_string();
    let doc_id = generate_doc_id(&path_str);

    Ok(chunker.chunk_text(&doc_id, &content, &path_str))
}

/// Load every supported file directly inside `dir_path`.
///
/// Files are visited in name order. A file that fails to load is logged and
/// recorded in [`LoadReport::failures`]; it never aborts the directory. Only
/// an unreadable directory is an error.
pub async fn load_directory(dir_path: &Path, chunker: &Chunker) -> Result<LoadReport> {
    let metadata = tokio::fs::metadata(dir_path)
        .await
        .context(format!("Failed to read directory: {:?}", dir_path))?;
    if !metadata.is_dir() {
        anyhow::bail!("Not a directory: {:?}", dir_path);
    }

    let mut report = LoadReport::default();

    let walker = WalkDir::new(dir_path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.context(format!("Failed to read directory: {:?}", dir_path))?;
        let path = entry.path();

        if !entry.file_type().is_file() || DocumentKind::from_path(path).is_none() {
            continue;
        }

        match ingest_file(path, chunker).await {
            Ok(segments) => {
                debug!(path = %path.display(), segments = segments.len(), "Loaded document");
                report.files_loaded += 1;
                report.segments.extend(segments);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{e:#}"), "Error loading document");
                report.failures.push(LoadFailure {
                    path: path.to_path_buf(),
                    reason: format!("{e:#}"),
                });
            }
        }
    }

    Ok(report)
}
