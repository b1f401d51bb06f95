use anyhow::Result;
use extract::{ExtractionRecord, Extractor, GroqClient, prompt::build_context};
use index::{Embedder, EmbeddingClient, Retriever, SimilarityIndex};
use ingest::{Chunker, ChunkerConfig, LoadFailure, Segment};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::{ApiKey, AppConfig};

/// What extraction produced for one folder.
#[derive(Debug)]
pub enum FolderResult {
    /// Nothing loadable in the folder; no record is written.
    NoDocuments,
    Extracted(ExtractionRecord),
    /// The pipeline failed; `record` is the all-"Extraction failed" record.
    Failed {
        record: ExtractionRecord,
        error: String,
    },
}

impl FolderResult {
    pub fn record(&self) -> Option<&ExtractionRecord> {
        match self {
            Self::NoDocuments => None,
            Self::Extracted(record) | Self::Failed { record, .. } => Some(record),
        }
    }

    fn failed(error: anyhow::Error) -> Self {
        Self::Failed {
            record: ExtractionRecord::failed(),
            error: format!("{error:#}"),
        }
    }
}

#[derive(Debug)]
pub struct FolderExtraction {
    pub result: FolderResult,
    pub load_failures: Vec<LoadFailure>,
}

/// Load → index → retrieve → prompt → parse, for one folder at a time.
pub struct Pipeline {
    embedder: Box<dyn Embedder>,
    extractor: Extractor,
    retriever: Retriever,
    chunker: Chunker,
}

impl Pipeline {
    pub fn new(
        embedder: Box<dyn Embedder>,
        extractor: Extractor,
        retriever: Retriever,
        chunker: Chunker,
    ) -> Self {
        Self {
            embedder,
            extractor,
            retriever,
            chunker,
        }
    }

    /// Wire the HTTP-backed embedder and chat model from configuration.
    pub fn from_config(config: &AppConfig, api_key: &ApiKey) -> Result<Self> {
        let timeout = Duration::from_secs(config.llm.request_timeout_secs);

        let embedder = EmbeddingClient::new(
            config.embedding.base_url.clone(),
            config.embedding.model.clone(),
        )
        .with_timeout(timeout)?;

        let model = GroqClient::new(
            config.llm.base_url.clone(),
            config.llm.model.clone(),
            api_key.expose().to_string(),
        )
        .with_temperature(config.llm.temperature)
        .with_timeout(timeout)?;

        let chunker = Chunker::new(ChunkerConfig {
            target_tokens_max: config.chunking.max_tokens,
            overlap_tokens: config.chunking.overlap_tokens,
        });

        Ok(Self::new(
            Box::new(embedder),
            Extractor::new(Box::new(model)),
            Retriever::new(config.retrieval.query.clone(), config.retrieval.top_k),
            chunker,
        ))
    }

    /// Run every stage for `folder`. Errors never escape: they become a
    /// [`FolderResult::Failed`] record.
    pub async fn extract_folder(&self, folder: &Path) -> FolderExtraction {
        let report = match ingest::load_directory(folder, &self.chunker).await {
            Ok(report) => report,
            Err(e) => {
                error!(folder = %folder.display(), error = %format!("{e:#}"), "Extraction error");
                return FolderExtraction {
                    result: FolderResult::failed(e),
                    load_failures: Vec::new(),
                };
            }
        };

        if report.is_empty() {
            warn!(
                folder = %folder.display(),
                failures = report.failures.len(),
                "No documents found"
            );
            return FolderExtraction {
                result: FolderResult::NoDocuments,
                load_failures: report.failures,
            };
        }

        debug!(
            folder = %folder.display(),
            files = report.files_loaded,
            segments = report.segments.len(),
            "Loaded folder"
        );

        let result = match self.extract_segments(report.segments).await {
            Ok(record) => FolderResult::Extracted(record),
            Err(e) => {
                error!(folder = %folder.display(), error = %format!("{e:#}"), "Extraction error");
                FolderResult::failed(e)
            }
        };

        FolderExtraction {
            result,
            load_failures: report.failures,
        }
    }

    async fn extract_segments(&self, segments: Vec<Segment>) -> Result<ExtractionRecord> {
        let index = SimilarityIndex::build(self.embedder.as_ref(), segments).await?;
        let hits = self.retriever.retrieve(self.embedder.as_ref(), &index).await?;

        let context = build_context(hits.iter().map(|hit| hit.segment.text.as_str()));
        self.extractor.extract_from_context(&context).await
    }
}
