use anyhow::{Context, Result};
use ingest::LoadFailure;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::pipeline::{FolderResult, Pipeline};

/// Which folders to process and where results go.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub input_root: PathBuf,
    pub folders: Vec<String>,
    pub output_dir: PathBuf,
}

impl From<&AppConfig> for RunPlan {
    fn from(config: &AppConfig) -> Self {
        Self {
            input_root: config.input.root.clone(),
            folders: config.input.folders.clone(),
            output_dir: config.output.dir.clone(),
        }
    }
}

#[derive(Debug)]
pub enum FolderOutcome {
    /// Folder does not exist; skipped.
    Missing,
    /// Folder had no loadable documents; nothing written.
    Empty,
    Extracted { fields: usize, output: PathBuf },
    Failed { error: String, output: PathBuf },
}

#[derive(Debug)]
pub struct FolderReport {
    pub folder: String,
    pub outcome: FolderOutcome,
    pub load_failures: Vec<LoadFailure>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub folders: Vec<FolderReport>,
}

impl RunSummary {
    pub fn written(&self) -> impl Iterator<Item = &Path> {
        self.folders.iter().filter_map(|report| match &report.outcome {
            FolderOutcome::Extracted { output, .. } | FolderOutcome::Failed { output, .. } => {
                Some(output.as_path())
            }
            FolderOutcome::Missing | FolderOutcome::Empty => None,
        })
    }

    fn count(&self, pred: impl Fn(&FolderOutcome) -> bool) -> usize {
        self.folders.iter().filter(|report| pred(&report.outcome)).count()
    }

    pub fn log(&self) {
        for report in &self.folders {
            for failure in &report.load_failures {
                warn!(
                    folder = %report.folder,
                    path = %failure.path.display(),
                    reason = %failure.reason,
                    "Skipped unreadable file"
                );
            }
        }

        info!(
            extracted = self.count(|o| matches!(o, FolderOutcome::Extracted { .. })),
            failed = self.count(|o| matches!(o, FolderOutcome::Failed { .. })),
            empty = self.count(|o| matches!(o, FolderOutcome::Empty)),
            missing = self.count(|o| matches!(o, FolderOutcome::Missing)),
            "Run complete"
        );
    }
}

/// `<folder>_extracted.json`, with path separators flattened.
pub fn output_file_name(folder: &str) -> String {
    let flat: String = folder
        .trim_matches(|c| c == '/' || c == '\\')
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{flat}_extracted.json")
}

/// Process each folder in order and write one JSON file per extracted folder.
///
/// Per-folder failures are folded into the summary. Only an output directory
/// or file that cannot be written stops the run.
pub async fn run(pipeline: &Pipeline, plan: &RunPlan) -> Result<RunSummary> {
    fs::create_dir_all(&plan.output_dir)
        .await
        .context(format!("Failed to create output directory {:?}", plan.output_dir))?;

    let mut summary = RunSummary::default();

    for folder in &plan.folders {
        let path = plan.input_root.join(folder);

        if !fs::try_exists(&path).await.unwrap_or(false) {
            warn!(folder = %folder, path = %path.display(), "Folder not found");
            summary.folders.push(FolderReport {
                folder: folder.clone(),
                outcome: FolderOutcome::Missing,
                load_failures: Vec::new(),
            });
            continue;
        }

        info!(folder = %folder, "Processing folder");
        let extraction = pipeline.extract_folder(&path).await;

        let outcome = match extraction.result {
            FolderResult::NoDocuments => FolderOutcome::Empty,
            FolderResult::Extracted(record) => {
                let output = write_record(&plan.output_dir, folder, &record).await?;
                FolderOutcome::Extracted {
                    fields: record.field_count(),
                    output,
                }
            }
            FolderResult::Failed { record, error } => {
                let output = write_record(&plan.output_dir, folder, &record).await?;
                FolderOutcome::Failed { error, output }
            }
        };

        summary.folders.push(FolderReport {
            folder: folder.clone(),
            outcome,
            load_failures: extraction.load_failures,
        });
    }

    Ok(summary)
}

async fn write_record(
    output_dir: &Path,
    folder: &str,
    record: &extract::ExtractionRecord,
) -> Result<PathBuf> {
    let output = output_dir.join(output_file_name(folder));
    let json = record
        .to_pretty_json()
        .context("Failed to serialize extraction record")?;

    fs::write(&output, json)
        .await
        .context(format!("Failed to write {:?}", output))?;

    info!(folder = %folder, path = %output.display(), "Saved extraction");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{KeywordEmbedder, ScriptedModel, pipeline};
    use extract::{CONTACT_INFO, EXTRACTION_FAILED, FIELDS, NOT_SPECIFIED};
    use serde_json::Value;
    use std::fs as std_fs;
    use tempfile::TempDir;

    fn workspace(folders: &[(&str, &[(&str, &str)])]) -> TempDir {
        let root = tempfile::tempdir().unwrap();
        for (folder, files) in folders {
            let dir = root.path().join(folder);
            std_fs::create_dir_all(&dir).unwrap();
            for (name, contents) in *files {
                std_fs::write(dir.join(name), contents).unwrap();
            }
        }
        root
    }

    fn plan(root: &TempDir, folders: &[&str]) -> RunPlan {
        RunPlan {
            input_root: root.path().to_path_buf(),
            folders: folders.iter().map(|f| f.to_string()).collect(),
            output_dir: root.path().join("output"),
        }
    }

    fn read_output(path: &Path) -> serde_json::Map<String, Value> {
        let raw = std_fs::read_to_string(path).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    /// Answers with whatever bid number and due date appear in the prompt.
    fn echo_model() -> ScriptedModel {
        ScriptedModel::new(|prompt| {
            if prompt.contains("Bid Number: 2024-55") {
                "```json\n{\"Bid Number\": \"2024-55\", \"Due Date\": \"2024-12-01\"}\n```".to_string()
            } else {
                "Sorry, I could not find an RFP in these documents.".to_string()
            }
        })
    }

    #[tokio::test]
    async fn extracts_bid_folder_end_to_end() {
        let root = workspace(&[(
            "Bid1",
            &[(
                "notice.html",
                "<html><body><p>Bid Number: 2024-55, Due Date: 2024-12-01, laptops for the county.</p></body></html>",
            )],
        )]);

        let summary = run(&pipeline(KeywordEmbedder, echo_model()), &plan(&root, &["Bid1"]))
            .await
            .unwrap();

        let output = root.path().join("output").join("Bid1_extracted.json");
        assert!(matches!(
            &summary.folders[0].outcome,
            FolderOutcome::Extracted { fields: 20, output: written } if *written == output
        ));

        let record = read_output(&output);
        assert_eq!(record.len(), FIELDS.len());
        assert_eq!(record["Bid Number"], "2024-55");
        assert_eq!(record["Due Date"], "2024-12-01");
        for field in FIELDS {
            if matches!(field, "Bid Number" | "Due Date" | CONTACT_INFO) {
                continue;
            }
            assert_eq!(record[field], NOT_SPECIFIED, "{field}");
        }
        assert_eq!(record[CONTACT_INFO]["Email"], NOT_SPECIFIED);

        let raw = std_fs::read_to_string(&output).unwrap();
        assert!(raw.starts_with("{\n  \"Bid Number\": \"2024-55\",\n  \"Title\""));
    }

    #[tokio::test]
    async fn missing_folders_are_skipped_without_output() {
        let root = workspace(&[]);

        let summary = run(&pipeline(KeywordEmbedder, echo_model()), &plan(&root, &["Bid1", "Bid2"]))
            .await
            .unwrap();

        assert_eq!(summary.folders.len(), 2);
        assert!(summary.folders.iter().all(|r| matches!(r.outcome, FolderOutcome::Missing)));
        assert!(root.path().join("output").is_dir());
        assert_eq!(std_fs::read_dir(root.path().join("output")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn folders_without_documents_write_nothing() {
        let root = workspace(&[("Bid1", &[("readme.txt", "Bid Number: 2024-55")])]);
        let model = echo_model();

        let summary = run(&pipeline(KeywordEmbedder, model.clone()), &plan(&root, &["Bid1"]))
            .await
            .unwrap();

        assert!(matches!(summary.folders[0].outcome, FolderOutcome::Empty));
        assert!(!root.path().join("output/Bid1_extracted.json").exists());
        assert_eq!(model.calls(), 0);
        assert_eq!(summary.written().count(), 0);
    }

    #[tokio::test]
    async fn failed_folder_does_not_stop_the_run() {
        let root = workspace(&[
            ("BidA", &[("rfp.html", "<p>Title: snow plows</p>")]),
            ("BidB", &[("rfp.html", "<p>Bid Number: 2024-55</p>")]),
        ]);

        let summary = run(
            &pipeline(KeywordEmbedder, echo_model()),
            &plan(&root, &["BidA", "Missing", "BidB"]),
        )
        .await
        .unwrap();

        assert!(matches!(summary.folders[0].outcome, FolderOutcome::Failed { .. }));
        assert!(matches!(summary.folders[1].outcome, FolderOutcome::Missing));
        assert!(matches!(summary.folders[2].outcome, FolderOutcome::Extracted { .. }));
        assert_eq!(summary.written().count(), 2);

        let failed = read_output(&root.path().join("output/BidA_extracted.json"));
        assert_eq!(failed.len(), FIELDS.len());
        for field in FIELDS {
            assert_eq!(failed[field], EXTRACTION_FAILED, "{field}");
        }

        let extracted = read_output(&root.path().join("output/BidB_extracted.json"));
        assert_eq!(extracted["Bid Number"], "2024-55");
    }

    #[tokio::test]
    async fn rerunning_an_unchanged_folder_is_byte_identical() {
        let root = workspace(&[(
            "Bid1",
            &[
                ("a.html", "<p>Bid Number: 2024-55</p>"),
                ("b.htm", "<p>Due Date: 2024-12-01</p>"),
            ],
        )]);
        let pipeline = pipeline(KeywordEmbedder, echo_model());
        let plan = plan(&root, &["Bid1"]);
        let output = root.path().join("output/Bid1_extracted.json");

        run(&pipeline, &plan).await.unwrap();
        let first = std_fs::read(&output).unwrap();
        run(&pipeline, &plan).await.unwrap();
        let second = std_fs::read(&output).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn load_failures_are_reported_in_the_summary() {
        let root = workspace(&[(
            "Bid1",
            &[
                ("broken.pdf", "not really a pdf"),
                ("notice.html", "<p>Bid Number: 2024-55</p>"),
            ],
        )]);

        let summary = run(&pipeline(KeywordEmbedder, echo_model()), &plan(&root, &["Bid1"]))
            .await
            .unwrap();

        let report = &summary.folders[0];
        assert!(matches!(report.outcome, FolderOutcome::Extracted { .. }));
        assert_eq!(report.load_failures.len(), 1);
        assert!(report.load_failures[0].path.ends_with("broken.pdf"));
    }

    #[test]
    fn output_names_flatten_nested_folders() {
        assert_eq!(output_file_name("Bid1"), "Bid1_extracted.json");
        assert_eq!(output_file_name("2024/Bid1/"), "2024_Bid1_extracted.json");
    }

    #[test]
    fn plan_follows_config() {
        let config = AppConfig::default();
        let plan = RunPlan::from(&config);

        assert_eq!(plan.folders, vec!["Bid1", "Bid2"]);
        assert_eq!(plan.output_dir, PathBuf::from("output"));
    }
}
