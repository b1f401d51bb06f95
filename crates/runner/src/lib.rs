pub mod config;
pub mod logging;
pub mod pipeline;
pub mod run;

pub use config::{ApiKey, AppConfig, Cli, ConfigError};
pub use pipeline::{FolderExtraction, FolderResult, Pipeline};
pub use run::{FolderOutcome, FolderReport, RunPlan, RunSummary, run};
