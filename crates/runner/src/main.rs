use anyhow::Result;
use clap::Parser;
use runner::logging::{LogFormat, init_tracing};
use runner::{AppConfig, Cli, Pipeline, RunPlan};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(LogFormat::from_env());

    let cli = Cli::parse();
    let (config, api_key) = AppConfig::load(&cli)?;

    let pipeline = Pipeline::from_config(&config, &api_key)?;
    let plan = RunPlan::from(&config);

    tracing::info!(
        folders = plan.folders.len(),
        output_dir = %plan.output_dir.display(),
        "Starting extraction run"
    );

    let summary = runner::run(&pipeline, &plan).await?;
    summary.log();

    Ok(())
}
