use anyhow::{Context, Result};
use clap::Parser;
use iqa_dataset::{summarize_with_thresholds, DatasetBuilder};
use iqa_tools::cli::{ensure_passed, DecodeStats, SummaryArgs};
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = SummaryArgs::parse();
    let cfg = args.resolve_config()?;

    let builder = DatasetBuilder::new(&cfg.dataset_root, cfg.layout, &cfg.exclusions)
        .with_context(|| format!("open dataset at {}", cfg.dataset_root.display()))?;
    info!(
        layout = builder.layout().name,
        rows = builder.len(),
        "loaded metadata"
    );

    let report = summarize_with_thresholds(&builder, &cfg.thresholds);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if args.decode {
        let stats = DecodeStats::collect(&builder)?;
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    ensure_passed(&report)
}
