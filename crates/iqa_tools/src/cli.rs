use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser};
use iqa_dataset::{DatasetBuilder, DatasetLayout, ValidationOutcome, ValidationReport};
use serde::Serialize;

use crate::ToolConfig;

/// Dataset selection flags shared by the dataset tools. Each flag given replaces
/// the matching config value.
#[derive(Debug, Clone, Default, Args)]
pub struct DatasetArgs {
    /// Dataset root containing image_pairs_mos.csv.
    #[arg(long)]
    pub root: Option<PathBuf>,
    /// Dataset layout: pipal, tid2008, tid2013, kadid10k.
    #[arg(long)]
    pub layout: Option<DatasetLayout>,
    /// Reference image ids to exclude (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub exclude_imgs: Option<Vec<i64>>,
    /// Ids to exclude through the distortion list (matched against reference ids).
    #[arg(long, value_delimiter = ',')]
    pub exclude_dist: Option<Vec<i64>>,
    /// Ids to exclude through the intensity list (matched against reference ids).
    #[arg(long, value_delimiter = ',')]
    pub exclude_ints: Option<Vec<i64>>,
}

impl ToolConfig {
    pub fn apply_overrides(&mut self, args: &DatasetArgs) {
        if let Some(root) = &args.root {
            self.dataset_root = root.clone();
        }
        if let Some(layout) = args.layout {
            self.layout = layout;
        }
        let excl = &mut self.exclusions;
        if let Some(ids) = &args.exclude_imgs {
            excl.images = Some(ids.iter().copied().collect());
        }
        if let Some(ids) = &args.exclude_dist {
            excl.distortions = Some(ids.iter().copied().collect());
        }
        if let Some(ids) = &args.exclude_ints {
            excl.intensities = Some(ids.iter().copied().collect());
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "iqa_summary",
    about = "Check an IQA dataset's metadata and image files, optionally decoding every sample"
)]
pub struct SummaryArgs {
    /// TOML config (defaults to $IQA_TOOLS_CONFIG or ./iqa-tools.toml).
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub dataset: DatasetArgs,
    /// Decode every sample and report score statistics.
    #[arg(long, default_value_t = false)]
    pub decode: bool,
}

impl SummaryArgs {
    /// Config file named by `--config` (or the default lookup), then the flags.
    pub fn resolve_config(&self) -> anyhow::Result<ToolConfig> {
        let mut cfg = match &self.config {
            Some(path) => ToolConfig::from_path(path)
                .with_context(|| format!("load config {}", path.display()))?,
            None => ToolConfig::load(),
        };
        cfg.apply_overrides(&self.dataset);
        Ok(cfg)
    }
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct DecodeStats {
    pub samples: usize,
    pub mos_min: Option<f32>,
    pub mos_max: Option<f32>,
    pub mos_mean: Option<f32>,
    pub off_spec_shapes: usize,
}

impl DecodeStats {
    /// Decode every sample of one pass; the first failing sample aborts.
    pub fn collect(builder: &DatasetBuilder) -> anyhow::Result<Self> {
        let spec = builder.element_spec();
        let mut stats = DecodeStats::default();
        let mut mos_sum = 0.0f64;
        for (i, sample) in builder.dataset().enumerate() {
            let sample = sample.with_context(|| format!("decode sample {i}"))?;
            stats.samples += 1;
            mos_sum += f64::from(sample.mos);
            stats.mos_min = Some(stats.mos_min.map_or(sample.mos, |m| m.min(sample.mos)));
            stats.mos_max = Some(stats.mos_max.map_or(sample.mos, |m| m.max(sample.mos)));
            if sample.reference.shape() != spec.reference
                || sample.distorted.shape() != spec.distorted
            {
                stats.off_spec_shapes += 1;
            }
        }
        if stats.samples > 0 {
            stats.mos_mean = Some((mos_sum / stats.samples as f64) as f32);
        }
        Ok(stats)
    }
}

/// Turn a failing report into an error so the binary exits non-zero.
pub fn ensure_passed(report: &ValidationReport) -> anyhow::Result<()> {
    if report.outcome == ValidationOutcome::Fail {
        bail!("dataset validation failed: {}", report.reasons.join("; "));
    }
    Ok(())
}
