use std::path::{Path, PathBuf};

use iqa_dataset::{DatasetLayout, ExclusionSet, ValidationThresholds};
use serde::Deserialize;
use tracing::warn;

const DEFAULT_CONFIG_NAME: &str = "iqa-tools.toml";
const CONFIG_ENV: &str = "IQA_TOOLS_CONFIG";

#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub dataset_root: PathBuf,
    pub layout: DatasetLayout,
    pub exclusions: ExclusionSet,
    pub thresholds: ValidationThresholds,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            dataset_root: PathBuf::from("datasets/tid2008"),
            layout: DatasetLayout::TID2008,
            exclusions: ExclusionSet::none(),
            thresholds: ValidationThresholds::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct ToolConfigFile {
    dataset_root: Option<String>,
    layout: Option<DatasetLayout>,
    exclude: Option<ExcludeSection>,
    thresholds: Option<ValidationThresholds>,
}

#[derive(Debug, Deserialize, Default)]
struct ExcludeSection {
    images: Option<Vec<i64>>,
    distortions: Option<Vec<i64>>,
    intensities: Option<Vec<i64>>,
}

impl ToolConfig {
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_NAME));
        let cfg = Self::from_path(&path)
            .unwrap_or_else(|| Self::from_file(ToolConfigFile::default()));
        cfg.warn_if_invalid();
        cfg
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let raw = std::fs::read_to_string(path).ok()?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Option<Self> {
        match toml::from_str::<ToolConfigFile>(raw) {
            Ok(file) => Some(Self::from_file(file)),
            Err(e) => {
                warn!(error = %e, "tools config: failed to parse; using defaults");
                None
            }
        }
    }

    /// Threshold keys absent from the file fall back to `IQA_DATASET_MAX_*`.
    fn from_file(file: ToolConfigFile) -> Self {
        let defaults = ToolConfig::default();
        let exclude = file.exclude.unwrap_or_default();
        let mut exclusions = ExclusionSet::none();
        if let Some(ids) = exclude.images {
            exclusions = exclusions.with_images(ids);
        }
        if let Some(ids) = exclude.distortions {
            exclusions = exclusions.with_distortions(ids);
        }
        if let Some(ids) = exclude.intensities {
            exclusions = exclusions.with_intensities(ids);
        }
        ToolConfig {
            dataset_root: file
                .dataset_root
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.dataset_root),
            layout: file.layout.unwrap_or(defaults.layout),
            exclusions,
            thresholds: file
                .thresholds
                .unwrap_or_default()
                .fill_from(ValidationThresholds::from_env()),
        }
    }

    fn warn_if_invalid(&self) {
        if self.dataset_root.as_os_str().is_empty() {
            warn!("tools config: dataset_root is empty; builders will look in the working directory");
        }
        if !self.dataset_root.join(self.layout.metadata_file).exists() {
            warn!(
                root = %self.dataset_root.display(),
                layout = self.layout.name,
                "tools config: metadata file not found under dataset_root"
            );
        }
    }
}

fn expand_path(raw: &str) -> PathBuf {
    let mut out = raw.to_string();
    if let Some(stripped) = out.strip_prefix('~') {
        if let Ok(home) = std::env::var("HOME") {
            out = format!("{home}{stripped}");
        }
    }
    PathBuf::from(expand_env(&out))
}

fn expand_env(input: &str) -> String {
    let mut out = String::new();
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match std::env::var(key) {
            Ok(val) => out.push_str(&val),
            Err(_) => out.push_str(&format!("${{{key}}}")),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variables_are_left_in_place() {
        assert_eq!(
            expand_env("/data/${IQA_TOOLS_SURELY_UNSET_VAR}/tid"),
            "/data/${IQA_TOOLS_SURELY_UNSET_VAR}/tid"
        );
        assert_eq!(expand_env("/data/${unterminated"), "/data/${unterminated");
        assert_eq!(expand_env("plain"), "plain");
    }

    #[test]
    fn set_variables_are_substituted() {
        if let Ok(home) = std::env::var("HOME") {
            assert_eq!(expand_env("${HOME}/iqa"), format!("{home}/iqa"));
        }
    }

    #[test]
    fn thresholds_missing_from_file_come_from_env() {
        std::env::set_var("IQA_DATASET_MAX_MISSING", "4");
        std::env::set_var("IQA_DATASET_MAX_MALFORMED_RATIO", "0.25");
        let from_env = ToolConfig::from_toml("layout = \"tid2013\"\n").unwrap();
        let from_file =
            ToolConfig::from_toml("[thresholds]\nmax_missing = 1\n").unwrap();
        std::env::remove_var("IQA_DATASET_MAX_MISSING");
        std::env::remove_var("IQA_DATASET_MAX_MALFORMED_RATIO");

        assert_eq!(from_env.thresholds.max_missing, Some(4));
        assert_eq!(from_env.thresholds.max_malformed_ratio, Some(0.25));
        assert_eq!(from_file.thresholds.max_missing, Some(1));
        assert_eq!(from_file.thresholds.max_malformed_ratio, Some(0.25));
    }
}
