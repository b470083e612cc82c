//! Dataset integrity checks that stat files without decoding them.

use crate::builder::DatasetBuilder;
use crate::layout::PathResolver;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub layout: String,
    pub rows: usize,
    pub distinct_references: usize,
    pub missing_reference: usize,
    pub missing_distorted: usize,
    pub malformed: usize,
}

impl DatasetSummary {
    pub fn missing(&self) -> usize {
        self.missing_reference + self.missing_distorted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationOutcome {
    Pass,
    Warn,
    Fail,
}

impl ValidationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationOutcome::Pass => "pass",
            ValidationOutcome::Warn => "warn",
            ValidationOutcome::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationThresholds {
    pub max_missing: Option<usize>,
    pub max_malformed: Option<usize>,
    pub max_missing_ratio: Option<f32>,
    pub max_malformed_ratio: Option<f32>,
}

impl ValidationThresholds {
    pub fn from_env() -> Self {
        fn parse<T: std::str::FromStr>(key: &str) -> Option<T> {
            std::env::var(key).ok()?.trim().parse().ok()
        }
        ValidationThresholds {
            max_missing: parse("IQA_DATASET_MAX_MISSING"),
            max_malformed: parse("IQA_DATASET_MAX_MALFORMED"),
            max_missing_ratio: parse("IQA_DATASET_MAX_MISSING_RATIO"),
            max_malformed_ratio: parse("IQA_DATASET_MAX_MALFORMED_RATIO"),
        }
    }

    /// Take each limit left unset here from `fallback`.
    pub fn fill_from(self, fallback: ValidationThresholds) -> Self {
        ValidationThresholds {
            max_missing: self.max_missing.or(fallback.max_missing),
            max_malformed: self.max_malformed.or(fallback.max_malformed),
            max_missing_ratio: self.max_missing_ratio.or(fallback.max_missing_ratio),
            max_malformed_ratio: self.max_malformed_ratio.or(fallback.max_malformed_ratio),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub outcome: ValidationOutcome,
    pub reasons: Vec<String>,
    pub summary: DatasetSummary,
}

/// Count rows whose image files are absent or whose fields cannot be used.
///
/// A row counts as malformed at most once, whichever of its fields is broken.
/// Missing files are only counted for rows whose paths resolve.
pub fn summarize(builder: &DatasetBuilder) -> DatasetSummary {
    let paths = builder.paths();
    let mut summary = DatasetSummary {
        layout: builder.layout().name.to_string(),
        ..Default::default()
    };
    let mut references = BTreeSet::new();
    for row in builder.table() {
        summary.rows += 1;
        if let Some(id) = row.reference_id() {
            references.insert(id);
        }
        let resolved = row
            .mos()
            .and_then(|_| Ok((paths.reference(row)?, paths.distorted(row)?)));
        let Ok((reference, distorted)) = resolved else {
            summary.malformed += 1;
            continue;
        };
        if !reference.is_file() {
            summary.missing_reference += 1;
        }
        if !distorted.is_file() {
            summary.missing_distorted += 1;
        }
    }
    summary.distinct_references = references.len();
    summary
}

/// One summary count held against its configured limits.
struct ThresholdCheck<'a> {
    label: &'a str,
    count: usize,
    rows: usize,
    max_count: Option<usize>,
    max_ratio: Option<f32>,
}

impl ThresholdCheck<'_> {
    fn ratio(&self) -> f32 {
        self.count as f32 / self.rows.max(1) as f32
    }

    /// Any count above zero downgrades a pass to a warning; a limit exceeded fails.
    fn apply(&self, report: &mut ValidationReport) {
        let Self { label, count, .. } = *self;
        let over_count = self.max_count.filter(|&max| count > max);
        let over_ratio = self.max_ratio.filter(|&max| self.ratio() > max);
        if let Some(max) = over_count {
            report.reasons.push(format!("{label}: {count} rows, limit {max}"));
        }
        if let Some(max) = over_ratio {
            let pct = self.ratio() * 100.0;
            report
                .reasons
                .push(format!("{label}: {pct:.1}% of rows, limit {:.1}%", max * 100.0));
        }
        if over_count.is_some() || over_ratio.is_some() {
            report.outcome = ValidationOutcome::Fail;
        } else if count > 0 {
            report.reasons.push(format!("{label}: {count} rows"));
            if report.outcome == ValidationOutcome::Pass {
                report.outcome = ValidationOutcome::Warn;
            }
        }
    }
}

pub fn validate_summary(
    summary: DatasetSummary,
    thresholds: &ValidationThresholds,
) -> ValidationReport {
    let checks = [
        ThresholdCheck {
            label: "missing image files",
            count: summary.missing(),
            rows: summary.rows,
            max_count: thresholds.max_missing,
            max_ratio: thresholds.max_missing_ratio,
        },
        ThresholdCheck {
            label: "malformed records",
            count: summary.malformed,
            rows: summary.rows,
            max_count: thresholds.max_malformed,
            max_ratio: thresholds.max_malformed_ratio,
        },
    ];
    let mut report = ValidationReport {
        outcome: ValidationOutcome::Pass,
        reasons: Vec::new(),
        summary,
    };
    for check in &checks {
        check.apply(&mut report);
    }
    report
}

pub fn summarize_with_thresholds(
    builder: &DatasetBuilder,
    thresholds: &ValidationThresholds,
) -> ValidationReport {
    validate_summary(summarize(builder), thresholds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(rows: usize, missing_distorted: usize, malformed: usize) -> DatasetSummary {
        DatasetSummary {
            layout: "tid2008".into(),
            rows,
            distinct_references: 1,
            missing_reference: 0,
            missing_distorted,
            malformed,
        }
    }

    #[test]
    fn clean_summary_passes() {
        let report = validate_summary(summary(10, 0, 0), &ValidationThresholds::default());
        assert_eq!(report.outcome, ValidationOutcome::Pass);
        assert!(report.reasons.is_empty());
    }

    #[test]
    fn observed_problems_warn_without_thresholds() {
        let report = validate_summary(summary(10, 2, 0), &ValidationThresholds::default());
        assert_eq!(report.outcome, ValidationOutcome::Warn);
        assert_eq!(report.reasons.len(), 1);
    }

    #[test]
    fn exceeded_ratio_fails() {
        let thresholds = ValidationThresholds {
            max_missing_ratio: Some(0.1),
            ..Default::default()
        };
        let report = validate_summary(summary(10, 2, 0), &thresholds);
        assert_eq!(report.outcome, ValidationOutcome::Fail);
        assert_eq!(report.reasons, vec!["missing image files: 20.0% of rows, limit 10.0%"]);
    }

    #[test]
    fn exceeded_count_fails() {
        let thresholds = ValidationThresholds {
            max_malformed: Some(0),
            ..Default::default()
        };
        let report = validate_summary(summary(4, 0, 1), &thresholds);
        assert_eq!(report.outcome, ValidationOutcome::Fail);
        assert_eq!(report.outcome.as_str(), "fail");
    }

    #[test]
    fn failure_is_not_downgraded_by_a_later_warning() {
        let thresholds = ValidationThresholds {
            max_missing: Some(1),
            ..Default::default()
        };
        let report = validate_summary(summary(10, 3, 2), &thresholds);
        assert_eq!(report.outcome, ValidationOutcome::Fail);
        assert_eq!(
            report.reasons,
            vec!["missing image files: 3 rows, limit 1", "malformed records: 2 rows"]
        );
        assert_eq!(report.summary.rows, 10);
    }

    #[test]
    fn unset_limits_are_filled_from_fallback() {
        let own = ValidationThresholds {
            max_missing: Some(2),
            ..Default::default()
        };
        let fallback = ValidationThresholds {
            max_missing: Some(9),
            max_malformed_ratio: Some(0.5),
            ..Default::default()
        };
        let merged = own.fill_from(fallback);
        assert_eq!(merged.max_missing, Some(2));
        assert_eq!(merged.max_malformed_ratio, Some(0.5));
        assert_eq!(merged.max_malformed, None);
    }
}
