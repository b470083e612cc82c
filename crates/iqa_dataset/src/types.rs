//! Core types, error definitions, and data structures for iqa_dataset.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, IqaDatasetError>;

#[derive(Debug, Error)]
pub enum IqaDatasetError {
    #[error("metadata file not found: {path}")]
    MissingMetadata { path: PathBuf },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv parse error at {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("malformed metadata record {record}: {msg}")]
    MalformedRow { record: usize, msg: String },
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// One record of `image_pairs_mos.csv`, kept as read.
///
/// Fields are only checked when a sample is generated for the row, so a table
/// with broken records still loads. `reference_id` is parsed eagerly because the
/// exclusion filter needs it; an unparseable id is `None` and never excluded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetadataRow {
    /// Position of the record among the data records of the file (header excluded).
    pub(crate) record: usize,
    pub(crate) reference_id: Option<i64>,
    pub(crate) reference: Option<String>,
    pub(crate) distorted: Option<String>,
    pub(crate) mos: Option<String>,
    pub(crate) directory: Option<String>,
}

impl MetadataRow {
    pub fn new(record: usize, reference_id: i64, reference: &str, distorted: &str, mos: f32) -> Self {
        Self {
            record,
            reference_id: Some(reference_id),
            reference: Some(reference.to_string()),
            distorted: Some(distorted.to_string()),
            mos: Some(mos.to_string()),
            directory: None,
        }
    }

    pub fn with_directory(mut self, directory: &str) -> Self {
        self.directory = Some(directory.to_string());
        self
    }

    pub fn record(&self) -> usize {
        self.record
    }

    pub fn reference_id(&self) -> Option<i64> {
        self.reference_id
    }

    pub fn reference(&self) -> DatasetResult<&str> {
        self.required("Reference", &self.reference)
    }

    pub fn distorted(&self) -> DatasetResult<&str> {
        self.required("Distorted", &self.distorted)
    }

    /// Sub-directory of the dataset root holding the distorted image (PIPAL only).
    pub fn directory(&self) -> DatasetResult<&str> {
        self.required("Directory", &self.directory)
    }

    pub fn mos(&self) -> DatasetResult<f32> {
        let raw = self.required("MOS", &self.mos)?;
        raw.parse::<f32>()
            .map_err(|e| self.malformed(format!("MOS {raw:?}: {e}")))
    }

    fn required<'a>(&self, column: &str, field: &'a Option<String>) -> DatasetResult<&'a str> {
        field
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| self.malformed(format!("missing {column}")))
    }

    pub(crate) fn malformed(&self, msg: String) -> IqaDatasetError {
        IqaDatasetError::MalformedRow {
            record: self.record,
            msg,
        }
    }
}

/// Identifiers used to drop rows at load time.
///
/// All three sets are matched against [`MetadataRow::reference_id`], including
/// `distortions` and `intensities`. That mirrors how the published builders
/// behave; the metadata tables carry no distortion-type or intensity column to
/// match against instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionSet {
    pub images: Option<BTreeSet<i64>>,
    pub distortions: Option<BTreeSet<i64>>,
    pub intensities: Option<BTreeSet<i64>>,
}

impl ExclusionSet {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_images<I: IntoIterator<Item = i64>>(mut self, ids: I) -> Self {
        self.images = Some(ids.into_iter().collect());
        self
    }

    pub fn with_distortions<I: IntoIterator<Item = i64>>(mut self, ids: I) -> Self {
        self.distortions = Some(ids.into_iter().collect());
        self
    }

    pub fn with_intensities<I: IntoIterator<Item = i64>>(mut self, ids: I) -> Self {
        self.intensities = Some(ids.into_iter().collect());
        self
    }

    /// True when no set was supplied.
    pub fn is_empty(&self) -> bool {
        self.images.is_none() && self.distortions.is_none() && self.intensities.is_none()
    }

    pub fn retains(&self, row: &MetadataRow) -> bool {
        let Some(id) = row.reference_id else {
            return true;
        };
        [&self.images, &self.distortions, &self.intensities]
            .into_iter()
            .flatten()
            .all(|set| !set.contains(&id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl ImageShape {
    pub const fn rgb(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            channels: 3,
        }
    }

    pub const fn dims(&self) -> [usize; 3] {
        [self.height, self.width, self.channels]
    }

    pub const fn num_elements(&self) -> usize {
        self.height * self.width * self.channels
    }
}

/// Declared contract for every element of a sequence: two images and a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub reference: ImageShape,
    pub distorted: ImageShape,
}

impl ElementSpec {
    /// Shape of the score component (a scalar).
    pub const fn score_dims(&self) -> [usize; 0] {
        []
    }
}

/// Decoded image, row-major HWC, RGB, normalized to [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageArray {
    pub data: Vec<f32>,
    pub width: u32,
    pub height: u32,
}

impl ImageArray {
    pub fn shape(&self) -> ImageShape {
        ImageShape::rgb(self.height as usize, self.width as usize)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IqaSample {
    pub reference: ImageArray,
    pub distorted: ImageArray,
    pub mos: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(reference_id: i64) -> MetadataRow {
        MetadataRow::new(0, reference_id, "r.png", "d.png", 1.0)
    }

    #[test]
    fn empty_exclusions_keep_everything() {
        let excl = ExclusionSet::none();
        assert!(excl.is_empty());
        assert!(excl.retains(&row(1)));
    }

    #[test]
    fn every_set_is_matched_against_reference_id() {
        assert!(!ExclusionSet::none().with_images([3]).retains(&row(3)));
        assert!(!ExclusionSet::none().with_distortions([3]).retains(&row(3)));
        assert!(!ExclusionSet::none().with_intensities([3]).retains(&row(3)));
        assert!(ExclusionSet::none().with_intensities([4]).retains(&row(3)));
    }

    #[test]
    fn empty_supplied_set_is_not_none() {
        let excl = ExclusionSet::none().with_images(Vec::new());
        assert!(!excl.is_empty());
        assert!(excl.retains(&row(1)));
    }

    #[test]
    fn unparsed_reference_id_is_never_excluded() {
        let row = MetadataRow {
            reference_id: None,
            ..row(3)
        };
        assert!(ExclusionSet::none().with_images([3]).retains(&row));
    }

    #[test]
    fn field_accessors_report_the_record() {
        let mut row = MetadataRow::new(4, 1, "r.png", "", 2.5);
        assert_eq!(row.reference().unwrap(), "r.png");
        assert!((row.mos().unwrap() - 2.5).abs() < 1e-6);
        assert!(matches!(
            row.distorted(),
            Err(IqaDatasetError::MalformedRow { record: 4, .. })
        ));
        assert!(row.directory().is_err());

        row.mos = Some("high".into());
        let err = row.mos().unwrap_err();
        assert!(err.to_string().contains("record 4"));
        row.mos = None;
        assert!(row.mos().is_err());
    }

    #[test]
    fn shape_elements() {
        let shape = ImageShape::rgb(384, 512);
        assert_eq!(shape.dims(), [384, 512, 3]);
        assert_eq!(shape.num_elements(), 384 * 512 * 3);
    }
}
