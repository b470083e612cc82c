//! On-disk layouts of the supported benchmarks and path resolution for their rows.

use crate::types::{DatasetResult, ElementSpec, ImageShape, MetadataRow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const METADATA_FILE: &str = "image_pairs_mos.csv";

/// Where distorted images live relative to the dataset root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistortedDir {
    /// A single directory for every row.
    Fixed(&'static str),
    /// `root/<row.directory>`.
    PerRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetLayout {
    pub name: &'static str,
    pub metadata_file: &'static str,
    pub reference_dir: &'static str,
    pub distorted_dir: DistortedDir,
    pub shape: ImageShape,
}

impl DatasetLayout {
    pub const PIPAL: DatasetLayout = DatasetLayout {
        name: "pipal",
        metadata_file: METADATA_FILE,
        reference_dir: "Train_Ref",
        distorted_dir: DistortedDir::PerRow,
        shape: ImageShape::rgb(288, 288),
    };

    pub const TID2008: DatasetLayout = DatasetLayout {
        name: "tid2008",
        metadata_file: METADATA_FILE,
        reference_dir: "reference_images",
        distorted_dir: DistortedDir::Fixed("distorted_images"),
        shape: ImageShape::rgb(384, 512),
    };

    pub const TID2013: DatasetLayout = DatasetLayout {
        name: "tid2013",
        ..Self::TID2008
    };

    pub const KADID10K: DatasetLayout = DatasetLayout {
        name: "kadid10k",
        ..Self::TID2008
    };

    pub const ALL: [DatasetLayout; 4] = [Self::PIPAL, Self::TID2008, Self::TID2013, Self::KADID10K];

    pub fn element_spec(&self) -> ElementSpec {
        ElementSpec {
            reference: self.shape,
            distorted: self.shape,
        }
    }

    pub fn metadata_path(&self, root: &Path) -> PathBuf {
        root.join(self.metadata_file)
    }

    pub fn paths(&self, root: impl Into<PathBuf>) -> LayoutPaths {
        LayoutPaths::new(root.into(), *self)
    }
}

impl FromStr for DatasetLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        Self::ALL
            .into_iter()
            .find(|layout| layout.name == key)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|l| l.name).collect();
                format!("unknown dataset layout {s:?} (expected one of {})", known.join(", "))
            })
    }
}

impl Serialize for DatasetLayout {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

impl<'de> Deserialize<'de> for DatasetLayout {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Maps a metadata row to the files it names.
pub trait PathResolver {
    fn reference(&self, row: &MetadataRow) -> DatasetResult<PathBuf>;
    fn distorted(&self, row: &MetadataRow) -> DatasetResult<PathBuf>;
}

/// A layout anchored at a dataset root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPaths {
    root: PathBuf,
    reference_dir: PathBuf,
    layout: DatasetLayout,
}

impl LayoutPaths {
    pub fn new(root: PathBuf, layout: DatasetLayout) -> Self {
        let reference_dir = root.join(layout.reference_dir);
        Self {
            root,
            reference_dir,
            layout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn reference_dir(&self) -> &Path {
        &self.reference_dir
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.layout.metadata_path(&self.root)
    }
}

impl PathResolver for LayoutPaths {
    fn reference(&self, row: &MetadataRow) -> DatasetResult<PathBuf> {
        Ok(self.reference_dir.join(row.reference()?))
    }

    fn distorted(&self, row: &MetadataRow) -> DatasetResult<PathBuf> {
        let file = row.distorted()?;
        match self.layout.distorted_dir {
            DistortedDir::Fixed(dir) => Ok(self.root.join(dir).join(file)),
            DistortedDir::PerRow => Ok(self.root.join(row.directory()?).join(file)),
        }
    }
}
