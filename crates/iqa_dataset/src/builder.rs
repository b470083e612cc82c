//! Dataset builders: a metadata table bound to a benchmark layout.

use crate::generator::{generate, load_sample, SampleIter};
use crate::layout::{DatasetLayout, LayoutPaths};
use crate::metadata::{load_metadata, MetadataTable};
use crate::types::{DatasetResult, ElementSpec, ExclusionSet, IqaSample};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Builder for one benchmark rooted at a directory.
///
/// The metadata table is read and filtered once, at construction. Every call to
/// [`DatasetBuilder::dataset`] starts a fresh pass that decodes images from disk.
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    paths: LayoutPaths,
    table: MetadataTable,
}

impl DatasetBuilder {
    pub fn new(
        root: impl AsRef<Path>,
        layout: DatasetLayout,
        exclusions: &ExclusionSet,
    ) -> DatasetResult<Self> {
        let paths = layout.paths(PathBuf::from(root.as_ref()));
        let table = load_metadata(&paths.metadata_path(), exclusions)?;
        debug!(
            layout = layout.name,
            root = %paths.root().display(),
            rows = table.len(),
            "dataset builder ready"
        );
        Ok(Self { paths, table })
    }

    pub fn pipal(root: impl AsRef<Path>, exclusions: &ExclusionSet) -> DatasetResult<Self> {
        Self::new(root, DatasetLayout::PIPAL, exclusions)
    }

    pub fn tid2008(root: impl AsRef<Path>, exclusions: &ExclusionSet) -> DatasetResult<Self> {
        Self::new(root, DatasetLayout::TID2008, exclusions)
    }

    pub fn tid2013(root: impl AsRef<Path>, exclusions: &ExclusionSet) -> DatasetResult<Self> {
        Self::new(root, DatasetLayout::TID2013, exclusions)
    }

    pub fn kadid10k(root: impl AsRef<Path>, exclusions: &ExclusionSet) -> DatasetResult<Self> {
        Self::new(root, DatasetLayout::KADID10K, exclusions)
    }

    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    pub fn layout(&self) -> &DatasetLayout {
        self.paths.layout()
    }

    pub fn paths(&self) -> &LayoutPaths {
        &self.paths
    }

    pub fn table(&self) -> &MetadataTable {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn element_spec(&self) -> ElementSpec {
        self.layout().element_spec()
    }

    /// New lazy pass over every retained row.
    pub fn dataset(&self) -> IqaDataset<'_> {
        IqaDataset {
            spec: self.element_spec(),
            samples: generate(&self.table, &self.paths),
        }
    }

    /// Decode the sample at `index`, or `None` past the end of the table.
    pub fn get(&self, index: usize) -> Option<DatasetResult<IqaSample>> {
        let row = self.table.rows().get(index)?;
        Some(load_sample(row, &self.paths))
    }
}

/// One pass over a builder's samples, tagged with the declared element shapes.
pub struct IqaDataset<'a> {
    spec: ElementSpec,
    samples: SampleIter<'a, LayoutPaths>,
}

impl IqaDataset<'_> {
    pub fn element_spec(&self) -> ElementSpec {
        self.spec
    }
}

impl Iterator for IqaDataset<'_> {
    type Item = DatasetResult<IqaSample>;

    fn next(&mut self) -> Option<Self::Item> {
        self.samples.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.samples.size_hint()
    }
}

impl std::iter::FusedIterator for IqaDataset<'_> {}

impl<'a> IntoIterator for &'a DatasetBuilder {
    type Item = DatasetResult<IqaSample>;
    type IntoIter = IqaDataset<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.dataset()
    }
}
