//! Loading and filtering of `image_pairs_mos.csv` metadata tables.

use crate::types::{DatasetResult, ExclusionSet, IqaDatasetError, MetadataRow};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Rows of a metadata file, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataTable {
    source: PathBuf,
    rows: Vec<MetadataRow>,
}

impl MetadataTable {
    pub fn from_rows(source: impl Into<PathBuf>, rows: Vec<MetadataRow>) -> Self {
        Self {
            source: source.into(),
            rows,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn rows(&self) -> &[MetadataRow] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MetadataRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Drop rows rejected by `exclusions`. Relative order is kept.
    pub fn filter(mut self, exclusions: &ExclusionSet) -> Self {
        if !exclusions.is_empty() {
            self.rows.retain(|row| exclusions.retains(row));
        }
        self
    }
}

impl<'a> IntoIterator for &'a MetadataTable {
    type Item = &'a MetadataRow;
    type IntoIter = std::slice::Iter<'a, MetadataRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Header positions of the columns a row is built from.
struct Columns {
    reference_id: Option<usize>,
    reference: Option<usize>,
    distorted: Option<usize>,
    mos: Option<usize>,
    directory: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h == name);
        Self {
            reference_id: find("Reference_ID"),
            reference: find("Reference"),
            distorted: find("Distorted"),
            mos: find("MOS"),
            directory: find("Directory"),
        }
    }

    fn row(&self, record: usize, fields: &csv::StringRecord) -> MetadataRow {
        let text = |column: Option<usize>| {
            column
                .and_then(|i| fields.get(i))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        MetadataRow {
            record,
            reference_id: text(self.reference_id).and_then(|v| v.parse().ok()),
            reference: text(self.reference),
            distorted: text(self.distorted),
            mos: text(self.mos),
            directory: text(self.directory),
        }
    }
}

/// Read a metadata CSV into memory and apply `exclusions`.
///
/// Records are kept as text; a record with a missing or unparseable field only
/// fails when a sample is generated for it.
pub fn load_metadata(path: &Path, exclusions: &ExclusionSet) -> DatasetResult<MetadataTable> {
    if !path.exists() {
        return Err(IqaDatasetError::MissingMetadata {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|e| IqaDatasetError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let csv_err = |e: csv::Error| IqaDatasetError::Csv {
        path: path.to_path_buf(),
        source: e,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);
    let columns = Columns::from_headers(reader.headers().map_err(csv_err)?);

    let mut rows = Vec::new();
    for (record, fields) in reader.records().enumerate() {
        rows.push(columns.row(record, &fields.map_err(csv_err)?));
    }
    let total = rows.len();
    let table = MetadataTable::from_rows(path, rows).filter(exclusions);
    debug!(
        path = %path.display(),
        total,
        kept = table.len(),
        dropped = total - table.len(),
        "loaded metadata table"
    );
    Ok(table)
}
