//! Lazy sample generation: one decoded (reference, distorted, MOS) triple per row.

use crate::layout::PathResolver;
use crate::metadata::MetadataTable;
use crate::types::{DatasetResult, ImageArray, IqaDatasetError, IqaSample, MetadataRow};
use std::iter::FusedIterator;
use std::path::Path;
use tracing::{trace, warn};

/// Decode an image as 8-bit RGB and scale it to [0, 1].
pub fn decode_rgb(path: &Path) -> DatasetResult<ImageArray> {
    let img = image::open(path)
        .map_err(|e| IqaDatasetError::Image {
            path: path.to_path_buf(),
            source: e,
        })?
        .to_rgb8();
    let (width, height) = img.dimensions();
    let data = img
        .into_raw()
        .into_iter()
        .map(|v| f32::from(v) / 255.0)
        .collect();
    Ok(ImageArray {
        data,
        width,
        height,
    })
}

/// Resolve and decode both images of `row`.
pub fn load_sample<R: PathResolver + ?Sized>(
    row: &MetadataRow,
    resolver: &R,
) -> DatasetResult<IqaSample> {
    let mos = row.mos()?;
    let distorted = decode_rgb(&resolver.distorted(row)?)?;
    let reference = decode_rgb(&resolver.reference(row)?)?;
    Ok(IqaSample {
        reference,
        distorted,
        mos,
    })
}

/// Start a pass over `table`. Every call re-reads the images from disk.
pub fn generate<'a, R: PathResolver + ?Sized>(
    table: &'a MetadataTable,
    resolver: &'a R,
) -> SampleIter<'a, R> {
    SampleIter {
        rows: table.iter(),
        resolver,
        finished: false,
    }
}

/// Pull-based pass over a metadata table.
///
/// The first error is yielded and ends the pass.
pub struct SampleIter<'a, R: ?Sized> {
    rows: std::slice::Iter<'a, MetadataRow>,
    resolver: &'a R,
    finished: bool,
}

impl<R: PathResolver + ?Sized> Iterator for SampleIter<'_, R> {
    type Item = DatasetResult<IqaSample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let Some(row) = self.rows.next() else {
            self.finished = true;
            return None;
        };
        match load_sample(row, self.resolver) {
            Ok(sample) => {
                trace!(record = row.record(), mos = sample.mos, "decoded sample");
                Some(Ok(sample))
            }
            Err(e) => {
                self.finished = true;
                warn!(record = row.record(), error = %e, "sample pass stopped");
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            (0, Some(0))
        } else {
            (0, Some(self.rows.len()))
        }
    }
}

impl<R: PathResolver + ?Sized> FusedIterator for SampleIter<'_, R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;

    struct FlatDir(PathBuf);

    impl PathResolver for FlatDir {
        fn reference(&self, row: &MetadataRow) -> DatasetResult<PathBuf> {
            Ok(self.0.join(row.reference()?))
        }
        fn distorted(&self, row: &MetadataRow) -> DatasetResult<PathBuf> {
            Ok(self.0.join(row.distorted()?))
        }
    }

    fn row(record: usize, reference: &str, distorted: &str, mos: f32) -> MetadataRow {
        MetadataRow::new(record, 1, reference, distorted, mos)
    }

    #[test]
    fn decodes_rgb_in_unit_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(0, 0, Rgb([255, 0, 51]));
        img.put_pixel(2, 1, Rgb([0, 255, 0]));
        let path = dir.path().join("a.png");
        img.save(&path).unwrap();

        let arr = decode_rgb(&path).unwrap();
        assert_eq!((arr.width, arr.height), (3, 2));
        assert_eq!(arr.data.len(), 3 * 2 * 3);
        assert_eq!(&arr.data[0..3], &[1.0, 0.0, 0.2]);
        let last = (3 + 2) * 3;
        assert_eq!(&arr.data[last..last + 3], &[0.0, 1.0, 0.0]);
        assert!(arr.data.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = decode_rgb(&dir.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, IqaDatasetError::Image { .. }));
    }

    #[test]
    fn pass_stops_after_first_error() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::new(2, 2).save(dir.path().join("r.png")).unwrap();
        RgbImage::new(2, 2).save(dir.path().join("d.png")).unwrap();
        let table = MetadataTable::from_rows(
            dir.path().join("meta.csv"),
            vec![
                row(0, "r.png", "d.png", 4.5),
                row(1, "r.png", "gone.png", 3.0),
                row(2, "r.png", "d.png", 2.0),
            ],
        );
        let resolver = FlatDir(dir.path().to_path_buf());
        let mut iter = generate(&table, &resolver);
        let first = iter.next().unwrap().unwrap();
        assert_eq!(first.mos, 4.5);
        assert!(matches!(iter.next(), Some(Err(IqaDatasetError::Image { .. }))));
        assert!(iter.next().is_none());
        assert_eq!(iter.size_hint(), (0, Some(0)));
    }

    #[test]
    fn unparseable_score_is_malformed_before_decoding() {
        let dir = tempfile::tempdir().unwrap();
        let mut broken = row(3, "r.png", "never-written.png", 0.0);
        broken.mos = Some("n/a".into());
        let err = load_sample(&broken, &FlatDir(dir.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, IqaDatasetError::MalformedRow { record: 3, .. }));
    }
}
