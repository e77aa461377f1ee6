//! Burn dataset and batcher for the lesion image index.
//!
//! Images are loaded lazily from disk in `Dataset::get`, resized to a square,
//! converted to CHW floats in [0, 1], and batched into normalized tensors
//! with ImageNet statistics.

use std::path::{Path, PathBuf};

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use image::imageops::FilterType;
use image::ImageReader;
use serde::{Deserialize, Serialize};

use crate::dataset::records::ImageRecord;
use crate::utils::error::{MelanetError, Result};

/// ImageNet channel means used for input normalization
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet channel standard deviations
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// A single lesion image ready for batching
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LesionItem {
    /// Image data as flattened CHW float array [3 * H * W], in [0, 1]
    pub image: Vec<f32>,
    /// Class label
    pub label: usize,
    /// Source path (for debugging/logging)
    pub path: String,
}

impl LesionItem {
    /// Load and preprocess an image from disk
    pub fn from_path(path: &Path, label: usize, image_size: usize) -> Result<Self> {
        let img = ImageReader::open(path)
            .map_err(|e| MelanetError::Dataset(format!("{}: {}", path.display(), e)))?
            .decode()
            .map_err(|e| MelanetError::Dataset(format!("{}: {}", path.display(), e)))?
            .resize_exact(image_size as u32, image_size as u32, FilterType::Triangle)
            .to_rgb8();

        let (width, height) = (image_size, image_size);
        let mut image = vec![0.0f32; 3 * height * width];

        // CHW layout, scaled to [0, 1]
        for y in 0..height {
            for x in 0..width {
                let pixel = img.get_pixel(x as u32, y as u32);
                image[y * width + x] = pixel[0] as f32 / 255.0;
                image[height * width + y * width + x] = pixel[1] as f32 / 255.0;
                image[2 * height * width + y * width + x] = pixel[2] as f32 / 255.0;
            }
        }

        Ok(Self {
            image,
            label,
            path: path.to_string_lossy().to_string(),
        })
    }

    /// Create from pre-loaded image data
    pub fn from_data(image: Vec<f32>, label: usize, path: String) -> Self {
        Self { image, label, path }
    }
}

/// Lazily-loading dataset over (image path, label) pairs
#[derive(Debug, Clone)]
pub struct LesionDataset {
    samples: Vec<(PathBuf, usize)>,
    image_size: usize,
}

impl LesionDataset {
    /// Build a dataset from CSV records resolved against an image directory.
    ///
    /// Every referenced file is checked for existence up front; a missing
    /// image aborts the run instead of surfacing mid-epoch.
    pub fn from_records(
        records: &[ImageRecord],
        data_path: &Path,
        image_size: usize,
    ) -> Result<Self> {
        let mut samples = Vec::with_capacity(records.len());
        for record in records {
            let path = record.image_path(data_path);
            if !path.is_file() {
                return Err(MelanetError::MissingImage(path));
            }
            samples.push((path, record.target));
        }

        Ok(Self {
            samples,
            image_size,
        })
    }

    /// Build a dataset from already-resolved samples (no existence check)
    pub fn new(samples: Vec<(PathBuf, usize)>, image_size: usize) -> Self {
        Self {
            samples,
            image_size,
        }
    }

    /// Load one sample, failing with the offending path on a decode error.
    ///
    /// Batch assembly goes through this so a corrupt file aborts the run
    /// instead of silently shrinking the epoch.
    pub fn try_get(&self, index: usize) -> Result<LesionItem> {
        let (path, label) = self.samples.get(index).ok_or_else(|| {
            MelanetError::Dataset(format!("sample index {} out of range", index))
        })?;
        LesionItem::from_path(path, *label, self.image_size)
    }

    /// Per-class sample counts
    pub fn class_distribution(&self, num_classes: usize) -> Vec<usize> {
        let mut counts = vec![0usize; num_classes];
        for (_, label) in &self.samples {
            if *label < num_classes {
                counts[*label] += 1;
            }
        }
        counts
    }
}

impl Dataset<LesionItem> for LesionDataset {
    fn get(&self, index: usize) -> Option<LesionItem> {
        self.try_get(index).ok()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// A batch of lesion images
#[derive(Clone, Debug)]
pub struct LesionBatch<B: Backend> {
    /// Images with shape [batch_size, 3, height, width], ImageNet-normalized
    pub images: Tensor<B, 4>,
    /// Labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher turning [`LesionItem`]s into normalized tensor batches
#[derive(Clone, Debug, Default)]
pub struct LesionBatcher {
    image_size: usize,
}

impl LesionBatcher {
    pub fn new(image_size: usize) -> Self {
        Self { image_size }
    }
}

impl<B: Backend> Batcher<B, LesionItem, LesionBatch<B>> for LesionBatcher {
    fn batch(&self, items: Vec<LesionItem>, device: &B::Device) -> LesionBatch<B> {
        let batch_size = items.len();
        let channels = 3;
        let height = self.image_size;
        let width = self.image_size;

        let images_data: Vec<f32> = items.iter().flat_map(|item| item.image.clone()).collect();

        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, channels, height, width]),
            device,
        );

        // (x - mean) / std with broadcast over [1, 3, 1, 1]
        let mean = Tensor::<B, 4>::from_floats(
            TensorData::new(IMAGENET_MEAN.to_vec(), [1, 3, 1, 1]),
            device,
        );
        let std = Tensor::<B, 4>::from_floats(
            TensorData::new(IMAGENET_STD.to_vec(), [1, 3, 1, 1]),
            device,
        );
        let images = (images - mean) / std;

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        LesionBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_item_from_data() {
        let image = vec![0.5f32; 3 * 128 * 128];
        let item = LesionItem::from_data(image, 1, "ISIC_0001.jpg".to_string());

        assert_eq!(item.label, 1);
        assert_eq!(item.image.len(), 3 * 128 * 128);
    }

    #[test]
    fn test_missing_image_fails_preflight() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![ImageRecord {
            image_name: "ISIC_9999".to_string(),
            target: 0,
        }];

        let err = LesionDataset::from_records(&records, dir.path(), 128).unwrap_err();
        match err {
            MelanetError::MissingImage(path) => {
                assert!(path.to_string_lossy().ends_with("ISIC_9999.jpg"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_preflight_accepts_existing_images() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ISIC_0001.jpg"), b"stub").unwrap();

        let records = vec![ImageRecord {
            image_name: "ISIC_0001".to_string(),
            target: 1,
        }];

        let dataset = LesionDataset::from_records(&records, dir.path(), 128).unwrap();
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn test_corrupt_image_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // Exists on disk (passes the preflight) but is not a decodable image.
        std::fs::write(dir.path().join("ISIC_0002.jpg"), b"not a jpeg").unwrap();

        let records = vec![ImageRecord {
            image_name: "ISIC_0002".to_string(),
            target: 0,
        }];
        let dataset = LesionDataset::from_records(&records, dir.path(), 16).unwrap();

        let err = dataset.try_get(0).unwrap_err();
        match err {
            MelanetError::Dataset(msg) => assert!(msg.contains("ISIC_0002.jpg")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_batcher_shapes_and_normalization() {
        let size = 8;
        let items = vec![
            LesionItem::from_data(vec![0.485f32; 3 * size * size], 0, "a.jpg".to_string()),
            LesionItem::from_data(vec![0.485f32; 3 * size * size], 1, "b.jpg".to_string()),
        ];

        let batcher = LesionBatcher::new(size);
        let device = Default::default();
        let batch: LesionBatch<NdArray> = batcher.batch(items, &device);

        assert_eq!(batch.images.dims(), [2, 3, size, size]);
        assert_eq!(batch.targets.dims(), [2]);

        // Red channel equals the ImageNet mean, so it normalizes to zero
        let red = batch
            .images
            .clone()
            .slice([0..1, 0..1, 0..1, 0..1])
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert!(red[0].abs() < 1e-5);
    }

    #[test]
    fn test_class_distribution() {
        let samples = vec![
            (PathBuf::from("a.jpg"), 0),
            (PathBuf::from("b.jpg"), 0),
            (PathBuf::from("c.jpg"), 1),
        ];
        let dataset = LesionDataset::new(samples, 128);
        assert_eq!(dataset.class_distribution(2), vec![2, 1]);
    }
}
