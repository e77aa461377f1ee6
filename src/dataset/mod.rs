//! Dataset handling: CSV index loading, train/validation split, and Burn
//! dataset/batcher integration.

pub mod batcher;
pub mod records;
pub mod split;

pub use batcher::{LesionBatch, LesionBatcher, LesionDataset, LesionItem};
pub use records::{load_records, ImageRecord, IMAGE_EXTENSION};
pub use split::{prepare_split, DatasetSplit, SplitOptions, DEFAULT_SAMPLE_CAP};
