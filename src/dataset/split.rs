//! Train/validation split.
//!
//! The full CSV index is shuffled, truncated to a fixed-size sample pool,
//! and split into disjoint train and validation subsets by ratio. A seeded
//! ChaCha8 RNG makes the whole shuffle/split reproducible; without a seed
//! the RNG draws from OS entropy.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::dataset::records::ImageRecord;
use crate::utils::error::{MelanetError, Result};

/// Default size of the subsampled training pool
pub const DEFAULT_SAMPLE_CAP: usize = 25_000;

/// Options controlling the shuffle/subsample/split
#[derive(Debug, Clone)]
pub struct SplitOptions {
    /// Fraction of the pool held out for validation, in (0, 1)
    pub validation_ratio: f64,
    /// Fixed pool size drawn from the shuffled index
    pub sample_cap: usize,
    /// RNG seed; `None` uses OS entropy
    pub seed: Option<u64>,
}

/// Disjoint train and validation record sets
#[derive(Debug)]
pub struct DatasetSplit {
    pub train: Vec<ImageRecord>,
    pub validation: Vec<ImageRecord>,
}

/// Shuffle the index, draw a fixed-size pool, and split it by ratio.
///
/// The index must contain at least `sample_cap` rows; a smaller index is a
/// fatal error rather than a silently smaller run.
pub fn prepare_split(mut records: Vec<ImageRecord>, options: &SplitOptions) -> Result<DatasetSplit> {
    if records.len() < options.sample_cap {
        return Err(MelanetError::Dataset(format!(
            "index has {} rows but sample_cap is {}",
            records.len(),
            options.sample_cap
        )));
    }
    if !(options.validation_ratio > 0.0 && options.validation_ratio < 1.0) {
        return Err(MelanetError::Dataset(format!(
            "validation_ratio must be in (0, 1), got {}",
            options.validation_ratio
        )));
    }

    let mut rng = match options.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    records.shuffle(&mut rng);
    records.truncate(options.sample_cap);

    let val_size = (options.sample_cap as f64 * options.validation_ratio).round() as usize;
    let validation = records.split_off(options.sample_cap - val_size);
    let train = records;

    info!(
        "Split pool of {}: {} train / {} validation",
        options.sample_cap,
        train.len(),
        validation.len()
    );

    Ok(DatasetSplit { train, validation })
}
