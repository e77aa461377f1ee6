//! CSV index loading.
//!
//! The dataset is described by a CSV file with an `image_name` column holding
//! file stems (no extension) and an integer `target` label. Stems get the
//! `.jpg` extension appended when resolved against the image directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::utils::error::Result;

/// Extension appended to every CSV image stem
pub const IMAGE_EXTENSION: &str = "jpg";

/// One row of the CSV index
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ImageRecord {
    /// File stem without extension, e.g. `ISIC_0015719`
    pub image_name: String,
    /// Integer class label
    pub target: usize,
}

impl ImageRecord {
    /// Resolve the record to a full image path under `data_path`
    pub fn image_path(&self, data_path: &Path) -> PathBuf {
        data_path.join(format!("{}.{}", self.image_name, IMAGE_EXTENSION))
    }
}

/// Load all records from a CSV index file.
///
/// Any row that fails to parse is a fatal error; partial indexes are not
/// silently accepted.
pub fn load_records(csv_path: &Path) -> Result<Vec<ImageRecord>> {
    let mut reader = csv::Reader::from_path(csv_path)?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: ImageRecord = row?;
        records.push(record);
    }

    info!(
        "Loaded {} records from {}",
        records.len(),
        csv_path.display()
    );

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_records() {
        let file = write_csv("image_name,target\nISIC_0001,0\nISIC_0002,1\n");
        let records = load_records(file.path()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].image_name, "ISIC_0001");
        assert_eq!(records[0].target, 0);
        assert_eq!(records[1].target, 1);
    }

    #[test]
    fn test_image_path_appends_extension() {
        let record = ImageRecord {
            image_name: "ISIC_0001".to_string(),
            target: 0,
        };
        let path = record.image_path(Path::new("/data/train"));
        assert_eq!(path, PathBuf::from("/data/train/ISIC_0001.jpg"));
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let file = write_csv("image_name,patient_id,target\nISIC_0001,IP_123,1\n");
        let records = load_records(file.path()).unwrap();
        assert_eq!(records[0].target, 1);
    }

    #[test]
    fn test_malformed_row_is_fatal() {
        let file = write_csv("image_name,target\nISIC_0001,not_a_number\n");
        assert!(load_records(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_fatal() {
        assert!(load_records(Path::new("/nonexistent/index.csv")).is_err());
    }
}
