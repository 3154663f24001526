
//! Persists decoded messages as timestamped JSON files.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Local};

use crate::error::ProcessorError;
use crate::handler::MessageHandler;

/// Timestamp layout for output filenames: date, time, microseconds.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";

/// Writes each message to its own file in the output folder.
///
/// Filenames are `<timestamp>_<routing_key>.json`; uniqueness relies on the
/// microsecond-resolution timestamp together with the routing key.
pub struct FileArchive {
    output_folder: PathBuf,
}

impl FileArchive {
    /// Creates the archive, making sure the output folder exists.
    pub fn new(output_folder: impl Into<PathBuf>) -> Result<Self, ProcessorError> {
        let output_folder = output_folder.into();
        fs::create_dir_all(&output_folder)?;
        log::info!("Output folder created/verified: {}", output_folder.display());
        Ok(Self { output_folder })
    }

    /// Decodes `payload` as JSON and writes it pretty-printed to a fresh
    /// file named after the current local timestamp and `routing_key`.
    ///
    /// Returns the path of the written file. No file is created if the
    /// payload fails to decode.
    pub fn persist(&self, routing_key: &str, payload: &[u8]) -> Result<PathBuf, ProcessorError> {
        let message: serde_json::Value = serde_json::from_slice(payload)?;
        let filename = archive_filename(Local::now(), routing_key);
        let path = self.output_folder.join(filename);

        // Exclusive create: a filename collision is an error, never an overwrite.
        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        file.write_all(serde_json::to_string_pretty(&message)?.as_bytes())?;
        Ok(path)
    }
}

#[async_trait]
impl MessageHandler for FileArchive {
    async fn handle(&self, routing_key: &str, payload: &[u8]) -> Result<(), ProcessorError> {
        let path = self.persist(routing_key, payload)?;
        if let Some(filename) = path.file_name() {
            log::info!("Message saved: {}", filename.to_string_lossy());
        }
        Ok(())
    }

    fn handler_name(&self) -> &str {
        "file_archive"
    }
}

/// Builds `<timestamp>_<routing_key>.json` for a message received at `at`.
fn archive_filename(at: DateTime<Local>, routing_key: &str) -> String {
    format!("{}_{}.json", at.format(TIMESTAMP_FORMAT), routing_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use std::path::Path;
    use tempfile::tempdir;

    fn archive_in(dir: &Path) -> FileArchive {
        FileArchive::new(dir).unwrap()
    }

    #[test]
    fn test_persist_writes_pretty_json() {
        let dir = tempdir().unwrap();
        let archive = archive_in(dir.path());
        let payload = br#"{"amount": 42, "category": "food"}"#;

        let path = archive.persist("expense.food", payload).unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with("_expense.food.json"), "unexpected name: {name}");

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\n  \"amount\": 42,\n  \"category\": \"food\"\n}");

        let reparsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        let original: serde_json::Value = serde_json::from_slice(payload).unwrap();
        assert_eq!(reparsed, original);
    }

    #[test]
    fn test_persist_preserves_key_order() {
        let dir = tempdir().unwrap();
        let archive = archive_in(dir.path());

        let path = archive
            .persist("expense.misc", br#"{"zebra": 1, "apple": 2}"#)
            .unwrap();

        let written = fs::read_to_string(path).unwrap();
        assert_eq!(written, "{\n  \"zebra\": 1,\n  \"apple\": 2\n}");
    }

    #[test]
    fn test_invalid_json_creates_no_file() {
        let dir = tempdir().unwrap();
        let archive = archive_in(dir.path());

        let result = archive.persist("expense.travel", b"{not json");

        assert!(matches!(result, Err(ProcessorError::Decode(_))));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_invalid_utf8_creates_no_file() {
        let dir = tempdir().unwrap();
        let archive = archive_in(dir.path());

        let result = archive.persist("expense.travel", &[0xff, 0xfe, 0x93]);

        assert!(matches!(result, Err(ProcessorError::Decode(_))));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_distinct_routing_keys_get_distinct_files() {
        let dir = tempdir().unwrap();
        let archive = archive_in(dir.path());

        let first = archive.persist("expense.food", br#"{"amount": 1}"#).unwrap();
        let second = archive.persist("expense.travel", br#"{"amount": 2}"#).unwrap();

        assert_ne!(first, second);
        assert!(first.exists());
        assert!(second.exists());
    }

    #[test]
    fn test_output_folder_creation_is_idempotent() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("out").join("messages");

        FileArchive::new(&nested).unwrap();
        FileArchive::new(&nested).unwrap();

        assert!(nested.is_dir());
    }

    #[test]
    fn test_archive_filename_format() {
        let at = Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .unwrap()
            .with_nanosecond(123_456_000)
            .unwrap();

        assert_eq!(
            archive_filename(at, "expense.food"),
            "20240309_140507_123456_expense.food.json"
        );
    }
}
