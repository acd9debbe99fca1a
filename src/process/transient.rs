//! Per-cycle input file handed to the checker.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::NamedTempFile;

/// Fixed prefix of every transient input file name
pub const FILE_PREFIX: &str = "perl-syntax-";

/// A snapshot written to the temporary directory, removed on drop
#[derive(Debug)]
pub struct TransientInput {
    file: Option<NamedTempFile>,
    path: PathBuf,
}

impl TransientInput {
    /// Write `text` to a new file in the platform temporary directory
    pub fn create(text: &str) -> io::Result<Self> {
        Self::create_in(&std::env::temp_dir(), text)
    }

    pub fn create_in(dir: &Path, text: &str) -> io::Result<Self> {
        let prefix = format!("{FILE_PREFIX}{}-", timestamp_nanos());
        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".pl")
            .tempfile_in(dir)?;

        file.write_all(text.as_bytes())?;
        file.flush()?;

        let path = file.path().to_path_buf();
        Ok(Self {
            file: Some(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path as it appears in checker output
    pub fn display_path(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// Delete the file now, logging instead of failing
    pub fn remove(mut self) {
        self.remove_file();
    }

    fn remove_file(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = file.close() {
                log::warn!(
                    "Failed to remove transient input {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

impl Drop for TransientInput {
    fn drop(&mut self) {
        self.remove_file();
    }
}

fn timestamp_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}
