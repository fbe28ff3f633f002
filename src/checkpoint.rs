use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use crate::domain::ProcessDate;
use crate::error::CollectorError;
use crate::fs_util::{read_optional, write_atomic};

pub const CHECKPOINT_FILE: &str = "process_date.txt";

/// Durable "next date to process". Only the latest value is kept.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: Utf8PathBuf,
    default_date: ProcessDate,
}

impl CheckpointStore {
    pub fn new(dir: Utf8PathBuf, default_date: ProcessDate) -> Self {
        Self { dir, default_date }
    }

    pub fn path(&self) -> Utf8PathBuf {
        self.dir.join(CHECKPOINT_FILE)
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Returns the persisted date, or the configured default when there is no
    /// readable checkpoint. Unparsable content is an error.
    pub fn load(&self) -> Result<ProcessDate, CollectorError> {
        let path = self.path();
        let content = match read_optional(&path) {
            Ok(Some(content)) => content,
            Ok(None) => {
                debug!(path = %path, default = %self.default_date, "no checkpoint, using default");
                return Ok(self.default_date);
            }
            Err(err) => {
                warn!(path = %path, error = %err, "checkpoint unreadable, using default");
                return Ok(self.default_date);
            }
        };

        let first_line = content.lines().next().unwrap_or_default().trim();
        first_line
            .parse()
            .map_err(|_| CollectorError::CorruptCheckpoint {
                path,
                value: first_line.to_string(),
            })
    }

    pub fn save(&self, date: ProcessDate) -> Result<(), CollectorError> {
        let path = self.path();
        write_atomic(&path, date.to_string().as_bytes())?;
        debug!(path = %path, date = %date, "checkpoint saved");
        Ok(())
    }
}
