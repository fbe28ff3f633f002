use std::io::{self, Write};

use camino::Utf8PathBuf;
use serde::Serialize;
use serde_json::Value;

use crate::domain::IssueId;
use crate::error::CollectorError;
use crate::fs_util::write_atomic;
use crate::harvest::HarvestSummary;

/// Destination for harvested meeting records.
pub trait RecordSink {
    fn write_record(&self, issue_id: &IssueId, record: &Value) -> Result<(), CollectorError>;
}

/// One compact JSON file per meeting, `meeting_<issueID>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: Utf8PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: Utf8PathBuf) -> Self {
        Self { dir }
    }

    pub fn record_path(&self, issue_id: &IssueId) -> Utf8PathBuf {
        self.dir.join(format!("meeting_{issue_id}.json"))
    }
}

impl RecordSink for JsonFileSink {
    fn write_record(&self, issue_id: &IssueId, record: &Value) -> Result<(), CollectorError> {
        let content =
            serde_json::to_vec(record).map_err(|err| CollectorError::Filesystem(err.to_string()))?;
        write_atomic(&self.record_path(issue_id), &content)
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &HarvestSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
