use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CollectorError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Records requested per list page. The list query is per day, so a day
/// with more meetings than this is treated as an overflow.
pub const PAGE_SIZE: u32 = 100;

/// Calendar day being harvested; the unit of checkpoint progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProcessDate(NaiveDate);

impl ProcessDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The following calendar day.
    pub fn next(&self) -> Result<Self, CollectorError> {
        self.0
            .checked_add_days(Days::new(1))
            .map(Self)
            .ok_or_else(|| CollectorError::InvalidDate(format!("{self} has no successor")))
    }
}

impl fmt::Display for ProcessDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for ProcessDate {
    type Err = CollectorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
            .map(Self)
            .map_err(|_| CollectorError::InvalidDate(value.to_string()))
    }
}

impl TryFrom<String> for ProcessDate {
    type Error = CollectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProcessDate> for String {
    fn from(value: ProcessDate) -> Self {
        value.to_string()
    }
}

/// Meeting identifier as issued by the record API. It ends up in file names,
/// so only ASCII alphanumerics are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueId(String);

impl IssueId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IssueId {
    type Err = CollectorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let is_valid =
            !normalized.is_empty() && normalized.chars().all(|ch| ch.is_ascii_alphanumeric());
        if !is_valid {
            return Err(CollectorError::InvalidIssueId(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

/// Ordered query parameters for one request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestParameters {
    pairs: Vec<(String, String)>,
}

impl RequestParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.pairs.push((name.to_string(), value.into()));
        self
    }

    /// Parameters for the list endpoint covering exactly one day.
    pub fn meeting_list(date: ProcessDate) -> Self {
        let date = date.to_string();
        Self::new()
            .with("maximumRecords", PAGE_SIZE.to_string())
            .with("recordPacking", "json")
            .with("from", date.clone())
            .with("until", date)
    }

    /// Parameters for the detail endpoint for a single meeting.
    pub fn meeting(issue_id: &IssueId) -> Self {
        Self::new()
            .with("recordPacking", "json")
            .with("issueID", issue_id.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

/// The fields of a list page the harvest loop depends on.
#[derive(Debug, Clone)]
pub struct MeetingList {
    pub number_of_return: u64,
    pub issue_ids: Vec<IssueId>,
}

impl MeetingList {
    pub fn from_document(url: &str, document: &Value) -> Result<Self, CollectorError> {
        let number_of_return = document
            .get("numberOfReturn")
            .and_then(count_value)
            .ok_or_else(|| malformed(url, "missing numberOfReturn"))?;
        if number_of_return == 0 {
            return Ok(Self {
                number_of_return,
                issue_ids: Vec::new(),
            });
        }

        let records = document
            .get("meetingRecord")
            .and_then(|value| value.as_array())
            .ok_or_else(|| malformed(url, "missing meetingRecord"))?;
        if records.len() as u64 != number_of_return {
            return Err(malformed(
                url,
                &format!(
                    "numberOfReturn is {number_of_return} but meetingRecord holds {}",
                    records.len()
                ),
            ));
        }
        let issue_ids = records
            .iter()
            .map(|record| {
                record
                    .get("issueID")
                    .and_then(|value| value.as_str())
                    .ok_or_else(|| malformed(url, "meetingRecord entry without issueID"))?
                    .parse::<IssueId>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            number_of_return,
            issue_ids,
        })
    }
}

/// Extracts the single record of a detail response.
pub fn single_meeting_record<'a>(url: &str, document: &'a Value) -> Result<&'a Value, CollectorError> {
    let records = document
        .get("meetingRecord")
        .and_then(|value| value.as_array())
        .ok_or_else(|| malformed(url, "missing meetingRecord"))?;
    match records.as_slice() {
        [record] => Ok(record),
        other => Err(malformed(
            url,
            &format!("expected exactly one meetingRecord, got {}", other.len()),
        )),
    }
}

// Counts are accepted as numbers or numeric strings.
fn count_value(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
}

fn malformed(url: &str, message: &str) -> CollectorError {
    CollectorError::MalformedResponse {
        url: url.to_string(),
        message: message.to_string(),
    }
}
