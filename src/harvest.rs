//! Day-by-day harvest driver.
//!
//! Each day moves through list fetch, detail fetches and checkpoint advance.
//! The checkpoint is only written once every record of the day has reached
//! the sink, so an aborted run repeats the whole day on restart; responses
//! already cached for that day are served from disk.

use std::collections::VecDeque;

use serde::Serialize;
use tracing::{debug, info};

use crate::checkpoint::CheckpointStore;
use crate::domain::{IssueId, MeetingList, ProcessDate, RequestParameters, single_meeting_record};
use crate::error::CollectorError;
use crate::fetcher::{CachedFetcher, FetchSource, RecordClient};
use crate::output::RecordSink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub list_url: String,
    pub detail_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestState {
    AwaitingListFetch(ProcessDate),
    AwaitingDetailFetch {
        date: ProcessDate,
        remaining: VecDeque<IssueId>,
    },
    AwaitingCheckpointAdvance(ProcessDate),
    Terminated,
}

impl HarvestState {
    pub fn date(&self) -> Option<ProcessDate> {
        match self {
            HarvestState::AwaitingListFetch(date)
            | HarvestState::AwaitingDetailFetch { date, .. }
            | HarvestState::AwaitingCheckpointAdvance(date) => Some(*date),
            HarvestState::Terminated => None,
        }
    }
}

/// Outcome of one fully completed day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayReport {
    pub date: ProcessDate,
    pub records: usize,
    pub cache_hits: usize,
    pub network_fetches: usize,
}

impl DayReport {
    pub fn new(date: ProcessDate) -> Self {
        Self {
            date,
            records: 0,
            cache_hits: 0,
            network_fetches: 0,
        }
    }

    fn count(&mut self, source: FetchSource) {
        match source {
            FetchSource::Cache => self.cache_hits += 1,
            FetchSource::Network => self.network_fetches += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarvestSummary {
    pub start: ProcessDate,
    pub next_date: ProcessDate,
    pub days: usize,
    pub records: usize,
    pub cache_hits: usize,
    pub network_fetches: usize,
    pub terminated: bool,
}

impl HarvestSummary {
    pub fn new(start: ProcessDate) -> Self {
        Self {
            start,
            next_date: start,
            days: 0,
            records: 0,
            cache_hits: 0,
            network_fetches: 0,
            terminated: false,
        }
    }

    pub fn add(&mut self, report: &DayReport) -> Result<(), CollectorError> {
        self.next_date = report.date.next()?;
        self.days += 1;
        self.records += report.records;
        self.cache_hits += report.cache_hits;
        self.network_fetches += report.network_fetches;
        Ok(())
    }
}

pub struct Harvester<C: RecordClient, S: RecordSink> {
    fetcher: CachedFetcher<C>,
    checkpoint: CheckpointStore,
    sink: S,
    endpoints: Endpoints,
}

impl<C: RecordClient, S: RecordSink> Harvester<C, S> {
    pub fn new(
        fetcher: CachedFetcher<C>,
        checkpoint: CheckpointStore,
        sink: S,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            fetcher,
            checkpoint,
            sink,
            endpoints,
        }
    }

    pub fn fetcher(&self) -> &CachedFetcher<C> {
        &self.fetcher
    }

    pub fn checkpoint(&self) -> &CheckpointStore {
        &self.checkpoint
    }

    /// Starts a run at `start`, or at the checkpoint when no start is given.
    /// Without `end` the returned iterator never finishes on its own.
    pub fn run(
        &self,
        start: Option<ProcessDate>,
        end: Option<ProcessDate>,
    ) -> Result<HarvestRun<'_, C, S>, CollectorError> {
        let start = match start {
            Some(start) => start,
            None => self.checkpoint.load()?,
        };
        if let Some(end) = end
            && end < start
        {
            return Err(CollectorError::InvalidDate(format!(
                "end date {end} is before start date {start}"
            )));
        }
        info!(start = %start, end = ?end.map(|date| date.to_string()), "harvest starting");
        Ok(HarvestRun {
            harvester: self,
            state: HarvestState::AwaitingListFetch(start),
            end,
            start,
            failed: false,
        })
    }

    /// Performs a single transition.
    pub fn step(
        &self,
        state: HarvestState,
        end: Option<ProcessDate>,
        report: &mut DayReport,
    ) -> Result<HarvestState, CollectorError> {
        match state {
            HarvestState::AwaitingListFetch(date) => self.fetch_list(date, report),
            HarvestState::AwaitingDetailFetch { date, mut remaining } => {
                let Some(issue_id) = remaining.pop_front() else {
                    return Ok(HarvestState::AwaitingCheckpointAdvance(date));
                };
                self.fetch_detail(&issue_id, report)?;
                if remaining.is_empty() {
                    Ok(HarvestState::AwaitingCheckpointAdvance(date))
                } else {
                    Ok(HarvestState::AwaitingDetailFetch { date, remaining })
                }
            }
            HarvestState::AwaitingCheckpointAdvance(date) => {
                let next = date.next()?;
                self.checkpoint.save(next)?;
                info!(
                    date = %date,
                    records = report.records,
                    cache_hits = report.cache_hits,
                    network_fetches = report.network_fetches,
                    "day complete"
                );
                match end {
                    Some(end) if date >= end => Ok(HarvestState::Terminated),
                    _ => Ok(HarvestState::AwaitingListFetch(next)),
                }
            }
            HarvestState::Terminated => Ok(HarvestState::Terminated),
        }
    }

    fn fetch_list(
        &self,
        date: ProcessDate,
        report: &mut DayReport,
    ) -> Result<HarvestState, CollectorError> {
        let url = self.endpoints.list_url.as_str();
        let params = RequestParameters::meeting_list(date);
        let (document, source) = self.fetcher.get_with_source(url, &params)?;
        report.count(source);

        let list = MeetingList::from_document(url, &document)?;
        debug!(date = %date, meetings = list.issue_ids.len(), "meeting list loaded");
        if list.issue_ids.is_empty() {
            return Ok(HarvestState::AwaitingCheckpointAdvance(date));
        }
        Ok(HarvestState::AwaitingDetailFetch {
            date,
            remaining: list.issue_ids.into(),
        })
    }

    fn fetch_detail(&self, issue_id: &IssueId, report: &mut DayReport) -> Result<(), CollectorError> {
        let url = self.endpoints.detail_url.as_str();
        let params = RequestParameters::meeting(issue_id);
        let (document, source) = self.fetcher.get_with_source(url, &params)?;
        report.count(source);

        let record = single_meeting_record(url, &document)?;
        self.sink.write_record(issue_id, record)?;
        report.records += 1;
        Ok(())
    }
}

/// Iterator over completed days. After an error it yields nothing further.
pub struct HarvestRun<'a, C: RecordClient, S: RecordSink> {
    harvester: &'a Harvester<C, S>,
    state: HarvestState,
    end: Option<ProcessDate>,
    start: ProcessDate,
    failed: bool,
}

impl<C: RecordClient, S: RecordSink> HarvestRun<'_, C, S> {
    pub fn start(&self) -> ProcessDate {
        self.start
    }

    /// True once the end date has been completed.
    pub fn is_terminated(&self) -> bool {
        !self.failed && self.state == HarvestState::Terminated
    }

    /// Runs until the end date, an error, or `max_days` completed days,
    /// whichever comes first.
    pub fn drive(mut self, max_days: Option<usize>) -> Result<HarvestSummary, CollectorError> {
        let mut summary = HarvestSummary::new(self.start);
        loop {
            if max_days.is_some_and(|limit| summary.days >= limit) {
                info!(next = %summary.next_date, "day limit reached");
                break;
            }
            match self.next() {
                Some(report) => summary.add(&report?)?,
                None => {
                    summary.terminated = true;
                    break;
                }
            }
        }
        info!(
            days = summary.days,
            records = summary.records,
            cache_hits = summary.cache_hits,
            network_fetches = summary.network_fetches,
            "harvest finished"
        );
        Ok(summary)
    }
}

impl<C: RecordClient, S: RecordSink> Iterator for HarvestRun<'_, C, S> {
    type Item = Result<DayReport, CollectorError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut report = DayReport::new(self.state.date()?);
        loop {
            let state = std::mem::replace(&mut self.state, HarvestState::Terminated);
            let completes_day = matches!(state, HarvestState::AwaitingCheckpointAdvance(_));
            match self.harvester.step(state, self.end, &mut report) {
                Ok(next) => {
                    self.state = next;
                    if completes_day {
                        return Some(Ok(report));
                    }
                }
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
