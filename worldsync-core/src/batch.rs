//! Bookkeeping for synchronisation runs.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::CountryCode;

/// Lifecycle state of a bulk synchronisation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// The run is still working through its batches.
    Processing,
    /// Every batch was attempted.
    Completed,
    /// The run stopped early; the partial counters remain valid.
    Error,
}

/// One country that could not be synchronised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedCountry {
    /// Country code.
    pub code: CountryCode,
    /// Display name, when the facts upstream supplied one.
    pub name: Option<String>,
    /// Human-readable failure description.
    pub error: String,
}

/// Counters and failures accumulated across one bulk run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    /// Current lifecycle state.
    pub status: BatchStatus,
    /// Size of the candidate universe.
    pub total: usize,
    /// Countries whose identity record was written.
    pub updated: usize,
    /// Countries recorded in `failed_countries`.
    pub failed: usize,
    /// Failures in the order they occurred.
    pub failed_countries: Vec<FailedCountry>,
    /// Seconds since the Unix epoch when the run started.
    pub started_at: u64,
    /// Seconds since the Unix epoch when the run finished.
    pub finished_at: Option<u64>,
    /// Run-level error, set alongside [`BatchStatus::Error`].
    pub error: Option<String>,
}

impl BatchResult {
    /// Begin a new run at `started_at`.
    #[must_use]
    pub const fn start(started_at: u64) -> Self {
        Self {
            status: BatchStatus::Processing,
            total: 0,
            updated: 0,
            failed: 0,
            failed_countries: Vec::new(),
            started_at,
            finished_at: None,
            error: None,
        }
    }

    /// Count one successfully synchronised country.
    pub const fn record_success(&mut self) {
        self.updated = self.updated.saturating_add(1);
    }

    /// Record one failed country.
    pub fn record_failure(&mut self, code: CountryCode, name: Option<String>, error: String) {
        self.failed = self.failed.saturating_add(1);
        self.failed_countries.push(FailedCountry { code, name, error });
    }

    /// Mark the run as completed.
    #[must_use]
    pub fn complete(mut self, finished_at: u64) -> Self {
        self.status = BatchStatus::Completed;
        self.finished_at = Some(finished_at);
        self
    }

    /// Mark the run as aborted with a run-level error.
    #[must_use]
    pub fn abort(mut self, finished_at: u64, error: String) -> Self {
        self.status = BatchStatus::Error;
        self.finished_at = Some(finished_at);
        self.error = Some(error);
        self
    }
}

/// One aspect of a country refreshed by a single-country run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Aspect {
    /// Identity record.
    Country,
    /// Demographic indicators.
    Demographics,
    /// Economic indicators.
    Economy,
    /// Education indicators.
    Education,
    /// Boundary geometry.
    Geometry,
}

impl Aspect {
    /// Lower-case label used in logs and serialised reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::Demographics => "demographics",
            Self::Economy => "economy",
            Self::Education => "education",
            Self::Geometry => "geometry",
        }
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall outcome of a single-country run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Every aspect was attempted.
    Completed,
    /// The run could not start, for example because the code was invalid.
    Error,
}

/// An aspect that failed to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AspectFailure {
    /// The affected aspect.
    pub aspect: Aspect,
    /// Human-readable failure description.
    pub error: String,
}

/// Per-aspect manifest returned by a single-country run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// The requested code after normalisation.
    pub code: String,
    /// Overall outcome.
    pub status: SyncStatus,
    /// Aspects that were written.
    pub updated: Vec<Aspect>,
    /// Aspects whose fetch or write failed.
    pub failures: Vec<AspectFailure>,
    /// Run-level error, set alongside [`SyncStatus::Error`].
    pub error: Option<String>,
}

impl SyncReport {
    /// Start an empty manifest for `code`.
    #[must_use]
    pub const fn new(code: String) -> Self {
        Self {
            code,
            status: SyncStatus::Completed,
            updated: Vec::new(),
            failures: Vec::new(),
            error: None,
        }
    }

    /// Build a manifest for a run that could not start.
    #[must_use]
    pub const fn rejected(code: String, error: String) -> Self {
        Self {
            code,
            status: SyncStatus::Error,
            updated: Vec::new(),
            failures: Vec::new(),
            error: Some(error),
        }
    }

    /// Whether `aspect` was written.
    #[must_use]
    pub fn updated(&self, aspect: Aspect) -> bool {
        self.updated.contains(&aspect)
    }

    /// Record that `aspect` could not be refreshed.
    pub fn record_failure(&mut self, aspect: Aspect, error: String) {
        self.failures.push(AspectFailure { aspect, error });
    }

    /// Settle the overall status: a run that wrote nothing is an error.
    #[must_use]
    pub fn finish(mut self) -> Self {
        if self.updated.is_empty() {
            self.status = SyncStatus::Error;
            self.error = Some(format!("no data synchronised for {}", self.code));
        }
        self
    }
}

/// Seconds since the Unix epoch, saturating to zero before it.
#[must_use]
pub fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn code(raw: &str) -> CountryCode {
        CountryCode::parse(raw).expect("valid code")
    }

    #[rstest]
    fn counters_track_successes_and_failures() {
        let mut result = BatchResult::start(10);
        result.total = 3;
        result.record_success();
        result.record_failure(code("AQ"), None, "boom".into());
        result.record_success();

        let finished = result.complete(20);
        assert_eq!(finished.status, BatchStatus::Completed);
        assert_eq!(finished.updated, 2);
        assert_eq!(finished.failed, 1);
        assert_eq!(finished.failed_countries[0].code, code("AQ"));
        assert_eq!(finished.finished_at, Some(20));
    }

    #[rstest]
    fn aborted_runs_keep_partial_counters() {
        let mut result = BatchResult::start(1);
        result.record_success();
        let aborted = result.abort(2, "universe unavailable".into());
        assert_eq!(aborted.status, BatchStatus::Error);
        assert_eq!(aborted.updated, 1);
        assert_eq!(aborted.error.as_deref(), Some("universe unavailable"));
    }

    #[rstest]
    fn statuses_serialise_in_lowercase() {
        let value = serde_json::to_value(BatchResult::start(0)).expect("serialise");
        assert_eq!(value["status"], "processing");
        let report = SyncReport::rejected("X".into(), "bad".into());
        let report_value = serde_json::to_value(report).expect("serialise report");
        assert_eq!(report_value["status"], "error");
    }

    #[rstest]
    fn reports_without_updates_finish_as_errors() {
        let mut report = SyncReport::new("AQ".into());
        report.record_failure(Aspect::Geometry, "boundary unavailable".into());
        let finished = report.finish();
        assert_eq!(finished.status, SyncStatus::Error);
        assert_eq!(finished.error.as_deref(), Some("no data synchronised for AQ"));
        assert_eq!(finished.failures[0].aspect, Aspect::Geometry);
    }

    #[rstest]
    fn partial_reports_finish_as_completed() {
        let mut report = SyncReport::new("FR".into());
        report.updated.push(Aspect::Country);
        report.record_failure(Aspect::Economy, "write failed".into());
        let finished = report.finish();
        assert_eq!(finished.status, SyncStatus::Completed);
        assert!(finished.updated(Aspect::Country));
        assert_eq!(Aspect::Economy.to_string(), "economy");
    }

    #[rstest]
    fn times_before_the_epoch_saturate() {
        let before = UNIX_EPOCH
            .checked_sub(std::time::Duration::from_secs(5))
            .expect("representable time");
        assert_eq!(unix_seconds(before), 0);
    }
}
