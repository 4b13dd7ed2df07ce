// crates/sangati-cli/src/output.rs
// ============================================================================
// Module: Run Output
// Description: Text and JSON renderings of a test run.
// Purpose: Stream per-test lines in declaration order and print the summary.
// Dependencies: sangati-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Text mode streams one line per test as the runner releases outcomes in
//! declaration order, then the totals line. JSON mode renders the full report
//! once the run completes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Write;
use std::sync::Mutex;
use std::sync::PoisonError;

use clap::ValueEnum;
use sangati_core::OutcomeStatus;
use sangati_core::Report;
use sangati_core::RunObserver;
use sangati_core::TestOutcome;
use serde::Serialize;

// ============================================================================
// SECTION: Formats
// ============================================================================

/// Report output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// One line per test followed by totals.
    #[default]
    Text,
    /// A single JSON document.
    Json,
}

// ============================================================================
// SECTION: Text Rendering
// ============================================================================

/// Renders the line reported for one outcome.
pub(crate) fn outcome_line(outcome: &TestOutcome) -> String {
    match outcome.status {
        OutcomeStatus::Passed => format!("Test '{}' PASSED", outcome.name),
        OutcomeStatus::Failed(_) => format!("Test '{}' FAILED: {}", outcome.name, outcome.detail),
        OutcomeStatus::Errored(_) => {
            format!("Test '{}' ERRORED: {}", outcome.name, outcome.detail)
        }
    }
}

/// Renders the closing totals line.
pub(crate) fn summary_line(report: &Report) -> String {
    format!("Total PASSED: {}, Total FAILED: {}", report.passed(), report.failed_total())
}

/// Observer writing text lines as outcomes are released.
pub(crate) struct TextObserver<W: Write + Send> {
    /// Destination stream.
    out: Mutex<W>,
    /// First write failure, if any.
    failure: Mutex<Option<io::Error>>,
}

impl<W: Write + Send> TextObserver<W> {
    /// Wraps `out`.
    pub(crate) const fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            failure: Mutex::new(None),
        }
    }

    /// Returns the stream, or the first write error seen during the run.
    pub(crate) fn finish(self) -> io::Result<W> {
        let failure = self.failure.into_inner().unwrap_or_else(PoisonError::into_inner);
        let out = self.out.into_inner().unwrap_or_else(PoisonError::into_inner);
        failure.map_or(Ok(out), Err)
    }

    /// Writes one line, keeping the first failure.
    fn emit(&self, line: &str) {
        let mut failure = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        if failure.is_some() {
            return;
        }
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            *failure = Some(err);
        }
    }
}

impl<W: Write + Send> RunObserver for TextObserver<W> {
    fn on_outcome(&self, _index: usize, outcome: &TestOutcome) {
        self.emit(&outcome_line(outcome));
    }

    fn on_complete(&self, report: &Report) {
        self.emit(&summary_line(report));
    }
}

// ============================================================================
// SECTION: JSON Rendering
// ============================================================================

/// Serialized form of one outcome.
#[derive(Debug, Serialize)]
struct OutcomeView<'a> {
    /// Test name.
    name: &'a str,
    /// Status label.
    status: &'static str,
    /// Rendered detail.
    detail: &'a str,
}

/// Serialized form of a run report.
#[derive(Debug, Serialize)]
struct ReportView<'a> {
    /// Passed count.
    passed: usize,
    /// Failed count, excluding errored tests.
    failed: usize,
    /// Errored count.
    errored: usize,
    /// Outcomes in declaration order.
    outcomes: Vec<OutcomeView<'a>>,
}

/// Renders `report` as a pretty-printed JSON document.
pub(crate) fn render_json(report: &Report) -> Result<String, serde_json::Error> {
    let view = ReportView {
        passed: report.passed(),
        failed: report.failed(),
        errored: report.errored(),
        outcomes: report
            .outcomes()
            .iter()
            .map(|outcome| OutcomeView {
                name: &outcome.name,
                status: outcome.status.label(),
                detail: &outcome.detail,
            })
            .collect(),
    };
    serde_json::to_string_pretty(&view)
}
