//! Per-step transcript of a run.
//!
//! Every orchestrator step ends in one or more [`StepRecord`]s. The
//! [`Transcript`] keeps them in memory, optionally echoes a status line per
//! record to a writer (stdout for the CLI), and optionally persists them as
//! JSON Lines.

use std::fmt;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::action::InteractionResult;

/// Status of one transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Performed and verified.
    Pass,
    /// Performed; the read-back differed from the canonical form.
    SoftPass,
    /// Non-fatal anomaly, e.g. an element present but not displayed.
    Warn,
    /// The step could not be performed.
    Fail,
}

impl StepStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            StepStatus::Pass | StepStatus::SoftPass => "✅",
            StepStatus::Warn => "⚠️",
            StepStatus::Fail => "❌",
        }
    }
}

impl From<InteractionResult> for StepStatus {
    fn from(result: InteractionResult) -> Self {
        match result {
            InteractionResult::Succeeded => StepStatus::Pass,
            InteractionResult::SucceededWithFallbackFormat => StepStatus::SoftPass,
            InteractionResult::Failed => StepStatus::Fail,
        }
    }
}

/// Where a step ended in `Idle -> Resolving -> {Acting -> Verifying -> Done} | NotFoundTerminal`.
///
/// Resolution either succeeds and moves on to acting or ends in
/// [`NotFoundTerminal`](StepPhase::NotFoundTerminal), so no record ends in
/// `Idle` or `Resolving`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPhase {
    Acting,
    Verifying,
    Done,
    NotFoundTerminal,
}

/// One transcript line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Unique identifier for this record.
    pub id: Uuid,

    /// When the record was written.
    pub timestamp: DateTime<Utc>,

    /// Static name of the step that produced the record.
    pub step: String,

    pub status: StepStatus,

    /// The phase the step ended in.
    pub phase: StepPhase,

    /// Human-readable description.
    pub message: String,

    /// PNG screenshot captured after a failure. Not persisted.
    #[serde(skip)]
    pub screenshot: Option<Arc<Vec<u8>>>,
}

impl StepRecord {
    pub fn new(
        step: impl Into<String>,
        status: StepStatus,
        phase: StepPhase,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            step: step.into(),
            status,
            phase,
            message: message.into(),
            screenshot: None,
        }
    }

    pub fn with_screenshot(mut self, png: Vec<u8>) -> Self {
        self.screenshot = Some(Arc::new(png));
        self
    }

    /// The status line echoed for this record.
    pub fn line(&self) -> String {
        format!("{} {}", self.status.symbol(), self.message)
    }
}

/// Counts per status over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub passed: usize,
    pub soft_passed: usize,
    pub warnings: usize,
    pub failed: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.passed + self.soft_passed + self.warnings + self.failed
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} soft-passed, {} warnings, {} failed",
            self.passed, self.soft_passed, self.warnings, self.failed
        )
    }
}

/// Recorded lines of a run.
pub struct Transcript {
    records: Mutex<Vec<StepRecord>>,
    echo: Mutex<Option<Box<dyn Write + Send>>>,
    log_writer: Mutex<Option<BufWriter<std::fs::File>>>,
}

impl Transcript {
    /// A transcript that only keeps records in memory.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(Vec::new()),
            echo: Mutex::new(None),
            log_writer: Mutex::new(None),
        })
    }

    /// A transcript that also writes status lines to `echo` and, when
    /// `log_path` is given, JSON Lines to that file.
    ///
    /// A log file that cannot be created is skipped with a warning; the run
    /// itself does not depend on it.
    pub fn with_outputs(echo: Option<Box<dyn Write + Send>>, log_path: Option<&Path>) -> Arc<Self> {
        let log_writer = log_path.and_then(|path| match std::fs::File::create(path) {
            Ok(file) => Some(BufWriter::new(file)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not create transcript log");
                None
            }
        });
        Arc::new(Self {
            records: Mutex::new(Vec::new()),
            echo: Mutex::new(echo),
            log_writer: Mutex::new(log_writer),
        })
    }

    /// Appends a record, echoing and persisting it.
    pub async fn record(&self, record: StepRecord) {
        if let Some(ref mut out) = *self.echo.lock().await {
            let _ = writeln!(out, "{}", record.line());
            let _ = out.flush();
        }

        if let Some(ref mut writer) = *self.log_writer.lock().await {
            if let Ok(json) = serde_json::to_string(&record) {
                let _ = writeln!(writer, "{}", json);
                let _ = writer.flush();
            }
        }

        self.records.lock().await.push(record);
    }

    /// Writes a free-form line to the echo output without recording it.
    pub async fn note(&self, line: &str) {
        if let Some(ref mut out) = *self.echo.lock().await {
            let _ = writeln!(out, "{}", line);
            let _ = out.flush();
        }
    }

    /// All records in order.
    pub async fn records(&self) -> Vec<StepRecord> {
        self.records.lock().await.clone()
    }

    pub async fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for record in self.records.lock().await.iter() {
            match record.status {
                StepStatus::Pass => summary.passed += 1,
                StepStatus::SoftPass => summary.soft_passed += 1,
                StepStatus::Warn => summary.warnings += 1,
                StepStatus::Fail => summary.failed += 1,
            }
        }
        summary
    }
}

impl fmt::Debug for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transcript")
            .field("records", &"<Mutex<Vec<StepRecord>>>")
            .field("echo", &"<Mutex<Option<Box<dyn Write>>>>")
            .field("log_writer", &"<Mutex<Option<BufWriter<File>>>>")
            .finish()
    }
}
