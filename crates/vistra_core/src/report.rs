//! Message reporting channel and engine error taxonomy.
//!
//! # Responsibility
//! - Collect non-fatal errors and notices from all engine components.
//! - Keep one severity-tagged channel that embedding callers can inspect
//!   after a batch completes.
//!
//! # Invariants
//! - Non-fatal errors are reported, never thrown across component boundaries.
//! - Only `FatalIo` aborts batch processing; applied state is preserved.

use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result alias for operations surfacing [`EngineError`].
pub type EngineResult<T> = Result<T, EngineError>;

/// Severity attached to every reported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// Stable lowercase label used in log lines and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }
}

/// One collected report entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub severity: Severity,
    pub text: String,
}

/// Engine-wide error taxonomy.
///
/// Everything except `FatalIo` is recoverable: the offending statement or
/// document entry is skipped and processing continues.
#[derive(Debug)]
pub enum EngineError {
    /// Malformed command or property syntax; the line is skipped.
    Parse { message: String },
    /// Target id/name/index does not resolve; the statement is skipped.
    Resolution { target: String },
    /// External data source failed; the model stays at its prior timestep.
    Load { step: i32, message: String },
    /// State document entry/key is missing structure or type-mismatched;
    /// the entry is skipped, the rest of the document still applies.
    Schema { entry: String, message: String },
    /// Unrecoverable I/O failure; the current batch aborts.
    FatalIo(std::io::Error),
}

impl EngineError {
    /// Severity this error is reported at.
    pub fn severity(&self) -> Severity {
        match self {
            Self::Parse { .. } | Self::Resolution { .. } => Severity::Error,
            Self::Load { .. } | Self::Schema { .. } => Severity::Warning,
            Self::FatalIo(_) => Severity::Fatal,
        }
    }

    /// Whether this error aborts the surrounding batch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalIo(_))
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse { message } => write!(f, "parse error: {message}"),
            Self::Resolution { target } => write!(f, "unknown target: {target}"),
            Self::Load { step, message } => {
                write!(f, "timestep {step} load failed: {message}")
            }
            Self::Schema { entry, message } => {
                write!(f, "invalid state entry `{entry}`: {message}")
            }
            Self::FatalIo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::FatalIo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(value: std::io::Error) -> Self {
        Self::FatalIo(value)
    }
}

/// Collected message channel shared by session, command engine and loaders.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one message and mirrors it to the process log.
    pub fn report(&mut self, severity: Severity, text: impl Into<String>) {
        let text = text.into();
        match severity {
            Severity::Info => info!("event=report module=report status=ok text={text}"),
            Severity::Warning => warn!("event=report module=report status=warn text={text}"),
            Severity::Error | Severity::Fatal => {
                error!("event=report module=report status=error text={text}")
            }
        }
        self.messages.push(Message { severity, text });
    }

    /// Reports an engine error at its mapped severity.
    pub fn report_error(&mut self, err: &EngineError) {
        self.report(err.severity(), err.to_string());
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of collected entries at `Error` severity or above.
    pub fn error_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|message| message.severity >= Severity::Error)
            .count()
    }

    /// Removes and returns all collected messages in report order.
    pub fn drain(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.messages)
    }
}
