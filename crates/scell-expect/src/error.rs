//! Error types for scell-expect.
//!
//! Errors carry enough context to debug a failed scenario from the test
//! output alone: timeouts and premature end of stream include the pattern
//! and the unconsumed output at the time of failure.

use std::io;
use std::time::Duration;

use scell_pty::PtyError;
use thiserror::Error;

/// Maximum length of buffer content to display in error messages.
const MAX_BUFFER_DISPLAY: usize = 500;

/// Context lines to show before/after truncation point.
const CONTEXT_LINES: usize = 3;

/// Format buffer content for display, truncating if necessary.
fn format_buffer_snippet(buffer: &str) -> String {
    if buffer.is_empty() {
        return "(empty buffer)".to_string();
    }

    let buffer_len = buffer.len();
    let lines: Vec<&str> = buffer.lines().collect();
    let total_lines = lines.len();

    if buffer_len <= MAX_BUFFER_DISPLAY || total_lines <= CONTEXT_LINES * 2 {
        return format!(
            "┌─ buffer ({buffer_len} bytes) ──────────────────────\n│ {}\n└────────────────────────────────────────",
            lines.join("\n│ ")
        );
    }

    let tail_lines = &lines[total_lines - CONTEXT_LINES * 2..];
    let hidden = total_lines - tail_lines.len();

    format!(
        "┌─ buffer ({buffer_len} bytes, {total_lines} lines) ─────────────\n│ ... ({hidden} lines hidden)\n│ {}\n└────────────────────────────────────────",
        tail_lines.join("\n│ ")
    )
}

fn format_timeout_error(duration: Duration, pattern: &str, buffer: &str) -> String {
    format!(
        "timeout after {duration:?} waiting for pattern\n\
         \n\
         Pattern: '{pattern}'\n\
         \n\
         {}",
        format_buffer_snippet(buffer)
    )
}

fn format_eof_error(pattern: &str, buffer: &str) -> String {
    format!(
        "output ended before the pattern was found\n\
         \n\
         Pattern: '{pattern}'\n\
         \n\
         {}",
        format_buffer_snippet(buffer)
    )
}

/// The main error type for session operations.
#[derive(Debug, Error)]
pub enum ExpectError {
    /// Failed to spawn the process.
    #[error("failed to spawn process: {0}")]
    Spawn(#[from] SpawnError),

    /// An I/O error occurred with additional context.
    #[error("{context}: {source}")]
    IoWithContext {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Timeout waiting for pattern match.
    #[error("{}", format_timeout_error(*duration, pattern, buffer))]
    Timeout {
        /// The timeout duration that elapsed.
        duration: Duration,
        /// The pattern that was being searched for.
        pattern: String,
        /// Unconsumed output at the time of timeout.
        buffer: String,
    },

    /// The child closed its output before the pattern appeared.
    #[error("{}", format_eof_error(pattern, buffer))]
    Eof {
        /// The pattern that was being searched for.
        pattern: String,
        /// Unconsumed output when the stream ended.
        buffer: String,
    },

    /// Writing input to the terminal failed.
    #[error("failed to write to process: {source}")]
    Write {
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Invalid pattern specification.
    #[error("invalid pattern: {message}")]
    InvalidPattern {
        /// Description of what's wrong with the pattern.
        message: String,
    },

    /// The session has already been closed.
    #[error("session is closed")]
    SessionClosed,

    /// Terminal control failed.
    #[error(transparent)]
    Pty(#[from] PtyError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Errors related to process spawning.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// Command not found.
    #[error("command not found: {command}")]
    CommandNotFound {
        /// The command that was not found.
        command: String,
    },

    /// Permission denied.
    #[error("permission denied: {path}")]
    PermissionDenied {
        /// The path that could not be executed.
        path: String,
    },

    /// PTY allocation failed.
    #[error("failed to allocate PTY: {reason}")]
    PtyAllocation {
        /// The reason for the failure.
        reason: String,
    },

    /// Working directory error.
    #[error("invalid working directory: {path}")]
    InvalidWorkingDir {
        /// The invalid working directory path.
        path: String,
    },

    /// General I/O error during spawn.
    #[error("I/O error during spawn: {0}")]
    Io(#[from] io::Error),
}

impl SpawnError {
    /// Classify a transport failure for `command`.
    #[must_use]
    pub fn from_pty(command: &str, err: PtyError) -> Self {
        match err {
            PtyError::Create(e) => Self::PtyAllocation {
                reason: e.to_string(),
            },
            PtyError::Spawn(e) => match e.kind() {
                io::ErrorKind::NotFound => Self::CommandNotFound {
                    command: command.to_string(),
                },
                io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                    path: command.to_string(),
                },
                _ => Self::Io(e),
            },
            other => Self::Io(io::Error::other(other)),
        }
    }
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, ExpectError>;

impl ExpectError {
    /// Create a timeout error with the given details.
    pub fn timeout(
        duration: Duration,
        pattern: impl Into<String>,
        buffer: impl Into<String>,
    ) -> Self {
        Self::Timeout {
            duration,
            pattern: pattern.into(),
            buffer: buffer.into(),
        }
    }

    /// Create an end-of-stream error.
    pub fn eof(pattern: impl Into<String>, buffer: impl Into<String>) -> Self {
        Self::Eof {
            pattern: pattern.into(),
            buffer: buffer.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the operation that failed.
    pub fn io_context(context: impl Into<String>, source: io::Error) -> Self {
        Self::IoWithContext {
            context: context.into(),
            source,
        }
    }

    /// Whether this is a timeout waiting for a pattern.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether the output ended before the pattern appeared.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::Eof { .. })
    }

    /// Whether this signals misuse of the API rather than an environment failure.
    #[must_use]
    pub const fn is_usage(&self) -> bool {
        matches!(self, Self::SessionClosed)
    }

    /// The unconsumed output attached to this error, if any.
    #[must_use]
    pub fn buffer(&self) -> Option<&str> {
        match self {
            Self::Timeout { buffer, .. } | Self::Eof { buffer, .. } => Some(buffer),
            _ => None,
        }
    }
}
