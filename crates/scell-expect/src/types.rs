//! Common types for scell-expect.
//!
//! This module defines the values handed back by expect operations and the
//! small vocabulary shared across the session API.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub use scell_pty::ExitStatus;

/// A match result from an expect operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// The full text that matched.
    pub matched: String,

    /// Text between the previous consumed position and the match.
    pub before: String,

    /// Absolute byte offset of the match start in the session output.
    pub start: usize,

    /// Absolute byte offset just past the match in the session output.
    pub end: usize,

    /// Capture groups from regex patterns. Group 0 is not included;
    /// groups that did not participate are empty strings.
    pub captures: Vec<String>,
}

impl Match {
    /// Get a capture group by index (0 is the first explicit group).
    #[must_use]
    pub fn capture(&self, index: usize) -> Option<&str> {
        self.captures.get(index).map(String::as_str)
    }

    /// Get the full matched text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.matched
    }

    /// Length of the match in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the match is zero-length.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.matched)
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The child is running, or has not been reaped yet.
    Running,
    /// The child has terminated; the session still holds its resources.
    Terminated(ExitStatus),
    /// The session was closed and every resource released.
    Closed(ExitStatus),
}

impl SessionState {
    /// Whether the session has been closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }

    /// The exit status, once known.
    #[must_use]
    pub const fn exit_status(&self) -> Option<ExitStatus> {
        match self {
            Self::Running => None,
            Self::Terminated(status) | Self::Closed(status) => Some(*status),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Terminated(status) => write!(f, "terminated ({status})"),
            Self::Closed(status) => write!(f, "closed ({status})"),
        }
    }
}

/// Terminal size in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    /// Number of rows.
    pub rows: u16,
    /// Number of columns.
    pub cols: u16,
}

impl Dimensions {
    /// Create dimensions from rows and columns.
    #[must_use]
    pub const fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::new(24, 80)
    }
}

impl From<Dimensions> for scell_pty::WindowSize {
    fn from(dims: Dimensions) -> Self {
        Self::new(dims.rows, dims.cols)
    }
}

/// Control characters understood by terminal line disciplines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlChar {
    /// Ctrl+C (ETX) - Interrupt
    CtrlC,
    /// Ctrl+D (EOT) - End of transmission
    CtrlD,
    /// Ctrl+L (FF) - Clear screen
    CtrlL,
    /// Ctrl+U (NAK) - Kill line
    CtrlU,
    /// Ctrl+W (ETB) - Kill word
    CtrlW,
    /// Ctrl+Z (SUB) - Suspend
    CtrlZ,
    /// Ctrl+\ (FS) - Quit
    CtrlBackslash,
    /// Escape
    Escape,
}

impl ControlChar {
    /// Get the byte value of this control character.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::CtrlC => 0x03,
            Self::CtrlD => 0x04,
            Self::CtrlL => 0x0C,
            Self::CtrlU => 0x15,
            Self::CtrlW => 0x17,
            Self::CtrlZ => 0x1A,
            Self::CtrlBackslash => 0x1C,
            Self::Escape => 0x1B,
        }
    }
}

impl From<ControlChar> for u8 {
    fn from(c: ControlChar) -> Self {
        c.as_byte()
    }
}

/// Process-unique identifier used to tell sessions apart in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate the next identifier.
    #[must_use]
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}
