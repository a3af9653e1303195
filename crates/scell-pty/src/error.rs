//! Error types for the scell-pty crate.
//!
//! [`PtyError`] covers every failure mode of allocating a pseudo-terminal,
//! starting a child on it and talking to the master side.

use std::io;

/// The error type for PTY operations.
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    /// Failed to allocate the PTY pair.
    #[error("failed to create PTY: {0}")]
    Create(#[source] io::Error),

    /// Failed to spawn the child process.
    #[error("failed to spawn process: {0}")]
    Spawn(#[source] io::Error),

    /// An I/O error occurred during PTY operations.
    #[error("PTY I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failed to get terminal attributes.
    #[error("failed to get terminal attributes: {0}")]
    GetAttributes(#[source] io::Error),

    /// Failed to resize the PTY.
    #[error("failed to resize PTY: {0}")]
    Resize(#[source] io::Error),

    /// The PTY has been closed.
    #[error("PTY has been closed")]
    Closed,

    /// Failed to send a signal to the child process.
    #[error("failed to send signal: {0}")]
    Signal(#[source] io::Error),

    /// Failed to wait for the child process.
    #[error("failed to wait for child: {0}")]
    Wait(#[source] io::Error),

    /// Invalid window size specified.
    #[error("invalid window size: {rows}x{cols}")]
    InvalidWindowSize {
        /// The requested number of rows.
        rows: u16,
        /// The requested number of columns.
        cols: u16,
    },
}

impl PtyError {
    /// The [`io::ErrorKind`] of the underlying OS error, if there is one.
    #[must_use]
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Create(e)
            | Self::Spawn(e)
            | Self::Io(e)
            | Self::GetAttributes(e)
            | Self::Resize(e)
            | Self::Signal(e)
            | Self::Wait(e) => Some(e.kind()),
            Self::Closed | Self::InvalidWindowSize { .. } => None,
        }
    }
}

/// A specialized Result type for PTY operations.
pub type Result<T> = std::result::Result<T, PtyError>;

#[cfg(unix)]
impl From<rustix::io::Errno> for PtyError {
    fn from(errno: rustix::io::Errno) -> Self {
        Self::Io(io::Error::from_raw_os_error(errno.raw_os_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = PtyError::Closed;
        assert_eq!(err.to_string(), "PTY has been closed");

        let err = PtyError::InvalidWindowSize { rows: 0, cols: 80 };
        assert_eq!(err.to_string(), "invalid window size: 0x80");
    }

    #[test]
    fn error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "not found");
        let pty_err: PtyError = io_err.into();
        assert!(matches!(pty_err, PtyError::Io(_)));
        assert_eq!(pty_err.io_kind(), Some(io::ErrorKind::NotFound));
    }

    #[test]
    fn spawn_error_keeps_kind() {
        let err = PtyError::Spawn(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.io_kind(), Some(io::ErrorKind::PermissionDenied));
        assert_eq!(PtyError::Closed.io_kind(), None);
    }
}
