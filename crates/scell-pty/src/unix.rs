//! Unix platform implementation for PTY operations.
//!
//! - PTY master/slave pair allocation via openpt/grantpt/unlockpt
//! - Async I/O through tokio's `AsyncFd`
//! - Child process management with session/controlling terminal setup

mod child;
mod pty;

use std::ffi::OsStr;

pub use child::{UnixPtyChild, spawn_child};
pub use pty::{UnixPtyMaster, open_slave};

use crate::config::PtyConfig;
use crate::error::Result;
use crate::traits::PtySystem;

/// Unix PTY system implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixPtySystem;

impl PtySystem for UnixPtySystem {
    type Master = UnixPtyMaster;
    type Child = UnixPtyChild;

    async fn spawn<S, I>(
        program: S,
        args: I,
        config: &PtyConfig,
    ) -> Result<(Self::Master, Self::Child)>
    where
        S: AsRef<OsStr> + Send,
        I: IntoIterator + Send,
        I::Item: AsRef<OsStr>,
    {
        let (master, slave_path) = UnixPtyMaster::open()?;

        // The size has to be in place before the child queries it.
        master.set_window_size(config.window_size)?;

        let slave_fd = open_slave(&slave_path)?;
        let child = spawn_child(slave_fd, program, args, config)?;

        tracing::debug!(
            pid = child.pid(),
            rows = config.window_size.rows,
            cols = config.window_size.cols,
            "spawned child on {slave_path}"
        );

        Ok((master, child))
    }
}

/// Convenience type alias for the default PTY system on Unix.
pub type NativePtySystem = UnixPtySystem;
