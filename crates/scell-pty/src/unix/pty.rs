//! Unix PTY allocation and management.
//!
//! This module provides the PTY master for Unix systems, using rustix for
//! the low-level PTY operations and tokio's `AsyncFd` for readiness.
//! Reads and writes take `&self` so one master can be shared between a
//! reader task and the writing caller.

use std::io;
use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use rustix::fs::{Mode, OFlags, fcntl_setfl, open};
use rustix::io::{FdFlags, fcntl_setfd};
use rustix::pty::{OpenptFlags, grantpt, openpt, ptsname, unlockpt};
use rustix::termios::{Winsize, tcgetwinsize, tcsetwinsize};
use tokio::io::unix::AsyncFd;

use crate::config::WindowSize;
use crate::error::{PtyError, Result};

fn create_err(e: rustix::io::Errno) -> PtyError {
    PtyError::Create(io::Error::from_raw_os_error(e.raw_os_error()))
}

/// Unix PTY master implementation.
pub struct UnixPtyMaster {
    /// The master file descriptor wrapped for async I/O.
    async_fd: AsyncFd<OwnedFd>,
    /// Whether the PTY is still open.
    open: AtomicBool,
}

impl std::fmt::Debug for UnixPtyMaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnixPtyMaster")
            .field("fd", &self.async_fd.as_raw_fd())
            .field("open", &self.is_open())
            .finish()
    }
}

impl UnixPtyMaster {
    /// Allocate a new pseudo-terminal pair and return the master side along
    /// with the path of the slave device.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open() -> Result<(Self, String)> {
        let master_fd = openpt(OpenptFlags::RDWR | OpenptFlags::NOCTTY).map_err(create_err)?;

        // The child must not inherit the master.
        fcntl_setfd(&master_fd, FdFlags::CLOEXEC).map_err(create_err)?;

        grantpt(&master_fd).map_err(create_err)?;
        unlockpt(&master_fd).map_err(create_err)?;

        let slave_name = ptsname(&master_fd, Vec::new()).map_err(create_err)?;
        let slave_path = slave_name
            .to_str()
            .map_err(|_| {
                PtyError::Create(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "invalid slave path encoding",
                ))
            })?
            .to_string();

        fcntl_setfl(&master_fd, OFlags::NONBLOCK).map_err(create_err)?;

        let async_fd = AsyncFd::new(master_fd).map_err(PtyError::Create)?;

        Ok((
            Self {
                async_fd,
                open: AtomicBool::new(true),
            },
            slave_path,
        ))
    }

    /// Check if the PTY is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Set the window size.
    pub fn set_window_size(&self, size: WindowSize) -> Result<()> {
        if !self.is_open() {
            return Err(PtyError::Closed);
        }
        if !size.is_valid() {
            return Err(PtyError::InvalidWindowSize {
                rows: size.rows,
                cols: size.cols,
            });
        }

        let winsize = Winsize {
            ws_row: size.rows,
            ws_col: size.cols,
            ws_xpixel: size.xpixel,
            ws_ypixel: size.ypixel,
        };

        tcsetwinsize(self.async_fd.get_ref(), winsize)
            .map_err(|e| PtyError::Resize(io::Error::from_raw_os_error(e.raw_os_error())))
    }

    /// Get the current window size.
    pub fn get_window_size(&self) -> Result<WindowSize> {
        if !self.is_open() {
            return Err(PtyError::Closed);
        }

        let winsize = tcgetwinsize(self.async_fd.get_ref())
            .map_err(|e| PtyError::GetAttributes(io::Error::from_raw_os_error(e.raw_os_error())))?;

        Ok(WindowSize {
            rows: winsize.ws_row,
            cols: winsize.ws_col,
            xpixel: winsize.ws_xpixel,
            ypixel: winsize.ws_ypixel,
        })
    }

    /// Mark the master closed. Pending and future reads report end of
    /// stream, writes fail with `BrokenPipe`. The descriptor itself is
    /// released when the master is dropped.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// Read whatever output is available, waiting for readiness.
    ///
    /// Returns `Ok(0)` at end of stream. On Linux the master reports `EIO`
    /// once every slave descriptor has been closed; that is end of stream
    /// too, not an error.
    pub async fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if !self.is_open() {
                return Ok(0);
            }

            let mut guard = self.async_fd.readable().await?;
            match guard.try_io(|fd| rustix::io::read(fd.get_ref(), &mut *buf).map_err(io::Error::from)) {
                Ok(Ok(n)) => return Ok(n),
                Ok(Err(e)) if e.raw_os_error() == Some(libc::EIO) => return Ok(0),
                Ok(Err(e)) => return Err(e),
                // Spurious readiness, try_io already cleared it.
                Err(_would_block) => {}
            }
        }
    }

    /// Write every byte of `data` to the terminal.
    pub async fn write_all(&self, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            if !self.is_open() {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "PTY closed"));
            }

            let mut guard = self.async_fd.writable().await?;
            match guard.try_io(|fd| rustix::io::write(fd.get_ref(), data).map_err(io::Error::from)) {
                Ok(Ok(0)) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(Ok(n)) => data = &data[n..],
                Ok(Err(e)) => return Err(e),
                Err(_would_block) => {}
            }
        }
        Ok(())
    }
}

impl AsRawFd for UnixPtyMaster {
    fn as_raw_fd(&self) -> RawFd {
        self.async_fd.as_raw_fd()
    }
}

/// Open the slave side of a PTY.
pub fn open_slave(path: &str) -> Result<OwnedFd> {
    open(
        Path::new(path),
        OFlags::RDWR | OFlags::NOCTTY | OFlags::CLOEXEC,
        Mode::empty(),
    )
    .map_err(create_err)
}
