//! The session handle.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use scell_pty::{NativePtySystem, PtyConfig, PtySystem, UnixPtyChild, UnixPtyMaster};
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tracing::{debug, info_span, trace, warn};

use super::lifecycle::{self, Resources};
use super::reader;
use crate::config::SessionConfig;
use crate::error::{ExpectError, Result, SpawnError};
use crate::expect::{Pattern, SharedOutput};
use crate::types::{ControlChar, Dimensions, ExitStatus, Match, SessionId, SessionState};

/// Name given to the runtime thread that reads the terminal.
const READER_THREAD_NAME: &str = "scell-pty-reader";

/// Pattern text reported when waiting for end of stream times out.
const EOF_PATTERN: &str = "<EOF>";

/// An interactive program running on a pseudo-terminal.
///
/// All methods block the calling thread. Output is collected by a
/// background task from the moment the program starts, so nothing is lost
/// between calls.
///
/// Call [`Session::close`] to release the session and learn how the
/// program exited. A session dropped without closing kills its program.
///
/// # Panics
///
/// A session drives its own tokio runtime and must be used from
/// synchronous code. Spawning, using, or dropping one on a thread that is
/// inside a tokio runtime panics. From async code, move the session to a
/// plain thread with [`std::thread::spawn`]; `spawn_blocking` is not
/// enough because it still runs inside the runtime.
pub struct Session {
    id: SessionId,
    config: SessionConfig,
    output: Arc<SharedOutput>,
    master: Option<Arc<UnixPtyMaster>>,
    reader: Option<JoinHandle<()>>,
    child: UnixPtyChild,
    dimensions: Dimensions,
    state: SessionState,
    // Declared last so the master is deregistered before the runtime goes.
    runtime: Runtime,
}

impl Session {
    /// Start `config.command` on a new pseudo-terminal.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::Spawn`] if the terminal cannot be allocated or
    /// the program cannot be started.
    ///
    /// # Panics
    ///
    /// Panics if called from within a tokio runtime. See [`Session`].
    pub fn spawn(config: &SessionConfig) -> Result<Self> {
        if let Some(dir) = config.working_dir.as_ref().filter(|d| !d.is_dir()) {
            return Err(SpawnError::InvalidWorkingDir {
                path: dir.display().to_string(),
            }
            .into());
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name(READER_THREAD_NAME)
            .enable_all()
            .build()
            .map_err(|e| ExpectError::io_context("creating tokio runtime", e))?;

        let pty_config = PtyConfig::from(config);
        let (master, child) = runtime
            .block_on(NativePtySystem::spawn(
                &config.command,
                &config.args,
                &pty_config,
            ))
            .map_err(|e| SpawnError::from_pty(&config.command, e))?;

        let id = SessionId::new();
        debug!(
            session = %id,
            command = %config.command,
            args = ?config.args,
            pid = child.pid(),
            rows = config.dimensions.rows,
            cols = config.dimensions.cols,
            "spawned session"
        );

        let master = Arc::new(master);
        let output = Arc::new(SharedOutput::new());
        let reader = runtime.spawn(reader::drain(Arc::clone(&master), Arc::clone(&output)));

        Ok(Self {
            id,
            config: config.clone(),
            output,
            master: Some(master),
            reader: Some(reader),
            child,
            dimensions: config.dimensions,
            state: SessionState::Running,
            runtime,
        })
    }

    /// The identifier used for this session in logs.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// The configuration the session was spawned with.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Process ID of the program.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.child.pid()
    }

    /// Current terminal size.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Where the session is in its lifecycle.
    pub fn state(&mut self) -> SessionState {
        self.refresh_state();
        self.state
    }

    /// Whether the program has closed its side of the terminal.
    #[must_use]
    pub fn is_stream_ended(&self) -> bool {
        self.output.is_ended()
    }

    /// The exit status, once the program is known to have terminated.
    ///
    /// `None` means the program is still running or has not been reaped
    /// yet; it never stands in for a successful exit.
    pub fn exit_status(&mut self) -> Option<ExitStatus> {
        self.refresh_state();
        self.state.exit_status()
    }

    /// Output received but not yet consumed by an expect, as text.
    #[must_use]
    pub fn buffer(&self) -> String {
        self.output.lock().unconsumed_lossy()
    }

    /// Everything the program has written so far, as text.
    #[must_use]
    pub fn transcript(&self) -> String {
        self.output.lock().contents_lossy()
    }

    /// Wait for `pattern` using the session's default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::Timeout`] if the pattern does not appear in
    /// time and [`ExpectError::Eof`] if the output ends first.
    pub fn expect(&mut self, pattern: impl Into<Pattern>) -> Result<Match> {
        let timeout = self.config.timeout.default;
        self.expect_timeout(pattern, timeout)
    }

    /// Wait for `pattern` for at most `timeout`.
    ///
    /// Output the match was found in, and everything before it, is consumed;
    /// the next expect starts searching right after the match. A failed
    /// expect consumes nothing and leaves the program running.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::Timeout`] if the pattern does not appear in
    /// time and [`ExpectError::Eof`] if the output ends first.
    pub fn expect_timeout(
        &mut self,
        pattern: impl Into<Pattern>,
        timeout: Duration,
    ) -> Result<Match> {
        self.ensure_open()?;
        let pattern = pattern.into();
        debug!(session = %self.id, %pattern, ?timeout, "expect");

        // A timeout too large to add to the clock means no deadline at all.
        let deadline = Instant::now().checked_add(timeout);
        let mut buffer = self.output.lock();
        loop {
            if let Some(found) = buffer.find(&pattern) {
                let m = buffer.consume_match(found);
                debug!(session = %self.id, start = m.start, end = m.end, "matched");
                return Ok(m);
            }
            if buffer.is_ended() {
                return Err(ExpectError::eof(pattern.as_str(), buffer.unconsumed_lossy()));
            }
            buffer = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(ExpectError::timeout(
                            timeout,
                            pattern.as_str(),
                            buffer.unconsumed_lossy(),
                        ));
                    }
                    self.output.wait_timeout(buffer, deadline - now)
                }
                None => self.output.wait(buffer),
            };
        }
    }

    /// Wait for the program to close its output.
    ///
    /// The returned match is empty and positioned at the end of the
    /// stream; its `before` holds whatever was left unconsumed.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::Timeout`] if the output is still open after
    /// `timeout`.
    pub fn expect_eof(&mut self, timeout: Duration) -> Result<Match> {
        self.ensure_open()?;
        debug!(session = %self.id, ?timeout, "expect end of stream");

        let deadline = Instant::now().checked_add(timeout);
        let mut buffer = self.output.lock();
        loop {
            if buffer.is_ended() {
                return Ok(buffer.consume_rest());
            }
            buffer = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(ExpectError::timeout(
                            timeout,
                            EOF_PATTERN,
                            buffer.unconsumed_lossy(),
                        ));
                    }
                    self.output.wait_timeout(buffer, deadline - now)
                }
                None => self.output.wait(buffer),
            };
        }
    }

    /// Write raw bytes to the terminal.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::Write`] if the program has exited or the
    /// write fails.
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_open()?;

        if let Some(status) = self.child.try_wait()? {
            return Err(ExpectError::Write {
                source: io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    format!("program already {status}"),
                ),
            });
        }

        let master = self.master.as_ref().ok_or(ExpectError::SessionClosed)?;
        self.runtime
            .block_on(master.write_all(data))
            .map_err(|source| ExpectError::Write { source })?;

        trace!(session = %self.id, bytes = data.len(), "sent");
        Ok(())
    }

    /// Write text to the terminal.
    ///
    /// # Errors
    ///
    /// See [`Session::send`].
    pub fn send_str(&mut self, s: &str) -> Result<()> {
        self.send(s.as_bytes())
    }

    /// Write a line of text followed by the configured line ending.
    ///
    /// # Errors
    ///
    /// See [`Session::send`].
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        let mut data = Vec::with_capacity(line.len() + 2);
        data.extend_from_slice(line.as_bytes());
        data.extend_from_slice(self.config.line_ending.as_bytes());
        self.send(&data)
    }

    /// Write a single control character.
    ///
    /// # Errors
    ///
    /// See [`Session::send`].
    pub fn send_control(&mut self, ctrl: ControlChar) -> Result<()> {
        self.send(&[ctrl.as_byte()])
    }

    /// Change the terminal size.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::Pty`] if either dimension is zero or the
    /// terminal rejects the size.
    pub fn resize(&mut self, rows: u16, cols: u16) -> Result<()> {
        self.ensure_open()?;
        let master = self.master.as_ref().ok_or(ExpectError::SessionClosed)?;

        let dimensions = Dimensions::new(rows, cols);
        master.set_window_size(dimensions.into())?;
        self.dimensions = dimensions;

        debug!(session = %self.id, rows, cols, "resized");
        Ok(())
    }

    /// Shut the session down and report how the program exited.
    ///
    /// Stops collecting output, closes the terminal, and waits up to the
    /// configured grace period for the program to exit before killing it.
    /// Safe to call after any failed expect or send.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::SessionClosed`] if the session was already
    /// closed.
    pub fn close(&mut self) -> Result<ExitStatus> {
        self.ensure_open()?;
        let span = info_span!("close", session = %self.id, pid = self.child.pid());
        let _guard = span.enter();

        let grace = self.config.timeout.close;
        let status = lifecycle::close(self.resources(), grace)?;

        self.state = SessionState::Closed(status);
        debug!(%status, "session closed");
        Ok(status)
    }

    fn resources(&mut self) -> Resources<'_> {
        Resources {
            runtime: &self.runtime,
            reader: &mut self.reader,
            master: &mut self.master,
            child: &mut self.child,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state.is_closed() {
            return Err(ExpectError::SessionClosed);
        }
        Ok(())
    }

    fn refresh_state(&mut self) {
        if self.state != SessionState::Running || !self.output.is_ended() {
            return;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => self.state = SessionState::Terminated(status),
            Ok(None) => {}
            Err(e) => warn!(session = %self.id, error = %e, "polling child status failed"),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state.is_closed() {
            return;
        }

        if matches!(self.child.try_wait(), Ok(Some(_))) {
            debug!(session = %self.id, "session dropped without close");
        } else {
            warn!(session = %self.id, pid = self.child.pid(), "session dropped without close, killing program");
        }
        if let Err(e) = lifecycle::kill(self.resources()) {
            warn!(session = %self.id, error = %e, "cleanup after drop failed");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("command", &self.config.command)
            .field("pid", &self.child.pid())
            .field("dimensions", &self.dimensions)
            .field("state", &self.state)
            .finish()
    }
}
