//! scell-e2e: end-to-end scenarios for the scell binary
//!
//! Helpers shared by the scenario tests under `tests/`. Each scenario
//! starts `scell` on a 600 x 800 pseudo-terminal, scripts a conversation
//! with it, and checks that it exits cleanly.
//!
//! The binary under test is taken from `SCELL_BIN`. Optional settings:
//! `SCELL_TIMEOUT` (default expect timeout in seconds) and
//! `SCELL_DATA_DIR` (fixture directory, defaults to `data/` in this crate).

use std::path::{Path, PathBuf};
use std::time::Duration;

use scell_expect::config::env::vars;
use scell_expect::{ControlChar, EnvConfig, ExitStatus, Result, Session, SessionConfig};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Terminal rows every scenario runs with.
pub const WINDOW_ROWS: u16 = 600;

/// Terminal columns every scenario runs with.
pub const WINDOW_COLS: u16 = 800;

/// Expect timeout when `SCELL_TIMEOUT` is not set.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Building the image on first start can take a while.
pub const SESSION_START_TIMEOUT: Duration = Duration::from_secs(120);

/// Shell prompt inside a cell started from the run fixtures.
pub const RUN_PROMPT: &str = "/app#";

/// Shell prompt inside a cell created by `scell init`.
pub const INIT_PROMPT: &str = "/my_project#";

/// Fixture directories the run scenarios are repeated over.
pub const RUN_FIXTURES: [&str; 2] = ["common", "from_docker"];

/// Harness settings read from the environment.
#[derive(Debug, Clone)]
pub struct ScellEnv {
    /// Path to the scell executable.
    pub bin: PathBuf,
    /// Default expect timeout.
    pub timeout: Duration,
    /// Directory holding the scenario fixtures.
    pub data_dir: PathBuf,
}

impl ScellEnv {
    /// Read settings from `SCELL_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `SCELL_BIN` is not set or
    /// `SCELL_TIMEOUT` is not a whole number of seconds.
    pub fn from_env() -> Result<Self> {
        Self::from_config(&EnvConfig::default())
    }

    /// Read settings through `env`.
    ///
    /// # Errors
    ///
    /// See [`ScellEnv::from_env`].
    pub fn from_config(env: &EnvConfig) -> Result<Self> {
        let bin = PathBuf::from(env.require(vars::BIN)?);
        let timeout = env.duration_secs(vars::TIMEOUT)?.unwrap_or(DEFAULT_TIMEOUT);
        let data_dir = env
            .path(vars::DATA_DIR)
            .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("data"));

        debug!(bin = %bin.display(), ?timeout, data_dir = %data_dir.display(), "harness settings");
        Ok(Self {
            bin,
            timeout,
            data_dir,
        })
    }

    /// Session configuration for running scell with `args`.
    #[must_use]
    pub fn session_config<I, S>(&self, args: I) -> SessionConfig
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SessionConfig::new(self.bin.to_string_lossy())
            .args(args)
            .dimensions(WINDOW_ROWS, WINDOW_COLS)
            .timeout(self.timeout)
    }

    /// Start scell with `args`.
    ///
    /// # Errors
    ///
    /// Returns a spawn error if the binary cannot be started.
    pub fn scell<I, S>(&self, args: I) -> Result<Session>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = self.session_config(args);
        info!(args = ?config.args, "starting scell");
        Session::spawn(&config)
    }

    /// Path of the fixture directory `name`.
    #[must_use]
    pub fn fixture(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }
}

/// Render a path as a command-line argument.
#[must_use]
pub fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Wait for scell to finish, close the session, and require exit code 0.
///
/// # Errors
///
/// Returns an error if the output does not end in time or the session
/// cannot be closed.
///
/// # Panics
///
/// Panics if scell exits with anything but code 0.
#[track_caller]
pub fn assert_clean_exit(session: &mut Session) -> Result<()> {
    let timeout = session.config().timeout.default;
    session.expect_eof(timeout)?;
    let transcript = session.transcript();
    let status = session.close()?;

    assert_eq!(
        status,
        ExitStatus::Exited(0),
        "scell did not exit cleanly; output was:\n{transcript}"
    );
    Ok(())
}

/// Wait until scell has started a cell and its shell shows `prompt`.
///
/// # Errors
///
/// Returns the first expectation that fails.
pub fn prepare_session(session: &mut Session, prompt: &str) -> Result<()> {
    session.expect("'Shell-Cell' is up to date")?;
    session.expect_timeout("Starting 'Shell-Cell' session", SESSION_START_TIMEOUT)?;
    session.expect("root@")?;
    session.expect(prompt)?;
    info!(prompt, "cell shell is ready");
    Ok(())
}

/// End the cell's shell and let scell exit.
///
/// Sends end-of-transmission to the shell, waits for scell to report the
/// session finished, then presses a key to dismiss its exit prompt.
///
/// # Errors
///
/// Returns the first step that fails.
///
/// # Panics
///
/// Panics if scell does not exit cleanly.
#[track_caller]
pub fn stop_session(session: &mut Session) -> Result<()> {
    session.send_control(ControlChar::CtrlD)?;
    session.expect("Finished 'Shell-Cell' session")?;
    session.send_str(" ")?;
    assert_clean_exit(session)
}

/// Install a test-friendly tracing subscriber. Safe to call repeatedly.
///
/// Filtering follows `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
