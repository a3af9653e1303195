//! Configuration types for scell-expect.
//!
//! [`SessionConfig`] describes what to spawn and how the session behaves;
//! [`env`] reads harness settings from `SCELL_*` environment variables.

pub mod env;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use scell_pty::PtyConfig;

use crate::types::Dimensions;

/// Default timeout for expect operations (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default grace period a child gets to exit on close (10 seconds).
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(10);

/// Default TERM environment variable value.
pub const DEFAULT_TERM: &str = "xterm-256color";

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The command to execute.
    pub command: String,

    /// Command arguments.
    pub args: Vec<String>,

    /// Environment variables to set on top of the base environment.
    pub env: HashMap<String, String>,

    /// Whether to inherit the parent environment.
    pub inherit_env: bool,

    /// Working directory for the process.
    pub working_dir: Option<PathBuf>,

    /// Initial terminal size.
    pub dimensions: Dimensions,

    /// Timeout configuration.
    pub timeout: TimeoutConfig,

    /// Line ending appended by `send_line`.
    pub line_ending: LineEnding,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let mut env = HashMap::new();
        env.insert("TERM".to_string(), DEFAULT_TERM.to_string());

        Self {
            command: String::new(),
            args: Vec::new(),
            env,
            inherit_env: true,
            working_dir: None,
            dimensions: Dimensions::default(),
            timeout: TimeoutConfig::default(),
            line_ending: LineEnding::default(),
        }
    }
}

impl SessionConfig {
    /// Create a new session configuration with the given command.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Set the command arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set whether to inherit the parent environment.
    #[must_use]
    pub const fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }

    /// Set the terminal size (rows, then columns).
    #[must_use]
    pub const fn dimensions(mut self, rows: u16, cols: u16) -> Self {
        self.dimensions = Dimensions::new(rows, cols);
        self
    }

    /// Set the default expect timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout.default = timeout;
        self
    }

    /// Set how long `close` waits for the child before killing it.
    #[must_use]
    pub const fn close_grace(mut self, grace: Duration) -> Self {
        self.timeout.close = grace;
        self
    }

    /// Set the line ending.
    #[must_use]
    pub const fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }
}

impl From<&SessionConfig> for PtyConfig {
    fn from(config: &SessionConfig) -> Self {
        let mut builder = Self::builder()
            .window_size(config.dimensions.rows, config.dimensions.cols)
            .envs(config.env.iter().map(|(k, v)| (k.clone(), v.clone())));

        if !config.inherit_env {
            builder = builder.env_clear();
        }
        if let Some(ref dir) = config.working_dir {
            builder = builder.working_directory(dir);
        }

        builder.build()
    }
}

/// Configuration for timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Default timeout for expect operations.
    pub default: Duration,

    /// How long close waits for the child before killing it.
    pub close: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default: DEFAULT_TIMEOUT,
            close: DEFAULT_CLOSE_GRACE,
        }
    }
}

impl TimeoutConfig {
    /// Create a new timeout configuration with the given default timeout.
    #[must_use]
    pub fn new(default: Duration) -> Self {
        Self {
            default,
            ..Default::default()
        }
    }

    /// Set the close timeout.
    #[must_use]
    pub const fn close(mut self, timeout: Duration) -> Self {
        self.close = timeout;
        self
    }
}

/// Line ending styles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    /// Unix-style line ending (LF).
    #[default]
    Lf,

    /// Windows-style line ending (CRLF).
    CrLf,

    /// Carriage return, what a terminal sends for Enter.
    Cr,
}

impl LineEnding {
    /// Get the line ending as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }

    /// Get the line ending as bytes.
    #[must_use]
    pub const fn as_bytes(self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}
