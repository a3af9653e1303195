//! scell-expect: blocking Expect-style sessions for end-to-end tests
//!
//! Start a program on a pseudo-terminal, wait for text to appear in its
//! output, type into it, and check how it exited.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//!
//! use scell_expect::{ControlChar, Session, SessionConfig};
//!
//! fn main() -> scell_expect::Result<()> {
//!     let config = SessionConfig::new("/bin/sh").dimensions(600, 800);
//!     let mut session = Session::spawn(&config)?;
//!
//!     session.send_line("echo hello")?;
//!     session.expect("hello")?;
//!
//!     session.send_control(ControlChar::CtrlD)?;
//!     session.expect_eof(Duration::from_secs(5))?;
//!     assert!(session.close()?.success());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod expect;
pub mod session;
pub mod types;

pub use config::env::EnvConfig;
pub use config::{LineEnding, SessionConfig, TimeoutConfig};
pub use error::{ExpectError, Result, SpawnError};
pub use expect::{OutputBuffer, Pattern, PatternMatch};
pub use session::Session;
pub use types::{ControlChar, Dimensions, ExitStatus, Match, SessionId, SessionState};
