//! scell-pty: async PTY transport for the shell-cell end-to-end harness
//!
//! This crate allocates a pseudo-terminal pair, starts a program attached
//! to the slave side with a chosen window size, and hands back the master
//! side for async reading and writing together with a child handle for
//! waiting on and killing the process.
//!
//! # Quick Start
//!
//! ```ignore
//! use scell_pty::{NativePtySystem, PtyConfig, PtySystem};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PtyConfig::builder().window_size(600, 800).build();
//!     let (master, mut child) = NativePtySystem::spawn("scell", ["--version"], &config).await?;
//!
//!     let mut buf = [0u8; 1024];
//!     let n = master.read(&mut buf).await?;
//!     println!("{}", String::from_utf8_lossy(&buf[..n]));
//!
//!     println!("{}", child.wait().await?);
//!     Ok(())
//! }
//! ```

#[cfg(not(unix))]
compile_error!("scell-pty only supports Unix platforms");

pub mod config;
pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod unix;

pub use config::{PtyConfig, PtyConfigBuilder, WindowSize};
pub use error::{PtyError, Result};
pub use traits::{ExitStatus, PtySystem};

#[cfg(unix)]
pub use unix::{NativePtySystem, UnixPtyChild, UnixPtyMaster, UnixPtySystem};
