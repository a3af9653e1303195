//! Interactive sessions.
//!
//! A [`Session`] owns one program running on a pseudo-terminal together
//! with the background reader that collects its output.

mod handle;
mod lifecycle;
mod reader;

pub use handle::Session;
