//! Expect pattern matching module.
//!
//! Pattern types and the output buffer the session searches while it
//! waits for terminal output.

mod buffer;
mod pattern;

pub use buffer::{OutputBuffer, SharedOutput};
pub use pattern::{CompiledRegex, Pattern, PatternMatch};
