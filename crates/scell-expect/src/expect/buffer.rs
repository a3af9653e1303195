//! Session output buffer.
//!
//! All output a session has produced is kept in one append-only byte
//! vector. A consumed cursor marks how far expect operations have already
//! matched; searches only ever look at the bytes after it.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::pattern::{Pattern, PatternMatch};
use crate::types::Match;

/// Append-only output with a consumed cursor and an end-of-stream flag.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    data: Vec<u8>,
    consumed: usize,
    ended: bool,
}

impl OutputBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes read from the terminal.
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Total bytes received so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been received yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Position of the consumed cursor.
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.consumed
    }

    /// Bytes after the consumed cursor.
    #[must_use]
    pub fn unconsumed(&self) -> &[u8] {
        &self.data[self.consumed..]
    }

    /// Bytes after the consumed cursor as text, for diagnostics.
    #[must_use]
    pub fn unconsumed_lossy(&self) -> String {
        String::from_utf8_lossy(self.unconsumed()).into_owned()
    }

    /// Everything received so far as text.
    #[must_use]
    pub fn contents_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    /// Record that no more output will arrive.
    pub fn mark_ended(&mut self) {
        self.ended = true;
    }

    /// Whether the stream has ended.
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.ended
    }

    /// Search the unconsumed tail. Offsets in the result are absolute.
    #[must_use]
    pub fn find(&self, pattern: &Pattern) -> Option<PatternMatch> {
        pattern.find(self.unconsumed()).map(|m| PatternMatch {
            start: self.consumed + m.start,
            end: self.consumed + m.end,
            captures: m.captures,
        })
    }

    /// Advance the cursor past a match found by [`OutputBuffer::find`].
    pub fn consume_match(&mut self, found: PatternMatch) -> Match {
        debug_assert!(self.consumed <= found.start && found.end <= self.data.len());

        let before = String::from_utf8_lossy(&self.data[self.consumed..found.start]).into_owned();
        let matched = String::from_utf8_lossy(&self.data[found.start..found.end]).into_owned();
        self.consumed = found.end;

        Match {
            matched,
            before,
            start: found.start,
            end: found.end,
            captures: found.captures,
        }
    }

    /// Consume everything that is left, returning it as the `before` text
    /// of a zero-length match at the end of the stream.
    pub fn consume_rest(&mut self) -> Match {
        let end = self.data.len();
        self.consume_match(PatternMatch {
            start: end,
            end,
            captures: Vec::new(),
        })
    }
}

/// Output buffer shared between the reader task and the session.
#[derive(Debug, Default)]
pub struct SharedOutput {
    buffer: Mutex<OutputBuffer>,
    changed: Condvar,
}

impl SharedOutput {
    /// Create an empty shared buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the buffer. A panic in another holder does not invalidate the
    /// bytes, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, OutputBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append bytes and wake every waiter.
    pub fn push(&self, bytes: &[u8]) {
        self.lock().append(bytes);
        self.changed.notify_all();
    }

    /// Mark the stream ended and wake every waiter.
    pub fn finish(&self) {
        self.lock().mark_ended();
        self.changed.notify_all();
    }

    /// Whether the stream has ended.
    pub fn is_ended(&self) -> bool {
        self.lock().is_ended()
    }

    /// Block until the buffer changes.
    pub fn wait<'a>(&self, guard: MutexGuard<'a, OutputBuffer>) -> MutexGuard<'a, OutputBuffer> {
        self.changed.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the buffer changes or `timeout` elapses.
    pub fn wait_timeout<'a>(
        &self,
        guard: MutexGuard<'a, OutputBuffer>,
        timeout: Duration,
    ) -> MutexGuard<'a, OutputBuffer> {
        match self.changed.wait_timeout(guard, timeout) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    use super::*;

    #[test]
    fn find_is_relative_to_cursor() {
        let mut buf = OutputBuffer::new();
        buf.append(b"prompt$ prompt$ ");

        let first = buf.find(&Pattern::from("prompt$")).unwrap();
        assert_eq!((first.start, first.end), (0, 7));
        let m = buf.consume_match(first);
        assert_eq!(m.before, "");
        assert_eq!(buf.consumed(), 7);

        let second = buf.find(&Pattern::from("prompt$")).unwrap();
        assert_eq!((second.start, second.end), (8, 15));
        let m = buf.consume_match(second);
        assert_eq!(m.before, " ");
        assert_eq!(buf.unconsumed(), b" ");
    }

    #[test]
    fn consumed_content_is_not_rescanned() {
        let mut buf = OutputBuffer::new();
        buf.append(b"Created\r\n");
        let found = buf.find(&Pattern::from("Created")).unwrap();
        buf.consume_match(found);
        assert!(buf.find(&Pattern::from("Created")).is_none());
    }

    #[test]
    fn consume_rest_takes_tail() {
        let mut buf = OutputBuffer::new();
        buf.append(b"abc");
        buf.consume_match(buf.find(&Pattern::from("a")).unwrap());
        buf.mark_ended();

        let m = buf.consume_rest();
        assert_eq!(m.before, "bc");
        assert!(m.is_empty());
        assert_eq!(m.start, 3);
        assert!(buf.unconsumed().is_empty());
        assert!(buf.is_ended());
    }

    #[test]
    fn lossy_views() {
        let mut buf = OutputBuffer::new();
        buf.append(b"ok \xff");
        assert_eq!(buf.contents_lossy(), "ok \u{fffd}");
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn push_wakes_waiter() {
        let shared = Arc::new(SharedOutput::new());
        let writer = Arc::clone(&shared);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            writer.push(b"ready");
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut guard = shared.lock();
        while guard.find(&Pattern::from("ready")).is_none() {
            let now = Instant::now();
            assert!(now < deadline, "waiter was never woken");
            guard = shared.wait_timeout(guard, deadline - now);
        }
        drop(guard);
        handle.join().unwrap();
    }

    #[test]
    fn finish_wakes_untimed_waiter() {
        let shared = Arc::new(SharedOutput::new());
        let writer = Arc::clone(&shared);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            writer.finish();
        });

        let mut guard = shared.lock();
        while !guard.is_ended() {
            guard = shared.wait(guard);
        }
        drop(guard);
        handle.join().unwrap();
    }

    #[test]
    fn finish_is_visible() {
        let shared = SharedOutput::new();
        assert!(!shared.is_ended());
        shared.finish();
        assert!(shared.is_ended());
    }
}
