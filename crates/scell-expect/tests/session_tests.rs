//! Integration tests for [`Session`] against real programs on a PTY.

#![cfg(unix)]

use std::thread;
use std::time::{Duration, Instant};

use scell_expect::{
    ControlChar, ExitStatus, ExpectError, Pattern, Session, SessionConfig, SessionState,
    SpawnError,
};

const SHORT: Duration = Duration::from_millis(300);
const LONG: Duration = Duration::from_secs(10);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn spawn(command: &str, args: &[&str]) -> Session {
    init_tracing();
    let config = SessionConfig::new(command).args(args.iter().copied()).timeout(LONG);
    Session::spawn(&config).expect("Failed to spawn session")
}

fn spawn_shell() -> Session {
    init_tracing();
    let config = SessionConfig::new("/bin/sh")
        .env("PS1", "PROMPT> ")
        .timeout(LONG);
    let mut session = Session::spawn(&config).expect("Failed to spawn shell");
    session.expect("PROMPT> ").expect("Failed to see first prompt");
    session
}

/// Poll until the program has been reaped.
fn wait_for_exit(session: &mut Session) -> ExitStatus {
    let deadline = Instant::now() + LONG;
    loop {
        if let Some(status) = session.exit_status() {
            return status;
        }
        assert!(Instant::now() < deadline, "program never exited");
        thread::sleep(Duration::from_millis(20));
    }
}

// =============================================================================
// Matching
// =============================================================================

#[test]
fn expect_echo_output() {
    let mut session = spawn("/bin/echo", &["hello", "world"]);

    let m = session.expect("world").expect("Failed to expect world");
    assert_eq!(m.matched, "world");
    assert_eq!(m.before, "hello ");
    assert_eq!((m.start, m.end), (6, 11));

    session.expect_eof(LONG).expect("Failed to expect eof");
    assert_eq!(session.close().expect("Failed to close"), ExitStatus::Exited(0));
}

#[test]
fn pattern_split_across_writes() {
    let mut session = spawn("/bin/sh", &["-c", "printf hel; sleep 0.2; printf 'lo world'"]);

    let m = session.expect("hello").expect("Failed to expect hello");
    assert_eq!(m.start, 0);
    assert_eq!(m.end, 5);

    session.close().expect("Failed to close");
}

#[test]
fn leftmost_match_wins_and_cursor_advances() {
    let mut session = spawn("/bin/sh", &["-c", "printf 'ab ab'; sleep 1"]);

    let first = session.expect("ab").expect("Failed first expect");
    assert_eq!(first.start, 0);
    let second = session.expect("ab").expect("Failed second expect");
    assert_eq!(second.start, 3);
    assert_eq!(second.before, " ");

    session.close().expect("Failed to close");
}

#[test]
fn sequential_expects_do_not_rematch() {
    let mut session = spawn("/bin/sh", &["-c", "echo first; echo second"]);

    session.expect("first").expect("Failed to expect first");
    session.expect("second").expect("Failed to expect second");

    let err = session.expect_timeout("first", LONG).unwrap_err();
    assert!(err.is_eof(), "unexpected error: {err}");

    session.close().expect("Failed to close");
}

#[test]
fn regex_pattern_captures() {
    let mut session = spawn("/bin/echo", &["shell-cell 1.0.1"]);

    let pattern = Pattern::regex(r"shell-cell (\d+\.\d+\.\d+)").expect("Failed to compile");
    let m = session.expect(pattern).expect("Failed to expect version");
    assert_eq!(m.capture(0), Some("1.0.1"));

    session.close().expect("Failed to close");
}

#[test]
fn empty_pattern_matches_immediately() {
    let mut session = spawn("/bin/cat", &[]);

    let m = session.expect_timeout("", SHORT).expect("Empty pattern should match");
    assert!(m.is_empty());
    assert_eq!(m.start, 0);

    session.close().expect("Failed to close");
}

#[test]
fn match_present_after_stream_end_is_found() {
    let mut session = spawn("/bin/echo", &["done"]);

    let deadline = Instant::now() + LONG;
    while !session.is_stream_ended() {
        assert!(Instant::now() < deadline, "stream never ended");
        thread::sleep(Duration::from_millis(20));
    }

    session.expect("done").expect("Buffered match should be honored");
    session.close().expect("Failed to close");
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn timeout_while_program_runs() {
    let mut session = spawn("/bin/cat", &[]);

    let started = Instant::now();
    let err = session.expect_timeout("never printed", SHORT).unwrap_err();
    assert!(err.is_timeout(), "unexpected error: {err}");
    assert!(started.elapsed() >= SHORT);

    // The session is still usable after a timeout.
    session.send_line("still here").expect("Failed to send");
    session.expect("still here").expect("Failed to expect echo");

    session.close().expect("Failed to close");
}

#[test]
fn default_timeout_comes_from_config() {
    init_tracing();
    let config = SessionConfig::new("/bin/cat").timeout(SHORT);
    let mut session = Session::spawn(&config).expect("Failed to spawn");

    match session.expect("nothing") {
        Err(ExpectError::Timeout { duration, pattern, .. }) => {
            assert_eq!(duration, SHORT);
            assert_eq!(pattern, "nothing");
        }
        other => panic!("expected timeout, got {other:?}"),
    }

    session.close().expect("Failed to close");
}

#[test]
fn unbounded_expect_timeout() {
    let mut session = spawn("/bin/echo", &["ready"]);

    let m = session
        .expect_timeout("ready", Duration::MAX)
        .expect("Failed to expect with unbounded timeout");
    assert_eq!(m.matched, "ready");

    session.close().expect("Failed to close");
}

#[test]
fn unbounded_default_timeout() {
    init_tracing();
    let config = SessionConfig::new("/bin/sh")
        .args(["-c", "sleep 0.1; echo late"])
        .timeout(Duration::from_secs(u64::MAX));
    let mut session = Session::spawn(&config).expect("Failed to spawn");

    session.expect("late").expect("Failed to expect with huge default timeout");
    let err = session.expect("never printed").unwrap_err();
    assert!(err.is_eof(), "unexpected error: {err}");

    session.close().expect("Failed to close");
}

#[test]
fn unbounded_expect_eof() {
    let mut session = spawn("/bin/sh", &["-c", "sleep 0.1; printf done"]);

    let m = session
        .expect_eof(Duration::MAX)
        .expect("Failed to expect eof with unbounded timeout");
    assert_eq!(m.before, "done");

    assert_eq!(session.close().expect("Failed to close"), ExitStatus::Exited(0));
}

#[test]
fn eof_before_pattern() {
    let mut session = spawn("/bin/sh", &["-c", "printf bye"]);

    let started = Instant::now();
    let err = session.expect("missing").unwrap_err();
    assert!(err.is_eof(), "unexpected error: {err}");
    assert!(started.elapsed() < LONG);
    assert!(err.buffer().is_some_and(|b| b.contains("bye")));

    assert_eq!(session.close().expect("Failed to close"), ExitStatus::Exited(0));
}

#[test]
fn spawn_missing_program() {
    init_tracing();
    let config = SessionConfig::new("/definitely/not/a/real/binary");
    let err = Session::spawn(&config).unwrap_err();
    assert!(
        matches!(err, ExpectError::Spawn(SpawnError::CommandNotFound { .. })),
        "unexpected error: {err}"
    );
}

#[test]
fn spawn_invalid_working_dir() {
    init_tracing();
    let config = SessionConfig::new("/bin/true").working_dir("/definitely/not/a/dir");
    let err = Session::spawn(&config).unwrap_err();
    assert!(matches!(
        err,
        ExpectError::Spawn(SpawnError::InvalidWorkingDir { .. })
    ));
}

#[test]
fn send_to_exited_program_fails() {
    let mut session = spawn("/bin/true", &[]);
    session.expect_eof(LONG).expect("Failed to expect eof");
    wait_for_exit(&mut session);

    let err = session.send(b"x").unwrap_err();
    assert!(matches!(err, ExpectError::Write { .. }), "unexpected error: {err}");

    session.close().expect("Failed to close");
}

// =============================================================================
// Input
// =============================================================================

#[test]
fn send_line_to_shell() {
    let mut session = spawn_shell();

    session.send_line("echo $((6 * 7))").expect("Failed to send");
    session.expect("42").expect("Failed to expect result");
    session.expect("PROMPT> ").expect("Failed to expect prompt");

    session.send_line("exit").expect("Failed to send exit");
    session.expect_eof(LONG).expect("Failed to expect eof");
    assert_eq!(session.close().expect("Failed to close"), ExitStatus::Exited(0));
}

#[test]
fn end_of_transmission_terminates_shell() {
    let mut session = spawn_shell();

    session
        .send_control(ControlChar::CtrlD)
        .expect("Failed to send ^D");
    session.expect_eof(LONG).expect("Shell did not exit on ^D");

    assert_eq!(wait_for_exit(&mut session), ExitStatus::Exited(0));
    assert_eq!(session.close().expect("Failed to close"), ExitStatus::Exited(0));
}

#[test]
fn resize_is_seen_by_program() {
    let mut session = spawn_shell();

    session.resize(30, 100).expect("Failed to resize");
    assert_eq!(session.dimensions().rows, 30);
    session.send_line("stty size").expect("Failed to send");
    session.expect("30 100").expect("Failed to expect new size");

    assert!(session.resize(0, 100).is_err());
    assert_eq!(session.dimensions().cols, 100);

    session.close().expect("Failed to close");
}

#[test]
fn initial_size_is_applied() {
    init_tracing();
    let config = SessionConfig::new("/bin/sh")
        .args(["-c", "stty size"])
        .dimensions(600, 800);
    let mut session = Session::spawn(&config).expect("Failed to spawn");

    session.expect("600 800").expect("Failed to expect size");
    session.close().expect("Failed to close");
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn exit_code_is_reported() {
    let mut session = spawn("/bin/sh", &["-c", "exit 3"]);

    session.expect_eof(LONG).expect("Failed to expect eof");
    assert_eq!(wait_for_exit(&mut session), ExitStatus::Exited(3));
    assert_eq!(session.state(), SessionState::Terminated(ExitStatus::Exited(3)));

    let status = session.close().expect("Failed to close");
    assert_eq!(status, ExitStatus::Exited(3));
    assert!(!status.success());
    assert_eq!(session.state(), SessionState::Closed(status));
}

#[test]
fn running_program_has_no_status() {
    let mut session = spawn("/bin/cat", &[]);
    assert_eq!(session.exit_status(), None);
    assert_eq!(session.state(), SessionState::Running);
    session.close().expect("Failed to close");
}

#[test]
fn close_after_failed_expect() {
    let mut session = spawn("/bin/cat", &[]);
    assert!(session.expect_timeout("nope", SHORT).is_err());

    // cat is hung up when the terminal closes.
    let status = session.close().expect("Failed to close");
    assert_eq!(session.exit_status(), Some(status));
}

#[test]
fn operations_after_close_are_usage_errors() {
    let mut session = spawn("/bin/echo", &["bye"]);
    session.close().expect("Failed to close");

    let err = session.close().unwrap_err();
    assert!(err.is_usage());
    assert!(session.expect("bye").unwrap_err().is_usage());
    assert!(session.send_line("hi").unwrap_err().is_usage());
    assert!(session.resize(10, 10).unwrap_err().is_usage());
}

#[test]
fn close_kills_program_that_ignores_hangup() {
    init_tracing();
    let config = SessionConfig::new("/bin/sh")
        .args(["-c", "trap '' HUP; echo ready; exec sleep 30"])
        .close_grace(SHORT);
    let mut session = Session::spawn(&config).expect("Failed to spawn");
    session.expect("ready").expect("Failed to expect ready");

    let started = Instant::now();
    let status = session.close().expect("Failed to close");
    assert_eq!(status, ExitStatus::Signaled(9));
    assert!(started.elapsed() < LONG);
}

#[cfg(target_os = "linux")]
#[test]
fn drop_without_close_kills_program() {
    let session = spawn("/bin/sleep", &["30"]);
    let proc_dir = format!("/proc/{}", session.pid());
    assert!(std::path::Path::new(&proc_dir).exists());

    drop(session);

    assert!(!std::path::Path::new(&proc_dir).exists());
}

// =============================================================================
// Async callers
// =============================================================================

#[tokio::test]
async fn session_runs_on_plain_thread_from_async_test() {
    init_tracing();
    let status = thread::spawn(|| {
        let mut session = spawn("/bin/echo", &["from a thread"]);
        session.expect("thread").expect("Failed to expect output");
        session.close().expect("Failed to close")
    })
    .join()
    .expect("session thread panicked");

    assert_eq!(status, ExitStatus::Exited(0));
}
