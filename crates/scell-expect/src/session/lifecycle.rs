//! Session teardown.
//!
//! Closing a session always runs the same steps: stop the reader, release
//! the master descriptor, then reap the child. [`close`] gives the child a
//! grace period to exit on its own; [`kill`] does not wait for it.

use std::sync::Arc;
use std::time::Duration;

use scell_pty::{ExitStatus, UnixPtyChild, UnixPtyMaster};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Result;

/// How long [`kill`] waits for the killed child to be reaped.
const KILL_REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Resources a running session holds.
pub struct Resources<'a> {
    /// Runtime driving the reader and child reaping.
    pub runtime: &'a Runtime,
    /// The reader task, if still attached.
    pub reader: &'a mut Option<JoinHandle<()>>,
    /// The master descriptor, if still open.
    pub master: &'a mut Option<Arc<UnixPtyMaster>>,
    /// The child process.
    pub child: &'a mut UnixPtyChild,
}

impl Resources<'_> {
    /// Stop the reader and close the master. Idempotent.
    fn release(&mut self) {
        if let Some(handle) = self.reader.take() {
            join_reader(self.runtime, handle);
        }

        if let Some(master) = self.master.take() {
            master.close();
        }
    }
}

/// Abort the reader and wait for it to finish.
///
/// Joining guarantees the task dropped its handle on the master. A panic
/// inside the reader is logged; cancellation is the expected outcome.
fn join_reader(runtime: &Runtime, handle: JoinHandle<()>) {
    handle.abort();
    match runtime.block_on(handle) {
        Err(e) if e.is_panic() => warn!(error = %e, "PTY reader task panicked"),
        Err(_) | Ok(()) => {}
    }
}

/// Release everything, then wait up to `grace` for the child before
/// killing it.
pub fn close(mut res: Resources<'_>, grace: Duration) -> Result<ExitStatus> {
    res.release();

    let Resources { runtime, child, .. } = res;
    let pid = child.pid();

    let waited = runtime.block_on(async { tokio::time::timeout(grace, child.wait()).await });
    let status = match waited {
        Ok(status) => status?,
        Err(_elapsed) => {
            warn!(pid, ?grace, "child did not exit within grace period, killing");
            child.kill()?;
            runtime.block_on(child.wait())?
        }
    };

    debug!(pid, %status, "child reaped");
    Ok(status)
}

/// Release everything and kill the child.
///
/// Returns `None` if the child could not be reaped in time.
pub fn kill(mut res: Resources<'_>) -> Result<Option<ExitStatus>> {
    res.release();

    let Resources { runtime, child, .. } = res;
    child.kill()?;

    let status = runtime
        .block_on(async { tokio::time::timeout(KILL_REAP_TIMEOUT, child.wait()).await })
        .ok()
        .transpose()?;
    if status.is_none() {
        warn!(pid = child.pid(), "killed child was not reaped in time");
    }
    Ok(status)
}
