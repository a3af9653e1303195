//! Background task that drains the PTY master into the session buffer.

use std::io;
use std::sync::Arc;

use scell_pty::UnixPtyMaster;
use tracing::{trace, warn};

use crate::expect::SharedOutput;

/// Size of each read from the master.
const READ_CHUNK: usize = 4096;

/// Copy everything the child writes into `output` until the stream ends.
///
/// A read error ends the stream the same way end-of-file does; waiters see
/// it as the child having closed its output.
pub async fn drain(master: Arc<UnixPtyMaster>, output: Arc<SharedOutput>) {
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        match master.read(&mut buf).await {
            Ok(0) => {
                trace!("end of stream");
                break;
            }
            Ok(n) => {
                trace!(bytes = n, "read");
                output.push(&buf[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                warn!(error = %e, "reading from PTY failed, treating as end of stream");
                break;
            }
        }
    }

    output.finish();
}
