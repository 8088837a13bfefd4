// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Output streaming and waiting.
//!
//! ```text
//! wait_streaming(token, on_line)
//!   stdout/stderr reader tasks --> mpsc (StreamKind, line)
//!   select:
//!     line       --> on_line
//!     child exit --> status
//!     cancelled  --> kill, interrupted = true
//!   done when exited and both readers closed
//! ```

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::runner::{ProcessExit, RunningProcess, StreamKind};
use crate::error::ProcessError;

/// Spawns a line reader task for one output stream.
fn spawn_reader<R>(stream: Option<R>, kind: StreamKind, tx: mpsc::Sender<(StreamKind, String)>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let Some(stream) = stream else {
        return;
    };
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send((kind, line)).await.is_err() {
                break;
            }
        }
    });
}

impl RunningProcess {
    /// Streams output lines to `on_line` until the process exits.
    ///
    /// All output is delivered before this returns. Cancelling `token`
    /// kills the process and yields an interrupted exit.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::Wait` if waiting on the child fails.
    pub async fn wait_streaming<F>(
        mut self,
        token: CancellationToken,
        mut on_line: F,
    ) -> Result<ProcessExit, ProcessError>
    where
        F: FnMut(StreamKind, &str),
    {
        let (tx, mut rx) = mpsc::channel::<(StreamKind, String)>(100);
        spawn_reader(self.child.stdout.take(), StreamKind::Stdout, tx.clone());
        spawn_reader(self.child.stderr.take(), StreamKind::Stderr, tx);

        let mut status = None;
        let mut lines_open = true;
        let mut interrupted = false;

        while status.is_none() || lines_open {
            tokio::select! {
                line = rx.recv(), if lines_open => match line {
                    Some((kind, line)) => on_line(kind, &line),
                    None => lines_open = false,
                },
                result = self.child.wait(), if status.is_none() => {
                    let exit = result.map_err(|source| ProcessError::Wait {
                        command: self.command_line.clone(),
                        source,
                    })?;
                    status = Some(exit);
                }
                () = token.cancelled(), if !interrupted && status.is_none() => {
                    debug!(process = %self.name, "interrupted, killing");
                    interrupted = true;
                    if let Err(e) = self.child.start_kill() {
                        debug!(process = %self.name, error = %e, "kill failed");
                    }
                }
            }
        }

        let code = status.and_then(|s| s.code());
        trace!(process = %self.name, exit_code = ?code, interrupted, "completed");
        Ok(ProcessExit::new(code, interrupted))
    }
}
