//! Line collection from process stdout/stderr
//!
//! Each pipe gets its own reader task. Both tasks feed one unbounded channel,
//! so line order is preserved within a pipe while the interleaving of stdout
//! and stderr is first-arrival.

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Pipe a line was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSource {
    Stdout,
    Stderr,
}

/// One non-blank line with trailing whitespace removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub source: LineSource,
    pub text: String,
}

/// Spawns reader tasks that push [`RawLine`]s into a shared channel
///
/// Readers stop at end of file, on a read error, when the receiver is dropped,
/// or when the token is cancelled.
#[derive(Debug)]
pub struct LineCollector {
    tx: mpsc::UnboundedSender<RawLine>,
    rx: mpsc::UnboundedReceiver<RawLine>,
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl LineCollector {
    pub fn new(token: CancellationToken) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            token,
            handles: Vec::with_capacity(2),
        }
    }

    /// Start reading `reader` line by line
    pub fn collect<R>(&mut self, source: LineSource, reader: R)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let tx = self.tx.clone();
        let token = self.token.clone();
        self.handles
            .push(tokio::spawn(read_lines(reader, source, tx, token)));
    }

    /// Start collection on both streams
    pub fn collect_both<O, E>(&mut self, stdout: O, stderr: E)
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        self.collect(LineSource::Stdout, stdout);
        self.collect(LineSource::Stderr, stderr);
    }

    /// Give up the sending side and hand out the receiver and reader handles
    ///
    /// The receiver yields `None` once every reader has finished.
    pub fn finish(self) -> (mpsc::UnboundedReceiver<RawLine>, Vec<JoinHandle<()>>) {
        let Self { rx, handles, .. } = self;
        (rx, handles)
    }
}

async fn read_lines<R>(
    reader: R,
    source: LineSource,
    tx: mpsc::UnboundedSender<RawLine>,
    token: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = tokio::select! {
            _ = token.cancelled() => break,
            read = reader.read_until(b'\n', &mut buf) => read,
        };

        match read {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                let text = text.trim_end();
                if text.is_empty() {
                    continue;
                }
                let line = RawLine {
                    source,
                    text: text.to_string(),
                };
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(?source, error = %e, "Failed to read agent output");
                break;
            }
        }
    }
}
