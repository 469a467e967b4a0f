//! Line-delimited JSON decoding of an agent's event stream.

use super::event::StreamEvent;
use crate::cancel::CancelToken;
use crate::{AgentPipeError, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::debug;

/// Lines longer than this are a fatal decode error (pull API) or are
/// dropped with a warning (there is no push-mode equivalent error path —
/// malformed/oversized lines are both silently skipped in push mode).
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Pull-style decoder over any line-buffered async reader.
pub struct StreamDecoder<R> {
    reader: R,
}

impl<R: AsyncBufRead + Unpin> StreamDecoder<R> {
    /// Wrap a reader for decoding.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read and parse the next event.
    ///
    /// Returns `Ok(None)` at end of stream. Empty and whitespace-only
    /// lines are skipped silently. A line exceeding [`MAX_LINE_BYTES`] is a
    /// fatal [`AgentPipeError::StreamDecode`]; a line within the limit that
    /// fails to parse as [`StreamEvent`] is also fatal in pull mode (pull
    /// mode has no sink to silently continue into — callers wanting
    /// skip-on-malformed behavior should use [`decode`]).
    pub async fn next(&mut self) -> Result<Option<StreamEvent>> {
        loop {
            let mut buf = Vec::new();
            let bytes_read = read_line_bounded(&mut self.reader, &mut buf).await?;
            if bytes_read == 0 {
                return Ok(None);
            }

            let line = String::from_utf8_lossy(&buf);
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let event: StreamEvent = serde_json::from_str(trimmed)
                .map_err(|e| AgentPipeError::StreamDecode(e.to_string()))?;
            return Ok(Some(event));
        }
    }
}

/// Drain `reader` into `sink`, skipping malformed or oversized lines
/// silently rather than aborting. Stops when the reader is exhausted or
/// `cancel` fires, whichever comes first; either way the sink is simply
/// dropped (never explicitly closed — it is owned by this call).
pub async fn decode<R: AsyncBufRead + Unpin>(
    mut reader: R,
    sink: mpsc::Sender<StreamEvent>,
    cancel: CancelToken,
) -> Result<()> {
    loop {
        let mut buf = Vec::new();
        let read_fut = read_line_bounded(&mut reader, &mut buf);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("stream decode cancelled");
                return Ok(());
            }
            result = read_fut => {
                let bytes_read = match result {
                    Ok(n) => n,
                    Err(e) => {
                        debug!(error = %e, "skipping line that exceeded the size limit");
                        continue;
                    }
                };
                if bytes_read == 0 {
                    return Ok(());
                }

                let line = String::from_utf8_lossy(&buf);
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match serde_json::from_str::<StreamEvent>(trimmed) {
                    Ok(event) => {
                        if sink.send(event).await.is_err() {
                            // Receiver dropped; nothing left to drain into.
                            return Ok(());
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, line = %trimmed, "skipping malformed stream line");
                    }
                }
            }
        }
    }
}

/// Read one line (up to and including its terminator) into `buf`, erroring
/// if it would exceed [`MAX_LINE_BYTES`]. Returns the number of bytes
/// read, `0` at EOF.
async fn read_line_bounded<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> Result<usize> {
    let mut total = 0usize;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(total);
        }

        if let Some(pos) = available.iter().position(|&b| b == b'\n') {
            buf.extend_from_slice(&available[..=pos]);
            total += pos + 1;
            reader.consume(pos + 1);
            if buf.len() > MAX_LINE_BYTES {
                return Err(AgentPipeError::StreamDecode(format!(
                    "line exceeded {} bytes",
                    MAX_LINE_BYTES
                )));
            }
            return Ok(total);
        }

        let n = available.len();
        buf.extend_from_slice(available);
        total += n;
        reader.consume(n);
        if buf.len() > MAX_LINE_BYTES {
            return Err(AgentPipeError::StreamDecode(format!(
                "line exceeded {} bytes",
                MAX_LINE_BYTES
            )));
        }
    }
}
