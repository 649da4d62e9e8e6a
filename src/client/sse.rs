//! Server-Sent Events (SSE) consumption for A2A streaming responses.
//!
//! [`SseParser`] is a pure incremental parser over the raw byte stream:
//! it accepts `\n`, `\r`, and `\r\n` line terminators (including ones
//! split across chunks), joins repeated `data:` lines with `\n`, tracks
//! the per-event `event:` name (defaulting to `message`), and ignores
//! comments, `id:`, and `retry:` fields. [`EventStream`] wires the parser
//! to an HTTP response body and yields validated [`A2AEvent`] values.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::Stream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{A2AError, A2AResult};
use crate::types::{A2AEvent, EVENT_MESSAGE_ALIAS};

/// One complete SSE frame: the event name and the joined data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Incremental SSE wire-format parser.
///
/// Feed raw chunks with [`feed`](Self::feed); each call returns the frames
/// completed by that chunk. Call [`finish`](Self::finish) once at end of
/// stream to flush a trailing frame that was not terminated by a blank
/// line.
#[derive(Debug, Default)]
pub(crate) struct SseParser {
    buffer: Vec<u8>,
    event_type: Option<String>,
    data: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk of bytes, returning any frames it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            let Some((line_end, term_len)) = self.find_line_terminator() else {
                break;
            };
            let raw_line = self.buffer.drain(..line_end + term_len).collect::<Vec<u8>>();
            let line_bytes = &raw_line[..line_end];

            let line = match std::str::from_utf8(line_bytes) {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "skipping non-UTF-8 line in SSE stream");
                    continue;
                }
            };

            if let Some(frame) = self.handle_line(line) {
                frames.push(frame);
            }
        }

        frames
    }

    /// Flush a trailing unterminated frame at end of stream.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let mut rest = std::mem::take(&mut self.buffer);
        // A held trailing \r is a complete terminator at end of stream.
        if rest.last() == Some(&b'\r') {
            rest.pop();
        }
        // A trailing line without a terminator still counts.
        if !rest.is_empty() {
            match std::str::from_utf8(&rest) {
                Ok(line) => {
                    if let Some(frame) = self.handle_line(line) {
                        return Some(frame);
                    }
                }
                Err(e) => warn!(error = %e, "skipping non-UTF-8 tail in SSE stream"),
            }
        }
        if self.data.is_empty() {
            return None;
        }
        Some(self.take_frame())
    }

    /// Locate the next line terminator, but refuse to split a `\r\n` pair
    /// whose `\n` may still be in flight.
    fn find_line_terminator(&self) -> Option<(usize, usize)> {
        for (i, &b) in self.buffer.iter().enumerate() {
            match b {
                b'\n' => return Some((i, 1)),
                b'\r' => {
                    if i + 1 < self.buffer.len() {
                        let term_len = if self.buffer[i + 1] == b'\n' { 2 } else { 1 };
                        return Some((i, term_len));
                    }
                    // Trailing \r: wait for the next chunk to decide
                    // whether it is a bare \r or half of \r\n.
                    return None;
                }
                _ => {}
            }
        }
        None
    }

    /// Process one logical line; returns a frame on a dispatching blank line.
    fn handle_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            if self.data.is_empty() {
                // Blank line with no pending data: nothing to dispatch.
                self.event_type = None;
                return None;
            }
            return Some(self.take_frame());
        }

        if line.starts_with(':') {
            // Comment / keep-alive.
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.trim_start_matches(' ')),
            None => {
                warn!(line = %line, "ignoring malformed SSE line (no colon)");
                return None;
            }
        };

        match field {
            "event" => self.event_type = Some(value.to_string()),
            "data" => {
                if !self.data.is_empty() {
                    self.data.push('\n');
                }
                self.data.push_str(value);
            }
            "id" | "retry" => {}
            other => warn!(field = %other, "ignoring unknown SSE field"),
        }
        None
    }

    fn take_frame(&mut self) -> SseFrame {
        let event = self
            .event_type
            .take()
            .unwrap_or_else(|| EVENT_MESSAGE_ALIAS.to_string());
        SseFrame {
            event,
            data: std::mem::take(&mut self.data),
        }
    }
}

/// Decode a frame's data payload into a validated [`A2AEvent`].
///
/// Returns `None` (after logging) for JSON decode failures, unknown event
/// names, and payloads that fail validation — the stream continues past
/// all of these.
pub(crate) fn decode_frame(frame: SseFrame) -> Option<A2AEvent> {
    let value: serde_json::Value = match serde_json::from_str(&frame.data) {
        Ok(value) => value,
        Err(e) => {
            warn!(event = %frame.event, error = %e, "dropping SSE event with invalid JSON data");
            return None;
        }
    };
    match A2AEvent::from_wire(&frame.event, value) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(event = %frame.event, error = %e, "dropping SSE event");
            None
        }
    }
}

/// A lazy, finite, single-consumer stream of task events.
///
/// Returned by [`crate::client::A2AClient::receive_messages`]. The stream
/// is consumed exactly once and cannot be restarted; dropping it aborts
/// the underlying HTTP request. Per-event decode and validation failures
/// are logged and skipped; stream-level transport failures yield one final
/// `Err(`[`A2AError::Connection`]`)` item.
///
/// # Example
///
/// ```no_run
/// # async fn example(mut stream: agentvault::client::EventStream) {
/// while let Some(event) = stream.next().await {
///     match event {
///         Ok(event) => println!("{}: {}", event.event_name(), event.task_id()),
///         Err(e) => eprintln!("stream failed: {e}"),
///     }
/// }
/// # }
/// ```
pub struct EventStream {
    receiver: mpsc::Receiver<A2AResult<A2AEvent>>,
    // Kept so the parsing task is aborted when the stream is dropped.
    task: tokio::task::JoinHandle<()>,
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream").finish_non_exhaustive()
    }
}

impl EventStream {
    /// Spawn a background task that parses the response body into events.
    pub(crate) fn from_response(response: reqwest::Response) -> Self {
        let (tx, rx) = mpsc::channel(64);

        let task = tokio::spawn(async move {
            if let Err(e) = pump_response(response, &tx).await {
                // Surface the stream-level failure, then stop. Send errors
                // mean the receiver is gone and are ignored.
                let _ = tx.send(Err(e)).await;
            }
        });

        Self { receiver: rx, task }
    }

    /// Get the next event, or `None` once the server closes the stream.
    pub async fn next(&mut self) -> Option<A2AResult<A2AEvent>> {
        self.receiver.recv().await
    }
}

impl Stream for EventStream {
    type Item = A2AResult<A2AEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Read the response body through the parser, forwarding decoded events.
async fn pump_response(
    response: reqwest::Response,
    tx: &mpsc::Sender<A2AResult<A2AEvent>>,
) -> A2AResult<()> {
    use futures::StreamExt;

    let mut body = response.bytes_stream();
    let mut parser = SseParser::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| {
            A2AError::Connection(format!("error reading SSE stream: {e}"))
        })?;

        for frame in parser.feed(&chunk) {
            if let Some(event) = decode_frame(frame) {
                if tx.send(Ok(event)).await.is_err() {
                    // Receiver dropped; stop parsing.
                    return Ok(());
                }
            }
        }
    }

    if let Some(frame) = parser.finish() {
        if let Some(event) = decode_frame(frame) {
            let _ = tx.send(Ok(event)).await;
        }
    }

    debug!("SSE stream finished");
    Ok(())
}
