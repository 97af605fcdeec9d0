//! Subscription stream decoding.
//!
//! The master streams events as RecordIO: each record is
//! `<decimal length>\n<payload of that many bytes>`, back to back, with no
//! alignment between records and the chunks the transport delivers. The
//! decoder therefore carries both the unread bytes and the length of the
//! payload it is waiting for across reads.
//!
//! - A length line that is not a decimal number ends the stream.
//! - A payload that does not decode as an event is logged and skipped.

use std::pin::Pin;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use mesos_proto::Event;
use tracing::warn;

use crate::error::{DriverError, Result};

/// Longest length line accepted before a newline must appear.
const MAX_LENGTH_LINE: usize = 20;

/// Largest record payload accepted.
pub const MAX_RECORD_SIZE: usize = 64 * 1024 * 1024;

/// Frames one payload as a record.
pub fn frame(payload: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(payload.len() + MAX_LENGTH_LINE);
    out.extend_from_slice(payload.len().to_string().as_bytes());
    out.extend_from_slice(b"\n");
    out.extend_from_slice(payload);
    out.freeze()
}

/// Incremental RecordIO decoder.
#[derive(Debug, Default)]
pub struct RecordDecoder {
    buf: BytesMut,
    /// Payload length announced by the last length line, while its payload
    /// is still incomplete.
    pending: Option<usize>,
}

impl RecordDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes read from the transport.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Bytes received but not yet returned as a record.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Pops the next complete record payload, if one is buffered.
    pub fn next_record(&mut self) -> Result<Option<Bytes>> {
        let len = match self.pending {
            Some(len) => len,
            None => {
                let Some(newline) = self.buf.iter().position(|b| *b == b'\n') else {
                    if self.buf.len() > MAX_LENGTH_LINE {
                        return Err(DriverError::Protocol(format!(
                            "no record length within {} bytes",
                            self.buf.len()
                        )));
                    }
                    return Ok(None);
                };
                let line = self.buf.split_to(newline + 1);
                let len = parse_length(&line[..newline])?;
                self.pending = Some(len);
                len
            }
        };

        if self.buf.len() < len {
            return Ok(None);
        }

        self.pending = None;
        Ok(Some(self.buf.split_to(len).freeze()))
    }
}

fn parse_length(line: &[u8]) -> Result<usize> {
    let text = std::str::from_utf8(line)
        .map_err(|_| DriverError::Protocol("record length is not UTF-8".to_string()))?
        .trim();

    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DriverError::Protocol(format!(
            "invalid record length {text:?}"
        )));
    }

    let len: usize = text
        .parse()
        .map_err(|_| DriverError::Protocol(format!("record length {text} out of range")))?;

    if len > MAX_RECORD_SIZE {
        return Err(DriverError::Protocol(format!(
            "record length {len} exceeds limit of {MAX_RECORD_SIZE} bytes"
        )));
    }

    Ok(len)
}

/// Body of a streaming HTTP response.
pub type BodyStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Lazy, non-restartable sequence of events read off one subscription.
pub struct EventStream<S> {
    body: S,
    decoder: RecordDecoder,
    idle_timeout: Option<Duration>,
}

impl<S> EventStream<S>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    pub fn new(body: S) -> Self {
        Self {
            body,
            decoder: RecordDecoder::new(),
            idle_timeout: None,
        }
    }

    /// Bounds how long a single read may wait for bytes.
    pub fn set_idle_timeout(&mut self, timeout: Option<Duration>) {
        self.idle_timeout = timeout;
    }

    /// Reads the next event.
    ///
    /// Only returns an error when the stream is unusable: transport failure,
    /// framing violation, idle timeout, or the master closing the stream.
    pub async fn next_event(&mut self) -> Result<Event> {
        loop {
            while let Some(record) = self.decoder.next_record()? {
                match Event::decode(&record) {
                    Ok(event) => return Ok(event),
                    Err(e) => {
                        warn!(error = %e, bytes = record.len(), "Dropping undecodable event");
                    }
                }
            }

            let chunk = match self.idle_timeout {
                Some(limit) => tokio::time::timeout(limit, self.body.next())
                    .await
                    .map_err(|_| DriverError::HeartbeatTimeout(limit))?,
                None => self.body.next().await,
            };

            match chunk {
                Some(Ok(bytes)) => self.decoder.push(&bytes),
                Some(Err(e)) => return Err(DriverError::Transport(e)),
                None => return Err(DriverError::StreamClosed),
            }
        }
    }
}

/// An open subscription: its session token and its event stream.
pub struct Subscription {
    pub stream_id: String,
    pub events: EventStream<BodyStream>,
}
