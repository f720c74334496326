//! Newline framing for the streaming response body
//!
//! Messages arrive as `\r\n`-delimited JSON, with blank lines sent as
//! keep-alives. Chunk boundaries fall anywhere, so bytes are buffered until a
//! full line is available.

use super::{ItemStream, StreamItem};
use crate::error::Error;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::pin::Pin;

/// Accumulates raw bytes and hands out complete lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    /// Bytes already searched for a terminator
    scanned: usize,
}

impl LineBuffer {
    /// Append a chunk
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Take the next complete line, without its terminator
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let Some(offset) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') else {
            self.scanned = self.buf.len();
            return None;
        };
        let end = self.scanned + offset;
        self.scanned = 0;

        let mut line: Vec<u8> = self.buf.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    /// Take whatever is left after the body ended, if it is not blank
    pub fn take_remainder(&mut self) -> Option<Vec<u8>> {
        self.scanned = 0;
        let rest = std::mem::take(&mut self.buf);
        (!is_blank(&rest)).then_some(rest)
    }

    /// Drop buffered bytes
    pub fn clear(&mut self) {
        self.scanned = 0;
        self.buf.clear();
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

struct DecodeState<S> {
    bytes: Pin<Box<S>>,
    lines: LineBuffer,
    done: bool,
}

/// Turn a byte stream into a stream of classified items.
///
/// A line that fails to decode yields one `Err` item and decoding continues.
/// A transport error yields one `Err` item and ends the stream.
pub fn decode_items<S, E>(bytes: S) -> ItemStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        bytes: Box::pin(bytes),
        lines: LineBuffer::default(),
        done: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.lines.next_line() {
                if is_blank(&line) {
                    continue;
                }
                return Some((StreamItem::from_line(&line), state));
            }

            if state.done {
                let rest = state.lines.take_remainder();
                return rest.map(move |line| (StreamItem::from_line(&line), state));
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => state.lines.push(&chunk),
                Some(Err(e)) => {
                    state.done = true;
                    state.lines.clear();
                    let err = Error::Stream(format!("stream read failed: {}", e));
                    return Some((Err(err), state));
                }
                None => state.done = true,
            }
        }
    }))
}
