use super::GenerateError;
use futures_core::stream::BoxStream;
use futures_core::{ready, Stream};
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Raw response body chunks.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, GenerateError>>;

/// Splits a byte stream into newline-delimited lines.
///
/// - Accepts `\n` and `\r\n`
/// - Drops blank and whitespace-only lines
/// - Keeps a trailing partial line until `finish`
#[derive(Debug, Default)]
pub struct LineSplitter {
    buf: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line = self.buf.drain(..=pos).collect::<Vec<u8>>();
            line.pop();
            if line.ends_with(b"\r") {
                line.pop();
            }
            if !is_blank(&line) {
                out.push(line);
            }
        }

        out
    }

    /// Remaining bytes after the stream ended without a final newline.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        let mut line = std::mem::take(&mut self.buf);
        if line.ends_with(b"\r") {
            line.pop();
        }
        (!is_blank(&line)).then_some(line)
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Decode one line of `/api/generate` output.
///
/// `Ok(None)` means the line is metadata only (no `response` field).
pub fn decode_line(line: &[u8]) -> Result<Option<String>, GenerateError> {
    let protocol = |reason: String| GenerateError::Protocol {
        line: String::from_utf8_lossy(line).into_owned(),
        reason,
    };

    let mut obj: serde_json::Map<String, Value> =
        serde_json::from_slice(line).map_err(|e| protocol(e.to_string()))?;

    if let Some(err) = obj.remove("error") {
        let msg = match err {
            Value::String(s) => s,
            other => other.to_string(),
        };
        return Err(GenerateError::Server(msg));
    }

    match obj.remove("response") {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(protocol(format!("`response` is not a string: {other}"))),
    }
}

/// Lazy sequence of generated fragments over an NDJSON body.
///
/// Owns the body exclusively. The body is dropped exactly once: at end of
/// stream, on the first error, or when this value is dropped by a consumer
/// that stopped early.
pub struct FragmentStream {
    body: Option<ByteStream>,
    lines: LineSplitter,
    ready: VecDeque<Result<String, GenerateError>>,
}

impl FragmentStream {
    pub fn new(body: ByteStream) -> Self {
        Self {
            body: Some(body),
            lines: LineSplitter::new(),
            ready: VecDeque::new(),
        }
    }

    pub fn is_released(&self) -> bool {
        self.body.is_none()
    }

    fn release(&mut self) {
        if self.body.take().is_some() {
            tracing::debug!("generation stream released");
        }
    }

    fn decode(&mut self, lines: Vec<Vec<u8>>) {
        for line in lines {
            match decode_line(&line) {
                Ok(Some(text)) => self.ready.push_back(Ok(text)),
                Ok(None) => {}
                Err(e) => {
                    self.release();
                    self.ready.push_back(Err(e));
                    return;
                }
            }
        }
    }
}

impl Stream for FragmentStream {
    type Item = Result<String, GenerateError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(item) = this.ready.pop_front() {
                return Poll::Ready(Some(item));
            }

            let Some(body) = this.body.as_mut() else {
                return Poll::Ready(None);
            };

            match ready!(body.as_mut().poll_next(cx)) {
                Some(Ok(bytes)) => {
                    let lines = this.lines.push(&bytes);
                    this.decode(lines);
                }
                Some(Err(e)) => {
                    this.release();
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    this.release();
                    let tail = this.lines.finish();
                    this.decode(tail.into_iter().collect());
                }
            }
        }
    }
}

impl Drop for FragmentStream {
    fn drop(&mut self) {
        self.release();
    }
}
