//! Stream adapter that decodes a streamed JSON array of partial responses.
//!
//! The service streams `[{...}\n,\r\n{...}\n]`: array punctuation and
//! whitespace between elements is framing, each top-level object is one
//! partial response. Objects may be split across reads and span lines.

use futures_util::{Stream, StreamExt};
use memchr::{memchr2, memchr3};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use crate::types::GenerateContentResponse;
use crate::wire::WireResponse;
use crate::Error;

/// Upper bound on bytes buffered for a single incomplete object.
const MAX_BUFFERED_BYTES: usize = 1_000_000;

/// A stream adapter that parses response chunks from a byte stream.
/// Maintains internal state to handle objects split across reads.
pub struct ChunkStream<S> {
    /// The underlying byte stream
    inner: S,
    /// Bytes not yet consumed as framing or a complete object
    buffer: Vec<u8>,
    /// Parsed chunks ready to be yielded
    chunks: VecDeque<GenerateContentResponse>,
    /// Fatal error to yield once the queued chunks are drained
    error: Option<Error>,
    /// Set once the inner stream ends or a fatal error occurs
    done: bool,
}

impl<S> ChunkStream<S> {
    /// Create a new chunk stream from a byte stream.
    pub fn new(stream: S) -> Self {
        Self {
            inner: stream,
            buffer: Vec::new(),
            chunks: VecDeque::new(),
            error: None,
            done: false,
        }
    }

    /// Parse every complete object currently in the buffer.
    fn parse_buffer(&mut self) -> Result<(), Error> {
        let mut start = 0;

        loop {
            start += skip_framing(&self.buffer[start..]);
            if start == self.buffer.len() {
                break;
            }
            if self.buffer[start] != b'{' {
                return Err(Error::parse(format!(
                    "unexpected byte {:?} between response objects",
                    self.buffer[start] as char
                )));
            }

            let Some(len) = object_len(&self.buffer[start..]) else {
                // Incomplete object, wait for more data
                break;
            };

            let object = &self.buffer[start..start + len];
            let wire: WireResponse = serde_json::from_slice(object).map_err(|e| {
                Error::parse(format!(
                    "malformed response chunk: {e}: {}",
                    String::from_utf8_lossy(object)
                ))
            })?;
            self.chunks.push_back(wire.normalize());
            start += len;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        Ok(())
    }

    /// Malformed input is fatal: nothing after it is read.
    fn fail(&mut self, error: Error) {
        self.buffer.clear();
        self.error = Some(error);
        self.done = true;
    }

    /// Called once the byte stream has ended.
    fn finish(&mut self) -> Result<(), Error> {
        let rest = skip_framing(&self.buffer);
        if rest < self.buffer.len() {
            let tail = String::from_utf8_lossy(&self.buffer[rest..]).into_owned();
            self.buffer.clear();
            return Err(Error::parse(format!(
                "response stream ended inside an object: {tail}"
            )));
        }
        self.buffer.clear();
        Ok(())
    }
}

/// Number of leading framing bytes: whitespace, `[`, `,` and `]`.
fn skip_framing(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .position(|b| !matches!(b, b'[' | b']' | b',' | b' ' | b'\t' | b'\r' | b'\n'))
        .unwrap_or(bytes.len())
}

/// Length of the complete JSON object at the start of `bytes`, which must
/// begin with `{`. Returns `None` while the object is still incomplete.
fn object_len(bytes: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    let mut pos = 0;

    loop {
        // Outside strings only braces and quotes matter.
        pos += memchr3(b'{', b'}', b'"', &bytes[pos..])?;
        match bytes[pos] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos + 1);
                }
            }
            _ => {
                // Inside a string, skip to its closing quote.
                pos += 1;
                loop {
                    pos += memchr2(b'"', b'\\', &bytes[pos..])?;
                    if bytes[pos] == b'\\' {
                        pos += 2;
                        if pos > bytes.len() {
                            return None;
                        }
                    } else {
                        break;
                    }
                }
            }
        }
        pos += 1;
    }
}

impl<S, E> Stream for ChunkStream<S>
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Unpin,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Item = Result<GenerateContentResponse, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            // First, yield any already-parsed chunks (FIFO order)
            if let Some(chunk) = self.chunks.pop_front() {
                return Poll::Ready(Some(Ok(chunk)));
            }
            if let Some(e) = self.error.take() {
                return Poll::Ready(Some(Err(e)));
            }
            if self.done {
                return Poll::Ready(None);
            }

            let bytes = match ready!(self.inner.poll_next_unpin(cx)) {
                Some(Ok(bytes)) => bytes,
                Some(Err(e)) => {
                    let e: Box<dyn std::error::Error + Send + Sync> = e.into();
                    self.fail(Error::streaming(format!(
                        "failed to read response body: {e}"
                    )));
                    continue;
                }
                None => {
                    self.done = true;
                    if let Err(e) = self.finish() {
                        self.error = Some(e);
                    }
                    continue;
                }
            };

            self.buffer.extend_from_slice(&bytes);

            if let Err(e) = self.parse_buffer() {
                self.fail(e);
            } else if self.buffer.len() > MAX_BUFFERED_BYTES {
                self.fail(Error::parse(
                    "response chunk exceeded maximum buffered size",
                ));
            }
        }
    }
}

/// Extension trait to decode byte streams as response chunks.
pub trait ChunkStreamExt: Stream {
    /// Parse this byte stream as a streamed JSON array of responses.
    fn response_chunks(self) -> ChunkStream<Self>
    where
        Self: Sized,
    {
        ChunkStream::new(self)
    }
}

impl<S: Stream> ChunkStreamExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use futures_util::stream;

    async fn collect(pieces: &[&'static [u8]]) -> Vec<Result<GenerateContentResponse, Error>> {
        let bytes: Vec<Result<bytes::Bytes, std::io::Error>> = pieces
            .iter()
            .map(|p| Ok(bytes::Bytes::from_static(*p)))
            .collect();
        stream::iter(bytes).response_chunks().collect().await
    }

    const BODY: &str = "[{\"candidates\":[{\"index\":0,\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"Hello\"}]}}]}\n,\r\n{\"candidates\":[{\"index\":0,\"content\":{\"parts\":[{\"text\":\" world\"}]},\"finishReason\":\"STOP\"}]}\n]";

    #[test]
    fn test_object_len() {
        assert_eq!(object_len(br#"{"a":1}, {"b":2}"#), Some(7));
        assert_eq!(object_len(br#"{"a":{"b":[{}]}}"#), Some(16));
        assert_eq!(object_len(br#"{"a":"}{"}"#), Some(10));
        assert_eq!(object_len(br#"{"a":"say \"hi\" }"}"#), Some(20));
        assert_eq!(object_len(br#"{"a":"\\"}"#), Some(10));
        assert_eq!(object_len(br#"{"a":"unterminated"#), None);
        assert_eq!(object_len(br#"{"a":{"b":1}"#), None);
        assert_eq!(object_len(br#"{"a":"\"#), None);
    }

    #[tokio::test]
    async fn test_streamed_array_body() {
        let results = collect(&[BODY.as_bytes()]).await;
        assert_eq!(results.len(), 2);

        let first = results[0].as_ref().unwrap();
        assert_eq!(first.text().as_deref(), Some("Hello"));

        let second = results[1].as_ref().unwrap();
        assert_eq!(second.text().as_deref(), Some(" world"));
        assert_eq!(second.candidates[0].content.role, Role::Model);
    }

    #[tokio::test]
    async fn test_split_at_every_byte() {
        let pieces: Vec<&'static [u8]> = BODY.as_bytes().chunks(1).collect();
        let results = collect(&pieces).await;
        let texts: Vec<_> = results
            .into_iter()
            .map(|r| r.unwrap().text().unwrap())
            .collect();
        assert_eq!(texts, vec!["Hello", " world"]);
    }

    #[tokio::test]
    async fn test_pretty_printed_objects() {
        let body: &'static [u8] = b"[{\n  \"candidates\": [\n    {\"content\": {\"parts\": [{\"text\": \"a\"}]}}\n  ]\n}\n,\n{\n  \"candidates\": [\n    {\"content\": {\"parts\": [{\"text\": \"b\"}]}}\n  ]\n}\n]\n";
        let results = collect(&[body]).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[tokio::test]
    async fn test_empty_body_and_empty_array() {
        assert!(collect(&[]).await.is_empty());
        assert!(collect(&[b"[]"]).await.is_empty());
        assert!(collect(&[b"[", b"\n", b"]\n"]).await.is_empty());
    }

    #[tokio::test]
    async fn test_utf8_split_across_reads() {
        // "€" is three bytes: E2 82 AC
        let results = collect(&[
            b"[{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Price: \xE2\x82",
            b"\xAC100\"}]}}]}]",
        ])
        .await;
        assert_eq!(
            results[0].as_ref().unwrap().text().as_deref(),
            Some("Price: €100")
        );
    }

    #[tokio::test]
    async fn test_malformed_json_is_fatal() {
        let results = collect(&[
            b"[{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"ok\"}]}}]},\n",
            b"{\"candidates\": nope},\n",
            b"{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"never\"}]}}]}]",
        ])
        .await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        let err = results[1].as_ref().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Parse);
    }

    #[tokio::test]
    async fn test_garbage_between_objects_is_fatal() {
        let results = collect(&[b"[{\"candidates\":[]}, oops {}]"]).await;
        assert_eq!(results.len(), 2);
        assert!(results[1].is_err());
    }

    #[tokio::test]
    async fn test_truncated_body_is_fatal() {
        let results = collect(&[b"[{\"candidates\":[{\"content\":"]).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap_err().kind(), crate::ErrorKind::Parse);
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let pieces: Vec<Result<bytes::Bytes, std::io::Error>> = vec![
            Ok(bytes::Bytes::from_static(b"[{\"candidates\":[]}")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(bytes::Bytes::from_static(b",{\"candidates\":[]}]")),
        ];
        let results: Vec<_> = stream::iter(pieces).response_chunks().collect().await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert_eq!(
            results[1].as_ref().unwrap_err().kind(),
            crate::ErrorKind::Transport
        );
    }
}
