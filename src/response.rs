//! The two views of a streaming generation call: the lazy chunk sequence and
//! the deferred merged response.

use futures_util::stream::Stream;
use futures_util::StreamExt;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::sync::{mpsc, oneshot};

use crate::accumulator::ResponseAccumulator;
use crate::types::GenerateContentResponse;
use crate::Error;

type ChunkResult = Result<GenerateContentResponse, Error>;

/// Result of a streaming generation call.
///
/// `stream` yields each parsed chunk once, in arrival order. `response`
/// resolves to the merged response after the underlying stream is drained,
/// whether or not `stream` is ever consumed.
pub struct StreamGenerateContentResult {
    pub stream: ResponseStream,
    pub response: ResponseFuture,
}

impl StreamGenerateContentResult {
    /// Drain the underlying stream and return only the merged response.
    pub async fn into_response(self) -> Result<GenerateContentResponse, Error> {
        self.response.await
    }
}

/// Single-pass sequence of parsed chunks.
pub struct ResponseStream {
    rx: mpsc::UnboundedReceiver<ChunkResult>,
}

impl Stream for ResponseStream {
    type Item = ChunkResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Deferred merged response.
pub struct ResponseFuture {
    rx: oneshot::Receiver<ChunkResult>,
}

impl ResponseFuture {
    pub(crate) fn new(rx: oneshot::Receiver<ChunkResult>) -> Self {
        Self { rx }
    }
}

impl Future for ResponseFuture {
    type Output = ChunkResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match ready!(Pin::new(&mut self.rx).poll(cx)) {
            Ok(result) => Poll::Ready(result),
            Err(_) => Poll::Ready(Err(Error::streaming(
                "response stream was dropped before it completed",
            ))),
        }
    }
}

/// Spawn the task that drains `chunks`, fanning each chunk out to the caller
/// and into the accumulator.
///
/// The chunk channel is closed before the merged response is published, so the
/// merged response never resolves ahead of the last chunk.
pub(crate) fn process_stream<S>(chunks: S) -> StreamGenerateContentResult
where
    S: Stream<Item = ChunkResult> + Send + 'static,
{
    let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
    let (response_tx, response_rx) = oneshot::channel();

    tokio::spawn(async move {
        let mut chunks = std::pin::pin!(chunks);
        let mut accumulator = ResponseAccumulator::new();

        let outcome = loop {
            match chunks.next().await {
                Some(Ok(chunk)) => {
                    accumulator.add_chunk(chunk.clone());
                    // A dropped receiver only means the caller stopped watching.
                    let _ = chunk_tx.send(Ok(chunk));
                }
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "response stream failed");
                    let merged_error = e.duplicate();
                    let _ = chunk_tx.send(Err(e));
                    break Err(merged_error);
                }
                None => {
                    tracing::debug!(
                        chunks = accumulator.chunk_count(),
                        "response stream drained"
                    );
                    break Ok(accumulator.finalize());
                }
            }
        };

        drop(chunk_tx);
        let _ = response_tx.send(outcome);
    });

    StreamGenerateContentResult {
        stream: ResponseStream { rx: chunk_rx },
        response: ResponseFuture::new(response_rx),
    }
}
