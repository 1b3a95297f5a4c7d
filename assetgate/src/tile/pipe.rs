//! Bounded streaming pipe between the upstream body and the consumer.
//!
//! A background task pulls from the upstream stream and pushes chunks of at
//! most `chunk_size` bytes into a channel with `capacity` slots. When the
//! channel is full the task stops reading, so a slow consumer holds at most
//! `chunk_size * capacity` bytes in flight. Dropping the consumer side ends
//! the task and releases the upstream connection.

use std::io;

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tracing::trace;

use super::upstream::BodyStream;

/// Default chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Default number of chunks buffered between upstream and consumer.
pub const DEFAULT_PIPE_CAPACITY: usize = 16;

/// Route `source` through a bounded pipe.
///
/// Must be called from within a Tokio runtime.
pub fn bounded_pipe(source: BodyStream, chunk_size: usize, capacity: usize) -> BodyStream {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    tokio::spawn(pump(source, tx, chunk_size.max(1)));

    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed()
}

async fn pump(
    mut source: BodyStream,
    tx: mpsc::Sender<Result<Bytes, io::Error>>,
    chunk_size: usize,
) {
    while let Some(item) = source.next().await {
        match item {
            Ok(mut data) => {
                while !data.is_empty() {
                    let chunk = data.split_to(chunk_size.min(data.len()));
                    if tx.send(Ok(chunk)).await.is_err() {
                        trace!("Tile consumer went away, stopping upstream read");
                        return;
                    }
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn source(chunks: Vec<Result<Bytes, io::Error>>) -> BodyStream {
        stream::iter(chunks).boxed()
    }

    #[tokio::test]
    async fn test_rechunks_to_chunk_size() {
        let data = Bytes::from(vec![7u8; 10_000]);
        let piped = bounded_pipe(source(vec![Ok(data.clone())]), 4096, 2);

        let chunks: Vec<Bytes> = piped.map(|c| c.unwrap()).collect().await;
        let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![4096, 4096, 1808]);

        let joined: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        assert_eq!(joined, data.to_vec());
    }

    #[tokio::test]
    async fn test_empty_body() {
        let piped = bounded_pipe(source(vec![]), 4096, 2);
        let chunks: Vec<_> = piped.collect().await;
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn test_error_is_forwarded_and_ends_stream() {
        let piped = bounded_pipe(
            source(vec![
                Ok(Bytes::from_static(b"ab")),
                Err(io::Error::other("reset")),
                Ok(Bytes::from_static(b"never")),
            ]),
            4096,
            4,
        );

        let items: Vec<_> = piped.collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn test_backpressure_limits_read_ahead() {
        let produced = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&produced);
        let upstream = stream::iter(0..1000)
            .map(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Bytes::from_static(b"x"))
            })
            .boxed();

        let mut piped = bounded_pipe(upstream, 1, 4);
        assert!(piped.next().await.is_some());
        tokio::time::sleep(Duration::from_millis(50)).await;

        // One consumed, `capacity` buffered, one held by the blocked send
        let read_ahead = produced.load(Ordering::SeqCst);
        assert!(read_ahead <= 6, "upstream read ahead {} chunks", read_ahead);
    }

    #[tokio::test]
    async fn test_dropped_consumer_stops_pump() {
        let produced = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&produced);
        let upstream = stream::repeat(())
            .map(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Bytes::from_static(b"x"))
            })
            .boxed();

        let piped = bounded_pipe(upstream, 1, 2);
        drop(piped);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let after_drop = produced.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(produced.load(Ordering::SeqCst), after_drop);
    }
}
