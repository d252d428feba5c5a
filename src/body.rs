//! Request and response bodies.
//!
//! A [`Body`] is a stream of byte chunks. Structured bodies (JSON, XML) are
//! not serialized up front: a producer on the blocking pool encodes the value
//! into one end of a bounded pipe while the transport reads chunks from the
//! other. The producer only starts once the body is first polled, and it
//! stops as soon as the reading side goes away.

use crate::codec::Encoder;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::fmt;
use std::io::{self, Write};
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::io::ReaderStream;

/// Size of the chunks the encoding producer hands to the pipe.
const PIPE_CHUNK_SIZE: usize = 8 * 1024;

/// An HTTP request or response body.
///
/// # Examples
///
/// ```
/// use fluent_request::Body;
///
/// # async fn example() -> std::io::Result<()> {
/// let body = Body::from("hello");
/// assert_eq!(body.collect().await?, "hello");
///
/// let empty = Body::empty();
/// assert!(empty.collect().await?.is_empty());
/// # Ok(())
/// # }
/// ```
pub struct Body {
    inner: Inner,
}

enum Inner {
    Empty,
    Full(Option<Bytes>),
    Streaming(BoxStream<'static, io::Result<Bytes>>),
}

impl Body {
    /// A body with no content.
    pub fn empty() -> Self {
        Self { inner: Inner::Empty }
    }

    /// Wraps a stream of byte chunks.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: Inner::Streaming(stream.boxed()),
        }
    }

    /// Wraps an asynchronous reader. The reader is consumed lazily.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self::from_stream(ReaderStream::new(reader))
    }

    /// Returns the content if the whole body is already in memory.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.inner {
            Inner::Empty => Some(&[]),
            Inner::Full(bytes) => bytes.as_deref(),
            Inner::Streaming(_) => None,
        }
    }

    /// Reads the body to completion.
    ///
    /// The body is dropped, and with it any underlying connection or
    /// producer, whether or not reading succeeds.
    pub async fn collect(mut self) -> io::Result<Bytes> {
        if let Inner::Full(bytes) = &mut self.inner {
            return Ok(bytes.take().unwrap_or_default());
        }

        let mut buf = BytesMut::new();
        while let Some(chunk) = self.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// A body whose content is produced by `encode` on the blocking pool.
    pub(crate) fn encoded(encode: Encoder) -> Self {
        let chunks = stream::once(async move {
            // Capacity 1: the producer waits for the reader after every chunk.
            let (tx, rx) = mpsc::channel(1);
            tokio::task::spawn_blocking(move || produce(encode, tx));
            stream::unfold(rx, |mut rx| async move {
                let chunk = rx.recv().await?;
                Some((chunk, rx))
            })
        })
        .flatten();

        Self::from_stream(chunks)
    }

    /// Ends the stream with a `TimedOut` error if it is still being read at
    /// `deadline`. Bodies already in memory are returned unchanged.
    pub(crate) fn with_deadline(self, deadline: Instant, timeout: Duration) -> Self {
        if !matches!(self.inner, Inner::Streaming(_)) {
            return self;
        }

        let sleep = Box::pin(tokio::time::sleep_until(deadline));
        let chunks = stream::unfold(Some((self, sleep)), move |state| async move {
            let (mut body, mut sleep) = state?;
            tokio::select! {
                biased;
                chunk = body.next() => chunk.map(|chunk| (chunk, Some((body, sleep)))),
                () = &mut sleep => {
                    let err = io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("response body not read within {:?}", timeout),
                    );
                    Some((Err(err), None))
                }
            }
        });

        Self::from_stream(chunks)
    }

    pub(crate) fn into_reqwest(self) -> Option<reqwest::Body> {
        match self.inner {
            Inner::Empty | Inner::Full(None) => None,
            Inner::Full(Some(bytes)) => Some(reqwest::Body::from(bytes)),
            Inner::Streaming(stream) => Some(reqwest::Body::wrap_stream(stream)),
        }
    }
}

fn produce(encode: Encoder, tx: mpsc::Sender<io::Result<Bytes>>) {
    let mut writer = io::BufWriter::with_capacity(PIPE_CHUNK_SIZE, PipeWriter { tx: tx.clone() });

    let result = encode(&mut writer as &mut dyn Write).and_then(|()| writer.flush().map_err(Into::into));
    if let Err(err) = result {
        // Discard buffered output so nothing reaches the reader after the error.
        let _ = writer.into_parts();
        tracing::debug!(error = %err, "Request body encoding failed");
        let _ = tx.blocking_send(Err(io::Error::other(err)));
    }
}

/// Blocking write half of the body pipe.
struct PipeWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "body reader closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Stream for Body {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        match &mut self.inner {
            Inner::Empty => Poll::Ready(None),
            Inner::Full(bytes) => Poll::Ready(bytes.take().map(Ok)),
            Inner::Streaming(stream) => stream.poll_next_unpin(cx),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Empty => f.write_str("Body(Empty)"),
            Inner::Full(bytes) => f
                .debug_tuple("Body")
                .field(&bytes.as_ref().map_or(0, Bytes::len))
                .finish(),
            Inner::Streaming(_) => f.write_str("Body(Streaming)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            return Self::empty();
        }
        Self {
            inner: Inner::Full(Some(bytes)),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(vec: Vec<u8>) -> Self {
        Bytes::from(vec).into()
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Bytes::from(s).into()
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Bytes::from_static(s.as_bytes()).into()
    }
}

impl From<&'static [u8]> for Body {
    fn from(s: &'static [u8]) -> Self {
        Bytes::from_static(s).into()
    }
}
