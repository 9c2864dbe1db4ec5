//! Adapters between the async world and the blocking decode thread.
//!
//! [`BlockingSource`] lets the demuxer pull compressed bytes from an async
//! reader by parking the decode thread on the runtime. [`PcmChunks`] goes the
//! other way: PCM chunks produced on that thread arrive through a bounded
//! channel and are served to async readers.

use std::{
    io::{self, Read},
    pin::Pin,
    task::{ready, Context, Poll},
};

use bytes::{Buf, Bytes};
use tokio::{
    io::{AsyncRead, AsyncReadExt, ReadBuf},
    runtime::Handle,
    sync::mpsc,
};

use crate::error::DemuxError;

/// Number of PCM chunks buffered between the decode thread and the reader.
pub(crate) const PCM_QUEUE_DEPTH: usize = 8;

pub(crate) type PcmSender = mpsc::Sender<Result<Bytes, DemuxError>>;

/// Blocking `Read` over an async reader.
///
/// Only usable off the runtime's worker threads, e.g. in `spawn_blocking`.
pub(crate) struct BlockingSource<R> {
    inner: R,
    handle: Handle,
}

impl<R> BlockingSource<R> {
    pub fn new(inner: R, handle: Handle) -> Self {
        Self { inner, handle }
    }
}

impl<R: AsyncRead + Unpin> Read for BlockingSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Self { inner, handle } = self;
        handle.block_on(inner.read(buf))
    }
}

/// Receiving end of the PCM queue.
///
/// A chunk is drained fully before the next one is taken. An error sent by
/// the decode thread is returned by the read that reaches it.
pub(crate) struct PcmChunks {
    rx: mpsc::Receiver<Result<Bytes, DemuxError>>,
    current: Bytes,
}

/// Creates a bounded PCM queue.
pub(crate) fn pcm_queue() -> (PcmSender, PcmChunks) {
    let (tx, rx) = mpsc::channel(PCM_QUEUE_DEPTH);
    (
        tx,
        PcmChunks {
            rx,
            current: Bytes::new(),
        },
    )
}

impl AsyncRead for PcmChunks {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        while this.current.is_empty() {
            match ready!(this.rx.poll_recv(cx)) {
                Some(Ok(chunk)) => this.current = chunk,
                Some(Err(err)) => return Poll::Ready(Err(err.into())),
                None => return Poll::Ready(Ok(())),
            }
        }
        let n = this.current.len().min(buf.remaining());
        buf.put_slice(&this.current[..n]);
        this.current.advance(n);
        Poll::Ready(Ok(()))
    }
}
