//! # Async interleaved PCM stream
//!
//! Runs a [`ChannelDemuxer`] on a blocking thread and exposes its
//! byte-interleaved output as a Tokio `AsyncRead`:
//!
//! ```text
//! AsyncRead ──block_on──▶ [demux thread] ──Bytes chunks──▶ PcmReader (AsyncRead)
//! ```
//!
//! The decode thread pulls compressed bytes on demand, so nothing is read
//! from the input faster than PCM is consumed.
//!
//! ```no_run
//! use pmodemux::{decode_interleaved_stream, DemuxOptions};
//! use tokio::io::AsyncReadExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let file = tokio::fs::File::open("audio.ogg").await?;
//!     let mut stream = decode_interleaved_stream(file, DemuxOptions::default()).await?;
//!     println!("{} channels", stream.info().channels);
//!
//!     let mut pcm = Vec::new();
//!     stream.read_to_end(&mut pcm).await?;
//!     stream.wait().await?;
//!     Ok(())
//! }
//! ```

use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use tokio::{
    io::{AsyncRead, ReadBuf},
    runtime::Handle,
    sync::oneshot,
    task::JoinHandle,
};
use tracing::debug;

use crate::{
    bridge::{pcm_queue, BlockingSource, PcmChunks, PcmSender},
    codec::FrameDecoder,
    config::DemuxOptions,
    demux::ChannelDemuxer,
    error::DemuxError,
    pcm::StreamInfo,
    vorbis::VorbisPushDecoder,
};

/// Interleaved frames per PCM chunk.
const PCM_CHUNK_FRAMES: usize = 4096;

/// PCM bytes decoded on a background thread.
///
/// Dropping the reader closes the queue, which stops the decode thread at its
/// next chunk.
pub struct PcmReader {
    chunks: PcmChunks,
    task: JoinHandle<Result<(), DemuxError>>,
}

impl PcmReader {
    /// Waits for the decode thread and returns how it ended.
    pub async fn wait(self) -> Result<(), DemuxError> {
        let Self { chunks, task } = self;
        drop(chunks);
        task.await.map_err(|err| DemuxError::TaskJoin {
            role: "demux",
            details: err.to_string(),
        })?
    }
}

impl AsyncRead for PcmReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.chunks).poll_read(cx, buf)
    }
}

/// Interleaved 16-bit little-endian PCM produced in the background.
pub struct DemuxedStream {
    info: StreamInfo,
    reader: PcmReader,
}

impl DemuxedStream {
    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    pub fn into_parts(self) -> (StreamInfo, PcmReader) {
        (self.info, self.reader)
    }

    /// Waits for decoding to complete. Errors hit after the header (corrupt
    /// frames, I/O failures) are reported here.
    ///
    /// Any PCM left unread is discarded.
    pub async fn wait(self) -> Result<(), DemuxError> {
        self.reader.wait().await
    }
}

impl AsyncRead for DemuxedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.reader).poll_read(cx, buf)
    }
}

/// Decodes an Ogg/Vorbis stream into interleaved PCM in the background.
///
/// Header errors are returned directly; the stream is only handed out once
/// the channel layout is known.
pub async fn decode_interleaved_stream<R>(
    reader: R,
    options: DemuxOptions,
) -> Result<DemuxedStream, DemuxError>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let ogg = options.ogg.clone();
    decode_interleaved_stream_with(reader, options, move || VorbisPushDecoder::new(ogg)).await
}

/// Same as [`decode_interleaved_stream`] with a caller-supplied decoder.
///
/// The decoder is built on the decode thread, so it does not need to be
/// `Send` itself.
pub async fn decode_interleaved_stream_with<R, F, D>(
    reader: R,
    options: DemuxOptions,
    make_decoder: F,
) -> Result<DemuxedStream, DemuxError>
where
    R: AsyncRead + Unpin + Send + 'static,
    F: FnOnce() -> D + Send + 'static,
    D: FrameDecoder + 'static,
{
    let source = BlockingSource::new(reader, Handle::current());
    let (pcm_tx, chunks) = pcm_queue();
    let (info_tx, info_rx) = oneshot::channel();

    let task = tokio::task::spawn_blocking(move || {
        let demux = ChannelDemuxer::with_decoder(source, make_decoder(), &options);
        let mut demux = match demux {
            Ok(demux) => {
                let _ = info_tx.send(Ok(*demux.info()));
                demux
            }
            Err(err) => {
                let _ = info_tx.send(Err(err.clone()));
                return Err(err);
            }
        };
        pump_interleaved(&mut demux, &pcm_tx)
    });

    let info = match info_rx.await {
        Ok(result) => result?,
        // The thread ended without reporting; its join result says why.
        Err(_) => {
            return Err(match task.await {
                Ok(Err(err)) => err,
                Ok(Ok(())) => DemuxError::ChannelClosed,
                Err(err) => DemuxError::TaskJoin {
                    role: "demux",
                    details: err.to_string(),
                },
            });
        }
    };

    Ok(DemuxedStream {
        info,
        reader: PcmReader { chunks, task },
    })
}

/// Sends interleaved PCM chunks until the stream ends, the reader goes away,
/// or decoding fails.
fn pump_interleaved<R, D>(
    demux: &mut ChannelDemuxer<R, D>,
    pcm_tx: &PcmSender,
) -> Result<(), DemuxError>
where
    R: std::io::Read,
    D: FrameDecoder,
{
    let chunk_len = PCM_CHUNK_FRAMES * demux.info().frame_width();
    let mut sent = 0usize;
    loop {
        let mut chunk = vec![0u8; chunk_len];
        let n = match demux.read_interleaved(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) => {
                let _ = pcm_tx.blocking_send(Err(err.clone()));
                return Err(err);
            }
        };
        chunk.truncate(n);
        sent += n;
        if pcm_tx.blocking_send(Ok(Bytes::from(chunk))).is_err() {
            debug!(bytes = sent, "PCM reader dropped, stopping");
            return Ok(());
        }
    }
    debug!(bytes = sent, "interleaved stream drained");
    Ok(())
}
