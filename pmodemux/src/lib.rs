//! # pmodemux
//!
//! Incremental Ogg/Vorbis demultiplexer for Rust.
//!
//! Compressed bytes are pulled from any `std::io::Read` into a growable
//! staging buffer and handed to a push-mode decoder. Every decoded frame is
//! converted to signed 16-bit little-endian PCM and split into one pending
//! buffer per channel, which callers drain independently or interleaved.
//!
//! ## Features
//!
//! - **Pull-driven decoding**: a frame is decoded only when a reader asks
//!   for bytes that are not buffered yet
//! - **Per-channel readers**: each channel is a separate `Read` stream
//! - **Pluggable decoder**: anything implementing [`FrameDecoder`] can drive
//!   the demuxer; [`VorbisPushDecoder`] is the built-in one
//! - **Async adapter**: interleaved PCM as a Tokio `AsyncRead`
//!
//! ## Example: Split a file per channel
//!
//! ```no_run
//! use std::{fs::File, io::Read};
//! use pmodemux::ChannelDemuxer;
//!
//! let mut demux = ChannelDemuxer::open(File::open("audio.ogg")?)?;
//! let mut left = vec![0u8; 4096];
//! let n = demux.channel(0)?.read(&mut left)?;
//! println!("read {n} bytes of channel 0 at {} Hz", demux.sample_rate());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Example: Interleaved PCM stream
//!
//! ```no_run
//! use pmodemux::{decode_interleaved_stream, DemuxOptions};
//! use tokio::io::AsyncReadExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let file = tokio::fs::File::open("audio.ogg").await?;
//!     let mut stream = decode_interleaved_stream(file, DemuxOptions::load(None)?).await?;
//!
//!     let mut pcm = Vec::new();
//!     stream.read_to_end(&mut pcm).await?;
//!     stream.wait().await?;
//!     Ok(())
//! }
//! ```

mod bridge;
pub mod channel;
pub mod codec;
pub mod config;
mod convert;
pub mod demux;
pub mod error;
mod ogg;
mod pcm;
pub mod reader;
mod staging;
mod stream;
pub mod vorbis;

pub use channel::ChannelBuffer;
pub use codec::{DecodeOutcome, DecoderErrorCode, FrameDecoder, StreamHeader};
pub use config::{DemuxOptions, OggOptions, ResyncOptions, StagingOptions};
pub use convert::{f32_to_i16, SAMPLE_BYTES};
pub use demux::ChannelDemuxer;
pub use error::DemuxError;
pub use pcm::StreamInfo;
pub use reader::{ChannelReader, InterleavedReader};
pub use stream::{
    decode_interleaved_stream, decode_interleaved_stream_with, DemuxedStream, PcmReader,
};
pub use vorbis::VorbisPushDecoder;
