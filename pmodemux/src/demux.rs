//! # Channel demultiplexer
//!
//! [`ChannelDemuxer`] owns the compressed source, the staging buffer, the
//! push decoder and one pending-PCM buffer per channel. Reads are pulled by
//! the caller: when a channel runs dry, one more frame is decoded and its
//! samples are appended to *every* channel, so pulling one channel can
//! populate the others as a side effect.
//!
//! ```no_run
//! use std::{fs::File, io::Read};
//! use pmodemux::ChannelDemuxer;
//!
//! let file = File::open("audio.ogg")?;
//! let mut demux = ChannelDemuxer::open(file)?;
//! println!("{} Hz, {} channels", demux.sample_rate(), demux.channel_count());
//!
//! let mut left = Vec::new();
//! demux.channel(0)?.read_to_end(&mut left)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io::Read;

use tracing::{debug, trace};

use crate::{
    channel::ChannelBuffer,
    codec::{DecoderErrorCode, FrameDecoder},
    config::DemuxOptions,
    convert::extend_i16_le,
    error::{DemuxError, Stage},
    pcm::StreamInfo,
    reader::{ChannelReader, InterleavedReader},
    staging::StagingBuffer,
    vorbis::VorbisPushDecoder,
};

pub struct ChannelDemuxer<R, D = VorbisPushDecoder> {
    source: R,
    decoder: D,
    staging: StagingBuffer,
    channels: Vec<ChannelBuffer>,
    scratch: Vec<u8>,
    info: StreamInfo,
    max_resync_bytes: Option<usize>,
    finished: bool,
    /// Decoder failure that ends the stream; reported on every later call.
    failed: Option<DemuxError>,
    /// Source error held back because a read had already copied bytes.
    deferred: Option<DemuxError>,
    /// Channel the next interleaved byte comes from.
    interleave_next: usize,
}

impl<R: Read> ChannelDemuxer<R, VorbisPushDecoder> {
    /// Opens an Ogg/Vorbis stream with default options.
    pub fn open(source: R) -> Result<Self, DemuxError> {
        Self::open_with_options(source, DemuxOptions::default())
    }

    pub fn open_with_options(source: R, options: DemuxOptions) -> Result<Self, DemuxError> {
        let decoder = VorbisPushDecoder::new(options.ogg.clone());
        Self::with_decoder(source, decoder, &options)
    }
}

impl<R: Read, D: FrameDecoder> ChannelDemuxer<R, D> {
    /// Reads from `source` until `decoder` accepts the stream headers.
    ///
    /// Either every channel is ready when this returns, or nothing is
    /// returned at all.
    pub fn with_decoder(
        mut source: R,
        mut decoder: D,
        options: &DemuxOptions,
    ) -> Result<Self, DemuxError> {
        options.validate()?;
        let mut staging = StagingBuffer::with_capacity(options.staging.initial_capacity);

        let header = loop {
            if staging.fill_from(&mut source)? == Some(0) {
                return Err(DemuxError::UnexpectedEndOfInput);
            }
            match decoder.open(staging.filled()) {
                Ok(header) => break header,
                Err(DecoderErrorCode::NeedMoreData) => {
                    if staging.is_full() {
                        staging.grow();
                    }
                }
                Err(code) => return Err(DemuxError::from_decoder(code, Stage::Setup)),
            }
        };

        if header.channels == 0 {
            return Err(DemuxError::DecodeSetup(DecoderErrorCode::InvalidSetup));
        }
        staging.consume(header.consumed);

        let info = StreamInfo {
            sample_rate: header.sample_rate,
            channels: header.channels,
            bits_per_sample: 16,
        };
        debug!(
            sample_rate = info.sample_rate,
            channels = info.channels,
            header_bytes = header.consumed,
            staging_capacity = staging.capacity(),
            "demuxer ready"
        );

        Ok(Self {
            source,
            decoder,
            staging,
            channels: (0..header.channels).map(|_| ChannelBuffer::new()).collect(),
            scratch: Vec::new(),
            info,
            max_resync_bytes: options.resync.max_skipped_bytes,
            finished: false,
            failed: None,
            deferred: None,
            interleave_next: 0,
        })
    }

    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    pub fn sample_rate(&self) -> u32 {
        self.info.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Current size of the compressed staging buffer.
    pub fn staging_capacity(&self) -> usize {
        self.staging.capacity()
    }

    /// Decoded bytes waiting in `channel`.
    pub fn pending(&self, channel: usize) -> Result<usize, DemuxError> {
        Ok(self.channel_buffer(channel)?.pending())
    }

    /// Whether the decoder has reported the end of the stream.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decodes one more frame into every channel buffer.
    ///
    /// Returns `Ok(false)` once the source is exhausted and no complete frame
    /// is left in the staging buffer. Later calls keep returning `false`.
    ///
    /// A decoder error is final: every later call returns it again. Source
    /// errors are returned once, so a retry reads from the source again.
    pub fn decode_next_frame(&mut self) -> Result<bool, DemuxError> {
        if let Some(err) = self.deferred.take().or_else(|| self.failed.clone()) {
            return Err(err);
        }
        if self.finished {
            return Ok(false);
        }
        match self.decode_frame_from_source() {
            Err(err) if !matches!(err, DemuxError::Io { .. }) => {
                self.failed = Some(err.clone());
                Err(err)
            }
            result => result,
        }
    }

    fn decode_frame_from_source(&mut self) -> Result<bool, DemuxError> {
        let mut skipped = 0usize;
        loop {
            let read = self.staging.fill_from(&mut self.source)?;
            let outcome = self.decoder.decode_frame(self.staging.filled());

            if outcome.consumed == 0 {
                if let Some(code) = outcome.error.filter(|code| !code.is_retryable()) {
                    return Err(DemuxError::from_decoder(code, Stage::Stream));
                }
                if self.staging.is_full() {
                    self.staging.grow();
                } else if read == Some(0) {
                    debug!(trailing = self.staging.len(), "end of stream");
                    self.finished = true;
                    return Ok(false);
                }
                continue;
            }

            skipped += outcome.discarded;
            if outcome.samples() == 0 {
                self.staging.consume(outcome.consumed);
                if let Some(limit) = self.max_resync_bytes {
                    if skipped > limit {
                        return Err(DemuxError::ResyncLimit { skipped });
                    }
                }
                continue;
            }

            if outcome.channels.len() != self.channels.len() {
                return Err(DemuxError::DecodeStream(DecoderErrorCode::InvalidStream));
            }
            for (buffer, samples) in self.channels.iter_mut().zip(outcome.channels) {
                self.scratch.clear();
                extend_i16_le(samples, &mut self.scratch);
                buffer.push(&self.scratch);
            }
            trace!(
                consumed = outcome.consumed,
                samples = outcome.samples(),
                skipped,
                "frame fanned out"
            );
            self.staging.consume(outcome.consumed);
            return Ok(true);
        }
    }

    /// Reads decoded PCM bytes of one channel.
    ///
    /// Decodes further frames while `buf` is not full. Returns fewer bytes
    /// than requested, possibly zero, only at the end of the stream.
    ///
    /// An error hit after some bytes were copied is held back: those bytes
    /// are returned first and the error comes with the next call.
    pub fn read(&mut self, channel: usize, buf: &mut [u8]) -> Result<usize, DemuxError> {
        self.channel_buffer(channel)?;
        let mut filled = 0;
        while filled < buf.len() {
            filled += self.channels[channel].read_into(&mut buf[filled..]);
            if filled == buf.len() {
                break;
            }
            match self.decode_next_frame() {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => return self.defer_error(filled, err),
            }
        }
        Ok(filled)
    }

    /// Reads one byte of one channel, `None` at the end of the stream.
    pub fn read_one(&mut self, channel: usize) -> Result<Option<u8>, DemuxError> {
        self.channel_buffer(channel)?;
        loop {
            if let Some(byte) = self.channels[channel].read_byte() {
                return Ok(Some(byte));
            }
            if !self.decode_next_frame()? {
                return Ok(None);
            }
        }
    }

    /// Reads the next interleaved byte.
    ///
    /// Channels take turns one byte at a time in header order. The turn is
    /// kept by the demuxer, so successive [`interleaved`](Self::interleaved)
    /// views carry on where the previous one stopped.
    pub fn read_interleaved_one(&mut self) -> Result<Option<u8>, DemuxError> {
        let Some(byte) = self.read_one(self.interleave_next)? else {
            return Ok(None);
        };
        self.interleave_next = (self.interleave_next + 1) % self.channels.len();
        Ok(Some(byte))
    }

    /// Fills `buf` with interleaved bytes; short only at the end of the
    /// stream. Errors after a partial fill are held back as in [`read`](Self::read).
    pub fn read_interleaved(&mut self, buf: &mut [u8]) -> Result<usize, DemuxError> {
        for filled in 0..buf.len() {
            match self.read_interleaved_one() {
                Ok(Some(byte)) => buf[filled] = byte,
                Ok(None) => return Ok(filled),
                Err(err) => return self.defer_error(filled, err),
            }
        }
        Ok(buf.len())
    }

    /// Channel the next interleaved byte will come from.
    pub fn interleave_position(&self) -> usize {
        self.interleave_next
    }

    /// A `Read` view over one channel.
    pub fn channel(&mut self, index: usize) -> Result<ChannelReader<'_, R, D>, DemuxError> {
        self.channel_buffer(index)?;
        Ok(ChannelReader::new(self, index))
    }

    /// A `Read` view producing byte-interleaved PCM across all channels.
    ///
    /// The view resumes at [`interleave_position`](Self::interleave_position).
    pub fn interleaved(&mut self) -> InterleavedReader<'_, R, D> {
        InterleavedReader::new(self)
    }

    /// Gives back the source and the decoder.
    pub fn into_inner(self) -> (R, D) {
        (self.source, self.decoder)
    }

    fn defer_error(&mut self, filled: usize, err: DemuxError) -> Result<usize, DemuxError> {
        if filled == 0 {
            return Err(err);
        }
        debug!(filled, error = %err, "returning partial read before error");
        if matches!(err, DemuxError::Io { .. }) {
            self.deferred = Some(err);
        }
        Ok(filled)
    }

    fn channel_buffer(&self, index: usize) -> Result<&ChannelBuffer, DemuxError> {
        self.channels.get(index).ok_or(DemuxError::InvalidChannel {
            index,
            channels: self.channels.len(),
        })
    }
}
