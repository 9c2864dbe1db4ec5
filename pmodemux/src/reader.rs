//! `Read` views over a [`ChannelDemuxer`].
//!
//! Both readers borrow the demuxer mutably, since reading may decode a new
//! frame and touch every channel buffer.

use std::io::{self, Read};

use crate::{codec::FrameDecoder, demux::ChannelDemuxer, error::DemuxError};

/// Sequential 16-bit little-endian PCM of a single channel.
pub struct ChannelReader<'a, R, D> {
    demux: &'a mut ChannelDemuxer<R, D>,
    index: usize,
}

impl<'a, R: Read, D: FrameDecoder> ChannelReader<'a, R, D> {
    pub(crate) fn new(demux: &'a mut ChannelDemuxer<R, D>, index: usize) -> Self {
        Self { demux, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn read_one(&mut self) -> Result<Option<u8>, DemuxError> {
        self.demux.read_one(self.index)
    }
}

impl<R: Read, D: FrameDecoder> Read for ChannelReader<'_, R, D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.demux.read(self.index, buf)?)
    }
}

/// Byte-interleaved PCM: one byte of channel 0, one of channel 1, and so on.
///
/// Channels take turns per byte in header order, so with two channels a
/// 16-bit sample arrives split as `c0 lo, c1 lo, c0 hi, c1 hi`. The turn is
/// stored in the demuxer and survives dropping the reader.
pub struct InterleavedReader<'a, R, D> {
    demux: &'a mut ChannelDemuxer<R, D>,
}

impl<'a, R: Read, D: FrameDecoder> InterleavedReader<'a, R, D> {
    pub(crate) fn new(demux: &'a mut ChannelDemuxer<R, D>) -> Self {
        Self { demux }
    }

    /// Channel the next byte will come from.
    pub fn current_channel(&self) -> usize {
        self.demux.interleave_position()
    }

    pub fn read_one(&mut self) -> Result<Option<u8>, DemuxError> {
        self.demux.read_interleaved_one()
    }

    /// Fills `buf` with interleaved bytes; short only at the end of the stream.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, DemuxError> {
        self.demux.read_interleaved(buf)
    }
}

impl<R: Read, D: FrameDecoder> Read for InterleavedReader<'_, R, D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf)?)
    }
}
