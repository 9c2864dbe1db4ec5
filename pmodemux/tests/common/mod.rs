#![allow(dead_code)]

use std::io::{self, Read};

use pmodemux::{DecodeOutcome, DecoderErrorCode, FrameDecoder, StreamHeader};

pub const HEADER_LEN: usize = 8;

/// Toy framing understood by [`TestDecoder`].
///
/// Header: `HDR`, channel count, sample rate (u32 LE).
/// Frame: `F`, samples per channel, then each channel's f32 LE samples.
/// `W` is a frame carrying one channel more than announced.
/// `Z` is a garbage byte the decoder skips.
/// `P` is a byte the decoder takes in without producing or discarding.
pub fn header(channels: u8, sample_rate: u32) -> Vec<u8> {
    let mut out = b"HDR".to_vec();
    out.push(channels);
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out
}

pub fn frame(channels: &[Vec<f32>]) -> Vec<u8> {
    encode_frame(b'F', channels)
}

pub fn wide_frame(channels: &[Vec<f32>]) -> Vec<u8> {
    encode_frame(b'W', channels)
}

fn encode_frame(tag: u8, channels: &[Vec<f32>]) -> Vec<u8> {
    let samples = channels.first().map_or(0, Vec::len);
    let mut out = vec![tag, samples as u8];
    for channel in channels {
        assert_eq!(channel.len(), samples);
        for sample in channel {
            out.extend_from_slice(&sample.to_le_bytes());
        }
    }
    out
}

/// Sample value that encodes its own position, exact after conversion.
pub fn sample_value(channel: usize, frame: usize, index: usize) -> i16 {
    (channel * 1000 + frame * 10 + index) as i16
}

pub fn frame_samples(channels: usize, frame: usize, samples: usize) -> Vec<Vec<f32>> {
    (0..channels)
        .map(|c| {
            (0..samples)
                .map(|s| f32::from(sample_value(c, frame, s)) / 32768.0)
                .collect()
        })
        .collect()
}

/// A complete stream of `frames` frames of `samples` samples per channel.
pub fn stream(channels: usize, frames: usize, samples: usize) -> Vec<u8> {
    let mut out = header(channels as u8, 44_100);
    for f in 0..frames {
        out.extend(frame(&frame_samples(channels, f, samples)));
    }
    out
}

/// Byte-interleaves per-channel PCM: byte 0 of every channel, then byte 1.
pub fn interleave_bytes(channels: &[Vec<u8>]) -> Vec<u8> {
    let len = channels.iter().map(Vec::len).min().unwrap_or(0);
    (0..len)
        .flat_map(|i| channels.iter().map(move |c| c[i]))
        .collect()
}

/// PCM bytes of channel `c` for `frames` frames of `samples` samples.
pub fn channel_pcm(c: usize, frames: usize, samples: usize) -> Vec<u8> {
    (0..frames)
        .flat_map(|f| (0..samples).map(move |s| sample_value(c, f, s)))
        .flat_map(i16::to_le_bytes)
        .collect()
}

pub fn to_i16(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[derive(Default)]
pub struct TestDecoder {
    channels: usize,
    frame: Vec<Vec<f32>>,
    /// Number of `open` calls, including the ones asking for more data.
    pub open_calls: usize,
    /// Minimum window `open` waits for before looking at the header.
    pub open_threshold: usize,
}

impl TestDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_open_threshold(threshold: usize) -> Self {
        Self {
            open_threshold: threshold,
            ..Self::default()
        }
    }

    fn decode_body(&mut self, data: &[u8], channels: usize) -> DecodeOutcome<'_> {
        if data.len() < 2 {
            return DecodeOutcome::need_more_data();
        }
        let samples = data[1] as usize;
        let needed = 2 + channels * samples * 4;
        if data.len() < needed {
            return DecodeOutcome::need_more_data();
        }
        let mut floats = data[2..needed]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]));
        self.frame = (0..channels)
            .map(|_| floats.by_ref().take(samples).collect())
            .collect();
        DecodeOutcome::frame(needed, &self.frame)
    }
}

impl FrameDecoder for TestDecoder {
    fn open(&mut self, data: &[u8]) -> Result<StreamHeader, DecoderErrorCode> {
        self.open_calls += 1;
        if data.len() < HEADER_LEN.max(self.open_threshold) {
            return Err(DecoderErrorCode::NeedMoreData);
        }
        if &data[..3] != b"HDR" {
            return Err(DecoderErrorCode::InvalidSetup);
        }
        self.channels = data[3] as usize;
        Ok(StreamHeader {
            consumed: HEADER_LEN,
            sample_rate: u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
            channels: data[3],
        })
    }

    fn decode_frame(&mut self, data: &[u8]) -> DecodeOutcome<'_> {
        match data.first() {
            None => DecodeOutcome::need_more_data(),
            Some(b'Z') => DecodeOutcome::skipped(1),
            Some(b'P') => DecodeOutcome::advanced(1),
            Some(b'F') => {
                let channels = self.channels;
                self.decode_body(data, channels)
            }
            Some(b'W') => {
                let channels = self.channels + 1;
                self.decode_body(data, channels)
            }
            Some(_) => DecodeOutcome::failed(DecoderErrorCode::InvalidStream),
        }
    }
}

/// Decoder that reports a fixed setup error.
pub struct RejectingDecoder(pub DecoderErrorCode);

impl FrameDecoder for RejectingDecoder {
    fn open(&mut self, _data: &[u8]) -> Result<StreamHeader, DecoderErrorCode> {
        Err(self.0)
    }

    fn decode_frame(&mut self, _data: &[u8]) -> DecodeOutcome<'_> {
        DecodeOutcome::failed(self.0)
    }
}

/// Source handing out at most `chunk` bytes per read.
pub struct ChunkedSource {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
    pub reads: usize,
}

impl ChunkedSource {
    pub fn new(data: Vec<u8>, chunk: usize) -> Self {
        Self {
            data,
            pos: 0,
            chunk,
            reads: 0,
        }
    }
}

impl Read for ChunkedSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        let n = buf.len().min(self.chunk).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Source that fails once its data is exhausted.
pub struct FailingSource {
    data: Vec<u8>,
    pos: usize,
}

impl FailingSource {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }
}

impl Read for FailingSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos == self.data.len() {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away"));
        }
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
