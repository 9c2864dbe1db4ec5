use crate::convert::SAMPLE_BYTES;

/// Describes the PCM produced by a demuxer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
}

impl StreamInfo {
    pub fn bytes_per_sample(&self) -> usize {
        SAMPLE_BYTES
    }

    /// Bytes of one interleaved frame (one sample for every channel).
    pub fn frame_width(&self) -> usize {
        self.channels as usize * self.bytes_per_sample()
    }
}
