//! Push-mode decoder contract.
//!
//! The demultiplexer never looks inside the compressed stream. It hands the
//! decoder the bytes it has buffered so far and acts on what the decoder
//! reports back: how many bytes were consumed, whether a frame of samples
//! came out, and whether something went wrong.

use std::fmt;

/// Error codes a push decoder can report.
///
/// The numeric values are stable and are kept in every error surfaced by the
/// demultiplexer so they can be logged or compared against decoder traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DecoderErrorCode {
    /// Not a real error: the decoder needs more bytes before it can progress.
    NeedMoreData = 1,
    InvalidApiMixing = 2,
    OutOfMemory = 3,
    FeatureNotSupported = 4,
    TooManyChannels = 5,
    UnexpectedEof = 10,
    /// Only produced by seeking decoders; never reached in push mode.
    SeekInvalid = 11,
    InvalidSetup = 20,
    InvalidStream = 21,
    MissingCapturePattern = 30,
    InvalidStreamStructureVersion = 31,
    ContinuedPacketFlagInvalid = 32,
    IncorrectStreamSerialNumber = 33,
    InvalidFirstPage = 34,
    BadPacketType = 35,
    CantFindLastPage = 36,
    SeekFailed = 37,
}

impl DecoderErrorCode {
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Whether the caller should feed more bytes and try again.
    pub fn is_retryable(self) -> bool {
        self == DecoderErrorCode::NeedMoreData
    }

    pub fn name(self) -> &'static str {
        match self {
            DecoderErrorCode::NeedMoreData => "need_more_data",
            DecoderErrorCode::InvalidApiMixing => "invalid_api_mixing",
            DecoderErrorCode::OutOfMemory => "outofmem",
            DecoderErrorCode::FeatureNotSupported => "feature_not_supported",
            DecoderErrorCode::TooManyChannels => "too_many_channels",
            DecoderErrorCode::UnexpectedEof => "unexpected_eof",
            DecoderErrorCode::SeekInvalid => "seek_invalid",
            DecoderErrorCode::InvalidSetup => "invalid_setup",
            DecoderErrorCode::InvalidStream => "invalid_stream",
            DecoderErrorCode::MissingCapturePattern => "missing_capture_pattern",
            DecoderErrorCode::InvalidStreamStructureVersion => "invalid_stream_structure_version",
            DecoderErrorCode::ContinuedPacketFlagInvalid => "continued_packet_flag_invalid",
            DecoderErrorCode::IncorrectStreamSerialNumber => "incorrect_stream_serial_number",
            DecoderErrorCode::InvalidFirstPage => "invalid_first_page",
            DecoderErrorCode::BadPacketType => "bad_packet_type",
            DecoderErrorCode::CantFindLastPage => "cant_find_last_page",
            DecoderErrorCode::SeekFailed => "seek_failed",
        }
    }
}

impl fmt::Display for DecoderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Stream parameters reported by a successful [`FrameDecoder::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    /// Number of leading bytes of the window the header used up.
    pub consumed: usize,
    pub sample_rate: u32,
    pub channels: u8,
}

/// Result of one [`FrameDecoder::decode_frame`] call.
///
/// `channels` borrows the decoder's own output buffers. They are only valid
/// until the next call on the decoder, so the caller copies what it needs
/// before decoding again.
///
/// `discarded` is the part of `consumed` that was thrown away as garbage
/// while resynchronizing. Bytes buffered inside the decoder (a packet that
/// continues on the next page, a packet that decodes to no samples) are
/// consumed without being discarded.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOutcome<'a> {
    pub consumed: usize,
    pub discarded: usize,
    pub channels: &'a [Vec<f32>],
    pub error: Option<DecoderErrorCode>,
}

impl<'a> DecodeOutcome<'a> {
    pub fn need_more_data() -> Self {
        Self::failed(DecoderErrorCode::NeedMoreData)
    }

    pub fn failed(code: DecoderErrorCode) -> Self {
        Self {
            consumed: 0,
            discarded: 0,
            channels: &[],
            error: Some(code),
        }
    }

    /// `consumed` bytes of garbage were dropped (resynchronization).
    pub fn skipped(consumed: usize) -> Self {
        Self::advanced(consumed).discarding(consumed)
    }

    /// `consumed` bytes were taken in, but no frame is complete yet.
    pub fn advanced(consumed: usize) -> Self {
        Self {
            consumed,
            discarded: 0,
            channels: &[],
            error: None,
        }
    }

    pub fn frame(consumed: usize, channels: &'a [Vec<f32>]) -> Self {
        Self {
            consumed,
            discarded: 0,
            channels,
            error: None,
        }
    }

    /// Marks `discarded` of the consumed bytes as garbage.
    pub fn discarding(mut self, discarded: usize) -> Self {
        self.discarded = discarded.min(self.consumed);
        self
    }

    /// Samples per channel in this frame, 0 when nothing was produced.
    pub fn samples(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }
}

/// A push-based decoder state machine.
///
/// Implementations receive the whole window of buffered compressed bytes on
/// every call, starting at the first byte they have not consumed yet. They
/// must not assume the window grows between calls: the caller may call again
/// with the same bytes after a resize.
pub trait FrameDecoder {
    /// Parses the stream headers from the start of `data`.
    ///
    /// Returns [`DecoderErrorCode::NeedMoreData`] when `data` does not hold
    /// the complete headers yet. Nothing is committed in that case.
    fn open(&mut self, data: &[u8]) -> Result<StreamHeader, DecoderErrorCode>;

    /// Decodes at most one frame from the start of `data`.
    ///
    /// Consuming zero bytes without an error means `data` holds no further
    /// frame yet, and the decoder state must be as before the call. Once any
    /// internal state moves forward, the bytes behind it are reported as
    /// consumed.
    fn decode_frame(&mut self, data: &[u8]) -> DecodeOutcome<'_>;
}

impl<D: FrameDecoder + ?Sized> FrameDecoder for Box<D> {
    fn open(&mut self, data: &[u8]) -> Result<StreamHeader, DecoderErrorCode> {
        (**self).open(data)
    }

    fn decode_frame(&mut self, data: &[u8]) -> DecodeOutcome<'_> {
        (**self).decode_frame(data)
    }
}
