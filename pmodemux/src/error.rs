use std::io;

use crate::codec::DecoderErrorCode;

/// Errors surfaced by the demultiplexer.
///
/// "Need more data" and resynchronization are handled internally and never
/// show up here. A clean end of stream is not an error either: reads simply
/// return fewer bytes.
#[derive(thiserror::Error, Debug, Clone)]
pub enum DemuxError {
    #[error("source ended before a complete stream header was found")]
    UnexpectedEndOfInput,
    #[error("invalid stream header: {0}")]
    DecodeSetup(DecoderErrorCode),
    #[error("corrupt stream data: {0}")]
    DecodeStream(DecoderErrorCode),
    #[error("decoder ran out of memory")]
    OutOfMemory,
    #[error("stream uses an unsupported codec feature")]
    UnsupportedFeature,
    #[error("stream has more channels than the decoder supports")]
    TooManyChannels,
    #[error("gave up resynchronizing after skipping {skipped} bytes")]
    ResyncLimit { skipped: usize },
    #[error("channel {index} out of range (stream has {channels} channels)")]
    InvalidChannel { index: usize, channels: usize },
    #[error("I/O error ({kind:?}): {message}")]
    Io {
        kind: io::ErrorKind,
        message: String,
    },
    #[error("internal channel closed unexpectedly")]
    ChannelClosed,
    #[error("{role} task failed: {details}")]
    TaskJoin { role: &'static str, details: String },
    #[error("configuration error: {0}")]
    Config(String),
}

/// Where a decoder error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Setup,
    Stream,
}

impl DemuxError {
    pub(crate) fn from_decoder(code: DecoderErrorCode, stage: Stage) -> Self {
        match code {
            DecoderErrorCode::OutOfMemory => DemuxError::OutOfMemory,
            DecoderErrorCode::FeatureNotSupported => DemuxError::UnsupportedFeature,
            DecoderErrorCode::TooManyChannels => DemuxError::TooManyChannels,
            code => match stage {
                Stage::Setup => DemuxError::DecodeSetup(code),
                Stage::Stream => DemuxError::DecodeStream(code),
            },
        }
    }

    /// The decoder code behind this error, if it came from the decoder.
    pub fn code(&self) -> Option<DecoderErrorCode> {
        match self {
            DemuxError::DecodeSetup(code) | DemuxError::DecodeStream(code) => Some(*code),
            DemuxError::OutOfMemory => Some(DecoderErrorCode::OutOfMemory),
            DemuxError::UnsupportedFeature => Some(DecoderErrorCode::FeatureNotSupported),
            DemuxError::TooManyChannels => Some(DecoderErrorCode::TooManyChannels),
            DemuxError::UnexpectedEndOfInput => Some(DecoderErrorCode::UnexpectedEof),
            _ => None,
        }
    }
}

impl From<io::Error> for DemuxError {
    fn from(err: io::Error) -> Self {
        DemuxError::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for DemuxError {
    fn from(err: serde_yaml::Error) -> Self {
        DemuxError::Config(err.to_string())
    }
}

impl From<DemuxError> for io::Error {
    fn from(err: DemuxError) -> Self {
        match err {
            DemuxError::Io { kind, message } => io::Error::new(kind, message),
            DemuxError::UnexpectedEndOfInput => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
