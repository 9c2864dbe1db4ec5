//! # Push-mode Ogg/Vorbis frame decoder
//!
//! [`VorbisPushDecoder`] implements [`FrameDecoder`] on top of lewton's
//! low-level packet API. It never reads from a source: every call receives
//! the staging window and reports how many bytes it used.
//!
//! ## How a window is consumed
//!
//! - A page header is only accepted once the whole page is in the window,
//!   so its CRC can be checked before anything is committed.
//! - Each call walks packets until one decodes to samples. Empty packets
//!   and packets that decode to nothing are passed over in the same call.
//! - A call stops at the end of a page when the next page is not complete
//!   yet. Packets spanning pages are accumulated inside the decoder, and the
//!   call reports the bytes it consumed without samples.
//! - Bytes that do not form a valid page are skipped up to the next `OggS`
//!   capture pattern (resynchronization).
//!
//! Chained streams are not supported: a page from a different logical
//! stream is reported as [`DecoderErrorCode::IncorrectStreamSerialNumber`].

use std::mem;

use lewton::{
    audio::{read_audio_packet_generic, AudioReadError, PreviousWindowRight},
    header::{
        read_header_comment, read_header_ident, read_header_setup, HeaderReadError, IdentHeader,
        SetupHeader,
    },
};
use tracing::{debug, trace, warn};

use crate::{
    codec::{DecodeOutcome, DecoderErrorCode, FrameDecoder, StreamHeader},
    config::OggOptions,
    ogg::{find_capture, parse_page, split_packets, PageParse, CAPTURE_PATTERN},
};

/// Highest channel count accepted in the identification header.
pub const MAX_CHANNELS: u8 = 16;

struct Codec {
    ident: IdentHeader,
    setup: SetupHeader,
    pwr: PreviousWindowRight,
}

/// Lacing values of the page being consumed.
#[derive(Debug, Default)]
struct PageCursor {
    lacing: Vec<u8>,
    next: usize,
    /// The first run belongs to a packet whose start was lost.
    drop_first: bool,
}

impl PageCursor {
    fn new(lacing: Vec<u8>, drop_first: bool) -> Self {
        Self {
            lacing,
            next: 0,
            drop_first,
        }
    }

    fn is_exhausted(&self) -> bool {
        self.next >= self.lacing.len()
    }

    /// Length of the next packet run and whether the packet ends here.
    fn next_run(&mut self) -> (usize, bool) {
        let mut len = 0;
        while let Some(&seg_len) = self.lacing.get(self.next) {
            self.next += 1;
            len += seg_len as usize;
            if seg_len < 255 {
                return (len, true);
            }
        }
        (len, false)
    }
}

pub struct VorbisPushDecoder {
    options: OggOptions,
    codec: Option<Codec>,
    serial: Option<u32>,
    page: PageCursor,
    partial: Vec<u8>,
    frame: Vec<Vec<f32>>,
}

impl VorbisPushDecoder {
    pub fn new(options: OggOptions) -> Self {
        Self {
            options,
            codec: None,
            serial: None,
            page: PageCursor::default(),
            partial: Vec::new(),
            frame: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.codec.is_some()
    }
}

impl Default for VorbisPushDecoder {
    fn default() -> Self {
        Self::new(OggOptions::default())
    }
}

impl FrameDecoder for VorbisPushDecoder {
    fn open(&mut self, data: &[u8]) -> Result<StreamHeader, DecoderErrorCode> {
        if self.codec.is_some() {
            return Err(DecoderErrorCode::InvalidApiMixing);
        }

        let mut pos = 0;
        if self.options.find_sync {
            pos = match find_capture(data, 0) {
                Some(at) => at,
                None if data.len() < self.options.max_sync_search => {
                    return Err(DecoderErrorCode::NeedMoreData);
                }
                None => return Err(DecoderErrorCode::MissingCapturePattern),
            };
            if pos > 0 {
                debug!(skipped = pos, "skipping bytes before the first Ogg page");
            }
        }

        // Identification, comment and setup headers. Nothing is committed
        // until all three are parsed.
        let mut packets: Vec<Vec<u8>> = Vec::with_capacity(3);
        let mut partial = Vec::new();
        let mut serial = None;
        while packets.len() < 3 {
            let page = match parse_page(&data[pos..], self.options.validate_crc) {
                PageParse::Incomplete => return Err(DecoderErrorCode::NeedMoreData),
                PageParse::Corrupt(code) => return Err(code),
                PageParse::Page(page) => page,
            };

            match serial {
                None if !page.is_first() => return Err(DecoderErrorCode::InvalidFirstPage),
                None => serial = Some(page.serial),
                Some(current) if current != page.serial => {
                    return Err(DecoderErrorCode::IncorrectStreamSerialNumber);
                }
                Some(_) => {}
            }
            if page.is_continued() == partial.is_empty() {
                return Err(DecoderErrorCode::ContinuedPacketFlagInvalid);
            }

            let body = &data[pos + page.header_len..pos + page.total_len()];
            for (payload, complete) in split_packets(&page.lacing, body) {
                partial.extend_from_slice(payload);
                if complete {
                    packets.push(mem::take(&mut partial));
                }
            }
            pos += page.total_len();
        }

        let ident = read_header_ident(&packets[0]).map_err(header_error)?;
        read_header_comment(&packets[1]).map_err(header_error)?;
        if ident.audio_channels > MAX_CHANNELS {
            return Err(DecoderErrorCode::TooManyChannels);
        }
        let setup = read_header_setup(
            &packets[2],
            ident.audio_channels,
            (ident.blocksize_0, ident.blocksize_1),
        )
        .map_err(header_error)?;

        if packets.len() > 3 {
            warn!(
                dropped = packets.len() - 3,
                "audio packets on the setup header page were dropped"
            );
        }

        let header = StreamHeader {
            consumed: pos,
            sample_rate: ident.audio_sample_rate,
            channels: ident.audio_channels,
        };
        debug!(
            sample_rate = header.sample_rate,
            channels = header.channels,
            block_sizes = ?(1u32 << ident.blocksize_0, 1u32 << ident.blocksize_1),
            consumed = pos,
            "opened Vorbis stream"
        );

        self.serial = serial;
        self.partial = partial;
        self.page = PageCursor::default();
        self.codec = Some(Codec {
            ident,
            setup,
            pwr: PreviousWindowRight::new(),
        });
        Ok(header)
    }

    fn decode_frame(&mut self, data: &[u8]) -> DecodeOutcome<'_> {
        let Self {
            options,
            codec,
            serial,
            page,
            partial,
            frame,
        } = self;
        let Some(codec) = codec.as_mut() else {
            return DecodeOutcome::failed(DecoderErrorCode::InvalidApiMixing);
        };

        let mut pos = 0;
        let mut discarded = 0;
        loop {
            if page.is_exhausted() {
                match parse_page(&data[pos..], options.validate_crc) {
                    PageParse::Incomplete if pos == 0 => return DecodeOutcome::need_more_data(),
                    PageParse::Incomplete => {
                        return DecodeOutcome::advanced(pos).discarding(discarded);
                    }
                    PageParse::Corrupt(code) => {
                        let keep = CAPTURE_PATTERN.len() - 1;
                        let skip_to = find_capture(data, pos + 1)
                            .unwrap_or_else(|| data.len().saturating_sub(keep).max(pos + 1));
                        warn!(%code, skipped = skip_to - pos, "lost Ogg page sync, resynchronizing");
                        partial.clear();
                        return DecodeOutcome::advanced(skip_to)
                            .discarding(discarded + skip_to - pos);
                    }
                    PageParse::Page(header) => {
                        if serial.is_some_and(|current| current != header.serial) {
                            return DecodeOutcome::failed(
                                DecoderErrorCode::IncorrectStreamSerialNumber,
                            );
                        }
                        let drop_first = header.is_continued() && partial.is_empty();
                        if drop_first {
                            warn!("page continues a packet whose start was lost");
                        } else if !header.is_continued() && !partial.is_empty() {
                            warn!(bytes = partial.len(), "dropping unterminated packet");
                            partial.clear();
                        }
                        trace!(
                            sequence = header.sequence,
                            len = header.total_len(),
                            last = header.is_last(),
                            "ogg page"
                        );
                        pos += header.header_len;
                        *page = PageCursor::new(header.lacing, drop_first);
                        continue;
                    }
                }
            }

            let (len, complete) = page.next_run();
            let Some(payload) = data.get(pos..pos + len) else {
                // The window no longer holds the page accepted earlier.
                return DecodeOutcome::failed(DecoderErrorCode::UnexpectedEof);
            };
            pos += len;

            if page.drop_first {
                page.drop_first = false;
                discarded += len;
                continue;
            }
            partial.extend_from_slice(payload);
            if !complete {
                continue;
            }

            // Zero-length packets carry nothing to decode.
            let packet = mem::take(partial);
            if packet.is_empty() {
                continue;
            }
            match read_audio_packet_generic::<Vec<Vec<f32>>>(
                &codec.ident,
                &codec.setup,
                &packet,
                &mut codec.pwr,
            ) {
                Ok(samples) => {
                    *frame = samples;
                    let produced = frame.first().map_or(0, Vec::len);
                    trace!(consumed = pos, samples = produced, "decoded Vorbis packet");
                    if produced > 0 {
                        return DecodeOutcome::frame(pos, frame.as_slice())
                            .discarding(discarded);
                    }
                }
                Err(err) => {
                    warn!(error = %err, "failed to decode Vorbis audio packet");
                    return DecodeOutcome::failed(audio_error(&err));
                }
            }
        }
    }
}

fn header_error(err: HeaderReadError) -> DecoderErrorCode {
    match err {
        HeaderReadError::NotVorbisHeader
        | HeaderReadError::HeaderIsAudio
        | HeaderReadError::HeaderBadType(_) => DecoderErrorCode::BadPacketType,
        HeaderReadError::UnsupportedVorbisVersion => DecoderErrorCode::FeatureNotSupported,
        _ => DecoderErrorCode::InvalidSetup,
    }
}

fn audio_error(err: &AudioReadError) -> DecoderErrorCode {
    match err {
        AudioReadError::AudioIsHeader => DecoderErrorCode::BadPacketType,
        _ => DecoderErrorCode::InvalidStream,
    }
}
