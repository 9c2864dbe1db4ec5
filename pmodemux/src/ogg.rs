//! # Push-mode Ogg page parsing
//!
//! Works directly on the bytes currently held in the staging buffer. A page
//! is only reported once it is complete (header, segment table and body), so
//! the caller can decide how many bytes to consume without ever reading the
//! source from here.
//!
//! ## Page layout
//!
//! ```text
//! 0      4        5       6          14        18         22    26        27
//! | OggS | version | flags | granule  | serial  | sequence | crc | nsegs | lacing[nsegs] | body
//! ```

use crate::codec::DecoderErrorCode;

pub(crate) const CAPTURE_PATTERN: &[u8; 4] = b"OggS";
pub(crate) const PAGE_HEADER_LEN: usize = 27;

const FLAG_CONTINUED: u8 = 0x01;
const FLAG_BOS: u8 = 0x02;
const FLAG_EOS: u8 = 0x04;

/// A complete page found at the start of a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PageHeader {
    pub header_type: u8,
    pub serial: u32,
    pub sequence: u32,
    pub lacing: Vec<u8>,
    /// Header plus segment table.
    pub header_len: usize,
    pub body_len: usize,
}

impl PageHeader {
    pub fn is_continued(&self) -> bool {
        self.header_type & FLAG_CONTINUED != 0
    }

    pub fn is_first(&self) -> bool {
        self.header_type & FLAG_BOS != 0
    }

    pub fn is_last(&self) -> bool {
        self.header_type & FLAG_EOS != 0
    }

    pub fn total_len(&self) -> usize {
        self.header_len + self.body_len
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PageParse {
    /// The window ends before the page does.
    Incomplete,
    Page(PageHeader),
    /// The bytes at the start of the window are not a valid page.
    Corrupt(DecoderErrorCode),
}

/// Parses the page starting at `data[0]`.
pub(crate) fn parse_page(data: &[u8], validate_crc: bool) -> PageParse {
    let probe = data.len().min(CAPTURE_PATTERN.len());
    if data[..probe] != CAPTURE_PATTERN[..probe] {
        return PageParse::Corrupt(DecoderErrorCode::MissingCapturePattern);
    }
    if data.len() < PAGE_HEADER_LEN {
        return PageParse::Incomplete;
    }
    if data[4] != 0 {
        return PageParse::Corrupt(DecoderErrorCode::InvalidStreamStructureVersion);
    }

    let page_segments = data[26] as usize;
    let header_len = PAGE_HEADER_LEN + page_segments;
    if data.len() < header_len {
        return PageParse::Incomplete;
    }
    let lacing = &data[PAGE_HEADER_LEN..header_len];
    let body_len: usize = lacing.iter().map(|&v| v as usize).sum();
    if data.len() < header_len + body_len {
        return PageParse::Incomplete;
    }

    if validate_crc {
        let expected = u32::from_le_bytes([data[22], data[23], data[24], data[25]]);
        let mut crc_header = [0u8; PAGE_HEADER_LEN];
        crc_header.copy_from_slice(&data[..PAGE_HEADER_LEN]);
        crc_header[22..26].copy_from_slice(&[0, 0, 0, 0]);

        let mut crc = crc::vorbis_crc32_update(0, &crc_header);
        crc = crc::vorbis_crc32_update(crc, &data[PAGE_HEADER_LEN..header_len + body_len]);
        if crc != expected {
            return PageParse::Corrupt(DecoderErrorCode::InvalidStream);
        }
    }

    PageParse::Page(PageHeader {
        header_type: data[5],
        serial: u32::from_le_bytes([data[14], data[15], data[16], data[17]]),
        sequence: u32::from_le_bytes([data[18], data[19], data[20], data[21]]),
        lacing: lacing.to_vec(),
        header_len,
        body_len,
    })
}

/// Position of the next capture pattern at or after `from`.
pub(crate) fn find_capture(data: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?
        .windows(CAPTURE_PATTERN.len())
        .position(|window| window == CAPTURE_PATTERN)
        .map(|pos| pos + from)
}

/// Splits a page body into packet payloads following the lacing table.
///
/// The boolean tells whether the packet ends on this page; only the last
/// entry can be unfinished.
pub(crate) fn split_packets<'a>(lacing: &[u8], body: &'a [u8]) -> Vec<(&'a [u8], bool)> {
    let mut packets = Vec::new();
    let mut start = 0;
    let mut end = 0;
    for &seg_len in lacing {
        end += seg_len as usize;
        if seg_len < 255 {
            packets.push((&body[start..end], true));
            start = end;
        }
    }
    if start < end {
        packets.push((&body[start..end], false));
    }
    packets
}

/// Builds a page holding `packets`, used by tests to craft streams.
///
/// With `last_continues`, the last packet is cut at its last full 255-byte
/// segment and left open for the next page.
#[cfg(test)]
pub(crate) fn build_page(
    header_type: u8,
    serial: u32,
    sequence: u32,
    packets: &[&[u8]],
    last_continues: bool,
) -> Vec<u8> {
    let mut lacing = Vec::new();
    let mut body = Vec::new();
    for (i, packet) in packets.iter().enumerate() {
        let mut remaining = packet.len();
        while remaining >= 255 {
            lacing.push(255);
            remaining -= 255;
        }
        let unfinished = last_continues && i + 1 == packets.len();
        if unfinished {
            body.extend_from_slice(&packet[..packet.len() - remaining]);
        } else {
            lacing.push(remaining as u8);
            body.extend_from_slice(packet);
        }
    }

    let mut page = Vec::with_capacity(PAGE_HEADER_LEN + lacing.len() + body.len());
    page.extend_from_slice(CAPTURE_PATTERN);
    page.push(0);
    page.push(header_type);
    page.extend_from_slice(&0u64.to_le_bytes());
    page.extend_from_slice(&serial.to_le_bytes());
    page.extend_from_slice(&sequence.to_le_bytes());
    page.extend_from_slice(&[0, 0, 0, 0]);
    page.push(lacing.len() as u8);
    page.extend_from_slice(&lacing);
    page.extend_from_slice(&body);

    let crc = crc::vorbis_crc32_update(0, &page);
    page[22..26].copy_from_slice(&crc.to_le_bytes());
    page
}

/// CRC32 used by Ogg pages.
///
/// Polynomial 0x04c11db7, initial value 0, no final XOR.
pub(crate) mod crc {
    const POLY: u32 = 0x04c11db7;

    const TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut idx = 0;
        while idx < 256 {
            let mut r = (idx as u32) << 24;
            let mut bit = 0;
            while bit < 8 {
                r = if r & 0x8000_0000 != 0 { (r << 1) ^ POLY } else { r << 1 };
                bit += 1;
            }
            table[idx] = r;
            idx += 1;
        }
        table
    };

    pub fn vorbis_crc32_update(crc: u32, bytes: &[u8]) -> u32 {
        bytes.iter().fold(crc, |crc, &byte| {
            (crc << 8) ^ TABLE[((crc >> 24) ^ u32::from(byte)) as usize]
        })
    }
}
