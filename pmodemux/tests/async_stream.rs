mod common;

use std::io::Cursor;

use common::{
    channel_pcm, frame, frame_samples, init_tracing, interleave_bytes, stream, to_i16, TestDecoder,
};
use pmodemux::{
    decode_interleaved_stream, decode_interleaved_stream_with, DecoderErrorCode, DemuxError,
    DemuxOptions,
};
use tokio::io::AsyncReadExt;

#[tokio::test]
async fn interleaved_stream_produces_pcm() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let data = stream(2, 5, 6);
    let mut stream =
        decode_interleaved_stream_with(Cursor::new(data), DemuxOptions::default(), TestDecoder::new)
            .await?;

    let info = *stream.info();
    assert_eq!(info.channels, 2);
    assert_eq!(info.sample_rate, 44_100);
    assert_eq!(info.bits_per_sample, 16);

    let mut pcm = Vec::new();
    stream.read_to_end(&mut pcm).await?;
    assert_eq!(pcm.len() % info.frame_width(), 0, "PCM data should align on frame");

    assert_eq!(pcm.len(), 2 * 5 * 6 * 2);
    assert_eq!(
        pcm,
        interleave_bytes(&[channel_pcm(0, 5, 6), channel_pcm(1, 5, 6)])
    );

    stream.wait().await?;
    Ok(())
}

#[tokio::test]
async fn header_errors_are_returned_before_streaming() {
    let result = decode_interleaved_stream_with(
        Cursor::new(b"NOTAHEADER".to_vec()),
        DemuxOptions::default(),
        TestDecoder::new,
    )
    .await;
    assert!(matches!(
        result.err(),
        Some(DemuxError::DecodeSetup(DecoderErrorCode::InvalidSetup))
    ));
}

#[tokio::test]
async fn mid_stream_errors_surface_in_wait() {
    let mut data = stream(1, 2, 4);
    data.push(b'?');
    data.extend(frame(&frame_samples(1, 2, 4)));

    let mut stream =
        decode_interleaved_stream_with(Cursor::new(data), DemuxOptions::default(), TestDecoder::new)
            .await
            .unwrap();

    let mut pcm = Vec::new();
    let err = stream.read_to_end(&mut pcm).await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    // Both frames before the bad byte are delivered.
    assert_eq!(to_i16(&pcm), [0, 1, 2, 3, 10, 11, 12, 13]);

    let err = stream.wait().await.unwrap_err();
    assert!(matches!(err, DemuxError::DecodeStream(DecoderErrorCode::InvalidStream)));
}

#[tokio::test]
async fn into_parts_keeps_the_reader_usable() -> Result<(), Box<dyn std::error::Error>> {
    let stream = decode_interleaved_stream_with(
        Cursor::new(stream(1, 3, 2)),
        DemuxOptions::default(),
        TestDecoder::new,
    )
    .await?;
    let (info, mut reader) = stream.into_parts();
    assert_eq!(info.channels, 1);

    let mut pcm = Vec::new();
    reader.read_to_end(&mut pcm).await?;
    assert_eq!(pcm.len(), 3 * 2 * 2);
    reader.wait().await?;
    Ok(())
}

#[tokio::test]
async fn dropping_the_stream_stops_decoding() -> Result<(), Box<dyn std::error::Error>> {
    let stream = decode_interleaved_stream_with(
        Cursor::new(stream(2, 200, 100)),
        DemuxOptions::default(),
        TestDecoder::new,
    )
    .await?;
    let (_, mut reader) = stream.into_parts();

    let mut first = [0u8; 64];
    reader.read_exact(&mut first).await?;
    assert_eq!(first[..4], [0, 232, 0, 3]);

    // Unread PCM is discarded and the decode thread ends cleanly.
    reader.wait().await?;
    Ok(())
}

#[tokio::test]
async fn empty_ogg_input_is_unexpected_end_of_input() {
    let result = decode_interleaved_stream(Cursor::new(Vec::new()), DemuxOptions::default()).await;
    assert!(matches!(result.err(), Some(DemuxError::UnexpectedEndOfInput)));
}

#[tokio::test]
async fn input_without_ogg_pages_is_rejected() {
    let options = DemuxOptions::from_yaml_str("ogg:\n  max_sync_search: 4096\n").unwrap();
    let result = decode_interleaved_stream(Cursor::new(vec![0u8; 10_000]), options).await;
    assert!(matches!(
        result.err(),
        Some(DemuxError::DecodeSetup(DecoderErrorCode::MissingCapturePattern))
    ));

    let options = DemuxOptions::from_yaml_str("ogg:\n  find_sync: false\n").unwrap();
    let result = decode_interleaved_stream(Cursor::new(vec![0u8; 10_000]), options).await;
    assert!(matches!(
        result.err(),
        Some(DemuxError::DecodeSetup(DecoderErrorCode::MissingCapturePattern))
    ));
}
