//! Example: Split an Ogg/Vorbis file into one raw PCM file per channel
//!
//! Run with: cargo run -p pmodemux --example split_channels -- input.ogg [config.yaml]
//!
//! Writes `input.ch0.raw`, `input.ch1.raw`, ... as signed 16-bit
//! little-endian mono PCM.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use pmodemux::{ChannelDemuxer, DemuxOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let Some(input) = args.next().map(PathBuf::from) else {
        eprintln!("usage: split_channels <input.ogg> [config.yaml]");
        std::process::exit(2);
    };
    let config = args.next().map(PathBuf::from);

    let options = DemuxOptions::load(config.as_deref())?;
    let mut demux = ChannelDemuxer::open_with_options(File::open(&input)?, options)?;
    println!(
        "{}: {} Hz, {} channels",
        input.display(),
        demux.sample_rate(),
        demux.channel_count()
    );

    let mut outputs = (0..demux.channel_count())
        .map(|channel| {
            let path = channel_path(&input, channel);
            File::create(&path).map(BufWriter::new)
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Drain the channels in lockstep so no buffer grows unbounded.
    let mut buf = vec![0u8; 8192];
    let mut written = vec![0usize; outputs.len()];
    loop {
        let mut progressed = false;
        for (channel, output) in outputs.iter_mut().enumerate() {
            let n = demux.read(channel, &mut buf)?;
            output.write_all(&buf[..n])?;
            written[channel] += n;
            progressed |= n > 0;
        }
        if !progressed {
            break;
        }
    }

    for (channel, mut output) in outputs.into_iter().enumerate() {
        output.flush()?;
        println!(
            "  {} ({} samples)",
            channel_path(&input, channel).display(),
            written[channel] / 2
        );
    }

    Ok(())
}

fn channel_path(input: &Path, channel: usize) -> PathBuf {
    input.with_extension(format!("ch{channel}.raw"))
}
