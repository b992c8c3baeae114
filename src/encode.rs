//! Encoder command assembly
//!
//! Turns a `Selection` into the ffmpeg argument list:
//! - global options, then the source as input 0
//! - one extra input per generated caption file
//! - one `-map` per selected stream, in video, audio, subtitle order
//! - per-kind encoder choice and options
//! - `<output dir>/<stem>.mkv`

use std::path::PathBuf;

use crate::config::{EncoderConfig, OutputConfig};
use crate::types::{IngestContext, Selection};

/// Path of the encoded file for this ingestion
pub fn output_path(ctx: &IngestContext, output: &OutputConfig) -> PathBuf {
    output.path.join(format!("{}.mkv", ctx.stem()))
}

/// Assemble the full encoder argument list
pub fn build_encode_args(
    ctx: &IngestContext,
    selection: &Selection,
    output: &OutputConfig,
) -> Vec<String> {
    let mut args = output.global_options.clone();
    args.push("-i".to_string());
    args.push(ctx.media_path.to_string_lossy().into_owned());

    for caption in selection.caption_files() {
        args.push("-i".to_string());
        args.push(caption.to_string_lossy().into_owned());
    }

    for stream in selection.video.iter().chain(&selection.audio) {
        args.push("-map".to_string());
        args.push(format!("0:{}", stream.index));
    }

    // Caption inputs are numbered from 1 in subtitle order
    let mut caption_input = 0;
    let mut caption_metadata = Vec::new();
    for (position, stream) in selection.subtitle.iter().enumerate() {
        args.push("-map".to_string());
        if stream.caption_file.is_some() {
            caption_input += 1;
            args.push(format!("{}:0", caption_input));
            if let Some(language) = &stream.language {
                caption_metadata.push(format!("-metadata:s:s:{}", position));
                caption_metadata.push(format!("language={}", language));
            }
        } else {
            args.push(format!("0:{}", stream.index));
        }
    }

    push_encoder(&mut args, "-c:v", &output.video);
    push_encoder(&mut args, "-c:a", &output.audio);
    push_encoder(&mut args, "-c:s", &output.subtitle);
    args.extend(caption_metadata);

    args.push(output_path(ctx, output).to_string_lossy().into_owned());
    args
}

fn push_encoder(args: &mut Vec<String>, flag: &str, encoder: &EncoderConfig) {
    args.push(flag.to_string());
    args.push(encoder.encoder.clone());
    args.extend(encoder.options.iter().cloned());
}
