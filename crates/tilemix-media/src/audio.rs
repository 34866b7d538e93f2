// crates/tilemix-media/src/audio.rs
//
// Audio extraction: decode a clip's audio track and resample it to one
// uniform PCM format, entirely in memory. Every clip lands on the same
// spec so multi-clip sessions can concatenate their buffers before
// segmentation.

use std::path::PathBuf;

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::input;
use ffmpeg::format::sample::{Sample, Type as SampleType};
use ffmpeg::media::Type as MediaType;
use ffmpeg::software::resampling;
use ffmpeg::util::channel_layout::ChannelLayout;
use ffmpeg::util::frame::audio::Audio as AudioFrame;

use tilemix_core::audio::{AudioBuffer, AudioSpec};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Normalization target for every extracted track.
const OUT_RATE: u32 = 44_100;

/// Packed (interleaved) signed 16-bit — the raw byte form the segmenter
/// slices and the output sink plays.
const OUT_FMT: Sample = Sample::I16(SampleType::Packed);

const OUT_LAYOUT: ChannelLayout = ChannelLayout::STEREO;

const OUT_SPEC: AudioSpec = AudioSpec {
    sample_rate:     OUT_RATE,
    channels:        2,
    bits_per_sample: 16,
};

// ── Public API ────────────────────────────────────────────────────────────────

/// Decode all audio from `path` into a 44.1 kHz stereo s16 buffer.
/// A clip with no audio stream yields an empty buffer (it simply
/// contributes nothing to the shuffled stream); decode failures are errors.
pub fn extract_audio(path: &PathBuf) -> Result<AudioBuffer, String> {
    let mut ictx = input(path).map_err(|e| format!("open: {e}"))?;

    let Some(audio_stream_idx) = ictx.streams().best(MediaType::Audio).map(|s| s.index())
    else {
        log::debug!("[media] no audio stream ← {}", path.display());
        return Ok(AudioBuffer::empty(OUT_SPEC));
    };

    let stream = ictx.stream(audio_stream_idx).unwrap();
    let dec_ctx = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
        .map_err(|e| format!("codec context: {e}"))?;
    let mut decoder = dec_ctx.decoder().audio()
        .map_err(|e| format!("audio decoder: {e}"))?;

    // The resampler is built lazily on the first decoded frame so we know
    // the real source format/layout/rate before constructing the SwrContext.
    let mut resampler: Option<resampling::Context> = None;
    let mut pcm: Vec<u8> = Vec::new();

    for result in ictx.packets() {
        let (stream, packet) = match result {
            Ok(p)  => p,
            Err(_) => continue,
        };
        if stream.index() != audio_stream_idx { continue; }
        if decoder.send_packet(&packet).is_err() { continue; }

        let mut frame = AudioFrame::empty();
        while decoder.receive_frame(&mut frame).is_ok() {
            append_resampled(&frame, &mut resampler, &mut pcm)?;
        }
    }

    // Flush decoder
    let _ = decoder.send_eof();
    let mut frame = AudioFrame::empty();
    while decoder.receive_frame(&mut frame).is_ok() {
        append_resampled(&frame, &mut resampler, &mut pcm)?;
    }

    log::debug!("[media] audio {} bytes PCM ← {}", pcm.len(), path.display());
    Ok(AudioBuffer::new(OUT_SPEC, pcm))
}

// ── Internal implementation ───────────────────────────────────────────────────

/// Resample `frame` to OUT_FMT/OUT_LAYOUT/OUT_RATE and append the resulting
/// interleaved s16 bytes to `out`. Builds `resampler` on first call.
fn append_resampled(
    frame:     &AudioFrame,
    resampler: &mut Option<resampling::Context>,
    out:       &mut Vec<u8>,
) -> Result<(), String> {
    let src_channels = frame.ch_layout().channels();
    let needs_resample = frame.format() != OUT_FMT
        || frame.rate()                != OUT_RATE
        || src_channels                != 2;

    if needs_resample {
        // Mono sources must be declared as MONO so swr doesn't misinterpret
        // the channel count.
        let rs = match resampler {
            Some(rs) => rs,
            None => {
                let src_layout = if src_channels >= 2 {
                    frame.ch_layout()
                } else {
                    ChannelLayout::MONO
                };
                let ctx = resampling::Context::get2(
                    frame.format(), src_layout,  frame.rate(),
                    OUT_FMT,        OUT_LAYOUT,  OUT_RATE,
                ).map_err(|e| format!("create resampler: {e}"))?;
                resampler.insert(ctx)
            }
        };

        let mut resampled = AudioFrame::empty();
        if rs.run(frame, &mut resampled).is_ok() && resampled.samples() > 0 {
            append_packed_s16(&resampled, out);
        }
    } else {
        // Source already matches — copy directly.
        append_packed_s16(frame, out);
    }

    Ok(())
}

/// Copy the packed s16 bytes from `frame` into `out`.
/// OUT_FMT is Packed (interleaved), so all channel data is in plane 0;
/// plane length can include allocator padding, so slice to the exact
/// sample count.
fn append_packed_s16(frame: &AudioFrame, out: &mut Vec<u8>) {
    let bytes = frame.samples() * frame.ch_layout().channels() as usize * 2;
    let data  = frame.data(0);
    out.extend_from_slice(&data[..bytes.min(data.len())]);
}
