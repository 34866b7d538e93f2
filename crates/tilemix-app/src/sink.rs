// crates/tilemix-app/src/sink.rs
//
// Rodio-backed audio output. One sink, connected to the default device's
// mixer; each shuffled stream is appended as a raw sample buffer, and
// stop_all clears everything queued at once.

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};

use tilemix_core::audio::AudioSpec;
use tilemix_core::media_types::{AudioSink, MediaError};

pub struct RodioSink {
    sink: Sink,
}

impl RodioSink {
    /// Connect to `stream`'s mixer. The OutputStream must outlive this sink
    /// — the app context owns both.
    pub fn new(stream: &OutputStream) -> Self {
        Self { sink: Sink::connect_new(stream.mixer()) }
    }
}

impl AudioSink for RodioSink {
    fn play(&self, pcm: &[u8], spec: AudioSpec) -> Result<(), MediaError> {
        if spec.bits_per_sample != 16 {
            return Err(MediaError::Sink(format!(
                "unsupported sample width: {} bits", spec.bits_per_sample,
            )));
        }
        let samples: Vec<f32> = pcm.chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32_768.0)
            .collect();
        self.sink.append(SamplesBuffer::new(spec.channels, spec.sample_rate, samples));
        // A prior stop_all leaves the sink paused; resume for the new stream.
        self.sink.play();
        Ok(())
    }

    fn stop_all(&self) {
        self.sink.stop();
    }
}
