use std::path::Path;

use ffmpeg::util::frame::audio::Audio;
use ffmpeg_next::{self as ffmpeg, codec, decoder, format, media, ChannelLayout};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};

use crate::error::{CoverError, Result};
use crate::video;

const CHANNELS: u16 = 2;

/// A whole audio track decoded to interleaved stereo `f32`.
pub struct DecodedAudio {
    samples: Vec<f32>,
    rate: u32,
}

impl DecodedAudio {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / CHANNELS as f64 / self.rate as f64
    }

    fn samples_from(&self, seconds: f64) -> Vec<f32> {
        let frame = (seconds.max(0.0) * self.rate as f64) as usize;
        let offset = (frame * CHANNELS as usize).min(self.samples.len());
        self.samples[offset..].to_vec()
    }
}

/// Decodes the best audio stream of `path`. Returns `None` when there is no
/// audio stream or it cannot be converted for playback.
pub fn decode_track(path: &Path) -> Result<Option<DecodedAudio>> {
    video::init()?;

    let mut input = format::input(&path)?;
    let (stream_index, parameters) = match input.streams().best(media::Type::Audio) {
        Some(stream) => (stream.index(), stream.parameters()),
        None => return Ok(None),
    };

    let mut decoder = codec::context::Context::from_parameters(parameters)?
        .decoder()
        .audio()?;
    let rate = decoder.rate();
    let mut resampler = match decoder.resampler(
        format::Sample::F32(format::sample::Type::Packed),
        ChannelLayout::STEREO,
        rate,
    ) {
        Ok(resampler) => resampler,
        Err(e) => {
            log::warn!("Audio of {} cannot be played: {}", path.display(), e);
            return Ok(None);
        }
    };

    let mut samples = Vec::new();
    let mut receive_and_resample =
        |decoder: &mut decoder::Audio, samples: &mut Vec<f32>| -> Result<()> {
            let mut decoded = Audio::empty();
            while decoder.receive_frame(&mut decoded).is_ok() {
                let mut resampled = Audio::empty();
                resampler.run(&decoded, &mut resampled)?;
                append_packed(&resampled, samples);
            }
            Ok(())
        };

    for (stream, packet) in input.packets() {
        if stream.index() == stream_index {
            // A damaged packet only costs a gap in the sound.
            if decoder.send_packet(&packet).is_ok() {
                receive_and_resample(&mut decoder, &mut samples)?;
            }
        }
    }
    decoder.send_eof()?;
    receive_and_resample(&mut decoder, &mut samples)?;

    let track = DecodedAudio { samples, rate };
    log::debug!(
        "Decoded {:.1}s of audio from {}",
        track.duration_secs(),
        path.display()
    );
    Ok(Some(track))
}

fn append_packed(frame: &Audio, samples: &mut Vec<f32>) {
    let len = frame.samples() * CHANNELS as usize * 4;
    if let Some(bytes) = frame.data(0).get(..len) {
        samples.extend(
            bytes
                .chunks_exact(4)
                .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]])),
        );
    }
}

/// Plays a decoded track, following the player's pause/seek/mute state.
pub struct AudioPlayer {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sink: Sink,
    track: DecodedAudio,
    paused: bool,
    muted: bool,
}

impl AudioPlayer {
    pub fn new(track: DecodedAudio, paused: bool, muted: bool) -> Result<Self> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| CoverError::Audio(e.to_string()))?;
        let sink = Sink::try_new(&handle).map_err(|e| CoverError::Audio(e.to_string()))?;
        let mut player = Self {
            _stream: stream,
            handle,
            sink,
            track,
            paused,
            muted,
        };
        player.restart_at(0.0)?;
        Ok(player)
    }

    /// Drops whatever is queued and continues from `seconds`.
    pub fn restart_at(&mut self, seconds: f64) -> Result<()> {
        self.sink.stop();
        let sink = Sink::try_new(&self.handle).map_err(|e| CoverError::Audio(e.to_string()))?;
        sink.set_volume(if self.muted { 0.0 } else { 1.0 });
        if self.paused {
            sink.pause();
        }
        sink.append(SamplesBuffer::new(
            CHANNELS,
            self.track.rate,
            self.track.samples_from(seconds),
        ));
        self.sink = sink;
        Ok(())
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        if paused {
            self.sink.pause();
        } else {
            self.sink.play();
        }
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.sink.set_volume(if muted { 0.0 } else { 1.0 });
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.sink.stop();
        log::debug!("Released audio output");
    }
}
