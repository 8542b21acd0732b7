// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Sound loading and caching.
//!
//! All audio is decoded entirely into memory at startup so playback and
//! triggering never touch the disk.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info, warn};

use super::error::AudioError;

/// A fully decoded sound, interleaved f32 at the output sample rate. The
/// sample data sits behind an Arc so clones are cheap to hand to channels.
#[derive(Clone)]
pub struct Sound {
    data: Arc<Vec<f32>>,
    channel_count: usize,
    sample_rate: u32,
}

impl Sound {
    pub fn new(data: Vec<f32>, channel_count: usize, sample_rate: u32) -> Sound {
        Sound {
            data: Arc::new(data),
            channel_count: channel_count.max(1),
            sample_rate,
        }
    }

    /// The interleaved sample data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The number of frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        self.data.len() / self.channel_count
    }

    /// The memory size of the sample data in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }
}

impl std::fmt::Debug for Sound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sound")
            .field("channels", &self.channel_count)
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frame_count())
            .finish()
    }
}

/// Loads and caches sounds, resampling everything to a single target rate
/// so the output never has to resample at playback time.
pub struct SoundLoader {
    cache: HashMap<PathBuf, Sound>,
    target_sample_rate: u32,
}

impl SoundLoader {
    pub fn new(target_sample_rate: u32) -> SoundLoader {
        SoundLoader {
            cache: HashMap::new(),
            target_sample_rate,
        }
    }

    /// Loads a sound from a file into memory. Returns a cached copy if the
    /// file was already loaded.
    pub fn load(&mut self, path: &Path) -> Result<Sound, AudioError> {
        if let Some(sound) = self.cache.get(path) {
            debug!(path = ?path, "Using cached sound");
            return Ok(sound.clone());
        }

        let (samples, channel_count, source_rate) = decode_file(path)?;

        let (data, sample_rate) = if source_rate != self.target_sample_rate {
            info!(
                path = ?path,
                source_rate,
                target_rate = self.target_sample_rate,
                "Resampling sound"
            );
            (
                resample(&samples, channel_count, source_rate, self.target_sample_rate),
                self.target_sample_rate,
            )
        } else {
            (samples, source_rate)
        };

        let sound = Sound::new(data, channel_count, sample_rate);
        info!(
            path = ?path,
            channels = channel_count,
            sample_rate,
            duration_ms = sound.duration().as_millis(),
            memory_kb = sound.memory_size() / 1024,
            "Sound loaded"
        );

        self.cache.insert(path.to_path_buf(), sound.clone());
        Ok(sound)
    }

    /// The total memory used by cached sounds.
    pub fn total_memory_usage(&self) -> usize {
        self.cache.values().map(|s| s.memory_size()).sum()
    }
}

impl std::fmt::Debug for SoundLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundLoader")
            .field("cached_sounds", &self.cache.len())
            .field("target_sample_rate", &self.target_sample_rate)
            .field("total_memory_kb", &(self.total_memory_usage() / 1024))
            .finish()
    }
}

/// Decodes an entire audio file with symphonia. Returns the interleaved
/// samples, the channel count, and the source sample rate.
fn decode_file(path: &Path) -> Result<(Vec<f32>, usize, u32), AudioError> {
    let file = File::open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let fmt_opts: FormatOptions = Default::default();
    let meta_opts: MetadataOptions = Default::default();
    let probed = get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::NoAudioTrack(path.display().to_string()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let sample_rate = params.sample_rate.ok_or_else(|| {
        AudioError::UnsupportedFormat(format!("{}: sample rate not specified", path.display()))
    })?;
    let channel_count = params
        .channels
        .ok_or_else(|| {
            AudioError::UnsupportedFormat(format!("{}: channels not specified", path.display()))
        })?
        .count();

    let mut decoder = get_codecs().make(&params, &DecoderOptions::default())?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let buf = sample_buf.get_or_insert_with(|| {
                    SampleBuffer::new(decoded.capacity() as u64, *decoded.spec())
                });
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            // Skip over malformed packets rather than failing the whole load.
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(path = ?path, error = e, "Skipping undecodable packet");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok((samples, channel_count, sample_rate))
}

/// Resamples interleaved audio with linear interpolation. Plenty for loops
/// and drum one-shots.
fn resample(samples: &[f32], channel_count: usize, source_rate: u32, target_rate: u32) -> Vec<f32> {
    let ratio = target_rate as f64 / source_rate as f64;
    let source_frames = samples.len() / channel_count;
    let target_frames = (source_frames as f64 * ratio).ceil() as usize;

    let mut output = Vec::with_capacity(target_frames * channel_count);
    for target_frame in 0..target_frames {
        let source_pos = target_frame as f64 / ratio;
        let source_frame = source_pos.floor() as usize;
        let frac = source_pos.fract() as f32;

        for channel in 0..channel_count {
            let idx0 = source_frame * channel_count + channel;
            let idx1 = (source_frame + 1) * channel_count + channel;

            let s0 = samples.get(idx0).copied().unwrap_or(0.0);
            let s1 = samples.get(idx1).copied().unwrap_or(s0);
            output.push(s0 + (s1 - s0) * frac);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, samples: &[i16], channels: u16, sample_rate: u32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
        for sample in samples {
            writer.write_sample(*sample).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }

    #[test]
    fn test_load_wav() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tone.wav");
        let samples: Vec<i16> = (0..441).map(|i| if i % 2 == 0 { 8192 } else { -8192 }).collect();
        write_wav(&path, &samples, 1, 44100);

        let mut loader = SoundLoader::new(44100);
        let sound = loader.load(&path).expect("load wav");
        assert_eq!(sound.channel_count(), 1);
        assert_eq!(sound.sample_rate(), 44100);
        assert_eq!(sound.frame_count(), 441);
        assert!((sound.data()[0] - 0.25).abs() < 0.01);
    }

    #[test]
    fn test_load_resamples_to_target_rate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tone.wav");
        let samples: Vec<i16> = vec![1000; 4410];
        write_wav(&path, &samples, 1, 22050);

        let mut loader = SoundLoader::new(44100);
        let sound = loader.load(&path).expect("load wav");
        assert_eq!(sound.sample_rate(), 44100);
        assert_eq!(sound.frame_count(), 8820);
    }

    #[test]
    fn test_load_caches_by_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tone.wav");
        write_wav(&path, &[0i16; 100], 2, 44100);

        let mut loader = SoundLoader::new(44100);
        let first = loader.load(&path).expect("load wav");
        let second = loader.load(&path).expect("load cached wav");
        assert!(Arc::ptr_eq(&first.data, &second.data));
        assert_eq!(loader.total_memory_usage(), first.memory_size());
    }

    #[test]
    fn test_load_missing_file_errors() {
        let mut loader = SoundLoader::new(44100);
        assert!(loader.load(Path::new("/nonexistent/nope.wav")).is_err());
    }

    #[test]
    fn test_resample_preserves_stereo_interleaving() {
        let source = vec![1.0f32, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        let result = resample(&source, 2, 44100, 48000);

        assert!(result.len() >= 8);
        assert!((result[0] - 1.0).abs() < 0.1);
        assert!((result[1] + 1.0).abs() < 0.1);
    }
}
