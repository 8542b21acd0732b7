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
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use duration_string::DurationString;
use serde::Deserialize;

mod error;

pub use error::ConfigError;

use crate::mixer::SAMPLE_SLOTS;

/// The crossfade law mapping crossfade position and master level to the two
/// deck gains. A static configuration choice, not switchable mid-session.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CrossfadeLaw {
    /// `volA = (1 - x) * m`, `volB = x * m`.
    #[default]
    Linear,
    /// Cosine taper: `volA = cos(x*pi/2) * m`, `volB = cos((1-x)*pi/2) * m`.
    EqualPower,
}

/// The session configuration. All values are fixed for the session; both the
/// gesture controller and the mixer receive them at construction.
#[derive(Deserialize)]
pub struct Config {
    /// The audio output device to use.
    #[serde(default = "default_audio_device")]
    audio_device: String,

    /// Video frame dimensions, used to normalize hand positions.
    #[serde(default)]
    frame: FrameConfig,

    /// Gesture conditioning tuning.
    #[serde(default)]
    gestures: GesturesConfig,

    /// Deck tracks, sample slots, and mixing behavior.
    mixer: MixerConfig,

    /// Directory the config was loaded from; relative asset paths resolve
    /// against it.
    #[serde(skip)]
    base_path: PathBuf,
}

/// Video frame dimensions in pixels.
#[derive(Deserialize)]
pub struct FrameConfig {
    #[serde(default = "default_frame_width")]
    width: u32,
    #[serde(default = "default_frame_height")]
    height: u32,
}

/// Tuning for the gesture signal conditioning.
#[derive(Deserialize)]
pub struct GesturesConfig {
    /// Frames required to confirm a gesture or value.
    #[serde(default = "default_stability_frames")]
    stability_frames: usize,

    /// Master volume smoothing factor in (0, 1]; bigger reacts faster.
    #[serde(default = "default_smoothing")]
    master_smoothing: f64,

    /// Crossfader smoothing factor in (0, 1].
    #[serde(default = "default_smoothing")]
    crossfader_smoothing: f64,

    /// Minimum interval between one-shot sample triggers, e.g. "250ms".
    #[serde(default = "default_sample_cooldown")]
    sample_cooldown: String,
}

/// Mixer assets and behavior.
#[derive(Deserialize)]
pub struct MixerConfig {
    /// The track looped on deck A.
    track_a: String,

    /// The track looped on deck B.
    track_b: String,

    /// The active crossfade gain law.
    #[serde(default)]
    crossfade_law: CrossfadeLaw,

    /// Initial master volume.
    #[serde(default = "default_master")]
    default_master: f64,

    /// Initial crossfade position.
    #[serde(default = "default_crossfade")]
    default_crossfade: f64,

    /// Number of spare channels for one-shot samples.
    #[serde(default = "default_sample_channels")]
    sample_channels: usize,

    /// Finger-count (1-5) to sample file mapping.
    #[serde(default)]
    samples: HashMap<u8, String>,
}

fn default_audio_device() -> String {
    "default".to_string()
}

fn default_frame_width() -> u32 {
    640
}

fn default_frame_height() -> u32 {
    480
}

fn default_stability_frames() -> usize {
    4
}

fn default_smoothing() -> f64 {
    0.2
}

fn default_sample_cooldown() -> String {
    "250ms".to_string()
}

fn default_master() -> f64 {
    0.7
}

fn default_crossfade() -> f64 {
    0.5
}

fn default_sample_channels() -> usize {
    14
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: default_frame_width(),
            height: default_frame_height(),
        }
    }
}

impl Default for GesturesConfig {
    fn default() -> Self {
        Self {
            stability_frames: default_stability_frames(),
            master_smoothing: default_smoothing(),
            crossfader_smoothing: default_smoothing(),
            sample_cooldown: default_sample_cooldown(),
        }
    }
}

impl Config {
    /// Loads and validates a session config from a YAML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let mut config: Config = serde_yml::from_str(&fs::read_to_string(path)?)?;
        config.base_path = path
            .canonicalize()?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Parses a config from a YAML string with an explicit base path.
    pub fn parse(contents: &str, base_path: &Path) -> Result<Config, ConfigError> {
        let mut config: Config = serde_yml::from_str(contents)?;
        config.base_path = base_path.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let gestures = &self.gestures;
        if gestures.stability_frames < 1 {
            return Err(ConfigError::Invalid(
                "gestures.stability_frames must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("master_smoothing", gestures.master_smoothing),
            ("crossfader_smoothing", gestures.crossfader_smoothing),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "gestures.{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        gestures.parse_sample_cooldown()?;

        if self.mixer.sample_channels < 1 {
            return Err(ConfigError::Invalid(
                "mixer.sample_channels must be at least 1".to_string(),
            ));
        }
        for slot in self.mixer.samples.keys() {
            if !(1..=SAMPLE_SLOTS as u8).contains(slot) {
                return Err(ConfigError::Invalid(format!(
                    "mixer.samples slot {} is out of range 1-{}",
                    slot, SAMPLE_SLOTS
                )));
            }
        }

        Ok(())
    }

    /// The audio output device name.
    pub fn audio_device(&self) -> &str {
        &self.audio_device
    }

    /// The directory relative asset paths resolve against.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn frame(&self) -> &FrameConfig {
        &self.frame
    }

    pub fn gestures(&self) -> &GesturesConfig {
        &self.gestures
    }

    pub fn mixer(&self) -> &MixerConfig {
        &self.mixer
    }

    /// Total channel table size: the two decks plus the sample pool.
    pub fn channel_count(&self) -> usize {
        crate::audio::SAMPLE_CHANNEL_START + self.mixer.sample_channels
    }
}

impl FrameConfig {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl GesturesConfig {
    pub fn stability_frames(&self) -> usize {
        self.stability_frames
    }

    pub fn master_smoothing(&self) -> f64 {
        self.master_smoothing
    }

    pub fn crossfader_smoothing(&self) -> f64 {
        self.crossfader_smoothing
    }

    /// The sample trigger cooldown as a duration.
    pub fn sample_cooldown(&self) -> Result<Duration, ConfigError> {
        self.parse_sample_cooldown()
    }

    fn parse_sample_cooldown(&self) -> Result<Duration, ConfigError> {
        DurationString::from_string(self.sample_cooldown.clone())
            .map(Into::into)
            .map_err(|e| {
                ConfigError::Invalid(format!(
                    "gestures.sample_cooldown '{}': {}",
                    self.sample_cooldown, e
                ))
            })
    }
}

impl MixerConfig {
    pub fn track_a(&self) -> &str {
        &self.track_a
    }

    pub fn track_b(&self) -> &str {
        &self.track_b
    }

    pub fn crossfade_law(&self) -> CrossfadeLaw {
        self.crossfade_law
    }

    pub fn default_master(&self) -> f64 {
        self.default_master
    }

    pub fn default_crossfade(&self) -> f64 {
        self.default_crossfade
    }

    pub fn sample_channels(&self) -> usize {
        self.sample_channels
    }

    /// The configured (slot, file) pairs, slots 1-5.
    pub fn samples(&self) -> impl Iterator<Item = (u8, &str)> {
        self.samples.iter().map(|(slot, file)| (*slot, file.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_CONFIG: &str = r#"
audio_device: mock
frame:
  width: 1280
  height: 720
gestures:
  stability_frames: 6
  master_smoothing: 0.3
  crossfader_smoothing: 0.25
  sample_cooldown: 500ms
mixer:
  track_a: assets/loop-a.wav
  track_b: assets/loop-b.wav
  crossfade_law: equal-power
  default_master: 0.8
  default_crossfade: 0.4
  sample_channels: 6
  samples:
    1: assets/kick.wav
    3: assets/clap.wav
"#;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(FULL_CONFIG, Path::new("/tmp")).unwrap();

        assert_eq!(config.audio_device(), "mock");
        assert_eq!(config.frame().width(), 1280);
        assert_eq!(config.frame().height(), 720);
        assert_eq!(config.gestures().stability_frames(), 6);
        assert_eq!(
            config.gestures().sample_cooldown().unwrap(),
            Duration::from_millis(500)
        );
        assert_eq!(config.mixer().crossfade_law(), CrossfadeLaw::EqualPower);
        assert_eq!(config.channel_count(), 8);

        let mut slots: Vec<(u8, &str)> = config.mixer().samples().collect();
        slots.sort();
        assert_eq!(slots, vec![(1, "assets/kick.wav"), (3, "assets/clap.wav")]);
    }

    #[test]
    fn test_defaults() {
        let config = Config::parse(
            "mixer:\n  track_a: a.wav\n  track_b: b.wav\n",
            Path::new("/tmp"),
        )
        .unwrap();

        assert_eq!(config.audio_device(), "default");
        assert_eq!(config.frame().width(), 640);
        assert_eq!(config.frame().height(), 480);
        assert_eq!(config.gestures().stability_frames(), 4);
        assert_eq!(config.gestures().master_smoothing(), 0.2);
        assert_eq!(
            config.gestures().sample_cooldown().unwrap(),
            Duration::from_millis(250)
        );
        assert_eq!(config.mixer().crossfade_law(), CrossfadeLaw::Linear);
        assert_eq!(config.mixer().default_master(), 0.7);
        assert_eq!(config.mixer().sample_channels(), 14);
    }

    #[test]
    fn test_rejects_bad_smoothing() {
        let yaml = r#"
gestures:
  master_smoothing: 0.0
mixer:
  track_a: a.wav
  track_b: b.wav
"#;
        assert!(matches!(
            Config::parse(yaml, Path::new("/tmp")),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_slot() {
        let yaml = r#"
mixer:
  track_a: a.wav
  track_b: b.wav
  samples:
    6: nope.wav
"#;
        assert!(matches!(
            Config::parse(yaml, Path::new("/tmp")),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_bad_cooldown() {
        let yaml = r#"
gestures:
  sample_cooldown: quickly
mixer:
  track_a: a.wav
  track_b: b.wav
"#;
        assert!(Config::parse(yaml, Path::new("/tmp")).is_err());
    }

    #[test]
    fn test_rejects_zero_stability() {
        let yaml = r#"
gestures:
  stability_frames: 0
mixer:
  track_a: a.wav
  track_b: b.wav
"#;
        assert!(matches!(
            Config::parse(yaml, Path::new("/tmp")),
            Err(ConfigError::Invalid(_))
        ));
    }
}
