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

//! The two-deck mixer.
//!
//! Owns two permanently-looping deck channels and a pool of spare channels
//! for one-shot samples. Deck gains are recomputed from the configured
//! crossfade law on every master or crossfade write.

use std::error::Error;
use std::f64::consts::FRAC_PI_2;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::audio::{Backend, Sound, SoundLoader, DECK_A, DECK_B, SAMPLE_CHANNEL_START};
use crate::config::{CrossfadeLaw, MixerConfig};

/// Number of one-shot sample slots, addressed by finger count 1 through 5.
pub const SAMPLE_SLOTS: usize = 5;

/// Preloaded audio assets for the mixer. A sample slot that failed to load
/// is recorded as absent; triggering it is a silent no-op.
pub struct MixerAssets {
    pub track_a: Sound,
    pub track_b: Sound,
    pub samples: [Option<Sound>; SAMPLE_SLOTS],
}

impl MixerAssets {
    /// Loads the deck tracks and sample slots named by the config, resolving
    /// relative paths against `base_path`. A missing deck track is fatal; a
    /// missing sample is a warning and an empty slot.
    pub fn load(
        loader: &mut SoundLoader,
        config: &MixerConfig,
        base_path: &Path,
    ) -> Result<MixerAssets, Box<dyn Error>> {
        let resolve = |file: &str| {
            if Path::new(file).is_absolute() {
                Path::new(file).to_path_buf()
            } else {
                base_path.join(file)
            }
        };

        let track_a = loader
            .load(&resolve(config.track_a()))
            .map_err(|e| format!("failed to load deck A track: {}", e))?;
        let track_b = loader
            .load(&resolve(config.track_b()))
            .map_err(|e| format!("failed to load deck B track: {}", e))?;

        let mut samples: [Option<Sound>; SAMPLE_SLOTS] = Default::default();
        for (slot, file) in config.samples() {
            match loader.load(&resolve(file)) {
                Ok(sound) => samples[(slot - 1) as usize] = Some(sound),
                Err(e) => {
                    warn!(slot, file, error = %e, "Could not load sample, slot disabled");
                }
            }
        }

        info!(
            loaded_slots = samples.iter().filter(|s| s.is_some()).count(),
            memory_kb = loader.total_memory_usage() / 1024,
            "Mixer assets loaded"
        );

        Ok(MixerAssets {
            track_a,
            track_b,
            samples,
        })
    }
}

/// Two-deck loop plus one-shot samples on spare channels. All operations
/// are synchronous, fire-and-forget commands into the audio backend.
pub struct DeckMixer {
    backend: Arc<dyn Backend>,
    law: CrossfadeLaw,
    master: f64,
    crossfade: f64,
    paused: bool,
    samples: [Option<Sound>; SAMPLE_SLOTS],
}

impl DeckMixer {
    /// Creates the mixer and starts both decks looping with the defaults
    /// applied through the gain law.
    pub fn new(
        backend: Arc<dyn Backend>,
        assets: MixerAssets,
        law: CrossfadeLaw,
        default_master: f64,
        default_crossfade: f64,
    ) -> Result<DeckMixer, Box<dyn Error>> {
        if backend.channel_count() <= SAMPLE_CHANNEL_START {
            return Err(format!(
                "backend must have at least {} channels, got {}",
                SAMPLE_CHANNEL_START + 1,
                backend.channel_count()
            )
            .into());
        }

        let mixer = DeckMixer {
            backend,
            law,
            master: default_master.clamp(0.0, 1.0),
            crossfade: default_crossfade.clamp(0.0, 1.0),
            paused: false,
            samples: assets.samples,
        };

        mixer.backend.play(DECK_A, assets.track_a, true);
        mixer.backend.play(DECK_B, assets.track_b, true);
        mixer.apply_gains();

        info!(
            law = ?mixer.law,
            master = mixer.master,
            crossfade = mixer.crossfade,
            pool_channels = mixer.backend.channel_count() - SAMPLE_CHANNEL_START,
            "Mixer started, decks looping"
        );

        Ok(mixer)
    }

    /// Sets the master volume, clamped to [0, 1], and reapplies both deck
    /// gains.
    pub fn set_master(&mut self, volume: f64) {
        self.master = volume.clamp(0.0, 1.0);
        self.apply_gains();
    }

    /// Sets the crossfade position, clamped to [0, 1], and reapplies both
    /// deck gains.
    pub fn set_crossfade(&mut self, position: f64) {
        self.crossfade = position.clamp(0.0, 1.0);
        self.apply_gains();
    }

    /// Pauses or resumes both decks. Pausing preserves deck positions and
    /// hard-stops every active pool channel so no stray one-shot keeps
    /// playing under a paused mix.
    pub fn pause_both(&mut self, pause: bool) {
        if pause {
            self.backend.pause(DECK_A);
            self.backend.pause(DECK_B);
            self.stop_samples();
            self.paused = true;
            info!("Decks paused");
        } else {
            self.backend.resume(DECK_A);
            self.backend.resume(DECK_B);
            self.paused = false;
            info!("Decks resumed");
        }
    }

    /// Plays the one-shot sample for the given finger count (1-5) on a free
    /// pool channel. No-op while paused or for an unloaded slot.
    pub fn trigger_sample(&mut self, slot: u8) {
        if self.paused {
            debug!(slot, "Trigger ignored while paused");
            return;
        }
        if !(1..=SAMPLE_SLOTS as u8).contains(&slot) {
            warn!(slot, "Trigger for out-of-range slot");
            return;
        }
        let sound = match &self.samples[(slot - 1) as usize] {
            Some(sound) => sound.clone(),
            None => {
                warn!(slot, "Trigger for unloaded sample slot");
                return;
            }
        };

        let channel = self.free_sample_channel();
        debug!(slot, channel, "Triggering sample");
        self.backend.play(channel, sound, false);
    }

    /// Releases the audio backend.
    pub fn shutdown(&self) {
        self.backend.shutdown();
    }

    /// The current master volume.
    pub fn master(&self) -> f64 {
        self.master
    }

    /// The current crossfade position.
    pub fn crossfade(&self) -> f64 {
        self.crossfade
    }

    /// The current pause state.
    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Computes the deck gains from the active law, clamped to [0, 1].
    fn deck_gains(&self) -> (f32, f32) {
        let (volume_a, volume_b) = match self.law {
            CrossfadeLaw::Linear => (
                (1.0 - self.crossfade) * self.master,
                self.crossfade * self.master,
            ),
            CrossfadeLaw::EqualPower => (
                (self.crossfade * FRAC_PI_2).cos() * self.master,
                ((1.0 - self.crossfade) * FRAC_PI_2).cos() * self.master,
            ),
        };
        (
            (volume_a as f32).clamp(0.0, 1.0),
            (volume_b as f32).clamp(0.0, 1.0),
        )
    }

    fn apply_gains(&self) {
        let (volume_a, volume_b) = self.deck_gains();
        self.backend.set_gain(DECK_A, volume_a);
        self.backend.set_gain(DECK_B, volume_b);
    }

    /// First-fit scan of the pool for a channel that is not busy. If every
    /// pool channel is busy, the lowest-indexed pool channel is reclaimed so
    /// the new trigger is always audible. Deck channels are never stolen.
    fn free_sample_channel(&self) -> usize {
        for channel in SAMPLE_CHANNEL_START..self.backend.channel_count() {
            if !self.backend.is_busy(channel) {
                return channel;
            }
        }
        warn!("All sample channels busy, stealing one");
        SAMPLE_CHANNEL_START
    }

    fn stop_samples(&self) {
        for channel in SAMPLE_CHANNEL_START..self.backend.channel_count() {
            if self.backend.is_busy(channel) {
                self.backend.stop(channel);
            }
        }
    }
}

impl std::fmt::Debug for DeckMixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeckMixer")
            .field("master", &self.master)
            .field("crossfade", &self.crossfade)
            .field("paused", &self.paused)
            .field(
                "loaded_slots",
                &self.samples.iter().filter(|s| s.is_some()).count(),
            )
            .finish()
    }
}
