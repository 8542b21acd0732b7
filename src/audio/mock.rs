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
use std::sync::Arc;

use super::engine::ChannelEngine;
use super::loader::Sound;

/// A mock backend. Runs the real channel engine but has no output stream,
/// so playback only advances when a test calls [`Backend::render`]. This
/// keeps channel state fully deterministic under test.
#[derive(Clone)]
pub struct Backend {
    engine: Arc<ChannelEngine>,
}

impl Backend {
    /// Creates a mock backend with the given channel table size.
    pub fn new(channel_count: usize, sample_rate: u32) -> Self {
        Self {
            engine: Arc::new(ChannelEngine::new(channel_count, sample_rate)),
        }
    }

    /// Pulls the given number of stereo frames through the engine, as the
    /// audio callback would, and returns the interleaved output.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut output = vec![0.0f32; frames * 2];
        self.engine.mix_into(&mut output, 2);
        output
    }

    /// The channel's current gain, for assertions.
    pub fn gain(&self, channel: usize) -> f32 {
        self.engine.gain(channel)
    }

    /// True if the channel is currently paused.
    pub fn is_paused(&self, channel: usize) -> bool {
        self.engine.is_paused(channel)
    }
}

impl super::Backend for Backend {
    fn play(&self, channel: usize, sound: Sound, looping: bool) {
        self.engine.play(channel, sound, looping);
    }

    fn pause(&self, channel: usize) {
        self.engine.pause(channel);
    }

    fn resume(&self, channel: usize) {
        self.engine.resume(channel);
    }

    fn stop(&self, channel: usize) {
        self.engine.stop(channel);
    }

    fn set_gain(&self, channel: usize, gain: f32) {
        self.engine.set_gain(channel, gain);
    }

    fn is_busy(&self, channel: usize) -> bool {
        self.engine.is_busy(channel)
    }

    fn channel_count(&self) -> usize {
        self.engine.channel_count()
    }

    fn sample_rate(&self) -> u32 {
        self.engine.sample_rate()
    }

    fn shutdown(&self) {
        self.engine.stop_all();
    }
}
