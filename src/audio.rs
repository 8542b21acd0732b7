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
use std::error::Error;
use std::sync::Arc;

pub mod cpal;
pub mod engine;
pub mod error;
pub mod loader;
pub mod mock;

pub use error::AudioError;
pub use loader::{Sound, SoundLoader};

/// The channel holding deck A's loop.
pub const DECK_A: usize = 0;
/// The channel holding deck B's loop.
pub const DECK_B: usize = 1;
/// First channel of the one-shot sample pool. Pool channels are disjoint
/// from the deck channels and are the only channels ever stolen.
pub const SAMPLE_CHANNEL_START: usize = 2;

/// An audio output with a fixed table of playback channels. Every call is a
/// synchronous, non-blocking command into the backend's own output thread.
pub trait Backend: Send + Sync {
    /// Starts the sound on the channel from the beginning.
    fn play(&self, channel: usize, sound: Sound, looping: bool);
    /// Pauses the channel, preserving its playback position.
    fn pause(&self, channel: usize);
    /// Resumes a paused channel.
    fn resume(&self, channel: usize);
    /// Hard-stops the channel.
    fn stop(&self, channel: usize);
    /// Sets the channel gain in [0, 1].
    fn set_gain(&self, channel: usize, gain: f32);
    /// True while the channel holds unfinished audio.
    fn is_busy(&self, channel: usize) -> bool;
    /// The fixed number of channels.
    fn channel_count(&self) -> usize;
    /// The output sample rate, which loaded sounds must match.
    fn sample_rate(&self) -> u32;
    /// Stops all channels and releases the output.
    fn shutdown(&self);
}

/// Lists the names of the available output devices.
pub fn list_devices() -> Result<Vec<String>, Box<dyn Error>> {
    cpal::list_devices()
}

/// Opens a backend for the named device with the given channel table size.
/// Names starting with "mock" produce a mock backend for tests.
pub fn get_backend(
    device: &str,
    channel_count: usize,
) -> Result<Arc<dyn Backend>, Box<dyn Error>> {
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Backend::new(channel_count, 44100)));
    }

    Ok(Arc::new(cpal::Backend::open(device, channel_count)?))
}
