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
// Core channel playback logic shared by the cpal and mock backends.

use parking_lot::Mutex;
use tracing::warn;

use super::loader::Sound;

/// One playback channel. A channel is busy while it holds a sound, whether
/// playing or paused; finished one-shots free the channel automatically.
struct ChannelSlot {
    sound: Option<Sound>,
    /// Playback position in frames.
    position: usize,
    gain: f32,
    looping: bool,
    paused: bool,
}

impl ChannelSlot {
    fn idle() -> ChannelSlot {
        ChannelSlot {
            sound: None,
            position: 0,
            gain: 1.0,
            looping: false,
            paused: false,
        }
    }
}

/// A fixed table of playback channels mixed into an interleaved output
/// buffer. Backend-independent so tests drive it without an audio device.
pub struct ChannelEngine {
    slots: Mutex<Vec<ChannelSlot>>,
    sample_rate: u32,
}

impl ChannelEngine {
    pub fn new(channel_count: usize, sample_rate: u32) -> ChannelEngine {
        ChannelEngine {
            slots: Mutex::new((0..channel_count).map(|_| ChannelSlot::idle()).collect()),
            sample_rate,
        }
    }

    /// Starts the sound on the channel from frame zero, replacing whatever
    /// the channel held. The channel gain is kept.
    pub fn play(&self, channel: usize, sound: Sound, looping: bool) {
        self.with_slot(channel, |slot| {
            slot.sound = Some(sound);
            slot.position = 0;
            slot.looping = looping;
            slot.paused = false;
        });
    }

    pub fn pause(&self, channel: usize) {
        self.with_slot(channel, |slot| slot.paused = true);
    }

    pub fn resume(&self, channel: usize) {
        self.with_slot(channel, |slot| slot.paused = false);
    }

    /// Hard-stops the channel, keeping its gain for the next sound.
    pub fn stop(&self, channel: usize) {
        self.with_slot(channel, |slot| {
            *slot = ChannelSlot {
                gain: slot.gain,
                ..ChannelSlot::idle()
            };
        });
    }

    pub fn set_gain(&self, channel: usize, gain: f32) {
        self.with_slot(channel, |slot| slot.gain = gain.clamp(0.0, 1.0));
    }

    pub fn gain(&self, channel: usize) -> f32 {
        self.slots.lock().get(channel).map(|s| s.gain).unwrap_or(0.0)
    }

    /// True while the channel holds unfinished audio. Paused channels are
    /// still busy.
    pub fn is_busy(&self, channel: usize) -> bool {
        self.slots
            .lock()
            .get(channel)
            .map(|s| s.sound.is_some())
            .unwrap_or(false)
    }

    pub fn is_paused(&self, channel: usize) -> bool {
        self.slots
            .lock()
            .get(channel)
            .map(|s| s.sound.is_some() && s.paused)
            .unwrap_or(false)
    }

    pub fn stop_all(&self) {
        let mut slots = self.slots.lock();
        for slot in slots.iter_mut() {
            *slot = ChannelSlot {
                gain: slot.gain,
                ..ChannelSlot::idle()
            };
        }
    }

    pub fn channel_count(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Mixes all playing channels into the interleaved output buffer. Mono
    /// sounds are duplicated across the output channels; extra source
    /// channels beyond the output width fold onto the last output channel's
    /// source. Runs on the audio callback.
    pub fn mix_into(&self, output: &mut [f32], out_channels: usize) {
        output.fill(0.0);
        if out_channels == 0 {
            return;
        }
        let out_frames = output.len() / out_channels;

        let mut slots = self.slots.lock();
        for slot in slots.iter_mut() {
            let sound = match &slot.sound {
                Some(sound) if !slot.paused => sound.clone(),
                _ => continue,
            };

            let source_channels = sound.channel_count();
            let frame_count = sound.frame_count();
            let data = sound.data();
            if frame_count == 0 {
                slot.sound = None;
                continue;
            }

            for out_frame in 0..out_frames {
                if slot.position >= frame_count {
                    if slot.looping {
                        slot.position = 0;
                    } else {
                        slot.sound = None;
                        break;
                    }
                }

                let base = slot.position * source_channels;
                for out_channel in 0..out_channels {
                    let source_channel = out_channel.min(source_channels - 1);
                    output[out_frame * out_channels + out_channel] +=
                        data[base + source_channel] * slot.gain;
                }
                slot.position += 1;
            }

            // A one-shot that ended exactly at the buffer boundary frees on
            // the next mix; check now so is_busy drops promptly.
            if !slot.looping && slot.position >= frame_count {
                slot.sound = None;
            }
        }
    }

    fn with_slot<F>(&self, channel: usize, f: F)
    where
        F: FnOnce(&mut ChannelSlot),
    {
        let mut slots = self.slots.lock();
        match slots.get_mut(channel) {
            Some(slot) => f(slot),
            None => warn!(channel, "Command for unknown channel"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sound(samples: Vec<f32>, channels: usize) -> Sound {
        Sound::new(samples, channels, 44100)
    }

    fn render(engine: &ChannelEngine, frames: usize, out_channels: usize) -> Vec<f32> {
        let mut output = vec![0.0f32; frames * out_channels];
        engine.mix_into(&mut output, out_channels);
        output
    }

    #[test]
    fn test_one_shot_frees_channel_at_end() {
        let engine = ChannelEngine::new(1, 44100);
        engine.play(0, sound(vec![0.5; 4], 1), false);
        assert!(engine.is_busy(0));

        let output = render(&engine, 8, 1);
        assert_eq!(&output[..4], &[0.5, 0.5, 0.5, 0.5]);
        assert_eq!(&output[4..], &[0.0, 0.0, 0.0, 0.0]);
        assert!(!engine.is_busy(0));
    }

    #[test]
    fn test_looping_wraps() {
        let engine = ChannelEngine::new(1, 44100);
        engine.play(0, sound(vec![0.1, 0.2, 0.3], 1), true);

        let output = render(&engine, 7, 1);
        assert_eq!(output, vec![0.1, 0.2, 0.3, 0.1, 0.2, 0.3, 0.1]);
        assert!(engine.is_busy(0));
    }

    #[test]
    fn test_channels_sum_with_gains() {
        let engine = ChannelEngine::new(2, 44100);
        engine.play(0, sound(vec![1.0; 4], 1), true);
        engine.play(1, sound(vec![1.0; 4], 1), true);
        engine.set_gain(0, 0.25);
        engine.set_gain(1, 0.5);

        let output = render(&engine, 2, 1);
        assert!((output[0] - 0.75).abs() < 1e-6);
        assert!((output[1] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_mono_sound_duplicated_to_stereo() {
        let engine = ChannelEngine::new(1, 44100);
        engine.play(0, sound(vec![0.3, 0.4], 1), false);

        let output = render(&engine, 2, 2);
        assert_eq!(output, vec![0.3, 0.3, 0.4, 0.4]);
    }

    #[test]
    fn test_pause_preserves_position() {
        let engine = ChannelEngine::new(1, 44100);
        engine.play(0, sound(vec![0.1, 0.2, 0.3, 0.4], 1), false);

        let output = render(&engine, 2, 1);
        assert_eq!(output, vec![0.1, 0.2]);

        engine.pause(0);
        assert!(engine.is_busy(0));
        assert!(engine.is_paused(0));
        let output = render(&engine, 2, 1);
        assert_eq!(output, vec![0.0, 0.0]);

        engine.resume(0);
        let output = render(&engine, 2, 1);
        assert_eq!(output, vec![0.3, 0.4]);
    }

    #[test]
    fn test_stop_keeps_gain() {
        let engine = ChannelEngine::new(1, 44100);
        engine.set_gain(0, 0.6);
        engine.play(0, sound(vec![1.0; 4], 1), true);
        engine.stop(0);

        assert!(!engine.is_busy(0));
        assert!((engine.gain(0) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_gain_is_clamped() {
        let engine = ChannelEngine::new(1, 44100);
        engine.set_gain(0, 2.0);
        assert_eq!(engine.gain(0), 1.0);
        engine.set_gain(0, -1.0);
        assert_eq!(engine.gain(0), 0.0);
    }

    #[test]
    fn test_unknown_channel_is_ignored() {
        let engine = ChannelEngine::new(1, 44100);
        engine.play(5, sound(vec![0.5; 4], 1), false);
        engine.set_gain(5, 0.5);
        assert!(!engine.is_busy(5));
        assert_eq!(engine.gain(5), 0.0);
    }
}
