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
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tracing::{error, info};

use super::engine::ChannelEngine;
use super::error::AudioError;
use super::loader::Sound;

/// Lists the names of cpal devices with at least one output configuration.
pub fn list_devices() -> Result<Vec<String>, Box<dyn Error>> {
    let mut names: Vec<String> = Vec::new();
    for host_id in cpal::available_hosts() {
        let host_devices = match cpal::host_from_id(host_id)?.devices() {
            Ok(host_devices) => host_devices,
            Err(e) => {
                error!(
                    err = e.to_string(),
                    host = host_id.name(),
                    "Unable to list devices for host"
                );
                continue;
            }
        };

        for device in host_devices {
            let has_output = device
                .supported_output_configs()
                .map(|mut configs| configs.next().is_some())
                .unwrap_or(false);
            if !has_output {
                continue;
            }
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
    }

    names.sort();
    names.dedup();
    Ok(names)
}

/// A cpal-backed audio output. The channel engine is shared with an output
/// thread that owns the stream; every trait call is a synchronous command
/// against the engine's channel table.
pub struct Backend {
    engine: Arc<ChannelEngine>,
    shutdown: Arc<AtomicBool>,
    output_thread: Mutex<Option<JoinHandle<()>>>,
}

impl Backend {
    /// Opens the named output device ("default" for the host default) and
    /// starts the output stream.
    pub fn open(name: &str, channel_count: usize) -> Result<Backend, Box<dyn Error>> {
        let host = cpal::default_host();
        let device = if name == "default" {
            host.default_output_device()
                .ok_or_else(|| AudioError::NoDevice(name.to_string()))?
        } else {
            host.output_devices()?
                .find(|device| {
                    device
                        .name()
                        .map(|device_name| device_name.trim() == name)
                        .unwrap_or(false)
                })
                .ok_or_else(|| AudioError::NoDevice(name.to_string()))?
        };

        let supported = device.default_output_config()?;
        let sample_rate = supported.sample_rate().0;
        let out_channels = supported.channels();
        let sample_format = supported.sample_format();

        let engine = Arc::new(ChannelEngine::new(channel_count, sample_rate));
        let shutdown = Arc::new(AtomicBool::new(false));

        info!(
            device = device.name().unwrap_or_else(|_| name.to_string()),
            sample_rate,
            out_channels,
            channels = channel_count,
            "Opening audio output"
        );

        // The stream is not Send, so it is created and kept alive inside the
        // output thread. The thread reports whether the stream started over
        // a channel so a bad format or build failure fails open() instead of
        // leaving a silent session.
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), AudioError>>(1);
        let output_thread = {
            let engine = engine.clone();
            let shutdown = shutdown.clone();
            thread::spawn(move || {
                let config = cpal::StreamConfig {
                    channels: out_channels,
                    sample_rate: cpal::SampleRate(sample_rate),
                    buffer_size: cpal::BufferSize::Default,
                };

                let stream_result = match sample_format {
                    cpal::SampleFormat::F32 => {
                        let engine = engine.clone();
                        device.build_output_stream(
                            &config,
                            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                                engine.mix_into(data, out_channels as usize);
                            },
                            |err| error!("cpal output stream error: {}", err),
                            None,
                        )
                    }
                    cpal::SampleFormat::I16 => {
                        let engine = engine.clone();
                        let mut scratch: Vec<f32> = Vec::new();
                        device.build_output_stream(
                            &config,
                            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                                scratch.resize(data.len(), 0.0);
                                engine.mix_into(&mut scratch, out_channels as usize);
                                for (out, sample) in data.iter_mut().zip(scratch.iter()) {
                                    *out = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                                }
                            },
                            |err| error!("cpal output stream error: {}", err),
                            None,
                        )
                    }
                    other => {
                        let _ = ready_tx.send(Err(AudioError::UnsupportedFormat(format!(
                            "output sample format {:?}",
                            other
                        ))));
                        return;
                    }
                };

                match stream_result {
                    Ok(stream) => {
                        if let Err(e) = stream.play() {
                            let _ = ready_tx.send(Err(AudioError::Stream(e.to_string())));
                            return;
                        }
                        info!("cpal output stream started");
                        let _ = ready_tx.send(Ok(()));

                        // Keep the stream alive until shutdown.
                        while !shutdown.load(Ordering::Relaxed) {
                            thread::sleep(Duration::from_millis(100));
                        }
                        drop(stream);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(AudioError::Stream(e.to_string())));
                    }
                }
            })
        };

        ready_rx
            .recv()
            .map_err(|_| AudioError::Stream("audio output thread exited early".to_string()))??;

        Ok(Backend {
            engine,
            shutdown,
            output_thread: Mutex::new(Some(output_thread)),
        })
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
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.output_thread.lock().take() {
            if handle.join().is_err() {
                error!("Audio output thread panicked during shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // An output that cannot start must surface as an error from open()
    // rather than a backend that plays nothing.
    #[test]
    fn test_open_fails_fast_without_usable_output() {
        let result = Backend::open("no-such-output-device", 4);
        assert!(result.is_err());
    }
}
