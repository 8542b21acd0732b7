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

//! The session loop: frames in, mixer updates out.
//!
//! One thread owns both the gesture controller and the mixer, so every
//! control update is applied in frame order with no locking between the
//! two. Frame timestamps come from a single monotonic epoch taken when the
//! session starts.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{error, info, span, Level};

use crate::gesture::GestureController;
use crate::mixer::DeckMixer;
use crate::tracker::Driver;

/// A snapshot of the mixer controls, published after every frame for status
/// displays.
#[derive(Debug, Clone, Copy, Default)]
pub struct Status {
    pub master_volume: f64,
    pub crossfade: f64,
    pub paused: bool,
}

/// A running performance session.
pub struct Session {
    status: Arc<Mutex<Status>>,
    join: Mutex<Option<JoinHandle<Result<(), io::Error>>>>,
}

impl Session {
    /// Starts the session loop on its own thread. The loop runs until the
    /// driver stops producing frames, then shuts the mixer down.
    pub fn run(
        driver: Arc<dyn Driver>,
        mut controller: GestureController,
        mut mixer: DeckMixer,
    ) -> Session {
        let status = Arc::new(Mutex::new(Status {
            master_volume: mixer.master(),
            crossfade: mixer.crossfade(),
            paused: mixer.paused(),
        }));

        let join = {
            let status = status.clone();
            thread::spawn(move || {
                let span = span!(Level::INFO, "session");
                let _enter = span.enter();

                let (frames_tx, frames_rx) = crossbeam_channel::unbounded();
                let driver_join = driver.watch_frames(frames_tx);
                let epoch = Instant::now();

                info!("Session started.");

                while let Ok(frame) = frames_rx.recv() {
                    let state =
                        controller.update(frame.left.as_ref(), frame.right.as_ref(), epoch.elapsed());

                    mixer.set_master(state.master_volume);
                    mixer.set_crossfade(state.crossfade);
                    if let Some(pause) = state.pause_change {
                        mixer.pause_both(pause);
                    }
                    if let Some(slot) = state.sample_to_trigger {
                        mixer.trigger_sample(slot);
                    }

                    *status.lock() = Status {
                        master_volume: mixer.master(),
                        crossfade: mixer.crossfade(),
                        paused: mixer.paused(),
                    };
                }

                info!("Frame source closed, session ending.");
                mixer.shutdown();

                match driver_join.join() {
                    Ok(result) => result,
                    Err(_) => {
                        error!("Tracker driver panicked.");
                        Err(io::Error::other("tracker driver panicked"))
                    }
                }
            })
        };

        Session {
            status,
            join: Mutex::new(Some(join)),
        }
    }

    /// The controls as of the most recently processed frame.
    pub fn status(&self) -> Status {
        *self.status.lock()
    }

    /// Waits for the session loop to finish.
    pub fn join(&self) -> Result<(), io::Error> {
        match self.join.lock().take() {
            Some(join) => match join.join() {
                Ok(result) => result,
                Err(_) => Err(io::Error::other("session loop panicked")),
            },
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;
    use std::time::Duration;

    use crossbeam_channel::Sender;

    use super::*;
    use crate::audio::mock;
    use crate::audio::{Backend as _, Sound, DECK_A, DECK_B, SAMPLE_CHANNEL_START};
    use crate::config::CrossfadeLaw;
    use crate::gesture::ControllerConfig;
    use crate::mixer::MixerAssets;
    use crate::test::eventually;
    use crate::tracker::{Frame, HandObservation, Side};

    /// A driver that replays a fixed script of frames, then closes. While a
    /// hold receiver is present the driver stays open after the script so
    /// tests can observe the running session before it shuts down.
    struct ScriptedDriver {
        frames: Vec<Frame>,
        hold: Mutex<Option<crossbeam_channel::Receiver<()>>>,
    }

    impl ScriptedDriver {
        fn new(frames: Vec<Frame>) -> (ScriptedDriver, Sender<()>) {
            let (release_tx, release_rx) = crossbeam_channel::bounded(1);
            let driver = ScriptedDriver {
                frames,
                hold: Mutex::new(Some(release_rx)),
            };
            (driver, release_tx)
        }
    }

    impl Driver for ScriptedDriver {
        fn watch_frames(&self, frames_tx: Sender<Frame>) -> JoinHandle<Result<(), io::Error>> {
            let frames = self.frames.clone();
            let hold = self.hold.lock().take();
            thread::spawn(move || {
                for frame in frames {
                    if frames_tx.send(frame).is_err() {
                        break;
                    }
                    thread::sleep(Duration::from_millis(1));
                }
                if let Some(hold) = hold {
                    let _ = hold.recv();
                }
                Ok(())
            })
        }
    }

    fn tone(frames: usize) -> Sound {
        Sound::new(vec![0.5; frames], 1, 44100)
    }

    fn test_mixer(backend: mock::Backend) -> Result<DeckMixer, Box<dyn Error>> {
        let assets = MixerAssets {
            track_a: tone(64),
            track_b: tone(64),
            samples: [Some(tone(16)), None, None, None, None],
        };
        DeckMixer::new(
            Arc::new(backend.clone()),
            assets,
            CrossfadeLaw::Linear,
            0.8,
            0.5,
        )
    }

    fn config() -> ControllerConfig {
        ControllerConfig {
            frame_width: 640.0,
            frame_height: 480.0,
            stability_frames: 2,
            master_smoothing: 1.0,
            crossfader_smoothing: 1.0,
            sample_cooldown: Duration::from_millis(1),
            default_master: 0.8,
            default_crossfade: 0.5,
        }
    }

    fn left(y: f64, fingers: u8) -> Option<HandObservation> {
        Some(HandObservation {
            side: Side::Left,
            center: (320.0, y),
            fingers,
        })
    }

    fn right(x: f64, fingers: u8) -> Option<HandObservation> {
        Some(HandObservation {
            side: Side::Right,
            center: (x, 240.0),
            fingers,
        })
    }

    #[test]
    fn test_session_applies_gestures() -> Result<(), Box<dyn Error>> {
        let backend = mock::Backend::new(SAMPLE_CHANNEL_START + 2, 44100);
        let mixer = test_mixer(backend.clone())?;

        // Two stable frames of each gesture: the left hand drops the master
        // volume, the right hand both moves the crossfader and triggers
        // sample slot 1.
        let (driver, release) = ScriptedDriver::new(vec![
            Frame {
                left: left(480.0, 5),
                right: right(0.0, 1),
            },
            Frame {
                left: left(480.0, 5),
                right: right(0.0, 1),
            },
        ]);

        let session = Session::run(Arc::new(driver), GestureController::new(config()), mixer);

        eventually(
            || {
                let status = session.status();
                status.master_volume < 0.01 && status.crossfade < 0.01
            },
            "controls never reached the gestured positions",
        );
        eventually(
            || backend.is_busy(SAMPLE_CHANNEL_START),
            "sample slot 1 never started",
        );

        drop(release);
        session.join()?;
        Ok(())
    }

    #[test]
    fn test_session_shuts_down_mixer_on_close() -> Result<(), Box<dyn Error>> {
        let backend = mock::Backend::new(SAMPLE_CHANNEL_START + 1, 44100);
        let mixer = test_mixer(backend.clone())?;
        assert!(backend.is_busy(DECK_A));

        let (driver, release) = ScriptedDriver::new(Vec::new());
        drop(release);
        let session = Session::run(Arc::new(driver), GestureController::new(config()), mixer);
        session.join()?;

        assert!(!backend.is_busy(DECK_A));
        assert!(!backend.is_busy(DECK_B));
        Ok(())
    }

    #[test]
    fn test_session_pauses_on_fist() -> Result<(), Box<dyn Error>> {
        let backend = mock::Backend::new(SAMPLE_CHANNEL_START + 1, 44100);
        let mixer = test_mixer(backend.clone())?;

        let (driver, release) = ScriptedDriver::new(vec![
            Frame {
                left: left(240.0, 0),
                right: None,
            },
            Frame {
                left: left(240.0, 0),
                right: None,
            },
        ]);

        let session = Session::run(Arc::new(driver), GestureController::new(config()), mixer);

        eventually(|| session.status().paused, "session never paused");
        eventually(|| backend.is_paused(DECK_A), "deck A never paused");

        drop(release);
        session.join()?;
        Ok(())
    }
}
