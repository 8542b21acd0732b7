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

//! A simulation tracker driven by the keyboard, so the instrument runs
//! end-to-end without a camera. Commands set a synthetic hand state that a
//! pump thread replays as per-frame observations:
//!
//! - `left <y> <fingers>` — left hand at normalized height `y` (0 = top)
//! - `right <x> <fingers>` — right hand at normalized position `x`
//! - `left off` / `right off` — hand lost
//! - `quit` — end the session

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::{info, span, warn, Level};

use super::{Frame, HandObservation, Side};

/// Synthetic frame rate of the pump thread, roughly webcam-like.
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// A tracker driver that synthesizes hand observations from stdin commands.
pub struct Driver {
    frame_width: f64,
    frame_height: f64,
    state: Arc<Mutex<Frame>>,
}

impl Driver {
    pub fn new(frame_width: u32, frame_height: u32) -> Driver {
        Driver {
            frame_width: frame_width as f64,
            frame_height: frame_height as f64,
            state: Arc::new(Mutex::new(Frame::default())),
        }
    }

    /// Reads one command and applies it to the synthetic hand state.
    /// Returns false when the session should end (quit or EOF).
    fn monitor_io<R, W>(
        state: &Mutex<Frame>,
        mut reader: R,
        mut writer: W,
        frame_width: f64,
        frame_height: f64,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command (left <y> <fingers>, right <x> <fingers>, left off, right off, quit): "
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }

        let input = input.trim().to_lowercase();
        let words: Vec<&str> = input.split_whitespace().collect();
        match words.as_slice() {
            ["quit"] => return Ok(false),
            ["left", "off"] => state.lock().left = None,
            ["right", "off"] => state.lock().right = None,
            ["left", y, fingers] => match parse_hand(y, fingers) {
                Some((position, fingers)) => {
                    state.lock().left = Some(HandObservation {
                        side: Side::Left,
                        center: (frame_width / 2.0, position * frame_height),
                        fingers,
                    });
                }
                None => warn!(input, "Unrecognized input"),
            },
            ["right", x, fingers] => match parse_hand(x, fingers) {
                Some((position, fingers)) => {
                    state.lock().right = Some(HandObservation {
                        side: Side::Right,
                        center: (position * frame_width, frame_height / 2.0),
                        fingers,
                    });
                }
                None => warn!(input, "Unrecognized input"),
            },
            _ => warn!(input, "Unrecognized input"),
        }
        Ok(true)
    }
}

/// Parses a normalized position and a finger count.
fn parse_hand(position: &str, fingers: &str) -> Option<(f64, u8)> {
    let position: f64 = position.parse().ok()?;
    let fingers: u8 = fingers.parse().ok()?;
    if !(0.0..=1.0).contains(&position) || fingers > 5 {
        return None;
    }
    Some((position, fingers))
}

impl super::Driver for Driver {
    fn watch_frames(&self, frames_tx: Sender<Frame>) -> JoinHandle<Result<(), io::Error>> {
        let state = self.state.clone();
        let frame_width = self.frame_width;
        let frame_height = self.frame_height;
        let stop = Arc::new(AtomicBool::new(false));

        // Pump thread: replay the current synthetic state as frames until
        // the command loop ends or the session drops the receiver.
        let pump = {
            let state = state.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    let frame = *state.lock();
                    if frames_tx.send(frame).is_err() {
                        break;
                    }
                    thread::sleep(FRAME_INTERVAL);
                }
            })
        };

        thread::spawn(move || {
            let span = span!(Level::INFO, "keyboard tracker");
            let _enter = span.enter();

            info!("Keyboard tracker started.");

            loop {
                match Self::monitor_io(
                    &state,
                    io::stdin().lock(),
                    io::stdout(),
                    frame_width,
                    frame_height,
                ) {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(e) => {
                        stop.store(true, Ordering::Relaxed);
                        let _ = pump.join();
                        return Err(e);
                    }
                }
            }

            info!("Keyboard tracker closing.");
            stop.store(true, Ordering::Relaxed);
            let _ = pump.join();
            Ok(())
        })
    }
}
