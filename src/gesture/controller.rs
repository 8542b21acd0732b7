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

//! Converts raw per-frame hand observations into stable control signals.
//!
//! Left hand: vertical position drives master volume, a held fist toggles
//! pause. Right hand: horizontal position drives the crossfader, a stable
//! 1-5 finger count triggers a one-shot sample. Continuous values are
//! confirmed by windowed mean and then exponentially smoothed; discrete
//! gestures are confirmed by windowed median and edge-triggered.

use std::time::Duration;

use tracing::debug;

use super::window::SignalWindow;
use crate::tracker::HandObservation;

/// Fixed per-session tuning for the gesture controller. Injected at
/// construction so the controller is deterministic and testable.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Video frame width in pixels, used to normalize horizontal positions.
    pub frame_width: f64,
    /// Video frame height in pixels, used to normalize vertical positions.
    pub frame_height: f64,
    /// Number of consecutive frames required to confirm a gesture or value.
    pub stability_frames: usize,
    /// Smoothing factor for the master volume, in (0, 1].
    pub master_smoothing: f64,
    /// Smoothing factor for the crossfader, in (0, 1].
    pub crossfader_smoothing: f64,
    /// Minimum interval between one-shot sample triggers.
    pub sample_cooldown: Duration,
    /// Initial master volume.
    pub default_master: f64,
    /// Initial crossfader position.
    pub default_crossfade: f64,
}

/// The controller's output for one frame. The mixer applies the continuous
/// values every frame; the discrete events fire at most once per edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    /// Smoothed master volume in [0, 1].
    pub master_volume: f64,
    /// Smoothed crossfader position in [0, 1].
    pub crossfade: f64,
    /// `Some(true)` requests a pause, `Some(false)` a resume. Emitted only
    /// on a pause-state transition, never repeated while the state holds.
    pub pause_change: Option<bool>,
    /// A confirmed sample slot (1-5) to trigger, gated by the cooldown.
    pub sample_to_trigger: Option<u8>,
}

/// Conditions noisy hand observations into mixer commands.
pub struct GestureController {
    config: ControllerConfig,

    left_y: SignalWindow,
    left_fingers: SignalWindow,
    right_x: SignalWindow,
    right_fingers: SignalWindow,

    master: f64,
    crossfade: f64,
    master_target: f64,
    crossfade_target: f64,

    paused: bool,
    last_trigger: Option<Duration>,
}

impl GestureController {
    /// Creates a controller with the given tuning. Continuous outputs start
    /// at the configured defaults and hold them until a full window of
    /// observations confirms a new target.
    pub fn new(config: ControllerConfig) -> Self {
        let frames = config.stability_frames;
        let master = config.default_master.clamp(0.0, 1.0);
        let crossfade = config.default_crossfade.clamp(0.0, 1.0);
        Self {
            left_y: SignalWindow::new(frames),
            left_fingers: SignalWindow::new(frames),
            right_x: SignalWindow::new(frames),
            right_fingers: SignalWindow::new(frames),
            master,
            crossfade,
            master_target: master,
            crossfade_target: crossfade,
            paused: false,
            last_trigger: None,
            config,
        }
    }

    /// Processes one frame of observations. `now` is a monotonic timestamp
    /// injected by the caller; the controller never reads the clock itself.
    pub fn update(
        &mut self,
        left: Option<&HandObservation>,
        right: Option<&HandObservation>,
        now: Duration,
    ) -> ControlState {
        let pause_change = self.update_left(left);
        let sample_to_trigger = self.update_right(right, now);

        // Smoothing runs every frame, even when the target did not update,
        // so outputs glide toward the last confirmed target.
        self.master += (self.master_target - self.master) * self.config.master_smoothing;
        self.crossfade += (self.crossfade_target - self.crossfade) * self.config.crossfader_smoothing;
        self.master = self.master.clamp(0.0, 1.0);
        self.crossfade = self.crossfade.clamp(0.0, 1.0);

        ControlState {
            master_volume: self.master,
            crossfade: self.crossfade,
            pause_change,
            sample_to_trigger,
        }
    }

    /// Left hand: master volume plus the fist pause toggle.
    fn update_left(&mut self, left: Option<&HandObservation>) -> Option<bool> {
        let observation = match left {
            Some(observation) => observation,
            None => {
                // Losing the hand discards accumulated stability. The target
                // holds its last confirmed value rather than drifting.
                self.left_y.clear();
                self.left_fingers.clear();
                return None;
            }
        };

        let volume = 1.0 - (observation.center.1 / self.config.frame_height);
        self.left_y.push(volume);
        self.left_fingers.push(observation.fingers as f64);

        if self.left_y.is_full() {
            if let Some(mean) = self.left_y.mean() {
                self.master_target = mean.clamp(0.0, 1.0);
            }
        }

        if !self.left_fingers.is_full() {
            return None;
        }
        // Ties round to the even integer, so a split window like [0,0,1,1]
        // reads as a fist.
        let stable = match self.left_fingers.median() {
            Some(median) => median.round_ties_even() as i64,
            None => return None,
        };

        // Two-state machine: emit only on the PLAYING <-> PAUSED edges.
        if stable == 0 && !self.paused {
            self.paused = true;
            debug!("Fist confirmed, pausing");
            Some(true)
        } else if stable != 0 && self.paused {
            self.paused = false;
            debug!("Fist released, resuming");
            Some(false)
        } else {
            None
        }
    }

    /// Right hand: crossfader plus cooldown-gated sample triggers.
    fn update_right(&mut self, right: Option<&HandObservation>, now: Duration) -> Option<u8> {
        let observation = match right {
            Some(observation) => observation,
            None => {
                self.right_x.clear();
                self.right_fingers.clear();
                return None;
            }
        };

        let position = observation.center.0 / self.config.frame_width;
        self.right_x.push(position);
        self.right_fingers.push(observation.fingers as f64);

        if self.right_x.is_full() {
            if let Some(mean) = self.right_x.mean() {
                self.crossfade_target = mean.clamp(0.0, 1.0);
            }
        }

        if !self.right_fingers.is_full() {
            return None;
        }
        let stable = match self.right_fingers.median() {
            Some(median) => median.round_ties_even() as i64,
            None => return None,
        };

        if !(1..=5).contains(&stable) {
            return None;
        }
        // The cooldown is shared across slots: any recent trigger gates all
        // of them, measured from the previous trigger.
        if let Some(last) = self.last_trigger {
            if now.saturating_sub(last) <= self.config.sample_cooldown {
                return None;
            }
        }

        self.last_trigger = Some(now);
        debug!(slot = stable, "Sample trigger confirmed");
        Some(stable as u8)
    }

    /// The current logical pause state.
    pub fn paused(&self) -> bool {
        self.paused
    }
}
