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

//! Gesture signal conditioning.
//!
//! This module turns noisy per-frame hand observations into stable mixer
//! commands:
//! - Windowed smoothing of continuous positions (volume, crossfade)
//! - Median-debounced classification of discrete finger-count gestures
//! - Edge-triggered pause toggling
//! - Cooldown-gated one-shot sample triggering

mod controller;
mod window;

pub use controller::{ControlState, ControllerConfig, GestureController};
pub use window::SignalWindow;
