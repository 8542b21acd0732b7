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

//! Hand observation types and the tracker driver seam.
//!
//! The actual hand tracking (landmark detection, finger counting) is an
//! external collaborator. Drivers produce one [`Frame`] per video frame and
//! push them over a channel; the session loop consumes them.

use std::io;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;

pub mod keyboard;

/// Which hand an observation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A single per-frame observation of one hand.
#[derive(Debug, Clone, Copy)]
pub struct HandObservation {
    /// Which hand this is.
    pub side: Side,
    /// Screen-space centroid of the hand in frame pixel coordinates.
    pub center: (f64, f64),
    /// Number of extended fingers, 0 through 5.
    pub fingers: u8,
}

/// Everything the tracker saw in one video frame. A hand that was not
/// detected this frame is simply absent; absence is not an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Frame {
    pub left: Option<HandObservation>,
    pub right: Option<HandObservation>,
}

/// A source of per-frame hand observations. Implementations run on their
/// own thread and push frames until the session ends or the source closes.
pub trait Driver: Send + Sync + 'static {
    fn watch_frames(&self, frames_tx: Sender<Frame>) -> JoinHandle<Result<(), io::Error>>;
}
