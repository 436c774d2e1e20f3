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

//! The tabla loop: anchor tables, variant rotation, rate mapping and the
//! engine that keeps the loop going.

pub mod anchors;
mod engine;
mod rate;
mod stems;
mod style;
mod variant;

pub use anchors::{resolve_anchor, resolve_anchor_for_name};
pub use engine::{
    EngineError, Load, Options, Phase, Snapshot, Status, TablaEngine, DEFAULT_ERROR_DISPLAY,
    DEFAULT_LEAD_IN,
};
pub use rate::{playback_rate, stretched};
pub use stems::StemPaths;
pub use style::{ParseStyleError, Style};
pub use variant::VariantCursor;
