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

//! A practice companion for Indian classical music: a tabla loop that follows
//! any tempo by time-stretching the nearest recorded take, and two melodic
//! drone phrases on top.

pub mod audio;
pub mod config;
pub mod controller;
pub mod controls;
pub mod melody;
pub mod session;
pub mod tabla;
#[cfg(test)]
mod testutil;
