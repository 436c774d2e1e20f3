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
use serde::Deserialize;

pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_THREAD_PRIORITY: u8 = 70;

/// A YAML representation of the audio configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct Audio {
    /// The audio device. Names starting with `mock` select the mock device.
    device: String,

    /// Target sample rate in Hz (default: 44100)
    sample_rate: Option<u32>,

    /// Priority of the output callback thread, 0-99 (default: 70)
    thread_priority: Option<u8>,

    /// Request realtime (SCHED_FIFO) scheduling for the callback thread (default: true)
    realtime: Option<bool>,
}

impl Audio {
    /// New will create a new Audio configuration.
    pub fn new(device: &str) -> Audio {
        Audio {
            device: device.to_string(),
            sample_rate: None,
            thread_priority: None,
            realtime: None,
        }
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Returns the target sample rate (default: 44100)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Returns the output callback thread priority (default: 70)
    pub fn thread_priority(&self) -> u8 {
        self.thread_priority.unwrap_or(DEFAULT_THREAD_PRIORITY).min(99)
    }

    /// Returns whether realtime scheduling is requested (default: true)
    pub fn realtime(&self) -> bool {
        self.realtime.unwrap_or(true)
    }
}
