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
use std::{error::Error, fmt, sync::Arc, time::Duration};

use crate::config;

pub mod cpal;
pub mod loader;
pub mod mixer;
pub mod mock;
mod thread_priority;

pub use loader::{LoadError, SampleLoader, StemLoader};

/// Decoded audio held entirely in memory as interleaved f32 samples.
/// Cloning is cheap: the sample data is shared.
#[derive(Clone)]
pub struct Buffer {
    data: Arc<Vec<f32>>,
    channels: u16,
    sample_rate: u32,
}

impl Buffer {
    /// Creates a buffer from interleaved samples.
    pub fn new(data: Vec<f32>, channels: u16, sample_rate: u32) -> Buffer {
        Buffer {
            data: Arc::new(data),
            channels: channels.max(1),
            sample_rate,
        }
    }

    /// Creates a silent buffer of the given length.
    pub fn silence(duration: Duration, channels: u16, sample_rate: u32) -> Buffer {
        let frames = (duration.as_secs_f64() * sample_rate as f64).round() as usize;
        Buffer::new(
            vec![0.0; frames * channels.max(1) as usize],
            channels,
            sample_rate,
        )
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.data.len() / self.channels as usize
    }

    /// The native duration of the buffer at its own sample rate.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Reads a sample at a fractional frame position using linear interpolation.
    /// Channels beyond the buffer's channel count read the last channel, and
    /// positions past the end read as silence.
    pub fn sample_at(&self, position: f64, channel: u16) -> f32 {
        if position < 0.0 {
            return 0.0;
        }
        let channel = channel.min(self.channels - 1) as usize;
        let channels = self.channels as usize;
        let frame = position.floor() as usize;
        let frac = (position - frame as f64) as f32;

        let s0 = match self.data.get(frame * channels + channel) {
            Some(s) => *s,
            None => return 0.0,
        };
        let s1 = self
            .data
            .get((frame + 1) * channels + channel)
            .copied()
            .unwrap_or(0.0);
        s0 + (s1 - s0) * frac
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frames())
            .finish()
    }
}

/// The dayan and bayan recordings of one tabla take. Both stems are always
/// played at the same rate and position so they stay phase-locked.
#[derive(Clone, Debug)]
pub struct StemPair {
    pub lead: Buffer,
    pub bass: Buffer,
}

impl StemPair {
    /// The native loop length, taken from the lead stem.
    pub fn duration(&self) -> Duration {
        self.lead.duration()
    }
}

/// One of the two melodic voices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Voice {
    One,
    Two,
}

impl Voice {
    pub fn index(&self) -> usize {
        match self {
            Voice::One => 0,
            Voice::Two => 1,
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice {}", self.index() + 1)
    }
}

/// Live mix parameters applied by the output device.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MixSettings {
    /// Master volume in dB.
    pub master_db: f32,
    /// Pan per melodic voice, -1.0 (left) to 1.0 (right).
    pub pans: [f32; 2],
    /// Tuning offset of the melodic voices in cents.
    pub tune_cents: f32,
    /// Bayan volume in dB.
    pub bayan_db: f32,
}

impl Default for MixSettings {
    fn default() -> Self {
        MixSettings {
            master_db: -12.0,
            pans: [-0.6, 0.6],
            tune_cents: 0.0,
            bayan_db: 0.0,
        }
    }
}

/// An output device that loops tabla stems and plays melodic notes.
pub trait Device: fmt::Display + Send + Sync {
    /// Starts both stems together from the top at the given rate.
    fn start_stems(&self, stems: StemPair, rate: f64) -> Result<(), Box<dyn Error>>;

    /// Switches to the given stems and rate at the next loop boundary.
    fn queue_stems(&self, stems: StemPair, rate: f64) -> Result<(), Box<dyn Error>>;

    /// Switches to the given stems and rate right away, keeping the position
    /// within the loop.
    fn replace_stems(&self, stems: StemPair, rate: f64) -> Result<(), Box<dyn Error>>;

    /// Halts both stems.
    fn stop_stems(&self);

    /// Plays a note sample on a melodic voice after the given delay.
    fn trigger_note(
        &self,
        voice: Voice,
        note: Buffer,
        delay: Duration,
        velocity: f32,
    ) -> Result<(), Box<dyn Error>>;

    /// Updates the mix.
    fn set_mix(&self, mix: MixSettings) -> Result<(), Box<dyn Error>>;
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets a device with the given name.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(device)));
    };

    Ok(Arc::new(cpal::Device::get(config)?))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_buffer_duration() {
        let buffer = Buffer::silence(Duration::from_millis(500), 2, 48000);
        assert_eq!(24000, buffer.frames());
        assert_eq!(Duration::from_millis(500), buffer.duration());
    }

    #[test]
    fn test_sample_at_interpolates() {
        let buffer = Buffer::new(vec![0.0, 1.0, 0.5], 1, 44100);
        assert_eq!(0.0, buffer.sample_at(0.0, 0));
        assert_eq!(0.5, buffer.sample_at(0.5, 0));
        assert_eq!(0.75, buffer.sample_at(1.5, 0));
        // Past the end is silence.
        assert_eq!(0.0, buffer.sample_at(3.0, 0));
        assert_eq!(0.0, buffer.sample_at(-1.0, 0));
    }

    #[test]
    fn test_sample_at_reuses_last_channel() {
        let buffer = Buffer::new(vec![0.25, 0.5], 1, 44100);
        assert_eq!(0.25, buffer.sample_at(0.0, 1));
    }
}
