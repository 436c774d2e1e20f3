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
use std::{
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use super::{Buffer, MixSettings, StemPair, Voice};

/// Something the mock device was asked to do.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Start { rate: f64, duration: Duration },
    Queue { rate: f64, duration: Duration },
    Replace { rate: f64, duration: Duration },
    Stop,
    Note {
        voice: Voice,
        frames: usize,
        delay: Duration,
        velocity: f32,
    },
    Mix(MixSettings),
}

/// A mock device. Doesn't actually play anything, but remembers what it was told.
#[derive(Clone)]
pub struct Device {
    name: String,
    is_playing: Arc<AtomicBool>,
    events: Arc<Mutex<Vec<Event>>>,
    queued_at: Arc<Mutex<Vec<Instant>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            is_playing: Arc::new(AtomicBool::new(false)),
            events: Arc::new(Mutex::new(Vec::new())),
            queued_at: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns true if the stems are currently looping.
    pub fn is_playing(&self) -> bool {
        self.is_playing.load(Ordering::Relaxed)
    }

    /// Returns every event recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// When each queued pair of stems was handed over.
    pub fn queue_times(&self) -> Vec<Instant> {
        self.queued_at.lock().clone()
    }

    fn record(&self, event: Event) {
        debug!(device = self.name, event = ?event, "Mock device event");
        self.events.lock().push(event);
    }
}

impl super::Device for Device {
    fn start_stems(&self, stems: StemPair, rate: f64) -> Result<(), Box<dyn Error>> {
        info!(device = self.name, rate, "Starting stems (mock)");
        self.is_playing.store(true, Ordering::Relaxed);
        self.record(Event::Start {
            rate,
            duration: stems.duration(),
        });
        Ok(())
    }

    fn queue_stems(&self, stems: StemPair, rate: f64) -> Result<(), Box<dyn Error>> {
        self.queued_at.lock().push(Instant::now());
        self.record(Event::Queue {
            rate,
            duration: stems.duration(),
        });
        Ok(())
    }

    fn replace_stems(&self, stems: StemPair, rate: f64) -> Result<(), Box<dyn Error>> {
        self.record(Event::Replace {
            rate,
            duration: stems.duration(),
        });
        Ok(())
    }

    fn stop_stems(&self) {
        info!(device = self.name, "Stopping stems (mock)");
        self.is_playing.store(false, Ordering::Relaxed);
        self.record(Event::Stop);
    }

    fn trigger_note(
        &self,
        voice: Voice,
        note: Buffer,
        delay: Duration,
        velocity: f32,
    ) -> Result<(), Box<dyn Error>> {
        self.record(Event::Note {
            voice,
            frames: note.frames(),
            delay,
            velocity,
        });
        Ok(())
    }

    fn set_mix(&self, mix: MixSettings) -> Result<(), Box<dyn Error>> {
        self.record(Event::Mix(mix));
        Ok(())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}

#[cfg(test)]
pub use loader::Loader;
