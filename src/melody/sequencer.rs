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

//! The two melodic phrase loops. Each voice ticks once per beat of the melody
//! tempo and triggers the next note of its phrase, with a little random timing
//! jitter so the two voices never lock together mechanically.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::{
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::{debug, info, span, warn, Instrument, Level, Span};

use super::{pattern, Note, NoteBank, Offset, PitchClass, PATTERN_LENGTH};
use crate::audio::{Device, Voice};

/// Note velocity for every trigger.
pub const VELOCITY: f32 = 0.7;

/// Maximum timing jitter either side of the beat.
pub const JITTER: Duration = Duration::from_millis(25);

pub const DEFAULT_TEMPO: u32 = 78;

/// Walks a phrase one step per tick.
#[derive(Debug, Default)]
pub struct Phrase {
    step: usize,
}

impl Phrase {
    pub fn new() -> Phrase {
        Phrase::default()
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Returns the note for the current step, if it isn't a rest, and moves on.
    pub fn next(&mut self, pattern: &[Option<Note>; PATTERN_LENGTH]) -> Option<Note> {
        let note = pattern[self.step % PATTERN_LENGTH];
        self.step += 1;
        note
    }
}

/// Trigger timing. Triggers are scheduled one jitter width ahead of the tick so
/// the early side of the jitter is still in the future.
pub struct Jitter {
    rng: StdRng,
}

impl Jitter {
    /// A fixed seed makes the jitter sequence reproducible.
    pub fn new(seed: Option<u64>) -> Jitter {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Jitter { rng }
    }

    /// Delay from the tick to the trigger, in `[0, 2 * JITTER)`.
    pub fn delay(&mut self) -> Duration {
        let jitter = JITTER.as_secs_f64();
        let offset = self.rng.gen_range(-jitter..jitter);
        Duration::from_secs_f64(jitter + offset)
    }
}

/// The live melodic settings. Read on every tick, so changes are heard on the
/// next beat.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub key: PitchClass,
    pub tempo: u32,
    pub offsets: [[Offset; 2]; 2],
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            key: PitchClass::C,
            tempo: DEFAULT_TEMPO,
            offsets: [
                [Offset::semitones(7), Offset::REST],
                [Offset::semitones(5), Offset::REST],
            ],
        }
    }
}

impl Settings {
    /// Length of one quarter note.
    pub fn beat(&self) -> Duration {
        Duration::from_secs_f64(60.0 / f64::from(self.tempo.max(1)))
    }
}

struct Inner {
    bank: NoteBank,
    device: Arc<dyn Device>,
    settings: Mutex<Settings>,
    jitter: Mutex<Jitter>,
    loops: Mutex<[Option<JoinHandle<()>>; 2]>,
    span: Span,
}

impl Inner {
    /// Plays one step for the voice and returns how long until the next.
    fn tick(&self, voice: Voice, phrase: &mut Phrase) -> Duration {
        let (note, beat) = {
            let settings = self.settings.lock();
            let pattern = pattern(settings.key, settings.offsets[voice.index()]);
            (phrase.next(&pattern), settings.beat())
        };
        if let Some(note) = note {
            self.trigger(voice, note);
        }
        beat
    }

    fn trigger(&self, voice: Voice, note: Note) {
        let Some(buffer) = self.bank.get(&note) else {
            warn!(%voice, %note, "No sample for note.");
            return;
        };
        let delay = self.jitter.lock().delay();
        debug!(%voice, %note, delay_ms = delay.as_millis(), "Triggering note");
        if let Err(e) = self
            .device
            .trigger_note(voice, buffer.clone(), delay, VELOCITY)
        {
            warn!(%voice, %note, err = %e, "Unable to trigger note.");
        }
    }
}

/// Runs the melodic loops. Cloning gives another handle to the same loops.
#[derive(Clone)]
pub struct Sequencer {
    inner: Arc<Inner>,
}

impl Sequencer {
    pub fn new(
        bank: NoteBank,
        device: Arc<dyn Device>,
        settings: Settings,
        seed: Option<u64>,
    ) -> Sequencer {
        Sequencer {
            inner: Arc::new(Inner {
                bank,
                device,
                settings: Mutex::new(settings),
                jitter: Mutex::new(Jitter::new(seed)),
                loops: Mutex::new([None, None]),
                span: span!(Level::INFO, "melody"),
            }),
        }
    }

    pub fn settings(&self) -> Settings {
        self.inner.settings.lock().clone()
    }

    pub fn set_key(&self, key: PitchClass) {
        self.inner.settings.lock().key = key;
    }

    pub fn set_tempo(&self, tempo: u32) {
        self.inner.settings.lock().tempo = tempo.max(1);
    }

    pub fn set_offsets(&self, voice: Voice, offsets: [Offset; 2]) {
        self.inner.settings.lock().offsets[voice.index()] = offsets;
    }

    pub fn is_running(&self, voice: Voice) -> bool {
        self.inner.loops.lock()[voice.index()].is_some()
    }

    /// Starts the voice's loop from the first step. Does nothing if it's running.
    pub fn start(&self, voice: Voice) {
        let _enter = self.inner.span.enter();
        let mut loops = self.inner.loops.lock();
        let slot = &mut loops[voice.index()];
        if slot.is_some() {
            debug!(%voice, "Melodic loop already running");
            return;
        }

        info!(%voice, "Starting melodic loop.");
        let inner = self.inner.clone();
        *slot = Some(tokio::spawn(
            async move {
                let mut phrase = Phrase::new();
                let mut next = Instant::now();
                loop {
                    next += inner.tick(voice, &mut phrase);
                    sleep_until(next).await;
                }
            }
            .instrument(self.inner.span.clone()),
        ));
    }

    pub fn stop(&self, voice: Voice) {
        let _enter = self.inner.span.enter();
        if let Some(handle) = self.inner.loops.lock()[voice.index()].take() {
            info!(%voice, "Stopping melodic loop.");
            handle.abort();
        }
    }

    /// Starts a stopped loop or stops a running one. Returns whether it's now running.
    pub fn toggle(&self, voice: Voice) -> bool {
        if self.is_running(voice) {
            self.stop(voice);
            false
        } else {
            self.start(voice);
            true
        }
    }

    pub fn stop_all(&self) {
        self.stop(Voice::One);
        self.stop(Voice::Two);
    }
}
