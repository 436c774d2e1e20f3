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
use std::{error::Error, fmt, sync::Arc};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::audio::{Device, MixSettings, StemLoader, Voice};
use crate::controls::{pan_label, Control};
use crate::melody::{
    sequencer::{Sequencer, Settings},
    Offset, PitchClass,
};
use crate::tabla::{self, Load, Snapshot, Style, TablaEngine};

/// A practice session: the tabla loop, the melodic loops and the mix they
/// share on one output device.
pub struct Session<L: StemLoader> {
    tabla: TablaEngine<L>,
    melody: Sequencer,
    device: Arc<dyn Device>,
    mix: Mutex<MixSettings>,
}

/// Everything the control surface shows.
#[derive(Clone, Debug)]
pub struct Status {
    pub tabla: tabla::Status,
    pub snapshot: Snapshot,
    pub voices: [bool; 2],
    pub melody: Settings,
    pub mix: MixSettings,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = &self.snapshot;
        write!(
            f,
            "tabla: {:?} {} {} BPM",
            self.tabla, snapshot.style, snapshot.tempo
        )?;
        if let (Some(anchor), Some(variant), Some(rate)) =
            (snapshot.anchor, snapshot.variant, snapshot.rate)
        {
            write!(f, " ({}BPM{} at {:.3}x)", anchor, variant, rate)?;
        }

        let on_off = |running: bool| if running { "on" } else { "off" };
        write!(
            f,
            " | t1: {} | t2: {} | key {}, {}",
            on_off(self.voices[0]),
            on_off(self.voices[1]),
            self.melody.key,
            Control::MelodyTempo(self.melody.tempo).label(),
        )?;
        write!(
            f,
            " | volume {}, tune {}, pan {}/{}, bayan {}",
            Control::Volume(self.mix.master_db).label(),
            Control::Tune(self.mix.tune_cents).label(),
            pan_label(self.mix.pans[0]),
            pan_label(self.mix.pans[1]),
            Control::BayanVolume(self.mix.bayan_db).label(),
        )
    }
}

impl<L: StemLoader> Session<L> {
    /// Creates a session and sends the starting mix to the device.
    pub fn new(
        tabla: TablaEngine<L>,
        melody: Sequencer,
        device: Arc<dyn Device>,
        mix: MixSettings,
    ) -> Result<Session<L>, Box<dyn Error>> {
        device.set_mix(mix)?;
        info!(device = %device, "Session ready.");
        Ok(Session {
            tabla,
            melody,
            device,
            mix: Mutex::new(mix),
        })
    }

    pub fn tabla(&self) -> &TablaEngine<L> {
        &self.tabla
    }

    pub fn melody(&self) -> &Sequencer {
        &self.melody
    }

    pub fn mix(&self) -> MixSettings {
        *self.mix.lock()
    }

    pub fn status(&self) -> Status {
        Status {
            tabla: self.tabla.status(),
            snapshot: self.tabla.snapshot(),
            voices: [
                self.melody.is_running(Voice::One),
                self.melody.is_running(Voice::Two),
            ],
            melody: self.melody.settings(),
            mix: self.mix(),
        }
    }

    /// Starts or stops the tabla. Stems load in the background; await the
    /// returned [`Load`] to wait for them.
    pub fn toggle_tabla(&self) -> Load {
        self.tabla.toggle()
    }

    /// Returns whether the voice is now running.
    pub fn toggle_voice(&self, voice: Voice) -> bool {
        self.melody.toggle(voice)
    }

    /// Stops the tabla and both melodic loops.
    pub fn stop(&self) {
        self.tabla.stop();
        self.melody.stop_all();
    }

    pub fn set_style(&self, style: Style) {
        self.tabla.set_style(style);
    }

    pub fn set_key(&self, key: PitchClass) {
        self.melody.set_key(key);
    }

    pub fn set_offsets(&self, voice: Voice, offsets: [Offset; 2]) {
        self.melody.set_offsets(voice, offsets);
    }

    /// Applies a control change and returns the label to display for it. A
    /// tabla tempo change resynchronizes in the background and logs its own
    /// failures.
    pub fn apply(&self, control: Control) -> Result<String, Box<dyn Error>> {
        let control = match control {
            Control::Pan(voice, pan) => Control::Pan(voice, pan.clamp(-1.0, 1.0)),
            Control::MelodyTempo(bpm) => Control::MelodyTempo(bpm.max(1)),
            Control::TablaTempo(bpm) => Control::TablaTempo(bpm.max(1)),
            control => control,
        };

        match control {
            Control::Tune(cents) => self.update_mix(|mix| mix.tune_cents = cents)?,
            Control::MelodyTempo(bpm) => self.melody.set_tempo(bpm),
            Control::Volume(db) => self.update_mix(|mix| mix.master_db = db)?,
            Control::Pan(voice, pan) => self.update_mix(|mix| mix.pans[voice.index()] = pan)?,
            Control::TablaTempo(bpm) => drop(self.tabla.set_tempo(bpm)),
            Control::BayanVolume(db) => self.update_mix(|mix| mix.bayan_db = db)?,
        }

        debug!(control = %control, "Control changed");
        Ok(control.label())
    }

    fn update_mix(&self, update: impl FnOnce(&mut MixSettings)) -> Result<(), Box<dyn Error>> {
        let mix = {
            let mut mix = self.mix.lock();
            update(&mut mix);
            *mix
        };
        self.device.set_mix(mix)
    }
}
