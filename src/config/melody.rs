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

use crate::audio::MixSettings;
use crate::melody::{
    sequencer::{Settings, DEFAULT_TEMPO},
    Offset, PitchClass,
};

const DEFAULT_VOLUME: f32 = -12.0;
const DEFAULT_PANS: [f32; 2] = [-0.6, 0.6];

/// One melodic voice.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Voice {
    /// Semitones above the key for the first step, or `none`.
    tune1: Option<Offset>,

    /// Semitones above the key for the second step, or `none`.
    tune2: Option<Offset>,

    /// Stereo position, -1 to 1.
    pan: Option<f32>,
}

/// The melodic loop configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Melody {
    /// The key of both voices (default: C).
    key: Option<PitchClass>,

    /// Melody tempo in BPM (default: 78).
    tempo: Option<u32>,

    /// Master volume in dB (default: -12).
    volume: Option<f32>,

    /// Melodic voice tuning in cents (default: 0).
    tune: Option<f32>,

    /// Seed for the timing jitter. Random when unset.
    seed: Option<u64>,

    /// Up to two voices.
    #[serde(default)]
    voices: Vec<Voice>,
}

impl Melody {
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// The sequencer settings, with unset values taken from the defaults.
    pub fn settings(&self) -> Settings {
        let defaults = Settings::default();
        let mut offsets = defaults.offsets;
        for (pair, voice) in offsets.iter_mut().zip(&self.voices) {
            pair[0] = voice.tune1.unwrap_or(pair[0]);
            pair[1] = voice.tune2.unwrap_or(pair[1]);
        }
        Settings {
            key: self.key.unwrap_or(defaults.key),
            tempo: self.tempo.unwrap_or(DEFAULT_TEMPO).max(1),
            offsets,
        }
    }

    /// The mix for the melodic voices and master bus. The bayan level comes
    /// from the tabla configuration.
    pub fn mix(&self, bayan_db: f32) -> MixSettings {
        let mut pans = DEFAULT_PANS;
        for (pan, voice) in pans.iter_mut().zip(&self.voices) {
            *pan = voice.pan.unwrap_or(*pan).clamp(-1.0, 1.0);
        }
        MixSettings {
            master_db: self.volume.unwrap_or(DEFAULT_VOLUME),
            pans,
            tune_cents: self.tune.unwrap_or(0.0),
            bayan_db,
        }
    }
}
