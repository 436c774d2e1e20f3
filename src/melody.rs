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
use std::{collections::HashMap, fmt, path::Path, str::FromStr};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::audio::{Buffer, StemLoader};

pub mod sequencer;

/// Steps in one phrase.
pub const PATTERN_LENGTH: usize = 6;

/// The sampled octaves.
pub const OCTAVES: [u8; 2] = [1, 2];

/// One of the twelve pitch classes. Also used as the key of the melodic loops.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(try_from = "String")]
pub enum PitchClass {
    #[default]
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitones above C.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The pitch class the given number of semitones above C, wrapping at the octave.
    pub fn from_index(index: usize) -> PitchClass {
        PitchClass::ALL[index % PitchClass::ALL.len()]
    }

    pub fn name(&self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    /// The spelling used in sample file names, where `#` becomes `s`.
    fn file_stem(&self) -> String {
        self.name().replace('#', "s")
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown note: {0}")]
pub struct ParsePitchError(String);

impl FromStr for PitchClass {
    type Err = ParsePitchError;

    /// Accepts `C#` as well as the file name spelling `Cs`, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        PitchClass::ALL
            .into_iter()
            .find(|pitch| {
                pitch.name().eq_ignore_ascii_case(s) || pitch.file_stem().eq_ignore_ascii_case(s)
            })
            .ok_or_else(|| ParsePitchError(s.to_string()))
    }
}

impl TryFrom<String> for PitchClass {
    type Error = ParsePitchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A sampled note.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Note {
    pub pitch: PitchClass,
    pub octave: u8,
}

impl Note {
    pub fn new(pitch: PitchClass, octave: u8) -> Note {
        Note { pitch, octave }
    }

    /// Every note in the sample bank, lowest first.
    pub fn all() -> impl Iterator<Item = Note> {
        OCTAVES.into_iter().flat_map(|octave| {
            PitchClass::ALL
                .into_iter()
                .map(move |pitch| Note::new(pitch, octave))
        })
    }

    /// The sample file for this note, e.g. `Cs1.wav` for C#1.
    pub fn file_name(&self) -> String {
        format!("{}{}.wav", self.pitch.file_stem(), self.octave)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch, self.octave)
    }
}

/// A semitone offset above the key, or a rest.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(try_from = "String")]
pub struct Offset(Option<u8>);

impl Offset {
    pub const REST: Offset = Offset(None);

    pub fn semitones(semitones: u8) -> Offset {
        Offset(Some(semitones))
    }

    /// The note this offset lands on above the given key. Offsets that reach
    /// past B land in the upper octave.
    pub fn note(&self, key: PitchClass) -> Option<Note> {
        let index = key.index() + usize::from(self.0?);
        let octave = if index >= PitchClass::ALL.len() { 2 } else { 1 };
        Some(Note::new(PitchClass::from_index(index), octave))
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(semitones) => write!(f, "{}", semitones),
            None => f.write_str("none"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid offset: {0} (expected semitones or none)")]
pub struct ParseOffsetError(String);

impl FromStr for Offset {
    type Err = ParseOffsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("none") {
            return Ok(Offset::REST);
        }
        s.parse::<u8>()
            .map(Offset::semitones)
            .map_err(|_| ParseOffsetError(s.to_string()))
    }
}

impl TryFrom<String> for Offset {
    type Error = ParseOffsetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The phrase for one voice: the two offset notes, the upper tonic twice, the
/// lower tonic, then a rest.
pub fn pattern(key: PitchClass, offsets: [Offset; 2]) -> [Option<Note>; PATTERN_LENGTH] {
    [
        offsets[0].note(key),
        offsets[1].note(key),
        Some(Note::new(key, 2)),
        Some(Note::new(key, 2)),
        Some(Note::new(key, 1)),
        None,
    ]
}

/// Decoded samples for every note the melodic voices can play.
#[derive(Default)]
pub struct NoteBank {
    notes: HashMap<Note, Buffer>,
}

impl NoteBank {
    /// Loads every note sample found in the directory. Missing or unreadable
    /// samples are logged and left out; triggering them later is a no-op.
    pub async fn load<L: StemLoader>(loader: &L, dir: &Path) -> NoteBank {
        let mut notes = HashMap::new();
        for note in Note::all() {
            let path = dir.join(note.file_name());
            match loader.load(path.clone()).await {
                Ok(buffer) => {
                    debug!(note = %note, frames = buffer.frames(), "Loaded note sample");
                    notes.insert(note, buffer);
                }
                Err(e) => warn!(note = %note, path = ?path, err = %e, "Unable to load note sample"),
            }
        }
        info!(
            loaded = notes.len(),
            dir = ?dir,
            "Loaded melodic samples."
        );
        NoteBank { notes }
    }

    pub fn from_buffers(notes: impl IntoIterator<Item = (Note, Buffer)>) -> NoteBank {
        NoteBank {
            notes: notes.into_iter().collect(),
        }
    }

    pub fn get(&self, note: &Note) -> Option<&Buffer> {
        self.notes.get(note)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
