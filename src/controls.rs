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
use std::fmt;

use crate::audio::Voice;

/// A continuous setting changed from the control surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Control {
    /// Pitch of the melodic voices, in cents.
    Tune(f32),
    /// Melody tempo in BPM.
    MelodyTempo(u32),
    /// Master volume in dB.
    Volume(f32),
    /// Stereo position of a melodic voice, -1 (left) to 1 (right).
    Pan(Voice, f32),
    /// Tabla tempo in BPM.
    TablaTempo(u32),
    /// Bayan (bass stem) volume in dB.
    BayanVolume(f32),
}

impl Control {
    /// The value as the control surface displays it.
    pub fn label(&self) -> String {
        match self {
            Control::Tune(cents) => format!("{:+} cents", cents),
            Control::MelodyTempo(bpm) | Control::TablaTempo(bpm) => format!("{} BPM", bpm),
            Control::Volume(db) | Control::BayanVolume(db) => format!("{} dB", db),
            Control::Pan(_, pan) => pan_label(*pan),
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Control::Tune(_) => "tune",
            Control::MelodyTempo(_) => "tempo",
            Control::Volume(_) => "volume",
            Control::Pan(Voice::One, _) => "pan1",
            Control::Pan(Voice::Two, _) => "pan2",
            Control::TablaTempo(_) => "tabla tempo",
            Control::BayanVolume(_) => "bayan",
        };
        write!(f, "{}: {}", name, self.label())
    }
}

/// `C` for centre, otherwise `L` or `R` and the distance from centre out of 50.
pub fn pan_label(pan: f32) -> String {
    // Halves round towards the right.
    let steps = (pan * 50.0 + 0.5).floor() as i32;
    match steps {
        0 => "C".to_string(),
        steps if steps < 0 => format!("L{}", -steps),
        steps => format!("R{}", steps),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pan_labels() {
        assert_eq!("C", pan_label(0.0));
        assert_eq!("L30", pan_label(-0.6));
        assert_eq!("R30", pan_label(0.6));
        assert_eq!("L50", pan_label(-1.0));
        assert_eq!("C", pan_label(-0.01));
        assert_eq!("R1", pan_label(0.02));
    }

    #[test]
    fn test_labels() {
        assert_eq!("+25 cents", Control::Tune(25.0).label());
        assert_eq!("-10 cents", Control::Tune(-10.0).label());
        assert_eq!("+0 cents", Control::Tune(0.0).label());
        assert_eq!("78 BPM", Control::MelodyTempo(78).label());
        assert_eq!("120 BPM", Control::TablaTempo(120).label());
        assert_eq!("-12 dB", Control::Volume(-12.0).label());
        assert_eq!("-3.5 dB", Control::BayanVolume(-3.5).label());
        assert_eq!("R15", Control::Pan(Voice::Two, 0.3).label());
        assert_eq!("pan1: L30", Control::Pan(Voice::One, -0.6).to_string());
    }
}
