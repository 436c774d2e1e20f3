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
use std::path::{Path, PathBuf};

use super::style::Style;

/// The on-disk locations of the two tabla stems for one take.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StemPaths {
    /// The dayan (chati) recording.
    pub lead: PathBuf,
    /// The bayan (baya) recording.
    pub bass: PathBuf,
}

impl StemPaths {
    /// Builds `<root>/<STYLE>/TABLA CHATI <STYLE> <ANCHOR>BPM<SUFFIX>.wav` and the
    /// matching BAYA path.
    pub fn new(root: &Path, style: Style, anchor: u32, suffix: &str) -> StemPaths {
        let dir = root.join(style.name());
        StemPaths {
            lead: dir.join(format!("TABLA CHATI {} {}BPM{}.wav", style, anchor, suffix)),
            bass: dir.join(format!("TABLA BAYA {} {}BPM{}.wav", style, anchor, suffix)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_paths_with_suffix() {
        let paths = StemPaths::new(Path::new("samples"), Style::Teentaal, 160, " B");
        assert_eq!(
            PathBuf::from("samples/TEENTAAL/TABLA CHATI TEENTAAL 160BPM B.wav"),
            paths.lead
        );
        assert_eq!(
            PathBuf::from("samples/TEENTAAL/TABLA BAYA TEENTAAL 160BPM B.wav"),
            paths.bass
        );
    }

    #[test]
    fn test_paths_without_suffix() {
        let paths = StemPaths::new(Path::new("/srv/tabla"), Style::Dadra, 75, "");
        assert_eq!(
            PathBuf::from("/srv/tabla/DADRA/TABLA CHATI DADRA 75BPM.wav"),
            paths.lead
        );
        assert_eq!(
            PathBuf::from("/srv/tabla/DADRA/TABLA BAYA DADRA 75BPM.wav"),
            paths.bass
        );
    }
}
