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
use super::anchors::variants;
use super::style::Style;

/// Round-robin position into the variant list of the active (style, anchor) pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VariantCursor {
    index: usize,
}

impl VariantCursor {
    pub fn new() -> VariantCursor {
        VariantCursor::default()
    }

    /// The current index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Moves the cursor and returns the suffix it now points at. A fresh start
    /// always lands on the first variant; any other call advances by one,
    /// wrapping around the list for this anchor.
    pub fn next_variant(&mut self, style: Style, anchor: u32, fresh: bool) -> &'static str {
        let available = variants(style, anchor);
        self.index = if fresh {
            0
        } else {
            (self.index + 1) % available.len()
        };
        available[self.index]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tabla::anchors::anchors;

    #[test]
    fn test_fresh_start_resets() {
        let mut cursor = VariantCursor::new();
        cursor.next_variant(Style::Teentaal, 160, false);
        cursor.next_variant(Style::Teentaal, 160, false);
        assert_eq!(2, cursor.index());

        assert_eq!("", cursor.next_variant(Style::Teentaal, 80, true));
        assert_eq!(0, cursor.index());
    }

    #[test]
    fn test_rotation_sequence() {
        let mut cursor = VariantCursor::new();
        assert_eq!("", cursor.next_variant(Style::Teentaal, 80, true));
        assert_eq!(" A", cursor.next_variant(Style::Teentaal, 80, false));
        assert_eq!(" B", cursor.next_variant(Style::Teentaal, 80, false));
        assert_eq!(" D", cursor.next_variant(Style::Teentaal, 80, false));
        assert_eq!(" V", cursor.next_variant(Style::Teentaal, 80, false));
        assert_eq!("", cursor.next_variant(Style::Teentaal, 80, false));
    }

    #[test]
    fn test_rotation_wraps_for_every_anchor() {
        for style in Style::ALL {
            for anchor in anchors(style) {
                let len = variants(style, *anchor).len();
                let mut cursor = VariantCursor::new();
                cursor.next_variant(style, *anchor, true);
                for step in 1..=(len * 2) {
                    cursor.next_variant(style, *anchor, false);
                    assert_eq!(step % len, cursor.index());
                }
            }
        }
    }

    #[test]
    fn test_single_variant_stays_put() {
        let mut cursor = VariantCursor::new();
        assert_eq!("", cursor.next_variant(Style::Dadra, 75, true));
        for _ in 0..5 {
            assert_eq!("", cursor.next_variant(Style::Dadra, 75, false));
            assert_eq!(0, cursor.index());
        }
    }

    #[test]
    fn test_shrinking_list_stays_in_bounds() {
        // Moving from a four-take anchor to a one-take anchor mid-run.
        let mut cursor = VariantCursor::new();
        cursor.next_variant(Style::Teentaal, 320, true);
        cursor.next_variant(Style::Teentaal, 320, false);
        cursor.next_variant(Style::Teentaal, 320, false);
        assert_eq!("", cursor.next_variant(Style::Teentaal, 40, false));
        assert_eq!(0, cursor.index());
    }
}
