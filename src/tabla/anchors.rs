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

//! Static tables of the tempos and takes for which tabla recordings exist.

use super::style::Style;

/// Anchors used when a style name isn't in the table.
pub const DEFAULT_ANCHORS: &[u32] = &[80];

/// Variants used when a (style, anchor) pair has no entry.
pub const DEFAULT_VARIANTS: &[&str] = &[""];

/// Returns the anchor tempos recorded for the given style, in declared order.
pub fn anchors(style: Style) -> &'static [u32] {
    match style {
        Style::Teentaal => &[40, 80, 160, 320],
        Style::Dadra => &[75, 150, 300],
        Style::Roopak => &[50, 100, 200],
        Style::Jhaptal => &[50, 100, 200],
        Style::Ektal => &[50, 75, 100, 150, 300],
    }
}

/// Returns the anchor tempos for a style name, falling back to the default set
/// for names that aren't known.
pub fn anchors_for_name(name: &str) -> &'static [u32] {
    name.parse().map(anchors).unwrap_or(DEFAULT_ANCHORS)
}

/// Returns the variant suffixes recorded for a style at an anchor tempo. Never empty.
pub fn variants(style: Style, anchor: u32) -> &'static [&'static str] {
    match (style, anchor) {
        (Style::Teentaal, 40) => &[""],
        (Style::Teentaal, 80) => &["", " A", " B", " D", " V"],
        (Style::Teentaal, 160) => &[" A", " B", " D", " V"],
        (Style::Teentaal, 320) => &[" A", " B", " C", " D"],
        (Style::Dadra, 75 | 150 | 300) => &[""],
        (Style::Roopak | Style::Jhaptal, 50) => &[" A", " B"],
        (Style::Roopak | Style::Jhaptal, 100 | 200) => &[" A", " B", " C", " D"],
        (Style::Ektal, 50 | 100) => &[""],
        (Style::Ektal, 75 | 150) => &[" A", " B"],
        (Style::Ektal, 300) => &[" A", " B", " C", " D"],
        _ => DEFAULT_VARIANTS,
    }
}

/// Picks the anchor closest to the desired tempo. On a tie the anchor declared
/// first wins.
pub fn resolve_anchor(style: Style, desired_tempo: u32) -> u32 {
    nearest(anchors(style), desired_tempo)
}

/// Same as [`resolve_anchor`] for a raw style name.
pub fn resolve_anchor_for_name(name: &str, desired_tempo: u32) -> u32 {
    nearest(anchors_for_name(name), desired_tempo)
}

fn nearest(candidates: &[u32], desired_tempo: u32) -> u32 {
    let mut candidates = candidates.iter().copied();
    // Tables are non-empty by construction.
    let mut best = candidates.next().unwrap_or(DEFAULT_ANCHORS[0]);
    for candidate in candidates {
        if candidate.abs_diff(desired_tempo) < best.abs_diff(desired_tempo) {
            best = candidate;
        }
    }
    best
}
