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
use std::time::Duration;

/// The playback rate that stretches a recording made at `anchor` bpm to `desired` bpm.
pub fn playback_rate(desired: u32, anchor: u32) -> f64 {
    desired as f64 / anchor as f64
}

/// How long a recording of `native` length lasts when played back at `rate`.
pub fn stretched(native: Duration, rate: f64) -> Duration {
    if rate <= 0.0 || !rate.is_finite() {
        return native;
    }
    Duration::from_secs_f64(native.as_secs_f64() / rate)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tabla::{anchors::anchors, Style};

    #[test]
    fn test_rate_at_anchor_is_unity() {
        for style in Style::ALL {
            for anchor in anchors(style) {
                assert_eq!(1.0, playback_rate(*anchor, *anchor));
            }
        }
    }

    #[test]
    fn test_rate() {
        assert_eq!(1.25, playback_rate(100, 80));
        assert_eq!(0.5, playback_rate(40, 80));
        assert_eq!(2.0, playback_rate(600, 300));
    }

    #[test]
    fn test_stretched() {
        assert_eq!(Duration::from_secs(4), stretched(Duration::from_secs(8), 2.0));
        assert_eq!(Duration::from_secs(16), stretched(Duration::from_secs(8), 0.5));
        assert_eq!(Duration::from_secs(8), stretched(Duration::from_secs(8), 1.0));
    }
}
