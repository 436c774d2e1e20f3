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
use std::{fmt, str::FromStr};

use serde::Deserialize;

/// A taal: the rhythmic cycle that picks the tabla sample bank and its tempo anchors.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(try_from = "String")]
pub enum Style {
    #[default]
    Teentaal,
    Dadra,
    Roopak,
    Jhaptal,
    Ektal,
}

impl Style {
    /// All styles in the order they are offered to the user.
    pub const ALL: [Style; 5] = [
        Style::Teentaal,
        Style::Dadra,
        Style::Roopak,
        Style::Jhaptal,
        Style::Ektal,
    ];

    /// The uppercase name used in sample directories and file names.
    pub fn name(&self) -> &'static str {
        match self {
            Style::Teentaal => "TEENTAAL",
            Style::Dadra => "DADRA",
            Style::Roopak => "ROOPAK",
            Style::Jhaptal => "JHAPTAL",
            Style::Ektal => "EKTAL",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown taal: {0}")]
pub struct ParseStyleError(String);

impl FromStr for Style {
    type Err = ParseStyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Style::ALL
            .into_iter()
            .find(|style| style.name() == upper)
            .ok_or(ParseStyleError(s.to_string()))
    }
}

impl TryFrom<String> for Style {
    type Error = ParseStyleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_style() {
        assert_eq!(Ok(Style::Teentaal), "teentaal".parse());
        assert_eq!(Ok(Style::Dadra), " Dadra ".parse());
        assert_eq!(Ok(Style::Ektal), "EKTAL".parse());
        assert!("keherwa".parse::<Style>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for style in Style::ALL {
            assert_eq!(Ok(style), style.to_string().parse());
        }
    }
}
