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

use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;
use crate::tabla::{self, Style};

const DEFAULT_SAMPLES: &str = "samples";
const DEFAULT_TEMPO: u32 = 80;

/// Parses a human duration such as `50ms`, falling back to the default when unset.
pub(super) fn parse_duration(
    field: &'static str,
    value: &Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => DurationString::from_string(value.clone())
            .map(Duration::from)
            .map_err(|_| ConfigError::Duration {
                field,
                value: value.clone(),
            }),
        None => Ok(default),
    }
}

/// The tabla configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Tabla {
    /// Root of the tabla sample bank, holding one directory per style.
    samples: Option<String>,

    /// The style selected at startup (default: TEENTAAL).
    style: Option<Style>,

    /// The tabla tempo at startup (default: 80).
    tempo: Option<u32>,

    /// How long before the loop ends the next take is loaded (default: 50ms).
    lead_in: Option<String>,

    /// How long a failed start shows its error (default: 2s).
    error_display: Option<String>,

    /// Bayan volume in dB (default: 0).
    bayan_volume: Option<f32>,
}

impl Tabla {
    /// The sample directory as written in the file. Relative paths are
    /// resolved by the player config.
    pub(super) fn samples(&self) -> &str {
        self.samples.as_deref().unwrap_or(DEFAULT_SAMPLES)
    }

    pub fn style(&self) -> Style {
        self.style.unwrap_or_default()
    }

    pub fn tempo(&self) -> u32 {
        self.tempo.unwrap_or(DEFAULT_TEMPO).max(1)
    }

    pub fn lead_in(&self) -> Result<Duration, ConfigError> {
        parse_duration("lead_in", &self.lead_in, tabla::DEFAULT_LEAD_IN)
    }

    pub fn error_display(&self) -> Result<Duration, ConfigError> {
        parse_duration(
            "error_display",
            &self.error_display,
            tabla::DEFAULT_ERROR_DISPLAY,
        )
    }

    pub fn bayan_volume(&self) -> f32 {
        self.bayan_volume.unwrap_or(0.0)
    }
}
