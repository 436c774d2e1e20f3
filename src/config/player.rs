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

use config::{Config, Environment, File};
use serde::Deserialize;

use super::audio::Audio;
use super::error::ConfigError;
use super::melody::Melody;
use super::tabla::Tabla;
use crate::audio::MixSettings;

const DEFAULT_SAMPLES: &str = "samples";

/// Prefix for environment overrides, e.g. `RIYAZ_TABLA__TEMPO=100`.
const ENV_PREFIX: &str = "RIYAZ";

/// The configuration for the practice player.
#[derive(Deserialize, Clone, Debug)]
pub struct Player {
    /// The audio output.
    audio: Audio,

    /// The melodic sample directory.
    samples: Option<String>,

    /// The tabla loop.
    #[serde(default)]
    tabla: Tabla,

    /// The melodic loops.
    #[serde(default)]
    melody: Melody,

    /// The directory relative paths are resolved against.
    #[serde(skip)]
    base: PathBuf,
}

/// Environment overrides. Nested fields are separated by `__`.
pub(super) fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl Player {
    /// Parses the player config from a YAML file, applying environment overrides.
    pub fn deserialize(path: &Path) -> Result<Player, ConfigError> {
        Player::deserialize_with(path, environment())
    }

    pub(super) fn deserialize_with(path: &Path, env: Environment) -> Result<Player, ConfigError> {
        let mut player = Config::builder()
            .add_source(File::from(path))
            .add_source(env)
            .build()?
            .try_deserialize::<Player>()?;
        player.base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(player)
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn tabla(&self) -> &Tabla {
        &self.tabla
    }

    pub fn melody(&self) -> &Melody {
        &self.melody
    }

    /// The melodic sample directory.
    pub fn samples(&self) -> PathBuf {
        self.resolve(self.samples.as_deref().unwrap_or(DEFAULT_SAMPLES))
    }

    /// The tabla sample root.
    pub fn tabla_samples(&self) -> PathBuf {
        self.resolve(self.tabla.samples())
    }

    /// The starting mix.
    pub fn mix(&self) -> MixSettings {
        self.melody.mix(self.tabla.bayan_volume())
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            path
        } else {
            self.base.join(path)
        }
    }
}

#[cfg(test)]
mod test {
    use std::{collections::HashMap, error::Error, fs, path::Path, time::Duration};

    use super::*;
    use crate::melody::{Offset, PitchClass};
    use crate::tabla::Style;

    fn write(dir: &Path, yaml: &str) -> Result<PathBuf, Box<dyn Error>> {
        let path = dir.join("riyaz.yaml");
        fs::write(&path, yaml)?;
        Ok(path)
    }

    fn no_env() -> Environment {
        environment().source(Some(HashMap::new()))
    }

    #[test]
    fn test_defaults() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = write(
            dir.path(),
            r#"
            audio:
              device: mock-device
            "#,
        )?;

        let player = Player::deserialize_with(&path, no_env())?;
        assert_eq!("mock-device", player.audio().device());
        assert_eq!(44100, player.audio().sample_rate());
        assert_eq!(70, player.audio().thread_priority());
        assert!(player.audio().realtime());
        assert_eq!(dir.path().join("samples"), player.samples());
        assert_eq!(dir.path().join("samples"), player.tabla_samples());
        assert_eq!(Style::Teentaal, player.tabla().style());
        assert_eq!(80, player.tabla().tempo());
        assert_eq!(Duration::from_millis(50), player.tabla().lead_in()?);
        assert_eq!(Duration::from_secs(2), player.tabla().error_display()?);
        assert_eq!(MixSettings::default(), player.mix());

        let settings = player.melody().settings();
        assert_eq!(PitchClass::C, settings.key);
        assert_eq!(78, settings.tempo);
        assert_eq!(None, player.melody().seed());
        Ok(())
    }

    #[test]
    fn test_full() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = write(
            dir.path(),
            r#"
            audio:
              device: mock-device
              sample_rate: 48000
              thread_priority: 150
              realtime: false
            samples: notes
            tabla:
              samples: /opt/tabla
              style: dadra
              tempo: 150
              lead_in: 80ms
              error_display: 5s
              bayan_volume: -6
            melody:
              key: "F#"
              tempo: 90
              volume: -3
              tune: 15
              seed: 9
              voices:
                - tune1: 7
                  tune2: 12
                  pan: -1
                - tune1: none
                  pan: 0.25
            "#,
        )?;

        let player = Player::deserialize_with(&path, no_env())?;
        assert_eq!(48000, player.audio().sample_rate());
        assert_eq!(99, player.audio().thread_priority());
        assert!(!player.audio().realtime());
        assert_eq!(dir.path().join("notes"), player.samples());
        assert_eq!(PathBuf::from("/opt/tabla"), player.tabla_samples());
        assert_eq!(Style::Dadra, player.tabla().style());
        assert_eq!(150, player.tabla().tempo());
        assert_eq!(Duration::from_millis(80), player.tabla().lead_in()?);
        assert_eq!(Duration::from_secs(5), player.tabla().error_display()?);

        let settings = player.melody().settings();
        assert_eq!(PitchClass::FSharp, settings.key);
        assert_eq!(90, settings.tempo);
        assert_eq!(
            [
                [Offset::semitones(7), Offset::semitones(12)],
                [Offset::REST, Offset::REST],
            ],
            settings.offsets
        );
        assert_eq!(Some(9), player.melody().seed());
        assert_eq!(
            MixSettings {
                master_db: -3.0,
                pans: [-1.0, 0.25],
                tune_cents: 15.0,
                bayan_db: -6.0,
            },
            player.mix()
        );
        Ok(())
    }

    #[test]
    fn test_environment_overrides() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = write(
            dir.path(),
            r#"
            audio:
              device: mock-device
            tabla:
              tempo: 100
            "#,
        )?;

        let env = HashMap::from([
            ("RIYAZ_TABLA__TEMPO".to_string(), "120".to_string()),
            ("RIYAZ_AUDIO__DEVICE".to_string(), "mock-other".to_string()),
        ]);
        let player = Player::deserialize_with(&path, environment().source(Some(env)))?;
        assert_eq!(120, player.tabla().tempo());
        assert_eq!("mock-other", player.audio().device());
        Ok(())
    }

    #[test]
    fn test_bad_values() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = write(
            dir.path(),
            r#"
            audio:
              device: mock-device
            tabla:
              style: waltz
            "#,
        )?;
        assert!(Player::deserialize_with(&path, no_env()).is_err());

        let path = write(
            dir.path(),
            r#"
            audio:
              device: mock-device
            tabla:
              lead_in: soon
            "#,
        )?;
        let player = Player::deserialize_with(&path, no_env())?;
        assert!(matches!(
            player.tabla().lead_in(),
            Err(ConfigError::Duration {
                field: "lead_in",
                ..
            })
        ));

        assert!(Player::deserialize_with(&dir.path().join("missing.yaml"), no_env()).is_err());
        Ok(())
    }
}
