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
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::audio::SampleLoader;
use crate::controller::{keyboard, Controller};
use crate::melody::{sequencer::Sequencer, NoteBank};
use crate::session::Session;
use crate::tabla::TablaEngine;

pub mod audio;
mod error;
mod melody;
mod player;
mod tabla;

pub use self::audio::{Audio, DEFAULT_SAMPLE_RATE, DEFAULT_THREAD_PRIORITY};
pub use self::error::ConfigError;
pub use self::melody::Melody;
pub use self::player::Player;
pub use self::tabla::Tabla;

/// Initializes the session and keyboard controller from the given config file.
/// The controller owns the session and runs until its driver closes.
pub async fn init_session_and_controller(path: &Path) -> Result<Controller, Box<dyn Error>> {
    let player = Player::deserialize(path)?;
    let device = crate::audio::get_device(player.audio())?;
    let loader = SampleLoader;

    let bank = NoteBank::load(&loader, &player.samples()).await;
    if bank.is_empty() {
        warn!(
            samples = ?player.samples(),
            "No melodic samples found, melodic loops will be silent."
        );
    }

    let tabla_config = player.tabla();
    let options = crate::tabla::Options {
        samples: player.tabla_samples(),
        lead_in: tabla_config.lead_in()?,
        error_display: tabla_config.error_display()?,
    };
    let engine = TablaEngine::new(
        loader,
        device.clone(),
        options,
        tabla_config.style(),
        tabla_config.tempo(),
    );
    let sequencer = Sequencer::new(
        bank,
        device.clone(),
        player.melody().settings(),
        player.melody().seed(),
    );

    let session = Session::new(engine, sequencer, device, player.mix())?;
    Ok(Controller::new(session, Arc::new(keyboard::Driver::new())))
}
