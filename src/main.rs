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
use std::path::PathBuf;

use clap::{crate_version, Parser, Subcommand};
use riyaz::{audio, config, tabla};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A tabla and melodic drone loop player for practice."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Starts the practice player, controlled from the keyboard.
    Start {
        /// The path to the player config.
        config_path: String,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Lists the recorded tempo anchors and takes of every taal.
    Anchors {},
    /// Shows which recording and playback rate a taal and tempo resolve to.
    Resolve {
        /// The taal, e.g. teentaal. Unknown names use the default anchors.
        style: String,
        /// The desired tempo in BPM.
        bpm: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config_path } => {
            let mut controller =
                config::init_session_and_controller(&PathBuf::from(config_path)).await?;
            controller.join().await?;
        }
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Anchors {} => {
            for style in tabla::Style::ALL {
                println!("{}:", style);
                for anchor in tabla::anchors::anchors(style) {
                    let takes: Vec<String> = tabla::anchors::variants(style, *anchor)
                        .iter()
                        .map(|variant| match variant.trim() {
                            "" => "base".to_string(),
                            take => take.to_string(),
                        })
                        .collect();
                    println!("- {} BPM: {}", anchor, takes.join(", "));
                }
            }
        }
        Commands::Resolve { style, bpm } => {
            let anchor = tabla::resolve_anchor_for_name(&style, bpm);
            println!(
                "{} at {} BPM plays the {} BPM takes at {:.4}x",
                style,
                bpm,
                anchor,
                tabla::playback_rate(bpm, anchor)
            );
            match style.parse::<tabla::Style>() {
                Ok(style) => {
                    let first = tabla::anchors::variants(style, anchor)
                        .first()
                        .copied()
                        .unwrap_or_default();
                    let paths =
                        tabla::StemPaths::new(&PathBuf::from("samples"), style, anchor, first);
                    println!("- {}", paths.lead.display());
                    println!("- {}", paths.bass.display());
                }
                Err(e) => println!("- no recordings: {}", e),
            }
        }
    }

    Ok(())
}
