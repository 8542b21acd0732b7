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

use clap::{crate_version, Parser, Subcommand};

use airjay::audio;
use airjay::audio::SoundLoader;
use airjay::config::Config;
use airjay::gesture::{ControllerConfig, GestureController};
use airjay::mixer::{DeckMixer, MixerAssets, SAMPLE_SLOTS};
use airjay::session::Session;
use airjay::tracker::keyboard;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A gesture-driven two-deck mixer."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Verifies a config and its audio assets without opening a device.
    Check {
        /// The path to the mixer config.
        config_path: String,
    },
    /// Start will start the mixer session.
    Start {
        /// The path to the mixer config.
        config_path: String,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
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
        Commands::Check { config_path } => {
            let config = Config::load(Path::new(&config_path))?;
            let mut loader = SoundLoader::new(44100);
            let assets = MixerAssets::load(&mut loader, config.mixer(), config.base_path())?;

            println!("Config OK: {}", config_path);
            println!("- deck A: {} ({:?})", config.mixer().track_a(), assets.track_a.duration());
            println!("- deck B: {} ({:?})", config.mixer().track_b(), assets.track_b.duration());
            for slot in 0..SAMPLE_SLOTS {
                match &assets.samples[slot] {
                    Some(sound) => {
                        println!("- sample {}: loaded ({:?})", slot + 1, sound.duration())
                    }
                    None => println!("- sample {}: empty", slot + 1),
                }
            }
        }
        Commands::Start { config_path } => {
            let config = Config::load(Path::new(&config_path))?;

            let backend = audio::get_backend(config.audio_device(), config.channel_count())?;
            let mut loader = SoundLoader::new(backend.sample_rate());
            let assets = MixerAssets::load(&mut loader, config.mixer(), config.base_path())?;
            let mixer = DeckMixer::new(
                backend,
                assets,
                config.mixer().crossfade_law(),
                config.mixer().default_master(),
                config.mixer().default_crossfade(),
            )?;

            let controller = GestureController::new(ControllerConfig {
                frame_width: config.frame().width() as f64,
                frame_height: config.frame().height() as f64,
                stability_frames: config.gestures().stability_frames(),
                master_smoothing: config.gestures().master_smoothing(),
                crossfader_smoothing: config.gestures().crossfader_smoothing(),
                sample_cooldown: config.gestures().sample_cooldown()?,
                default_master: config.mixer().default_master(),
                default_crossfade: config.mixer().default_crossfade(),
            });

            let driver = Arc::new(keyboard::Driver::new(
                config.frame().width(),
                config.frame().height(),
            ));

            let session = Session::run(driver, controller, mixer);
            session.join()?;
        }
    };

    Ok(())
}
