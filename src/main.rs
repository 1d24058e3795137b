//! Murmur CLI - ambient sound for whatever your terminal is doing

use clap::Parser;
use murmur::audio::SoundEngine;
use murmur::config::{Overrides, Settings};
use murmur::error::MurmurError;
use murmur::materials::{self, SoundSet};
use murmur::{demo, session};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "murmur")]
#[command(about = "Ambient audio soundscape feedback for terminal output", long_about = None)]
struct Cli {
    /// Command to wrap
    #[arg(default_value = "claude")]
    command: String,

    /// Read from stdin instead of wrapping a command
    #[arg(long)]
    pipe: bool,

    /// Sound set (default: ambient)
    #[arg(short = 's', long = "set", value_enum)]
    sound_set: Option<SoundSet>,

    /// Sound character (default: random). See --list-characters
    #[arg(short, long)]
    character: Option<String>,

    /// Volume 0.0-1.0 (default: 0.5)
    #[arg(short, long)]
    volume: Option<f32>,

    /// Seconds of silence before the attention signal (default: 30)
    #[arg(short, long)]
    attention: Option<f64>,

    /// Sound plays during silence, not during output
    #[arg(short, long)]
    reverse: bool,

    /// List available sound characters
    #[arg(long)]
    list_characters: bool,

    /// Play a short demo of each character in the set
    #[arg(long)]
    demo: bool,

    /// With --demo: render to this WAV file instead of playing
    #[arg(long, requires = "demo")]
    export: Option<PathBuf>,

    /// Settings file (default: <config dir>/murmur/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            volume: self.volume,
            attention_seconds: self.attention,
            sound_set: self.sound_set,
            character: self.character.clone(),
            reverse: self.reverse,
        }
    }
}

fn main() -> ExitCode {
    // stdout belongs to the wrapped program
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("murmur: {}", e);
            if let Some(MurmurError::DeviceUnavailable(_)) = e.downcast_ref::<MurmurError>() {
                eprintln!(
                    "murmur: check that an output device is connected and not held exclusively \
                     by another program, or try --demo --export out.wav to test without one"
                );
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if cli.list_characters {
        demo::write_listing(&mut std::io::stdout().lock())?;
        return Ok(ExitCode::SUCCESS);
    }

    let settings = Settings::load(cli.config.as_deref())?
        .apply(cli.overrides())
        .normalized()?;

    if cli.demo {
        match &cli.export {
            Some(path) => {
                let stats =
                    demo::export(settings.sound_set, settings.volume, path, &mut rand::thread_rng())?;
                eprintln!(
                    "Wrote {} ({:.1}s, peak {:.3}, rms {:.3})",
                    path.display(),
                    stats.duration,
                    stats.peak,
                    stats.rms
                );
            }
            None => demo::play_live(settings.sound_set, settings.volume)?,
        }
        return Ok(ExitCode::SUCCESS);
    }

    let material = match &settings.character {
        Some(name) => materials::lookup(settings.sound_set, name)?,
        None => materials::random_character(settings.sound_set, &mut rand::thread_rng()),
    };
    info!("Character {} from {}", material.name, settings.sound_set);

    let mode_label = if settings.reverse { " (reverse)" } else { "" };
    eprintln!(
        "[murmur] {}{} - {}",
        material.name, mode_label, material.description
    );

    let engine = Arc::new(SoundEngine::new(material, settings.volume));
    let monitor_config = settings.monitor_config();

    if cli.pipe {
        session::run_pipe(engine, monitor_config)?;
        Ok(ExitCode::SUCCESS)
    } else {
        let code = session::run_wrap(&cli.command, engine, monitor_config)?;
        Ok(ExitCode::from(code.clamp(0, 255) as u8))
    }
}
