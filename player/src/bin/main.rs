//! framefill player
//!
//! Plays a panned test tone through the per-frame fill scheduler.
//!
//! Usage:
//!   framefill [--frames N] [--hz HZ] [--tone HZ] [--pan P] [--null-audio] [--markers]

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use framefill_core::config::{self, Config};
use framefill_core::{AudioEngine, DebugObserver, FillObserver, NullBackend, SinkBackend};
use framefill_player::{LoopOptions, PanSweep, run, save_sync_display};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the player
#[derive(Parser, Debug)]
#[command(name = "framefill")]
#[command(author, version, about = "Per-frame audio buffer fill player")]
struct Args {
    /// Number of frames to run (runs until interrupted if omitted)
    #[arg(long, short = 'n')]
    frames: Option<u64>,

    /// Target frame rate
    #[arg(long)]
    hz: Option<u32>,

    /// Tone frequency in Hz
    #[arg(long)]
    tone: Option<f32>,

    /// Tone amplitude in 16-bit units
    #[arg(long)]
    volume: Option<f32>,

    /// Stereo position (-100 = left, 100 = right)
    #[arg(long, allow_hyphen_values = true)]
    pan: Option<f32>,

    /// Sweep the pan position by this many units per frame
    #[arg(long)]
    sweep: Option<f32>,

    /// Requested device buffer length in milliseconds
    #[arg(long)]
    buffer_ms: Option<u32>,

    /// Use the wall-clock null device instead of real audio hardware
    #[arg(long)]
    null_audio: bool,

    /// Record sync markers
    #[arg(long)]
    markers: bool,

    /// Keep a fixed frame rate even when frames are missed
    #[arg(long)]
    fixed_rate: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Save the effective settings to the --config file (or the default config) and exit
    #[arg(long)]
    save_config: bool,

    /// Write the sync display to this PNG on exit (implies --markers)
    #[arg(long)]
    sync_dump: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(hz) = self.hz {
            config.timing.game_update_hz = hz;
        }
        if let Some(tone) = self.tone {
            config.audio.tone_hz = tone;
        }
        if let Some(volume) = self.volume {
            config.audio.tone_volume = volume;
        }
        if let Some(pan) = self.pan {
            config.audio.pan = pan;
        }
        if let Some(buffer_ms) = self.buffer_ms {
            config.audio.buffer_ms = buffer_ms;
        }
        if self.markers || self.sync_dump.is_some() {
            config.debug.markers = true;
        }
        if self.fixed_rate {
            config.timing.adaptive_frame_rate = false;
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => config::load(),
    };
    args.apply(&mut config);

    if args.save_config {
        return save_config(&config, args.config.as_deref());
    }

    let backend = select_backend(args.null_audio);
    info!("Audio backend: {}", backend.name());

    let mut engine = AudioEngine::open(
        config.sound_output(),
        backend.as_ref(),
        config.audio.buffer_ms,
        DebugObserver::new(config.debug.markers),
    );

    let options = LoopOptions {
        frames: args.frames,
        pan_sweep: args.sweep.map(PanSweep::new),
        adaptive_frame_rate: config.timing.adaptive_frame_rate,
        stats_interval: Duration::from_secs(1),
    };

    let summary = run(&mut engine, &options);
    info!(
        "Ran {} frames ({} missed, final rate {} Hz), {} samples written, {} underruns",
        summary.frames,
        summary.missed_frames,
        summary.final_hz,
        engine.stats().samples_written,
        engine.stats().underruns
    );

    if let Some(path) = &args.sync_dump {
        let buffer_size = engine.session().query_actual_buffer_size();
        match engine.observer().markers() {
            Some(ring) => save_sync_display(ring, buffer_size, path)?,
            None => anyhow::bail!("No sync markers were recorded"),
        }
    }

    engine.shutdown();
    Ok(())
}

/// Write `config` back to the file it came from, or to the platform default.
fn save_config(config: &Config, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            config::save_to(config, path)
                .with_context(|| format!("Failed to save config to {}", path.display()))?;
            info!("Config saved to {}", path.display());
        }
        None => {
            config::save(config).context("Failed to save config")?;
            info!("Config saved");
        }
    }
    Ok(())
}

#[cfg(feature = "cpal-backend")]
fn select_backend(null_audio: bool) -> Box<dyn SinkBackend> {
    if null_audio {
        Box::new(NullBackend)
    } else {
        Box::new(framefill_core::CpalBackend)
    }
}

#[cfg(not(feature = "cpal-backend"))]
fn select_backend(_null_audio: bool) -> Box<dyn SinkBackend> {
    Box::new(NullBackend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_config_writes_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player.toml");
        let args = Args::parse_from(["framefill", "--hz", "30", "--pan", "-50"]);
        let mut config = Config::default();
        args.apply(&mut config);

        save_config(&config, Some(&path)).unwrap();

        let saved = config::load_from(&path).unwrap();
        assert_eq!(saved.timing.game_update_hz, 30);
        assert_eq!(saved.audio.pan, -50.0);
    }

    #[test]
    fn test_sync_dump_implies_markers() {
        let args = Args::parse_from(["framefill", "--sync-dump", "sync.png", "--fixed-rate"]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert!(config.debug.markers);
        assert!(!config.timing.adaptive_frame_rate);
    }
}
