use anyhow::Result;
use clap::{Parser, Subcommand};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use voxcap::{list_input_devices, AudioCaptureEngine};

#[derive(Parser)]
#[command(name = "voxcap")]
#[command(about = "Microphone capture with live level and spectrum feedback")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available audio input devices
    Devices {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Record from the default input device
    Record {
        /// Recording duration in seconds
        #[arg(long, default_value = "5")]
        duration: u64,

        /// Keep the recorded file instead of cleaning it up on exit
        #[arg(long)]
        keep: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Devices { json } => devices(json),
        Commands::Record { duration, keep } => record(Duration::from_secs(duration), keep),
    }
}

fn devices(json: bool) -> Result<()> {
    let devices = list_input_devices()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    for device in devices {
        let marker = if device.is_default { "*" } else { " " };
        println!("{marker} {}", device.name);
        if !device.sample_rates.is_empty() {
            println!("    rates: {:?}  formats: {:?}", device.sample_rates, device.formats);
        }
    }
    Ok(())
}

fn record(duration: Duration, keep: bool) -> Result<()> {
    let mut engine = AudioCaptureEngine::new();
    let mut updates = engine.subscribe();
    engine.start()?;

    let started = Instant::now();
    while started.elapsed() < duration {
        // Drain whatever arrived and render the latest meter line.
        let mut latest = None;
        while let Ok(snapshot) = updates.try_recv() {
            latest = Some(snapshot);
        }
        if let Some(snapshot) = latest {
            print!("\rlevel {}  bands {}", meter(snapshot.audio_level, 20), bars(&snapshot.frequency_bands));
            use std::io::Write;
            std::io::stdout().flush().ok();
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    println!();

    match engine.stop() {
        Some(path) => {
            println!("recorded {:?} to {}", started.elapsed(), path.display());
            if !keep {
                engine.cleanup();
                println!("cleaned up (pass --keep to retain the file)");
            }
        }
        None => println!("no active recording"),
    }
    Ok(())
}

fn meter(level: f32, width: usize) -> String {
    let filled = ((level * width as f32) as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

fn bars(bands: &[f32]) -> String {
    const GLYPHS: [char; 5] = [' ', '.', ':', '|', '#'];
    bands
        .iter()
        .map(|b| GLYPHS[((b * 4.0).round() as usize).min(4)])
        .collect()
}
