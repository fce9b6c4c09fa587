//! Live volume meter example.
//!
//! Prints a level bar for the default input device (or the device named on
//! the command line) for ten seconds.
//!
//! Run with: cargo run --example live_meter -- [device name]

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use volume_meter::processor::is_silent;
use volume_meter::source::{AudioSource, DeviceSource};
use volume_meter::{list_input_devices, VolumeMeter};

const BAR_WIDTH: usize = 50;

fn render(volume: f32) {
    let filled = if is_silent(volume) {
        0
    } else {
        ((volume.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize).min(BAR_WIDTH)
    };
    let bar = format!("{}{}", "#".repeat(filled), " ".repeat(BAR_WIDTH - filled));
    print!("\r[{bar}] {volume:.4}");
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("Input devices:");
    for name in list_input_devices()? {
        println!("  - {name}");
    }

    let source = match std::env::args().nth(1) {
        Some(name) => DeviceSource::open_by_name(&name)?,
        None => DeviceSource::open_default()?,
    };
    println!(
        "Metering '{}' at {} Hz for 10 seconds...",
        source.name(),
        source.sample_rate()?
    );

    let mut meter = VolumeMeter::builder()
        .source(Arc::new(source))
        .on_volume(render)
        .build()?;

    meter.start().await?;
    tokio::time::sleep(Duration::from_secs(10)).await;

    let stats = meter.stats();
    meter.destroy();

    println!();
    println!("Stats: {:?}", stats);

    Ok(())
}
