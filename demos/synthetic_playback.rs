// Synthetic recording playback walkthrough
// Usage: cargo run --example synthetic_playback -- [output.json]

use std::time::Duration;

use telemetry_engine::core::generator::generate;
use telemetry_engine::{GeneratorConfig, RecordingSource, TelemetryService};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let config = GeneratorConfig {
        seconds: 600,
        label_count: 8,
        seed: Some(42),
        ..GeneratorConfig::default()
    };

    // Optionally dump the generated document for use as a file source
    if let Some(path) = std::env::args().nth(1) {
        let doc = generate(&config);
        std::fs::write(&path, serde_json::to_vec_pretty(&doc)?)?;
        info!("Wrote synthetic recording to {}", path);
    }

    let service = TelemetryService::default();
    service.load(&RecordingSource::Synthetic(config)).await?;

    {
        let mut engine = service.engine().await;
        let titles = engine.label_titles();
        println!("Labels: {}", titles.join(", "));

        engine.set_visibility(titles.iter().take(3).cloned());
        for series in engine.chart_series()?.iter() {
            println!(
                "  {:<10} {:?} {} points",
                series.label,
                series.chart_type,
                series.points.len()
            );
        }

        let window = engine.set_trim_start(120)?;
        println!("Trim window: {}..={}", window.trim_start, window.trim_end);
    }

    service.seek(100).await?;
    service.play().await;
    tokio::time::sleep(Duration::from_millis(3200)).await;
    service.pause().await;

    let engine = service.engine().await;
    let state = engine.playback()?;
    println!("Stopped at second {} (playing: {})", state.current_second, state.is_playing);

    if let Some(entry) = engine.current_entry() {
        println!("  {} at ({:.5}, {:.5})", entry.timestamp, entry.latitude, entry.longitude);
        for label in entry.labels.iter().take(3) {
            println!("  {:<10} avg {:.2}", label.title, label.avg_value);
        }
    }

    Ok(())
}
