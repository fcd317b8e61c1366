//! Clarion CLI application
//!
//! A small host that stands in for the plugin environment: it drives
//! synthesized stereo audio through the EQ processor on a producer thread
//! at real-time block cadence, runs the analyzer task on the tokio runtime,
//! and logs what the analyzer observes. Halfway through the run it flips a
//! few parameters to demonstrate live coefficient swaps.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{info, warn};

use clarion_core::domain::chain::response_magnitude;
use clarion_core::domain::config::ClarionConfig;
use clarion_core::domain::params::{ChainSettings, EqParams, Slope};
use clarion_core::domain::AudioChannel;
use clarion_infra::audio::{AnalyzerTask, EqProcessor, SpectrumSink};

#[derive(Parser)]
#[command(name = "clarion")]
#[command(about = "A parametric EQ signal engine demo", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How long to run, in seconds
    #[arg(short, long, default_value_t = 4)]
    seconds: u64,

    /// Test tone frequencies for the left and right channels, in Hz
    #[arg(long, default_value_t = 220.0)]
    left_tone: f32,
    #[arg(long, default_value_t = 440.0)]
    right_tone: f32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Sink that logs per-channel block levels and the response curve.
struct LoggingSink {
    sample_rate: f32,
    blocks: [u64; 2],
    last_rms_db: [f32; 2],
}

impl LoggingSink {
    fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            blocks: [0, 0],
            last_rms_db: [f32::NEG_INFINITY; 2],
        }
    }

    fn rms_db(samples: &[f32]) -> f32 {
        let mean_square = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
        if mean_square > 0.0 {
            10.0 * mean_square.log10()
        } else {
            f32::NEG_INFINITY
        }
    }
}

impl SpectrumSink for LoggingSink {
    fn on_block(&mut self, channel: AudioChannel, samples: &[f32]) {
        let index = match channel {
            AudioChannel::Left => 0,
            AudioChannel::Right => 1,
        };
        self.blocks[index] += 1;
        self.last_rms_db[index] = Self::rms_db(samples);
    }

    fn on_settings_changed(&mut self, settings: &ChainSettings) {
        // Recompute the cached response curve at a handful of frequencies.
        let curve: Vec<String> = [50.0, 200.0, 750.0, 3_000.0, 12_000.0]
            .iter()
            .map(|&freq| {
                let db = 20.0 * response_magnitude(settings, self.sample_rate, freq).log10();
                format!("{}Hz: {:+.1}dB", freq, db)
            })
            .collect();
        info!(
            "settings changed (low cut {} Hz, peak {} Hz, high cut {} Hz); response {}",
            settings.low_cut_freq,
            settings.peak_freq,
            settings.high_cut_freq,
            curve.join(", ")
        );
    }
}

fn producer_loop(
    mut processor: EqProcessor,
    params: Arc<EqParams>,
    cli: &Cli,
    sample_rate: f32,
    block_size: usize,
) {
    let total_blocks = (cli.seconds * sample_rate as u64) / block_size as u64;
    let block_duration = Duration::from_secs_f64(block_size as f64 / sample_rate as f64);
    let mut left = vec![0.0f32; block_size];
    let mut right = vec![0.0f32; block_size];
    let mut phase: u64 = 0;
    let start = Instant::now();

    for block_index in 0..total_blocks {
        for i in 0..block_size {
            let t = (phase + i as u64) as f32 / sample_rate;
            left[i] = (2.0 * std::f32::consts::PI * cli.left_tone * t).sin() * 0.5;
            right[i] = (2.0 * std::f32::consts::PI * cli.right_tone * t).sin() * 0.5;
        }
        phase += block_size as u64;

        processor.process(&mut left, &mut right);

        // Halfway through, move the EQ around while audio is flowing.
        if block_index == total_blocks / 2 {
            info!("flipping parameters mid-stream");
            params.set_low_cut_freq(300.0);
            params.set_low_cut_slope(Slope::Db48);
            params.set_peak_gain_db(9.0);
        }

        // Pace the loop at block cadence like an audio callback would.
        let deadline = block_duration * (block_index as u32 + 1);
        if let Some(remaining) = deadline.checked_sub(start.elapsed()) {
            std::thread::sleep(remaining);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    let config = match &cli.config {
        Some(path) => ClarionConfig::load_from_file(path).await?,
        None => {
            info!("no configuration file given, using defaults");
            ClarionConfig::default()
        }
    };

    let params = Arc::new(EqParams::new());
    config.eq.apply_to(&params);

    let mut processor = EqProcessor::new(Arc::clone(&params));
    let stream_config = config.engine.stream_config();
    let analyzer_block = config.engine.analyzer_block_size as usize;
    let feed = processor.prepare(&stream_config, analyzer_block)?;

    let sample_rate = config.engine.sample_rate as f32;
    let sink = LoggingSink::new(sample_rate);
    let task = AnalyzerTask::new(
        feed,
        Arc::clone(&params),
        sink,
        config.engine.analyzer_rate_hz,
    );

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let analyzer = tokio::spawn(task.run(stop_rx));

    info!(
        seconds = cli.seconds,
        sample_rate = config.engine.sample_rate,
        block = config.engine.buffer_size,
        "starting producer"
    );

    let block_size = config.engine.buffer_size as usize;
    let producer = tokio::task::spawn_blocking({
        let params = Arc::clone(&params);
        move || producer_loop(processor, params, &cli, sample_rate, block_size)
    });

    producer.await?;
    stop_tx.send(true).ok();
    let sink = analyzer.await?;

    for (channel, (blocks, rms)) in ["left", "right"]
        .iter()
        .zip(sink.blocks.iter().zip(sink.last_rms_db.iter()))
    {
        if *blocks == 0 {
            warn!("analyzer observed no blocks on the {} channel", channel);
        } else {
            info!(
                "analyzer summary: {} channel, {} blocks, last RMS {:.1} dB",
                channel, blocks, rms
            );
        }
    }

    Ok(())
}
