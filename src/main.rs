use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

use edgesight::{
    CaptureClassifyIntegration, CaptureController, CaptureControllerBuilder, CaptureState,
    ClassificationPipeline, DeviceSelector, EdgesightConfig, Inference, InputTensor, LabelTable,
    MockCaptureChannel, StillFormat, Surface,
};

#[derive(Parser, Debug)]
#[command(name = "edgesight")]
#[command(about = "Rust-based edge camera still-capture and image classification pipeline")]
#[command(version)]
#[command(long_about = "Configuration tooling and a mock-wired smoke run for the edgesight \
capture and classification library. Production deployments embed the library with a real \
hardware channel and inference backend; this binary drives the full capture-to-classification \
path against synthetic frames.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "edgesight.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without running")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting edgesight v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match EdgesightConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    config.validate().context("invalid configuration")?;

    run_smoke(&config).await
}

/// Synthetic inference for the smoke run: scores three labels by the mean
/// of the corresponding color channel, undoing the preprocessor's
/// normalization. A solid-color frame classifies as its dominant channel.
struct ChannelMeanInference {
    mean: f32,
    std: f32,
}

impl Inference for ChannelMeanInference {
    fn infer(&self, input: &InputTensor) -> Vec<f32> {
        let mut sums = [0.0f64; 3];
        for pixel in input.as_slice().chunks(3) {
            for (channel, value) in pixel.iter().enumerate() {
                sums[channel] += f64::from(value * self.std + self.mean);
            }
        }
        let pixel_count = (input.len() / 3).max(1) as f64;
        sums.iter()
            .map(|sum| (sum / pixel_count / 255.0) as f32)
            .collect()
    }
}

async fn run_smoke(config: &EdgesightConfig) -> Result<()> {
    info!("Starting mock-wired smoke run");

    let channel = Arc::new(MockCaptureChannel::new());
    let (controller, events) = CaptureControllerBuilder::new()
        .channel(channel.clone())
        .auto_exposure(config.camera.auto_exposure)
        .build()?;

    let labels = LabelTable::from_lines("red\ngreen\nblue");
    let mut classifier_config = config.classifier.clone();
    classifier_config.num_classes = labels.len();
    let inference = Arc::new(ChannelMeanInference {
        mean: classifier_config.channel_mean,
        std: classifier_config.channel_std,
    });
    let pipeline = Arc::new(ClassificationPipeline::new(
        &classifier_config,
        inference,
        labels,
    )?);

    let (sink_tx, mut sink_rx) = mpsc::unbounded_channel();
    let integration = CaptureClassifyIntegration::spawn(pipeline, events, sink_tx);

    let surface = Surface::new(
        config.camera.resolution.0,
        config.camera.resolution.1,
        StillFormat::Rgb24,
    );

    controller.open(DeviceSelector::First).await?;
    wait_for_state(&controller, CaptureState::Open).await?;

    for (name, color) in [
        ("red", [220u8, 10, 10]),
        ("green", [10, 220, 10]),
        ("blue", [10, 10, 220]),
    ] {
        channel.set_frame_color(color);

        controller.configure_session(surface).await?;
        wait_for_state(&controller, CaptureState::Ready).await?;

        let request_id = controller.capture().await?;
        let results = tokio::time::timeout(Duration::from_secs(5), sink_rx.recv())
            .await
            .context("timed out waiting for classification results")?
            .context("result sink closed unexpectedly")?;

        println!("capture {} ({} frame):", request_id, name);
        if results.is_empty() {
            println!("  no label above threshold {}", classifier_config.confidence_threshold);
        }
        for result in &results {
            println!("  {:<8} {:.3}", result.label, result.confidence);
        }

        // The one-shot session has closed; the device is back at `Open`.
        wait_for_state(&controller, CaptureState::Open).await?;
    }

    controller.shutdown().await;
    integration.join().await;

    info!("Smoke run complete");
    Ok(())
}

async fn wait_for_state(controller: &CaptureController, expected: CaptureState) -> Result<()> {
    for _ in 0..200 {
        if controller.state().await == expected {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    bail!("capture state machine never reached {}", expected);
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("edgesight={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Edgesight Configuration File");
    println!("# This is the default configuration with all available options");
    println!();
    println!("{}", toml::to_string_pretty(&EdgesightConfig::default())?);
    Ok(())
}
