/// Lumen - offline tools for the Lumen audio core
use clap::{Args, Parser, Subcommand};
use lumen_audio::{gain_staging, GainStaging};
use lumen_cli::{render_file, CliConfig, RenderOptions, SettingsArgs};
use lumen_core::{EqBand, EqPreset, EqualizerSettings, JsonFileStore, Tone};
use lumen_playback::EqualizerController;
use std::{path::PathBuf, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lumen")]
#[command(about = "Lumen audio core tools", long_about = None)]
struct Cli {
    /// Configuration file path (default: ./lumen.toml when present)
    #[arg(short, long, global = true, env = "LUMEN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the gain staging for a set of equalizer settings
    Staging {
        #[command(flatten)]
        eq: EqArgs,
    },
    /// Render a WAV file through the processing graph
    Render {
        /// Input WAV file
        input: PathBuf,
        /// Output WAV file (32-bit float stereo)
        output: PathBuf,
        /// Master volume (0-100, default from config)
        #[arg(long)]
        volume: Option<u8>,
        /// Skip the fade-in
        #[arg(long)]
        no_fade: bool,
        #[command(flatten)]
        eq: EqArgs,
    },
    /// List built-in presets
    Presets,
    /// Show or edit the persisted equalizer settings
    Eq {
        /// Flatten everything before applying edits
        #[arg(long)]
        reset: bool,
        /// Re-enable a disabled equalizer
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[command(flatten)]
        eq: EqArgs,
    },
}

#[derive(Args, Clone, Default)]
struct EqArgs {
    /// Preset applied before band edits
    #[arg(short, long)]
    preset: Option<String>,
    /// Band gain as name=dB or index=dB (repeatable)
    #[arg(short, long = "band", value_name = "BAND=DB")]
    bands: Vec<String>,
    /// Bass tone gain (dB)
    #[arg(long, allow_negative_numbers = true)]
    bass: Option<f32>,
    /// Treble tone gain (dB)
    #[arg(long, allow_negative_numbers = true)]
    treble: Option<f32>,
    /// Bypass the equalizer
    #[arg(long)]
    disable: bool,
    /// Start from the persisted settings instead of flat
    #[arg(long)]
    stored: bool,
}

impl EqArgs {
    fn edits(&self) -> SettingsArgs {
        SettingsArgs {
            preset: self.preset.clone(),
            bands: self.bands.clone(),
            bass: self.bass,
            treble: self.treble,
            disabled: self.disable,
        }
    }

    async fn settings(&self, config: &CliConfig) -> anyhow::Result<EqualizerSettings> {
        let base = if self.stored {
            let controller = EqualizerController::new(Arc::new(JsonFileStore::new(
                &config.equalizer.path,
            )));
            controller.init().await
        } else {
            EqualizerSettings::default()
        };
        Ok(self.edits().apply(base)?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lumen=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Staging { eq } => {
            let settings = eq.settings(&config).await?;
            print_settings(&settings);
        }
        Commands::Render {
            input,
            output,
            volume,
            no_fade,
            eq,
        } => {
            let settings = eq.settings(&config).await?;
            let level = volume.unwrap_or(config.playback.volume).min(100);
            let options = RenderOptions {
                gain: f32::from(level) / 100.0,
                fade_in_ms: if no_fade { 0 } else { config.playback.fade_in_ms },
            };
            let report = render_file(&input, &output, &settings, &config.graph, options)?;

            println!("Rendered {} frames at {} Hz", report.frames, report.sample_rate);
            println!(
                "  pre-gain {:.3}, bass compensation {:.3}",
                report.staging.pre_gain, report.staging.bass_compensation
            );
            println!(
                "  peak {:.3} -> {:.3}",
                report.input_peak, report.output_peak
            );
        }
        Commands::Presets => {
            for preset in EqPreset::ALL {
                let gains = preset
                    .gains()
                    .iter()
                    .map(|g| format!("{g:+.0}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("{:<14} {}", preset.tag(), gains);
            }
        }
        Commands::Eq { reset, enable, eq } => {
            let store = Arc::new(JsonFileStore::new(&config.equalizer.path));
            let controller = EqualizerController::new(store);
            let mut settings = controller.init().await;

            if reset {
                settings.reset();
            }
            if enable {
                settings.enabled = true;
            }
            let edits = eq.edits();
            if reset || enable || !edits.is_empty() {
                controller.replace(edits.apply(settings)?);
                controller.flush().await;
                println!("Saved {}", config.equalizer.path.display());
            }

            print_settings(&controller.settings());
        }
    }

    Ok(())
}

fn print_settings(settings: &EqualizerSettings) {
    let staging = GainStaging::for_settings(settings);

    println!(
        "Preset: {} ({})",
        settings.preset,
        if settings.enabled { "enabled" } else { "bypassed" }
    );
    for band in EqBand::ALL {
        println!(
            "  {:>5.0} Hz  {:<11} {:+5.1} dB",
            band.frequency(),
            band.name(),
            settings.band(band)
        );
    }
    println!("  Bass tone   {:+5.1} dB", settings.tone(Tone::Bass));
    println!("  Treble tone {:+5.1} dB", settings.tone(Tone::Treble));
    println!(
        "Boost: bass {:.1} dB, total {:.1} dB",
        gain_staging::bass_boost_db(settings),
        gain_staging::total_boost_db(settings)
    );
    println!(
        "Staging: pre-gain {:.3}, bass compensation {:.3}",
        staging.pre_gain, staging.bass_compensation
    );
}
