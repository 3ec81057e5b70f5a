use anyhow::{anyhow, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{debug, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use elan_data::app_config::{self, Config};
use elan_data::app_controller::{Controller, ExportFormat};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Input .eaf file or directory to process
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Directory for the exported files (defaults to next to each input)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Tier to leave out (repeatable)
    #[arg(long = "filter", value_name = "TIER")]
    filter: Vec<String>,

    /// Replace existing output files
    #[arg(short = 'f', long)]
    overwrite: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the tiers, audio and segment counts of a document
    Info {
        /// The .eaf file
        #[arg(value_name = "EAF")]
        eaf: PathBuf,
    },

    /// Export to RTTM (one SPEAKER line per segment)
    Rttm(ExportArgs),

    /// Export to plain text (one line per segment)
    Text {
        #[command(flatten)]
        export: ExportArgs,

        /// Line template using {tier} {start} {end} {duration} {id} {text}
        #[arg(short, long)]
        template: Option<String>,
    },

    /// Create an empty document
    Create {
        /// Path of the new .eaf file
        #[arg(value_name = "EAF")]
        eaf: PathBuf,

        /// Tier to add (repeatable)
        #[arg(long = "tier", value_name = "TIER")]
        tiers: Vec<String>,

        /// Associated WAV file
        #[arg(short, long)]
        audio: Option<PathBuf>,

        /// Do not keep the "default" tier
        #[arg(long)]
        remove_default: bool,

        /// Replace an existing file
        #[arg(short = 'f', long)]
        overwrite: bool,
    },

    /// Write sound wave data of the document's audio as JSON
    Wave {
        /// The .eaf file
        #[arg(value_name = "EAF")]
        eaf: PathBuf,

        /// Start of the window in seconds
        #[arg(long, default_value_t = 0.0)]
        start: f64,

        /// End of the window in seconds (defaults to the end of the audio)
        #[arg(long)]
        stop: Option<f64>,

        /// Channel to plot as COLOR=N (repeatable, defaults to blue=1)
        #[arg(short, long = "channel", value_name = "COLOR=N", value_parser = parse_channel)]
        channels: Vec<(String, usize)>,

        /// Output JSON file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace an existing output file
        #[arg(short = 'f', long)]
        overwrite: bool,
    },

    /// Generate shell completions for elan-data
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// elan-data - read, edit and export ELAN transcription files
#[derive(Parser, Debug)]
#[command(name = "elan-data")]
#[command(version)]
#[command(about = "Read, edit and export ELAN (.eaf) transcription files")]
#[command(long_about = "elan-data inspects ELAN transcription files, exports them to RTTM or text and
extracts sound wave data from their audio.

EXAMPLES:
    elan-data info interview.eaf                  # Tiers, audio and segment counts
    elan-data rttm interview.eaf --filter Noise   # Export to interview.rttm
    elan-data text corpus/ -o out/                # Export every .eaf below corpus/
    elan-data create new.eaf --tier A --tier B    # New document with two tiers
    elan-data wave interview.eaf --stop 5 -c red=1 -c blue=2 -o wave.json
    elan-data completions bash > elan-data.bash   # Generate bash completions

CONFIGURATION:
    Configuration is read from conf.json in the working directory, or from the
    user config directory. An explicit --config file is created with defaults
    when it does not exist. Command line flags override configured values.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @parses: COLOR=N channel selection
fn parse_channel(value: &str) -> Result<(String, usize), String> {
    let (color, channel) = value
        .split_once('=')
        .ok_or_else(|| format!("expected COLOR=N, got {:?}", value))?;

    let channel: usize = channel
        .trim()
        .parse()
        .map_err(|_| format!("invalid channel number {:?}", channel))?;
    if channel == 0 || color.trim().is_empty() {
        return Err(format!("expected COLOR=N with N >= 1, got {:?}", value));
    }

    Ok((color.trim().to_string(), channel))
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(LevelFilter::Trace)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and marker for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "❌"),
            Level::Warn => ("1;33", "🚧"),
            Level::Info => ("1;32", " "),
            Level::Debug => ("1;36", "🔍"),
            Level::Trace => ("1;35", "📋"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, marker) = Self::style_for_level(record.level());

            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                marker,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Load the configuration and apply the global CLI overrides
fn load_config(options: &CommandLineOptions) -> Result<Config> {
    let mut config = match &options.config {
        Some(path) => Config::load_or_create(path)?,
        None => {
            let path = Config::default_path();
            if path.exists() {
                Config::load(&path)?
            } else {
                debug!("No config file at {}, using defaults", path.display());
                Config::default()
            }
        }
    };

    if let Some(level) = options.log_level {
        config.log_level = level.into();
    }

    Ok(config)
}

fn apply_export_args(config: &mut Config, args: &ExportArgs) {
    config.export.filter.extend(args.filter.iter().cloned());
    if args.output_dir.is_some() {
        config.output.output_dir = args.output_dir.clone();
    }
    config.output.overwrite |= args.overwrite;
}

fn main() -> Result<()> {
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "elan-data", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = load_config(&cli)?;
    log::set_max_level(config.log_level.to_level_filter());

    match cli.command {
        Commands::Info { eaf } => {
            let controller = Controller::with_config(config)?;
            print!("{}", controller.describe(&eaf)?);
        }
        Commands::Rttm(args) => {
            apply_export_args(&mut config, &args);
            Controller::with_config(config)?.run(&args.input, ExportFormat::Rttm)?;
        }
        Commands::Text { export, template } => {
            apply_export_args(&mut config, &export);
            if template.is_some() {
                config.export.text_template = template;
            }
            Controller::with_config(config)?.run(&export.input, ExportFormat::Text)?;
        }
        Commands::Create {
            eaf,
            tiers,
            audio,
            remove_default,
            overwrite,
        } => {
            config.output.overwrite |= overwrite;
            Controller::with_config(config)?.create(&eaf, &tiers, audio.as_deref(), remove_default)?;
        }
        Commands::Wave {
            eaf,
            start,
            stop,
            channels,
            output,
            overwrite,
        } => {
            config.output.overwrite |= overwrite;
            let channels = if channels.is_empty() {
                vec![("blue".to_string(), 1)]
            } else {
                channels
            };

            let json = Controller::with_config(config)?.sound_wave(&eaf, start, stop, &channels, output.as_deref())?;
            if output.is_none() {
                println!("{}", json);
            }
        }
        Commands::Completions { .. } => return Err(anyhow!("completions are handled before configuration")),
    }

    Ok(())
}
