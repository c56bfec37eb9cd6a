use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use led_lut::LogParser;
use ledcal::models::{AppConfig, CONFIG_ENV};
use ledcal::services::{self, stages, RunPaths};

#[derive(Parser)]
#[command(name = "ledcal")]
#[command(version)]
#[command(about = "Turn LED calibration sensor logs into firmware brightness lookup tables")]
struct Cli {
    /// Configuration file (defaults to $LEDCAL_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract sensor samples from a serial log into a samples CSV
    ParseLog {
        /// Log file, or - for stdin
        input: PathBuf,
        /// Samples CSV, or - for stdout
        output: PathBuf,
        #[command(flatten)]
        log: LogArgs,
    },
    /// Recover drive currents from a samples CSV
    Sync {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        sync: SyncArgs,
    },
    /// Group synced rows into one row per current
    Join { input: PathBuf, output: PathBuf },
    /// Replace unreliable low-current red readings in a joined CSV
    ApproximateRed {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        red: RedArgs,
    },
    /// Solve the brightness table from a joined CSV
    Solve {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        solve: SolveArgs,
    },
    /// Write <PREFIX>.h and <PREFIX>.c from a solver CSV
    Emit {
        input: PathBuf,
        prefix: PathBuf,
        #[command(flatten)]
        emit: EmitArgs,
    },
    /// Run every stage from a log to the C sources
    Run {
        log: PathBuf,
        prefix: PathBuf,

        /// Also write the intermediate CSV tables here
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Write a JSON run report
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        log_args: LogArgs,
        #[command(flatten)]
        sync: SyncArgs,
        #[command(flatten)]
        red: RedArgs,
        #[command(flatten)]
        solve: SolveArgs,
        #[command(flatten)]
        emit: EmitArgs,
    },
}

#[derive(Args, Debug, Default)]
struct LogArgs {
    /// Sensor tag in front of the channel fields
    #[arg(long)]
    tag: Option<String>,
}

#[derive(Args, Debug, Default)]
struct SyncArgs {
    /// All four channels below this mark a black sample
    #[arg(long)]
    black_threshold: Option<f64>,

    /// Green reading that marks the first green block
    #[arg(long)]
    green_threshold: Option<f64>,

    /// Highest drive current to recover
    #[arg(long)]
    max_current: Option<u32>,

    /// Fail on a final series cut off by the end of the log
    #[arg(long)]
    strict: bool,
}

#[derive(Args, Debug, Default)]
struct RedArgs {
    /// First red reading above this anchors the extrapolation
    #[arg(long)]
    red_threshold: Option<f64>,
}

#[derive(Args, Debug, Default)]
struct SolveArgs {
    /// Number of brightness steps
    #[arg(long)]
    steps: Option<usize>,

    /// PWM duty mode: luminance or current
    #[arg(long)]
    pwm_mode: Option<String>,
}

#[derive(Args, Debug, Default)]
struct EmitArgs {
    /// Array values per line in the C source
    #[arg(long)]
    values_per_line: Option<usize>,
}

impl LogArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(tag) = &self.tag {
            config.log.tag = tag.clone();
        }
    }
}

impl SyncArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(v) = self.black_threshold {
            config.sync.black_threshold = Some(v);
        }
        if let Some(v) = self.green_threshold {
            config.sync.green_trigger_threshold = Some(v);
        }
        if let Some(v) = self.max_current {
            config.sync.max_current = v;
        }
        if self.strict {
            config.sync.abort_on_truncated_series = true;
        }
    }
}

impl RedArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(v) = self.red_threshold {
            config.red.threshold = Some(v);
        }
    }
}

impl SolveArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(v) = self.steps {
            config.solve.steps = v;
        }
        if let Some(mode) = &self.pwm_mode {
            config.solve.pwm_mode = mode.clone();
        }
    }
}

impl EmitArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(v) = self.values_per_line {
            config.emit.values_per_line = v;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        run_status_command(cli.config.as_deref());
        return Ok(());
    };

    // stdout may carry a table, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledcal=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    let mut config = AppConfig::load(cli.config.as_deref())?;

    match command {
        Commands::ParseLog { input, output, log } => {
            log.apply(&mut config);
            let parser = LogParser::new(&config.log.tag);
            stages::parse_log(&input, &output, &parser)?;
        }
        Commands::Sync {
            input,
            output,
            sync,
        } => {
            sync.apply(&mut config);
            stages::sync(
                &input,
                &output,
                config.sync_options()?,
                config.sync.abort_on_truncated_series,
            )?;
        }
        Commands::Join { input, output } => {
            stages::join(&input, &output)?;
        }
        Commands::ApproximateRed { input, output, red } => {
            red.apply(&mut config);
            stages::approximate_red(&input, &output, config.red_threshold()?)?;
        }
        Commands::Solve {
            input,
            output,
            solve,
        } => {
            solve.apply(&mut config);
            stages::solve(&input, &output, &config.solve_options()?)?;
        }
        Commands::Emit {
            input,
            prefix,
            emit,
        } => {
            emit.apply(&mut config);
            stages::emit(&input, &prefix, config.values_per_line()?)?;
        }
        Commands::Run {
            log,
            prefix,
            work_dir,
            report,
            log_args,
            sync,
            red,
            solve,
            emit,
        } => {
            log_args.apply(&mut config);
            sync.apply(&mut config);
            red.apply(&mut config);
            solve.apply(&mut config);
            emit.apply(&mut config);

            let paths = RunPaths {
                log: &log,
                prefix: &prefix,
                work_dir: work_dir.as_deref(),
                report: report.as_deref(),
            };
            let summary = services::run(&paths, &config)?;
            tracing::info!(
                steps = summary.solve.steps,
                currents = summary.join.triplets,
                "Calibration complete"
            );
        }
    }

    Ok(())
}

/// Show version, configuration and available commands
fn run_status_command(config_path: Option<&Path>) {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let env_config = std::env::var(CONFIG_ENV).ok();

    println!("ledcal v{VERSION}");
    println!("LED calibration lookup table generator\n");

    println!("Environment Variables:");
    println!(
        "  {CONFIG_ENV} = {}",
        env_config.as_deref().unwrap_or("(not set)")
    );

    println!("\nConfiguration:");
    let source = match (config_path, &env_config) {
        (Some(path), _) => path.display().to_string(),
        (None, Some(path)) => path.clone(),
        (None, None) => "none (defaults)".to_string(),
    };
    println!("  Source:  {source}");

    let config = match AppConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("  Error:   {e}");
            return;
        }
    };

    fn show(value: Option<f64>) -> String {
        value.map_or_else(|| "(not set)".to_string(), |v| v.to_string())
    }

    println!("  log.tag                        = {}", config.log.tag);
    println!(
        "  sync.black_threshold           = {}",
        show(config.sync.black_threshold)
    );
    println!(
        "  sync.green_trigger_threshold   = {}",
        show(config.sync.green_trigger_threshold)
    );
    println!("  sync.max_current               = {}", config.sync.max_current);
    println!(
        "  sync.abort_on_truncated_series = {}",
        config.sync.abort_on_truncated_series
    );
    println!("  red.threshold                  = {}", show(config.red.threshold));
    println!("  solve.steps                    = {}", config.solve.steps);
    println!("  solve.pwm_mode                 = {}", config.solve.pwm_mode);
    println!(
        "  emit.values_per_line           = {}",
        config.emit.values_per_line
    );

    println!("\nCommands:");
    println!("  ledcal parse-log        Extract sensor samples from a log");
    println!("  ledcal sync             Recover drive currents from samples");
    println!("  ledcal join             Group synced rows per current");
    println!("  ledcal approximate-red  Extrapolate low-current red readings");
    println!("  ledcal solve            Solve the brightness table");
    println!("  ledcal emit             Write the C header and source");
    println!("  ledcal run              All of the above in one go");
    println!("\nRun 'ledcal --help' for more details.");
}
