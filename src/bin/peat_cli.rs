use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use peat::calibration::retspl;
use peat::scoring::{self, ShortfallPolicy, ThresholdScorer};
use peat::session::{
    CsvRecorder, SessionConfig, SilentPresenter, SimulatedListener, TrialController,
};
use peat::stimulus::{self, StimulusParams, DEFAULT_SAMPLE_RATE};
use peat::{ErrorCode, SlmCalibration};

#[derive(Parser, Debug)]
#[command(
    name = "peat_cli",
    about = "Adaptive 2IAFC threshold engine: scoring, simulation and calibration tools"
)]
struct Cli {
    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute thresholds from every session CSV in a directory
    Score {
        #[arg(long)]
        dir: PathBuf,
        /// Number of trailing reversals to average
        #[arg(long, allow_negative_numbers = true)]
        reversals: i64,
        #[arg(long, default_value = "thresholds.csv")]
        output: PathBuf,
        /// Fail when a group has fewer reversals than requested
        #[arg(long)]
        strict: bool,
    },
    /// Run a full session against a simulated listener
    Simulate {
        /// Session configuration (JSON); defaults when omitted
        #[arg(long)]
        config: Option<PathBuf>,
        /// Listener threshold in track units (dB)
        #[arg(long, default_value_t = 20.0, allow_negative_numbers = true)]
        threshold: f64,
        /// Psychometric slope (dB)
        #[arg(long, default_value_t = 2.0)]
        slope: f64,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Trial CSV to append to
        #[arg(long)]
        output: PathBuf,
    },
    /// Export a synthesized stimulus as a WAV file
    Stimulus {
        #[arg(long, default_value_t = 1000.0)]
        freq: f64,
        #[arg(long, default_value_t = 1)]
        channels: usize,
        #[arg(long, default_value_t = 2.0)]
        duration: f64,
        #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,
        #[arg(long)]
        output: PathBuf,
    },
    /// Derive the session offset from a sound level meter reading
    Calibrate {
        /// SLM reading of the 1 kHz reference tone (dB)
        #[arg(long, allow_negative_numbers = true)]
        slm_reading: f64,
        /// Level the reference tone was played at (dB FS)
        #[arg(long, default_value_t = -30.0, allow_negative_numbers = true)]
        cal_level: f64,
    },
    /// Print the RETSPL reference table
    Retspl,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Score {
            dir,
            reversals,
            output,
            strict,
        } => run_score(dir, reversals, output, strict),
        Commands::Simulate {
            config,
            threshold,
            slope,
            seed,
            output,
        } => run_simulate(config, threshold, slope, seed, output),
        Commands::Stimulus {
            freq,
            channels,
            duration,
            sample_rate,
            output,
        } => run_stimulus(freq, channels, duration, sample_rate, output),
        Commands::Calibrate {
            slm_reading,
            cal_level,
        } => run_calibrate(slm_reading, cal_level),
        Commands::Retspl => run_retspl(),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn run_score(dir: PathBuf, reversals: i64, output: PathBuf, strict: bool) -> Result<ExitCode> {
    let policy = if strict {
        ShortfallPolicy::Reject
    } else {
        ShortfallPolicy::AverageAvailable
    };

    let rows = scoring::load_dir(&dir)
        .with_context(|| format!("loading trial files from {}", dir.display()))?;
    let thresholds = ThresholdScorer::new(policy)
        .score(&rows, reversals)
        .context("scoring thresholds")?;
    scoring::write_thresholds(&output, &thresholds)?;

    print!("{}", scoring::thresholds_csv(&thresholds));
    Ok(ExitCode::from(0))
}

fn run_simulate(
    config_path: Option<PathBuf>,
    threshold: f64,
    slope: f64,
    seed: u64,
    output: PathBuf,
) -> Result<ExitCode> {
    let config = match config_path {
        Some(path) => SessionConfig::load_from_file(&path)
            .with_context(|| format!("reading session config {}", path.display()))?,
        None => SessionConfig::default(),
    };

    let recorder = CsvRecorder::open(&output)?;
    let mut controller = TrialController::with_seed(config, SilentPresenter::new(), recorder, seed)
        .context("starting session")?;
    let mut listener = SimulatedListener::new(threshold, slope, seed);

    let results = match controller.run_with(&mut listener) {
        Ok(results) => results,
        Err(err) => bail!("session stopped (code {}): {}", err.code(), err.message()),
    };

    for result in &results {
        if result.aborted {
            println!("{} Hz: aborted after {} trials", result.frequency, result.trials);
        } else {
            println!(
                "{} Hz: {} trials, reversals {:?}",
                result.frequency, result.trials, result.reversals
            );
        }
    }
    println!(
        "{} trials written to {}",
        controller.trials_completed(),
        output.display()
    );

    let aborted = results.iter().any(|r| r.aborted);
    Ok(ExitCode::from(if aborted { 2 } else { 0 }))
}

fn run_stimulus(
    freq: f64,
    channels: usize,
    duration: f64,
    sample_rate: u32,
    output: PathBuf,
) -> Result<ExitCode> {
    let buffer = stimulus::synthesize(&StimulusParams {
        sample_rate,
        ..StimulusParams::new(duration, freq, channels)
    })?;
    buffer
        .write_wav(&output)
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "{} Hz, {} channel(s), {} frames at {} Hz -> {}",
        freq,
        buffer.num_channels(),
        buffer.frames(),
        sample_rate,
        output.display()
    );
    Ok(ExitCode::from(0))
}

fn run_calibrate(slm_reading: f64, cal_level: f64) -> Result<ExitCode> {
    let calibration = SlmCalibration::new(cal_level, slm_reading);
    println!("slm_offset: {}", calibration.slm_offset());
    println!("calibration_offset: {}", calibration.calibration_offset());
    Ok(ExitCode::from(0))
}

fn run_retspl() -> Result<ExitCode> {
    println!("frequency_hz,retspl_db");
    for (frequency, offset) in retspl::RETSPL_TABLE {
        println!("{},{}", frequency, offset);
    }
    Ok(ExitCode::from(0))
}
