//! hodoscope-cli: Command-line interface for hodoscope reconstruction.
//!
//! Runs the per-event pipeline over a JSON-lines event file and writes
//! one report per event, plus the TOF calibration dump on request.
#![allow(clippy::cast_precision_loss, clippy::too_many_lines)]

use clap::{Parser, Subcommand};
use hodoscope_algorithms::Hodoscope;
use hodoscope_core::{EventStatus, EventTypeClassifier};
use hodoscope_io::{
    load_config, EventFileReader, EventRecord, OutputFormat, ReportWriter, TofDumpWriter,
};
use log::{info, LevelFilter};
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    HodoscopeIo(#[from] hodoscope_io::Error),
}

/// Scintillator hodoscope hit reconstruction.
#[derive(Parser)]
#[command(name = "hodoscope")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct every event of a JSON-lines file
    Process {
        /// Parameter file (JSON object of key -> value/array)
        #[arg(long)]
        params: PathBuf,

        /// Parameter name prefix of the detector
        #[arg(long, default_value = "h")]
        prefix: String,

        /// Input event file, one JSON event per line
        #[arg(short, long)]
        input: PathBuf,

        /// Report file (.jsonl or .csv)
        #[arg(short, long)]
        output: PathBuf,

        /// Write the TOF calibration dump to this file
        #[arg(long)]
        tof_dump: Option<PathBuf>,

        /// Event types treated as pedestal events
        #[arg(long = "pedestal-event-type", num_args = 1..)]
        pedestal_event_types: Vec<u32>,

        /// Stop after this many events
        #[arg(long)]
        max_events: Option<usize>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the plane layout of a parameter file
    Info {
        /// Parameter file
        #[arg(long)]
        params: PathBuf,

        /// Parameter name prefix of the detector
        #[arg(long, default_value = "h")]
        prefix: String,

        /// Optional event file to count events in
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    // a second call (tests) keeps the first logger
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

fn read_events(reader: &EventFileReader, max_events: Option<usize>) -> Result<Vec<EventRecord>> {
    let records = match max_events {
        Some(n) => reader
            .records()
            .take(n)
            .collect::<hodoscope_io::Result<Vec<_>>>()?,
        None => reader.read_all()?,
    };
    Ok(records)
}

fn main() -> Result<()> {
    run(Cli::parse())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Process {
            params,
            prefix,
            input,
            output,
            tof_dump,
            pedestal_event_types,
            max_events,
            verbose,
        } => {
            init_logging(verbose);
            let config = load_config(&params, &prefix)?;
            let mut hodoscope = Hodoscope::new(config);
            let classifier = EventTypeClassifier::new(pedestal_event_types);

            let format = OutputFormat::from_path(&output)?;
            let mut writer = ReportWriter::create(&output, format)?;
            let mut dump_writer = tof_dump.as_ref().map(TofDumpWriter::create).transpose()?;

            let start = Instant::now();
            let reader = EventFileReader::open(&input)?;
            info!("Reading {} ({} bytes)", input.display(), reader.len());
            let records = read_events(&reader, max_events)?;

            let mut pedestal = 0usize;
            let mut empty = 0usize;
            let mut good_start_time = 0usize;
            for record in &records {
                let report =
                    hodoscope.process_event(&record.event, &record.tracks, &classifier, record);
                match report.status {
                    EventStatus::Pedestal => pedestal += 1,
                    EventStatus::Empty => empty += 1,
                    EventStatus::Processed => {}
                }
                if report.focal_plane.good_start_time {
                    good_start_time += 1;
                }
                if let Some(dump) = dump_writer.as_mut() {
                    dump.write(&report.tof_dump)?;
                }
                writer.write(&report)?;
            }
            writer.flush()?;
            if let Some(dump) = dump_writer.as_mut() {
                dump.flush()?;
                info!("TOF dump: {} events", dump.events());
            }
            if hodoscope.pedestals_pending() {
                info!("Run ended with pedestal events still pending");
            }

            let elapsed = start.elapsed();
            println!(
                "Processed {} events in {:.2}s",
                records.len(),
                elapsed.as_secs_f64()
            );
            println!("Pedestal events: {pedestal}");
            println!("Empty events: {empty}");
            println!("Good start time: {good_start_time}");
            println!("Reports written to: {}", output.display());
        }

        Commands::Info {
            params,
            prefix,
            input,
        } => {
            init_logging(false);
            let config = load_config(&params, &prefix)?;

            println!("Parameters: {}", params.display());
            println!(
                "{:<6} | {:>6} | {:>4} | {:>8} | {:>8}",
                "Plane", "Number", "View", "Paddles", "z (cm)"
            );
            println!("{:-<46}", "");
            for plane in &config.planes {
                println!(
                    "{:<6} | {:>6} | {:>4} | {:>8} | {:>8.2}",
                    plane.name,
                    plane.number,
                    format!("{:?}", plane.view),
                    plane.n_paddles(),
                    plane.z_pos
                );
            }
            println!("Time correction: {:?}", config.timing.mode);
            println!("ADC mode: {:?}", config.timing.adc_mode);
            println!("Beta planes: {}", config.n_beta_planes());

            if let Some(input) = input {
                let reader = EventFileReader::open(&input)?;
                println!("File: {}", input.display());
                println!(
                    "Size: {} bytes ({:.2} MB)",
                    reader.len(),
                    reader.len() as f64 / 1_000_000.0
                );
                println!("Events: {}", reader.event_count());
            }
        }
    }

    Ok(())
}
