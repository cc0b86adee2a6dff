// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tcg_measure_cli::commands::measure::{parse_event_type, MeasureRequest};
use tcg_measure_cli::commands::{hash, inspect, measure, replay, status, Input};
use tcg_measure_cli::session::{parse_algorithm, ProfileArgs};
use tcg_measure_cli::telemetry;

#[derive(Parser)]
#[command(name = "tcgm")]
#[command(about = "Trusted measurement service tool: measure, inspect and replay TCG event logs", long_about = None)]
struct Cli {
    #[command(flatten)]
    profile: ProfileArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the capability report and event log location.
    Status {
        /// Event log image to restore before reporting
        #[arg(long)]
        log: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Hash a file or string.
    Hash {
        file: Option<PathBuf>,

        #[arg(long)]
        text: Option<String>,

        #[arg(long, short, default_value = "sha1")]
        algorithm: String,
    },
    /// Hash, extend and log one event. Creates the log image if missing.
    Measure {
        /// Event log image to append to
        #[arg(long)]
        log: PathBuf,

        /// Target register
        #[arg(long)]
        pcr: u32,

        /// Event type name (EV_IPL) or number
        #[arg(long, default_value = "EV_POST_CODE")]
        event_type: String,

        #[arg(long, short, default_value = "sha1")]
        algorithm: String,

        /// File whose contents are measured
        file: Option<PathBuf>,

        /// Measure this string instead of a file
        #[arg(long)]
        text: Option<String>,

        /// Opaque event data stored with the entry
        #[arg(long, default_value = "")]
        event_data: String,

        /// Log without extending (EV_NO_ACTION)
        #[arg(long)]
        note: bool,

        #[arg(long)]
        json: bool,
    },
    /// List the entries of an event log image.
    Inspect { log: PathBuf },
    /// Replay an event log image into register values.
    Replay {
        log: PathBuf,

        /// JSON list of {pcr, algorithm, value} the replay must reproduce
        #[arg(long)]
        expect: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    telemetry::init_telemetry();

    let cli = Cli::parse();

    match cli.command {
        Commands::Status { log, json } => status::run(&cli.profile, log.as_deref(), json),
        Commands::Hash {
            file,
            text,
            algorithm,
        } => hash::run(&cli.profile, &algorithm, &Input::from_args(file, text)?),
        Commands::Measure {
            log,
            pcr,
            event_type,
            algorithm,
            file,
            text,
            event_data,
            note,
            json,
        } => {
            let request = MeasureRequest {
                log,
                pcr,
                event_type: parse_event_type(&event_type)?,
                algorithm: parse_algorithm(&algorithm)?,
                input: Input::from_args(file, text)?,
                event_data: event_data.into_bytes(),
                note,
            };
            measure::run(&cli.profile, &request, json)
        }
        Commands::Inspect { log } => inspect::run(&log),
        Commands::Replay { log, expect } => replay::run(&log, expect.as_deref()),
    }
}
