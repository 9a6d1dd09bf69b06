// SPDX-License-Identifier: MIT

//!
//! *Part of the wider OpenAtlas project*
//!
//! Check a dataset, list its interest dates, and print what the map shows at
//! a date
//!

use clap::{CommandFactory, Parser, ValueEnum, builder::PossibleValue};
use open_atlas_core::{Instant, Rounding, is_present};
use open_atlas_engine::{
    Atlas, AtlasConfig, Bookmark, LoadOptions, MapSessionState, TransportControl, TransportEvent,
};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, TermLogger, TerminalMode,
};
use std::path::PathBuf;

#[macro_use]
extern crate log;
extern crate simplelog;

/// OpenAtlas entry point
///
/// One of:
/// - Lint a dataset
/// - List its interest dates
/// - Print the layer state at a date
/// - Play through the time range
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    // Setup logging
    let config_log = ConfigBuilder::new()
        .add_filter_allow_str("open_atlas")
        .build();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    CombinedLogger::init(vec![TermLogger::new(
        level,
        config_log,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )])?;

    let config = match &args.config {
        Some(path) => match AtlasConfig::load(path) {
            Ok(config) => config,
            Err(error) => {
                eprintln!("Error: {error}");
                std::process::exit(1);
            }
        },
        None => AtlasConfig::default(),
    };

    // Loading is all or nothing, so nothing else happens if it fails
    let options = LoadOptions {
        now: Instant::now(),
        exclusions: config.exclusions.clone(),
    };
    let atlas = match Atlas::from_path(&args.dataset, &options) {
        Ok(atlas) => atlas,
        Err(error) => {
            eprintln!("Error: {error}");
            std::process::exit(1);
        }
    };

    match (&args.cli_command, &args.date) {
        //----------------------------------------------------------------------
        // Valid
        //----------------------------------------------------------------------
        (Command::Lint, _) => println!(
            "Valid: {} features ({} excluded), {} interest dates",
            atlas.features().len(),
            atlas.excluded().len(),
            atlas.index().len()
        ),
        (Command::Dates, _) => print_dates(&atlas),
        (Command::State, Some(date)) => {
            let mut session = start_session(&atlas, &config);
            let query = if is_present(date) {
                atlas.now()
            } else {
                match Instant::parse(date, Rounding::Start) {
                    Ok(query) => query,
                    Err(error) => {
                        eprintln!("Error: {error}");
                        std::process::exit(1);
                    }
                }
            };
            let transport = TransportControl::from_config(&atlas, &config);
            let query = transport.handle(&mut session, TransportEvent::SetQuery(query));
            info!("Showing {}", query.as_long_date_format());
            let layers = if args.only_visible {
                atlas.evaluate_visible(&session)
            } else {
                atlas.evaluate(&session)
            };
            println!("{}", serde_json::to_string_pretty(&layers)?);
        }
        (Command::Play, _) => {
            let mut session = start_session(&atlas, &config);
            let transport = TransportControl::from_config(&atlas, &config);
            transport.handle(&mut session, TransportEvent::Play);
            let ticks = args.ticks.unwrap_or(config.play_steps);
            for _ in 0..ticks {
                let query = transport.handle(&mut session, TransportEvent::Advance);
                println!(
                    "{:>16}  {} visible",
                    query.as_long_date_format(),
                    atlas.evaluate_visible(&session).len()
                );
                if !session.is_playing() {
                    break;
                }
            }
            println!("{}", Bookmark::from_session(&session).to_query_string());
        }
        //----------------------------------------------------------------------
        // Invalid
        //----------------------------------------------------------------------
        _ => {
            eprintln!("CLI Error: invalid options");
            Cli::command().print_long_help()?;
            std::process::exit(1);
        }
    }

    Ok(())
}

fn start_session(atlas: &Atlas, config: &AtlasConfig) -> MapSessionState {
    match atlas.start_session(config, &Bookmark::default()) {
        Ok(session) => session,
        Err(error) => {
            eprintln!("Error: {error}");
            std::process::exit(1);
        }
    }
}

/// One line per interest date, with the features that start and stop there
fn print_dates(atlas: &Atlas) {
    let ids = |positions: &[usize]| -> String {
        positions
            .iter()
            .filter_map(|position| atlas.feature_at(*position))
            .map(|feature| feature.id().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let index = atlas.index();
    for (i, date) in index.dates().iter().enumerate() {
        println!(
            "{:>16}  {:>4} active  +[{}]  -[{}]",
            date.as_long_date_format(),
            index.active_at(i).len(),
            ids(index.adds(i)),
            ids(index.removes(i))
        );
    }
    debug!("Printed {} interest dates", index.len());
}

/// OpenAtlas CLI args using [clap]
#[derive(Parser, Debug)]
#[command(
    version,
    about = "OpenAtlas tool for checking and exploring datasets",
    after_help = "Dataset files may be plain JSON or a JS assignment (`dataNA = {...};`)"
)]
pub struct Cli {
    // What to do
    #[arg(value_enum)]
    pub cli_command: Command,

    /// Path to the dataset
    #[arg(long)]
    pub dataset: PathBuf,

    /// Date literal to show (e.g. 1776:07:04, 44BC, or present)
    #[arg(long)]
    pub date: Option<String>,

    /// Only print visible layers
    #[arg(long)]
    pub only_visible: bool,

    /// How many play ticks to run (defaults to the config's play steps)
    #[arg(long)]
    pub ticks: Option<u32>,

    /// Path to the config
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log debug messages
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub enum Command {
    Lint,
    Dates,
    State,
    Play,
}

impl ValueEnum for Command {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Lint, Self::Dates, Self::State, Self::Play]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        match self {
            Command::Lint => Some(PossibleValue::new("lint").help("Check the dataset loads")),
            Command::Dates => Some(
                PossibleValue::new("dates")
                    .help("List the interest dates and what starts and stops at each"),
            ),
            Command::State => Some(
                PossibleValue::new("state").help("Print the layer state at --date as JSON"),
            ),
            Command::Play => Some(
                PossibleValue::new("play").help("Play through the time range, printing each tick"),
            ),
        }
    }
}
