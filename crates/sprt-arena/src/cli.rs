//! Command-line entry point.
//!
//! The arena is generic over the game being played, so the binary lives in
//! the crate that provides the rules:
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     sprt_arena::cli::main_with(AtaxxRules::default())
//! }
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::arena::{self, ArenaPlan};
use crate::authority::GameAuthority;
use crate::config::{MatchConfig, MatchSettings};
use crate::opening::{load_openings, partition_openings};
use crate::worker::WorkerSettings;

/// Run matches and SPRT between two engines.
#[derive(Parser, Debug, Default)]
#[command(name = "sprt-arena")]
#[command(about = "Run matches and SPRT between two engines")]
pub struct Args {
    /// TOML file with match settings; flags override its keys
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Engine 1 executable
    #[arg(long)]
    pub engine1: Option<PathBuf>,
    /// Engine 2 executable
    #[arg(long)]
    pub engine2: Option<PathBuf>,
    /// Argument passed to engine 1 (repeatable)
    #[arg(long = "engine1-arg", allow_hyphen_values = true)]
    pub engine1_args: Vec<String>,
    /// Argument passed to engine 2 (repeatable)
    #[arg(long = "engine2-arg", allow_hyphen_values = true)]
    pub engine2_args: Vec<String>,
    /// Number of games played at once
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Time control in seconds, <base>+<increment>
    #[arg(long)]
    pub tc: Option<String>,
    /// Opening book, one position per line
    #[arg(long)]
    pub openings: Option<PathBuf>,
    #[arg(long, allow_negative_numbers = true)]
    pub elo0: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub elo1: Option<f64>,
    #[arg(long)]
    pub alpha: Option<f64>,
    #[arg(long)]
    pub beta: Option<f64>,
    /// Use the cutechess LLR formula
    #[arg(long, alias = "cutechess_llr")]
    pub cutechess_llr: bool,
    /// Print current SPRT results every x games
    #[arg(long = "ratinginterval", alias = "rating-interval")]
    pub rating_interval: Option<u64>,
    /// Directory for per-worker engine transcripts
    #[arg(long)]
    pub debug_dir: Option<PathBuf>,
    /// Milliseconds an engine may overrun its clock before it counts as dead
    #[arg(long)]
    pub response_grace_ms: Option<u64>,
    /// Stop once the SPRT accepts either hypothesis
    #[arg(long)]
    pub stop_on_verdict: bool,
}

impl Args {
    /// The settings given as flags. Boolean flags only override when set.
    pub fn overrides(&self) -> MatchConfig {
        MatchConfig {
            engine1: self.engine1.clone(),
            engine2: self.engine2.clone(),
            engine1_args: non_empty(&self.engine1_args),
            engine2_args: non_empty(&self.engine2_args),
            concurrency: self.concurrency,
            tc: self.tc.clone(),
            openings: self.openings.clone(),
            elo0: self.elo0,
            elo1: self.elo1,
            alpha: self.alpha,
            beta: self.beta,
            cutechess_llr: self.cutechess_llr.then_some(true),
            rating_interval: self.rating_interval,
            debug_dir: self.debug_dir.clone(),
            response_grace_ms: self.response_grace_ms,
            stop_on_verdict: self.stop_on_verdict.then_some(true),
        }
    }

    /// Merges the config file (if any) with the flags and validates.
    pub fn settings(&self) -> anyhow::Result<MatchSettings> {
        let file = match &self.config {
            Some(path) => MatchConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => MatchConfig::default(),
        };
        Ok(file.merge(self.overrides()).resolve()?)
    }
}

fn non_empty(args: &[String]) -> Option<Vec<String>> {
    (!args.is_empty()).then(|| args.to_vec())
}

fn print_banner(settings: &MatchSettings) {
    let sprt = &settings.sprt;
    println!();
    println!("{} vs {}", settings.engines[0], settings.engines[1]);
    println!("Time control {} seconds", settings.time_control);
    println!("Concurrency {}", settings.concurrency);
    println!("Openings book {}", settings.openings.display());
    println!(
        "elo0 {} elo1 {} alpha {} beta {} cutechess_llr {}",
        sprt.elo0, sprt.elo1, sprt.alpha, sprt.beta, sprt.cutechess_llr
    );
    println!("Rating interval {}", settings.rating_interval);
    println!();
}

/// Builds the plan for `settings`: loads, shuffles and splits the book.
pub fn plan(settings: &MatchSettings) -> anyhow::Result<ArenaPlan> {
    let openings = load_openings(&settings.openings)
        .with_context(|| format!("loading {}", settings.openings.display()))?;
    let partitions = partition_openings(openings, settings.concurrency, &mut rand::thread_rng())?;

    Ok(ArenaPlan {
        engines: settings.engines.clone(),
        partitions,
        settings: WorkerSettings {
            time_control: settings.time_control,
            response_grace: settings.response_grace,
            rating_interval: settings.rating_interval,
        },
        sprt: settings.sprt,
        debug_dir: settings.debug_dir.clone(),
        stop_on_verdict: settings.stop_on_verdict,
    })
}

/// Runs a match from parsed arguments.
pub async fn run<A: GameAuthority>(args: Args, authority: A) -> anyhow::Result<()> {
    let settings = args.settings()?;
    print_banner(&settings);

    let plan = plan(&settings)?;
    let final_snapshot = arena::run(authority, plan).await?;

    println!();
    println!("Final results");
    println!(
        "Total w-l-d {}-{}-{} ({})",
        final_snapshot.tally.wins,
        final_snapshot.tally.losses,
        final_snapshot.tally.draws,
        final_snapshot.tally.games
    );
    println!("{}", final_snapshot);
    Ok(())
}

/// Parses the process arguments, starts logging and runs the match.
pub fn main_with<A: GameAuthority>(authority: A) -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt().try_init();
    let args = Args::parse();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(args, authority))
}
