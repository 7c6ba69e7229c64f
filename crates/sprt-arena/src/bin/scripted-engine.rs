//! Scripted engine - answers every `go` with the same move.
//!
//! Speaks just enough of the protocol for the arena to drive it. Used by
//! the integration tests to stand in for real engines, including broken
//! ones that stall, exit, or overrun their clock.

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use clap::Parser;

#[derive(Parser)]
#[command(name = "scripted-engine")]
#[command(about = "Engine stand-in that always plays the same move")]
struct Args {
    /// Name reported in the greeting
    #[arg(long, default_value = "Scripted")]
    name: String,
    /// Move sent after every `go`
    #[arg(long, default_value = "0000")]
    reply: String,
    /// Never answer `go`
    #[arg(long)]
    silent: bool,
    /// Exit as soon as `go` arrives
    #[arg(long)]
    exit_on_go: bool,
    /// Think this long before answering `go`
    #[arg(long, default_value = "0")]
    delay_ms: u64,
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    let stdin = io::stdin();
    let mut out = io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line?;
        let command = line.split_whitespace().next().unwrap_or_default();
        match command {
            "uai" => {
                writeln!(out, "id name {}", args.name)?;
                writeln!(out, "id author sprt-arena")?;
                writeln!(out, "uaiok")?;
            }
            "isready" => writeln!(out, "readyok")?,
            "go" => {
                if args.exit_on_go {
                    return Ok(());
                }
                if args.silent {
                    continue;
                }
                if args.delay_ms > 0 {
                    thread::sleep(Duration::from_millis(args.delay_ms));
                }
                writeln!(out, "info depth 1 score cp 0")?;
                writeln!(out, "bestmove {}", args.reply)?;
            }
            "quit" => return Ok(()),
            _ => {}
        }
        out.flush()?;
    }
    Ok(())
}
