//! Progress lines printed while a match runs.

use std::fmt;

use crate::aggregate::Tally;
use crate::sprt::{elo_with_confidence, EloEstimate, SprtParameters, Verdict};

/// Why a game ended before reaching a result on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForfeitKind {
    OutOfTime,
    IllegalMove,
}

/// A game lost by forfeit, named after the engine that lost it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forfeit {
    pub engine: String,
    pub kind: ForfeitKind,
}

/// Running totals after one finished game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    pub worker: usize,
    pub engine1: String,
    pub engine2: String,
    pub tally: Tally,
    pub forfeit: Option<Forfeit>,
}

impl fmt::Display for GameSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({} vs {}, worker {}) Total w-l-d {}-{}-{} ({})",
            self.engine1,
            self.engine2,
            self.worker,
            self.tally.wins,
            self.tally.losses,
            self.tally.draws,
            self.tally.games
        )?;
        match &self.forfeit {
            Some(Forfeit {
                engine,
                kind: ForfeitKind::OutOfTime,
            }) => write!(f, " {} out of time", engine),
            Some(Forfeit {
                engine,
                kind: ForfeitKind::IllegalMove,
            }) => write!(f, " {} illegal move", engine),
            None => Ok(()),
        }
    }
}

/// Elo, LLR and verdict for one consistent set of totals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSnapshot {
    pub tally: Tally,
    pub elo: EloEstimate,
    pub llr: f64,
    pub lower: f64,
    pub upper: f64,
    pub verdict: Verdict,
}

impl RatingSnapshot {
    pub fn compute(tally: Tally, sprt: &SprtParameters) -> Self {
        let llr = sprt.log_likelihood_ratio(tally.wins, tally.losses, tally.draws);
        Self {
            tally,
            elo: elo_with_confidence(tally.wins, tally.losses, tally.draws),
            llr,
            lower: sprt.lower(),
            upper: sprt.upper(),
            verdict: sprt.verdict(llr),
        }
    }
}

impl fmt::Display for RatingSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Red w-l {}-{} | Blue w-l {}-{}",
            self.tally.red_wins, self.tally.red_losses, self.tally.red_losses, self.tally.red_wins
        )?;
        writeln!(
            f,
            "ELO: {:.1} +- {:.1} ({:.1}, {:.1})",
            self.elo.mid,
            self.elo.error_margin(),
            self.elo.low,
            self.elo.high
        )?;
        writeln!(
            f,
            "LLR: {} ({}, {})",
            significant(self.llr, 3),
            significant(self.lower, 3),
            significant(self.upper, 3)
        )?;
        write!(f, "{}", self.verdict)
    }
}

/// Formats `value` to `digits` significant digits.
///
/// Fixed notation keeps at least one decimal and drops trailing zeros;
/// exponents below -4 or at `digits - 1` and above switch to scientific
/// notation (`1.23e+02`).
fn significant(value: f64, digits: usize) -> String {
    let digits = digits.max(1);
    if value == 0.0 || !value.is_finite() {
        return format!("{:.1}", value);
    }
    let scientific = format!("{:.*e}", digits - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= digits as i32 - 1 {
        let mantissa = if mantissa.contains('.') {
            mantissa.trim_end_matches('0').trim_end_matches('.')
        } else {
            mantissa
        };
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
    }

    let decimals = (digits as i32 - 1 - exponent) as usize;
    let fixed = format!("{:.*}", decimals, value);
    let trimmed = fixed.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Everything a worker tells the controller.
#[derive(Debug, Clone)]
pub enum MatchEvent {
    GameFinished(GameSummary),
    Rating(RatingSnapshot),
    WorkerFailed { worker: usize, error: String },
}
