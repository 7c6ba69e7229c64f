//! Match totals shared by every worker.

use std::sync::{Mutex, PoisonError};

use crate::authority::ColorResult;
use crate::color::{Color, ColorAssignment, EngineId};
use crate::game_driver::GameOutcome;

/// A consistent copy of the match totals.
///
/// Wins and losses are from engine 1's point of view. `red_wins` and
/// `red_losses` count games by color regardless of which engine was Red.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub games: u64,
    pub wins: u64,
    pub losses: u64,
    pub draws: u64,
    pub red_wins: u64,
    pub red_losses: u64,
}

impl Tally {
    /// Adds one game.
    pub fn record(&mut self, outcome: GameOutcome, seats: ColorAssignment) {
        self.games += 1;
        match outcome.color_result() {
            ColorResult::RedWins => {
                self.red_wins += 1;
                self.credit_engine1(seats.engine(Color::Red));
            }
            ColorResult::BlueWins => {
                self.red_losses += 1;
                self.credit_engine1(seats.engine(Color::Blue));
            }
            ColorResult::Draw => self.draws += 1,
        }
    }

    fn credit_engine1(&mut self, winner: EngineId) {
        match winner {
            EngineId::Engine1 => self.wins += 1,
            EngineId::Engine2 => self.losses += 1,
        }
    }
}

/// Totals updated concurrently by all workers.
///
/// All six counters live behind one lock so a reader can never observe a
/// game counted in `games` but not yet in `wins`/`losses`/`draws`.
#[derive(Debug, Default)]
pub struct MatchAggregate {
    tally: Mutex<Tally>,
}

impl MatchAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one game in and returns the totals including it.
    ///
    /// Every game count is returned to exactly one caller, which is what
    /// makes interval reporting fire once per multiple.
    pub fn record(&self, outcome: GameOutcome, seats: ColorAssignment) -> Tally {
        let mut tally = self.tally.lock().unwrap_or_else(PoisonError::into_inner);
        tally.record(outcome, seats);
        *tally
    }

    pub fn snapshot(&self) -> Tally {
        *self.tally.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const E1_RED: ColorAssignment = ColorAssignment::with_red(EngineId::Engine1);
    const E2_RED: ColorAssignment = ColorAssignment::with_red(EngineId::Engine2);

    #[test]
    fn normal_results_credit_the_engine_on_that_color() {
        let mut t = Tally::default();
        t.record(GameOutcome::Normal(ColorResult::RedWins), E1_RED);
        t.record(GameOutcome::Normal(ColorResult::RedWins), E2_RED);
        t.record(GameOutcome::Normal(ColorResult::BlueWins), E2_RED);
        t.record(GameOutcome::Normal(ColorResult::Draw), E1_RED);
        assert_eq!(
            t,
            Tally {
                games: 4,
                wins: 2,
                losses: 1,
                draws: 1,
                red_wins: 2,
                red_losses: 1,
            }
        );
    }

    #[test]
    fn forfeits_never_count_as_draws() {
        let mut t = Tally::default();
        t.record(GameOutcome::Timeout(Color::Red), E1_RED);
        t.record(GameOutcome::IllegalMove(Color::Red), E2_RED);
        assert_eq!(t.draws, 0);
        assert_eq!(t.wins, 1);
        assert_eq!(t.losses, 1);
        assert_eq!(t.red_losses, 2);
    }

    #[test]
    fn concurrent_records_keep_totals_consistent() {
        let aggregate = Arc::new(MatchAggregate::new());
        let outcomes = [
            GameOutcome::Normal(ColorResult::RedWins),
            GameOutcome::Normal(ColorResult::BlueWins),
            GameOutcome::Normal(ColorResult::Draw),
            GameOutcome::Timeout(Color::Blue),
            GameOutcome::IllegalMove(Color::Red),
        ];

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let aggregate = Arc::clone(&aggregate);
                thread::spawn(move || {
                    for game in 0..250 {
                        let seats = if game % 2 == 0 { E1_RED } else { E2_RED };
                        let t = aggregate.record(outcomes[(worker + game) % outcomes.len()], seats);
                        assert_eq!(t.wins + t.losses + t.draws, t.games);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let t = aggregate.snapshot();
        assert_eq!(t.games, 2000);
        assert_eq!(t.wins + t.losses + t.draws, t.games);
        assert_eq!(t.red_wins + t.red_losses + t.draws, t.games);
    }

    #[test]
    fn each_game_count_is_returned_once() {
        let aggregate = Arc::new(MatchAggregate::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let aggregate = Arc::clone(&aggregate);
                thread::spawn(move || {
                    (0..100)
                        .map(|_| {
                            aggregate
                                .record(GameOutcome::Normal(ColorResult::Draw), E1_RED)
                                .games
                        })
                        .collect::<Vec<u64>>()
                })
            })
            .collect();
        let mut seen: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (1..=400).collect::<Vec<u64>>());
    }
}
