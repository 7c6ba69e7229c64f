//! Match worker - plays games back to back on its own engine pair.
//!
//! Each worker owns two engine processes and a private slice of the
//! opening book for its whole life. After every game it folds the result
//! into the shared [`MatchAggregate`] and reports progress to the
//! controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::aggregate::MatchAggregate;
use crate::authority::GameAuthority;
use crate::color::{ColorAssignment, EngineId};
use crate::debug_log::DebugLog;
use crate::engine_channel::{ChannelError, EngineChannel, EngineCommand};
use crate::game_driver::{GameDriver, GameError, GameOutcome, GameRecord};
use crate::opening::{Opening, OpeningError, OpeningSchedule};
use crate::report::{Forfeit, ForfeitKind, GameSummary, MatchEvent, RatingSnapshot};
use crate::sprt::SprtParameters;
use crate::time_control::TimeControl;

/// Errors that stop a worker.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// An engine could not be started or failed its greeting.
    #[error("Failed to start {engine:?}: {source}")]
    Startup {
        engine: EngineId,
        #[source]
        source: ChannelError,
    },
    /// A game was aborted.
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Opening(#[from] OpeningError),
}

/// Settings shared by every worker of a match.
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub time_control: TimeControl,
    /// How long past its clock an engine may stay silent before it is
    /// declared dead. Also bounds the startup greeting.
    pub response_grace: Duration,
    /// Print Elo and LLR every this many games (across all workers).
    pub rating_interval: u64,
}

/// State shared between the workers and the controller.
#[derive(Debug, Clone)]
pub struct SharedMatch {
    pub aggregate: Arc<MatchAggregate>,
    pub sprt: SprtParameters,
    pub events: UnboundedSender<MatchEvent>,
}

/// One worker and the engines it owns.
pub struct MatchWorker<A: GameAuthority> {
    id: usize,
    authority: A,
    engines: [EngineChannel; 2],
    schedule: OpeningSchedule,
    settings: WorkerSettings,
    shared: SharedMatch,
}

impl<A: GameAuthority> MatchWorker<A> {
    /// Spawns both engines and greets them.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Startup`] if an engine cannot be spawned or
    /// does not complete the greeting within the response grace, and
    /// [`WorkerError::Opening`] if `openings` is empty.
    pub fn start(
        id: usize,
        authority: A,
        commands: &[EngineCommand; 2],
        openings: Vec<Opening>,
        log: DebugLog,
        settings: WorkerSettings,
        shared: SharedMatch,
    ) -> Result<Self, WorkerError> {
        let schedule = OpeningSchedule::new(openings)?;
        let engine1 = start_engine(EngineId::Engine1, &commands[0], &log, settings)?;
        let engine2 = start_engine(EngineId::Engine2, &commands[1], &log, settings)?;
        tracing::info!(
            "Worker {} started: {} vs {} ({} openings)",
            id,
            engine1.name(),
            engine2.name(),
            schedule.len()
        );

        Ok(Self {
            id,
            authority,
            engines: [engine1, engine2],
            schedule,
            settings,
            shared,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn engine_name(&self, engine: EngineId) -> &str {
        self.engines[engine.index()].name()
    }

    /// Plays one game, folds it into the match totals and reports it.
    pub fn play_game(&mut self) -> Result<GameRecord, WorkerError> {
        let (opening, seats) = self.schedule.next_game();
        let driver = GameDriver::new(
            &self.authority,
            self.settings.time_control,
            self.settings.response_grace,
        );
        let record = driver.play(&mut self.engines, opening, seats)?;

        let tally = self.shared.aggregate.record(record.outcome, seats);
        self.emit(MatchEvent::GameFinished(GameSummary {
            worker: self.id,
            engine1: self.engine_name(EngineId::Engine1).to_string(),
            engine2: self.engine_name(EngineId::Engine2).to_string(),
            tally,
            forfeit: self.forfeit(record.outcome, seats),
        }));

        if self.settings.rating_interval > 0 && tally.games % self.settings.rating_interval == 0 {
            self.emit(MatchEvent::Rating(RatingSnapshot::compute(
                tally,
                &self.shared.sprt,
            )));
        }

        Ok(record)
    }

    /// Plays games until `stop` is set.
    ///
    /// The flag is checked between games; a game in progress always runs to
    /// completion. Returns the number of games this worker played.
    pub fn run(mut self, stop: &AtomicBool) -> Result<u64, WorkerError> {
        let mut played = 0;
        while !stop.load(Ordering::SeqCst) {
            self.play_game()?;
            played += 1;
        }
        tracing::info!("Worker {} stopped after {} games", self.id, played);
        Ok(played)
    }

    fn forfeit(&self, outcome: GameOutcome, seats: ColorAssignment) -> Option<Forfeit> {
        let kind = match outcome {
            GameOutcome::Normal(_) => return None,
            GameOutcome::Timeout(_) => ForfeitKind::OutOfTime,
            GameOutcome::IllegalMove(_) => ForfeitKind::IllegalMove,
        };
        let loser = seats.engine(outcome.forfeited_by()?);
        Some(Forfeit {
            engine: self.engine_name(loser).to_string(),
            kind,
        })
    }

    fn emit(&self, event: MatchEvent) {
        // The controller may already be gone during shutdown.
        let _ = self.shared.events.send(event);
    }
}

fn start_engine(
    engine: EngineId,
    command: &EngineCommand,
    log: &DebugLog,
    settings: WorkerSettings,
) -> Result<EngineChannel, WorkerError> {
    let label = match engine {
        EngineId::Engine1 => "engine1",
        EngineId::Engine2 => "engine2",
    };
    let startup = |source| WorkerError::Startup { engine, source };
    let mut channel = EngineChannel::spawn_command(command, Some(label), log.clone()).map_err(startup)?;
    channel.handshake(settings.response_grace).map_err(startup)?;
    Ok(channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_missing_engine_returns_startup_error() {
        #[derive(Clone)]
        struct NoRules;
        impl GameAuthority for NoRules {
            type Position = ();
            type Move = ();
            fn parse_position(
                &self,
                _: &str,
            ) -> Result<(), crate::authority::PositionError> {
                Ok(())
            }
            fn serialize(&self, _: &()) -> String {
                String::new()
            }
            fn parse_move(&self, _: &str) -> Option<()> {
                None
            }
            fn is_legal(&self, _: &(), _: &()) -> bool {
                false
            }
            fn apply(&self, _: &(), _: &()) {}
            fn is_terminal(&self, _: &()) -> bool {
                true
            }
            fn result(&self, _: &()) -> crate::authority::ColorResult {
                crate::authority::ColorResult::Draw
            }
        }

        let (events, _rx) = tokio::sync::mpsc::unbounded_channel();
        let shared = SharedMatch {
            aggregate: Arc::new(MatchAggregate::new()),
            sprt: SprtParameters::new(0.0, 5.0, 0.05, 0.05, false).unwrap(),
            events,
        };
        let settings = WorkerSettings {
            time_control: TimeControl::new(1000, 10),
            response_grace: Duration::from_millis(100),
            rating_interval: 10,
        };
        let openings = vec![Opening::parse("x5o/7/7/7/7/7/o5x x 0 1").unwrap()];
        let result = MatchWorker::start(
            1,
            NoRules,
            &[
                EngineCommand::new("/nonexistent/engine1"),
                EngineCommand::new("/nonexistent/engine2"),
            ],
            openings,
            DebugLog::disabled(),
            settings,
            shared,
        );
        assert!(matches!(
            result,
            Err(WorkerError::Startup {
                engine: EngineId::Engine1,
                ..
            })
        ));
    }

    #[test]
    fn test_worker_error_display() {
        let err = WorkerError::Startup {
            engine: EngineId::Engine2,
            source: ChannelError::Closed,
        };
        assert_eq!(
            err.to_string(),
            "Failed to start Engine2: Engine closed its output"
        );
    }
}
