//! Workers playing against scripted engines and sharing one aggregate.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{opening_line, scripted_engine, ScriptedRules};
use sprt_arena::debug_log::DebugLog;
use sprt_arena::engine_channel::{ChannelError, EngineCommand};
use sprt_arena::opening::Opening;
use sprt_arena::report::{Forfeit, ForfeitKind, MatchEvent};
use sprt_arena::worker::{MatchWorker, SharedMatch, WorkerError, WorkerSettings};
use sprt_arena::{
    Color, GameError, GameOutcome, MatchAggregate, SprtParameters, TimeControl,
};
use tokio::sync::mpsc::{self, UnboundedReceiver};

fn shared() -> (SharedMatch, UnboundedReceiver<MatchEvent>) {
    let (events, rx) = mpsc::unbounded_channel();
    let shared = SharedMatch {
        aggregate: Arc::new(MatchAggregate::new()),
        sprt: SprtParameters::new(0.0, 5.0, 0.05, 0.05, false).unwrap(),
        events,
    };
    (shared, rx)
}

fn settings(rating_interval: u64) -> WorkerSettings {
    WorkerSettings {
        time_control: TimeControl::new(10_000, 100),
        response_grace: Duration::from_secs(2),
        rating_interval,
    }
}

fn openings(count: usize) -> Vec<Opening> {
    (0..count)
        .map(|n| Opening::parse(&opening_line("x", n)).unwrap())
        .collect()
}

fn start(
    id: usize,
    commands: &[EngineCommand; 2],
    rating_interval: u64,
    shared: SharedMatch,
) -> MatchWorker<ScriptedRules> {
    MatchWorker::start(
        id,
        ScriptedRules,
        commands,
        openings(2),
        DebugLog::disabled(),
        settings(rating_interval),
        shared,
    )
    .unwrap()
}

fn drain(rx: &mut UnboundedReceiver<MatchEvent>) -> Vec<MatchEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[test]
fn test_parallel_workers_count_every_game_once() {
    let (shared, mut rx) = shared();
    let commands = [
        scripted_engine(&["--reply", "b2"]),
        scripted_engine(&["--reply", "c3"]),
    ];

    let handles: Vec<_> = (1..=2)
        .map(|id| {
            let shared = shared.clone();
            let commands = commands.clone();
            thread::spawn(move || {
                let mut worker = start(id, &commands, 10, shared);
                for _ in 0..50 {
                    worker.play_game().unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let tally = shared.aggregate.snapshot();
    assert_eq!(tally.games, 100);
    assert_eq!(tally.wins + tally.losses + tally.draws, 100);
    assert_eq!(tally.draws, 100);

    let events = drain(&mut rx);
    let finished = events
        .iter()
        .filter(|e| matches!(e, MatchEvent::GameFinished(_)))
        .count();
    assert_eq!(finished, 100);

    let mut rated: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            MatchEvent::Rating(snapshot) => Some(snapshot.tally.games),
            _ => None,
        })
        .collect();
    rated.sort_unstable();
    assert_eq!(rated, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
}

#[test]
fn test_each_opening_is_played_with_both_colors() {
    let (shared, _rx) = shared();
    let commands = [
        scripted_engine(&["--reply", "mate"]),
        scripted_engine(&["--reply", "mate"]),
    ];
    let mut worker = start(1, &commands, 100, shared.clone());

    worker.play_game().unwrap();
    worker.play_game().unwrap();

    let tally = shared.aggregate.snapshot();
    assert_eq!(tally.games, 2);
    assert_eq!(tally.wins, 1);
    assert_eq!(tally.losses, 1);
    assert_eq!(tally.red_wins, 2);
    assert_eq!(tally.red_losses, 0);
}

#[test]
fn test_forfeit_names_the_losing_engine() {
    let (shared, mut rx) = shared();
    let commands = [
        scripted_engine(&["--name", "Broken", "--reply", "zz"]),
        scripted_engine(&["--name", "Steady", "--reply", "b2"]),
    ];
    let mut worker = start(3, &commands, 100, shared.clone());
    assert_eq!(worker.engine_name(sprt_arena::EngineId::Engine1), "Broken");

    let record = worker.play_game().unwrap();
    assert_eq!(record.outcome, GameOutcome::IllegalMove(Color::Red));

    let events = drain(&mut rx);
    let summary = match events.as_slice() {
        [MatchEvent::GameFinished(summary)] => summary.clone(),
        other => panic!("unexpected events: {:?}", other),
    };
    assert_eq!(
        summary.forfeit,
        Some(Forfeit {
            engine: "Broken".to_string(),
            kind: ForfeitKind::IllegalMove,
        })
    );
    assert_eq!(
        summary.to_string(),
        "(Broken vs Steady, worker 3) Total w-l-d 0-1-0 (1) Broken illegal move"
    );
    assert_eq!(shared.aggregate.snapshot().losses, 1);
}

#[test]
fn test_failed_game_is_not_counted() {
    let (shared, _rx) = shared();
    let commands = [
        scripted_engine(&["--reply", "b2"]),
        scripted_engine(&["--silent"]),
    ];
    let mut worker = MatchWorker::start(
        1,
        ScriptedRules,
        &commands,
        openings(1),
        DebugLog::disabled(),
        WorkerSettings {
            time_control: TimeControl::new(200, 0),
            response_grace: Duration::from_millis(200),
            rating_interval: 1,
        },
        shared.clone(),
    )
    .unwrap();

    let err = worker.play_game().unwrap_err();
    assert!(matches!(
        err,
        WorkerError::Game(GameError::ProcessFailure {
            color: Color::Blue,
            source: ChannelError::Unresponsive(_),
        })
    ));
    assert_eq!(shared.aggregate.snapshot().games, 0);
}

#[test]
fn test_run_returns_once_stopped() {
    let (shared, _rx) = shared();
    let commands = [
        scripted_engine(&["--reply", "mate"]),
        scripted_engine(&["--reply", "mate"]),
    ];
    let worker = start(1, &commands, 100, shared.clone());

    let stop = Arc::new(AtomicBool::new(false));
    let stopper = {
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            stop.store(true, Ordering::SeqCst);
        })
    };
    let played = worker.run(&stop).unwrap();
    stopper.join().unwrap();

    assert_eq!(played, shared.aggregate.snapshot().games);
}

#[test]
fn test_run_with_stop_already_set_plays_nothing() {
    let (shared, _rx) = shared();
    let commands = [
        scripted_engine(&["--reply", "b2"]),
        scripted_engine(&["--reply", "b2"]),
    ];
    let worker = start(1, &commands, 100, shared.clone());

    let stop = AtomicBool::new(true);
    assert_eq!(worker.run(&stop).unwrap(), 0);
    assert_eq!(shared.aggregate.snapshot().games, 0);
}
