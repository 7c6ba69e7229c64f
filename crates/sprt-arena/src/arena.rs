//! Runs all workers of a match and prints their progress.
//!
//! Workers are blocking tasks on the tokio runtime. The controller owns
//! stdout: it receives [`MatchEvent`]s from every worker and prints them
//! one at a time. A decided SPRT (with `stop_on_verdict`) or ctrl-c, which
//! is watched by its own task, sets the stop flag every worker polls.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::signal;
use tokio::sync::mpsc;

use crate::aggregate::MatchAggregate;
use crate::authority::GameAuthority;
use crate::debug_log::{prepare_debug_dir, DebugLog};
use crate::engine_channel::EngineCommand;
use crate::opening::Opening;
use crate::report::{MatchEvent, RatingSnapshot};
use crate::sprt::SprtParameters;
use crate::worker::{MatchWorker, SharedMatch, WorkerSettings};

/// Errors that prevent a match from starting.
#[derive(Error, Debug)]
pub enum ArenaError {
    /// The debug directory or a worker transcript could not be created.
    #[error("Failed to prepare debug logs: {0}")]
    DebugLog(#[from] std::io::Error),
    #[error("No opening partitions to play")]
    NoWorkers,
}

/// Everything needed to run a match, already validated.
#[derive(Debug, Clone)]
pub struct ArenaPlan {
    pub engines: [EngineCommand; 2],
    /// One opening partition per worker.
    pub partitions: Vec<Vec<Opening>>,
    pub settings: WorkerSettings,
    pub sprt: SprtParameters,
    pub debug_dir: PathBuf,
    pub stop_on_verdict: bool,
}

/// Runs the match until every worker has stopped.
///
/// Workers stop after ctrl-c, after a decided verdict when
/// `stop_on_verdict` is set, or when their engines fail. Returns the Elo
/// and LLR for the final totals.
pub async fn run<A: GameAuthority>(authority: A, plan: ArenaPlan) -> Result<RatingSnapshot, ArenaError> {
    if plan.partitions.is_empty() {
        return Err(ArenaError::NoWorkers);
    }
    prepare_debug_dir(&plan.debug_dir)?;

    // All transcripts are created before any worker starts.
    let logs = (1..=plan.partitions.len())
        .map(|id| DebugLog::create(&plan.debug_dir, id))
        .collect::<std::io::Result<Vec<_>>>()?;

    let aggregate = Arc::new(MatchAggregate::new());
    let stop = Arc::new(AtomicBool::new(false));
    let (events, mut rx) = mpsc::unbounded_channel();

    let signal_stop = Arc::clone(&stop);
    let ctrl_c = tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received, finishing games in progress");
            signal_stop.store(true, Ordering::SeqCst);
        }
    });

    let mut handles = Vec::with_capacity(plan.partitions.len());
    for (index, (openings, log)) in plan.partitions.into_iter().zip(logs).enumerate() {
        let id = index + 1;
        let authority = authority.clone();
        let engines = plan.engines.clone();
        let settings = plan.settings;
        let shared = SharedMatch {
            aggregate: Arc::clone(&aggregate),
            sprt: plan.sprt,
            events: events.clone(),
        };
        let stop = Arc::clone(&stop);

        tracing::info!("Starting worker {}", id);
        handles.push(tokio::task::spawn_blocking(move || {
            let failures = shared.events.clone();
            let result = MatchWorker::start(
                id,
                authority,
                &engines,
                openings,
                log,
                settings,
                shared,
            )
            .and_then(|worker| worker.run(&stop));
            if let Err(e) = &result {
                let _ = failures.send(MatchEvent::WorkerFailed {
                    worker: id,
                    error: e.to_string(),
                });
            }
            result
        }));
    }
    // Only workers hold senders now; the loop below ends when all are done.
    drop(events);

    while let Some(event) = rx.recv().await {
        if handle_event(event, plan.stop_on_verdict) {
            stop.store(true, Ordering::SeqCst);
        }
    }

    for handle in handles {
        match handle.await {
            Ok(Ok(played)) => tracing::debug!("Worker finished after {} games", played),
            Ok(Err(_)) => {}
            Err(e) => tracing::error!("Worker task panicked: {}", e),
        }
    }
    ctrl_c.abort();

    Ok(RatingSnapshot::compute(aggregate.snapshot(), &plan.sprt))
}

/// Prints one event. Returns true if the match should stop.
fn handle_event(event: MatchEvent, stop_on_verdict: bool) -> bool {
    match event {
        MatchEvent::GameFinished(summary) => {
            println!("{}", summary);
            false
        }
        MatchEvent::Rating(snapshot) => {
            println!("{}", snapshot);
            if stop_on_verdict && snapshot.verdict.is_decided() {
                tracing::info!("SPRT decided ({}), stopping workers", snapshot.verdict);
                return true;
            }
            false
        }
        MatchEvent::WorkerFailed { worker, error } => {
            tracing::error!("Worker {} stopped: {}", worker, error);
            false
        }
    }
}
