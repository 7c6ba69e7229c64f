//! SPRT Arena - engine-vs-engine strength testing.
//!
//! This crate plays two engines against each other in many parallel games,
//! keeps win/loss/draw totals, and runs a sequential probability ratio test
//! to decide whether engine 1 is stronger than engine 2. Game rules are
//! supplied by the caller through [`authority::GameAuthority`].
//!
//! # Modules
//!
//! - [`engine_channel`] - subprocess wrapper with deadline-bounded reads
//! - [`game_driver`] - the turn loop and time control for one game
//! - [`worker`] - a worker playing games back to back on one engine pair
//! - [`arena`] - runs all workers and prints their progress
//! - [`sprt`] - Elo estimate and log-likelihood ratio
//! - [`config`] - TOML configuration and validation

pub mod aggregate;
pub mod arena;
pub mod authority;
pub mod cli;
pub mod color;
pub mod config;
pub mod debug_log;
pub mod engine_channel;
pub mod game_driver;
pub mod opening;
pub mod report;
pub mod sprt;
pub mod time_control;
pub mod worker;

pub use aggregate::{MatchAggregate, Tally};
pub use authority::{ColorResult, GameAuthority, PositionError};
pub use color::{Color, ColorAssignment, EngineId};
pub use engine_channel::{EngineChannel, EngineCommand};
pub use game_driver::{GameDriver, GameError, GameOutcome, GameRecord};
pub use sprt::{SprtParameters, Verdict};
pub use time_control::TimeControl;
