//! Thread entry points.
//!
//! - [`replay`]: Fixed-rate replay loop and its inbox

pub mod replay;

pub use replay::{
    OperatorInput, ReplayCommand, ReplayCommandReceiver, ReplayCommandSender, ReplayHandle,
    ReplayLoop, ReplaySummary, TickOutcome, create_replay_channel, spawn_replay_thread,
};
