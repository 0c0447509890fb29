//! SEDAO simulator
//!
//! Replays a table of metered slots through an in-memory ledger the way an
//! oracle would, recording member balances after every slot.

pub mod config;
pub mod simulation;

pub use config::{LoggingConfig, SimConfig};
pub use simulation::{SimError, Simulation, SlotReport, SlotTable};
