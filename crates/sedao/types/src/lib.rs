//! SEDAO Domain Types
//!
//! This crate defines the domain types for the cooperative settlement
//! ledger: members and their lifecycle, payment amounts and shares,
//! the immutable DAO configuration, settlement batches and the
//! facts the ledger records for observers.
//!
//! # Key Concepts
//!
//! - **Member**: a principal admitted against a fixed payment. Moves
//!   `NonMember → Active → Left` and may be forced back to `NonMember`
//!   by the admin.
//! - **Shares**: non-transferable claims on the pooled reserve. Only the
//!   ledger mints or burns them.
//! - **Share price**: reserve balance divided by total share supply.
//! - **Settlement batch**: a period's metered energy deltas, settled per
//!   account with isolated failure handling.
//!
//! # Architecture
//!
//! This is a pure types crate with no runtime dependencies. `Amount` and
//! `Shares` are distinct newtypes; converting between them only happens
//! through a `SharePrice`.

#![deny(unsafe_code)]

mod amount;
mod config;
mod errors;
mod events;
mod member;
mod settlement;

pub use amount::*;
pub use config::*;
pub use errors::*;
pub use events::*;
pub use member::*;
pub use settlement::*;
