//! SEDAO Runtime
//!
//! The accounting engine of the cooperative: admission and exit with a
//! share floor and exit cooldown, NAV-based share pricing, and batched
//! energy settlement that isolates individual defaults.
//!
//! # Components
//!
//! - [`CooperativeLedger`]: the facade every operation goes through
//! - [`LedgerHandle`]: serialized async access for concurrent callers
//! - [`ReserveAccessor`] / [`EquityLedger`]: the two external ledgers the
//!   core depends on, with in-memory implementations
//! - [`ExternalAccounts`]: the member-side funding and approval calls, the
//!   only reserve surface reachable once a ledger owns its accessor
//! - [`AdmissionController`], [`SettlementEngine`], [`AccessControl`]:
//!   the managers the facade composes

#![deny(unsafe_code)]

pub mod access_control;
pub mod admission;
pub mod clock;
pub mod equity;
pub mod handle;
pub mod ledger;
pub mod pricing;
pub mod reserve;
pub mod settlement_engine;

pub use access_control::AccessControl;
pub use admission::AdmissionController;
pub use clock::{Clock, ManualClock, SystemClock};
pub use equity::{EquityLedger, InMemoryEquity};
pub use handle::LedgerHandle;
pub use ledger::CooperativeLedger;
pub use pricing::share_price;
pub use reserve::{ExternalAccounts, InMemoryReserve, ReserveAccessor, UNLIMITED_ALLOWANCE};
pub use settlement_engine::{SettlementBook, SettlementEngine};
