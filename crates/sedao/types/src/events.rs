//! Ledger facts: what happened, for observers
//!
//! Every successful state change records an event in the journal.
//! The ledger never reads these back to make decisions.

use crate::{Amount, Principal, Shares};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Settlement period identifier (caller-supplied, monotonic by convention)
pub type PeriodId = u64;

/// A fact emitted by the ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEvent {
    Initialized {
        admin: Principal,
        payment_asset: String,
        admission_amount: Amount,
    },
    OracleAdded {
        oracle: Principal,
    },
    Joined {
        member: Principal,
        amount_paid: Amount,
        shares_issued: Shares,
    },
    BoughtShares {
        member: Principal,
        amount: Shares,
        cost: Amount,
    },
    RedeemedShares {
        member: Principal,
        amount: Shares,
        payout: Amount,
    },
    Left {
        member: Principal,
        balance_at_leave: Shares,
    },
    MemberRemoved {
        member: Principal,
        balance: Shares,
    },
    Produced {
        member: Principal,
        period: PeriodId,
        energy: u64,
        price: Amount,
    },
    Consumed {
        member: Principal,
        period: PeriodId,
        energy: u64,
        price: Amount,
    },
    SharesSeized {
        member: Principal,
        period: PeriodId,
        shortfall: Amount,
        shares_burned: Shares,
        unrecovered: Amount,
    },
}

impl LedgerEvent {
    /// The principal the event is about
    pub fn subject(&self) -> &Principal {
        match self {
            LedgerEvent::Initialized { admin, .. } => admin,
            LedgerEvent::OracleAdded { oracle } => oracle,
            LedgerEvent::Joined { member, .. }
            | LedgerEvent::BoughtShares { member, .. }
            | LedgerEvent::RedeemedShares { member, .. }
            | LedgerEvent::Left { member, .. }
            | LedgerEvent::MemberRemoved { member, .. }
            | LedgerEvent::Produced { member, .. }
            | LedgerEvent::Consumed { member, .. }
            | LedgerEvent::SharesSeized { member, .. } => member,
        }
    }
}

/// A journaled event with ordering and time
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique record identifier
    pub record_id: String,
    /// Position in the journal, starting at 0
    pub sequence: u64,
    /// When the event was recorded (ledger clock)
    pub timestamp: DateTime<Utc>,
    pub event: LedgerEvent,
}

/// Append-only event journal
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventJournal {
    records: Vec<EventRecord>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn record(&mut self, event: LedgerEvent, timestamp: DateTime<Utc>) {
        let sequence = self.records.len() as u64;
        self.records.push(EventRecord {
            record_id: uuid::Uuid::new_v4().to_string(),
            sequence,
            timestamp,
            event,
        });
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records appended at or after `sequence`
    pub fn since(&self, sequence: u64) -> &[EventRecord] {
        let start = (sequence as usize).min(self.records.len());
        &self.records[start..]
    }

    /// All events about a principal
    pub fn events_for(&self, principal: &Principal) -> Vec<&LedgerEvent> {
        self.records
            .iter()
            .map(|r| &r.event)
            .filter(|e| e.subject() == principal)
            .collect()
    }

    pub fn last(&self) -> Option<&LedgerEvent> {
        self.records.last().map(|r| &r.event)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
