//! Member registry: who belongs to the cooperative
//!
//! The registry tracks every principal ever admitted together with its
//! lifecycle state and timestamps. Share balances are NOT stored here;
//! they live in the equity ledger. The registry does not make decisions,
//! it stores membership state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque identity of a participant (member, admin or oracle)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Principal(pub String);

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Privileged roles checked by access control
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Oracle,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Oracle => write!(f, "oracle"),
        }
    }
}

/// Lifecycle state of a member
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MemberState {
    /// Never admitted, or removed by the admin
    #[default]
    NonMember,
    /// Admitted and participating
    Active,
    /// Announced departure; the cooldown clock is running or has run
    Left,
}

/// A record for a single (current or former) member
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemberRecord {
    /// The member's identity
    pub principal: Principal,
    /// Current lifecycle state
    pub state: MemberState,
    /// When the member (last) joined
    pub joined_at: DateTime<Utc>,
    /// When the member left; set only on transition to `Left`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_at: Option<DateTime<Utc>>,
}

impl MemberRecord {
    /// Create an active member record
    pub fn new(principal: Principal, joined_at: DateTime<Utc>) -> Self {
        Self {
            principal,
            state: MemberState::Active,
            joined_at,
            left_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, MemberState::Active)
    }

    pub fn has_left(&self) -> bool {
        matches!(self.state, MemberState::Left)
    }

    /// Active or Left: still counted as a member for settlement purposes
    pub fn is_member(&self) -> bool {
        !matches!(self.state, MemberState::NonMember)
    }

    /// When the cooldown after leaving ends
    ///
    /// None unless `Left`, or when the end lies beyond the representable
    /// calendar (such a cooldown never elapses).
    pub fn cooldown_ends_at(&self, cooldown: Duration) -> Option<DateTime<Utc>> {
        match (self.state, self.left_at) {
            (MemberState::Left, Some(left_at)) => left_at.checked_add_signed(cooldown),
            _ => None,
        }
    }

    /// Whether the cooldown has fully elapsed at `now`
    pub fn cooldown_elapsed(&self, cooldown: Duration, now: DateTime<Utc>) -> bool {
        self.cooldown_ends_at(cooldown)
            .map(|ends_at| now >= ends_at)
            .unwrap_or(false)
    }
}

/// The cooperative's member registry
///
/// Records are never deleted: a removed member keeps its record in state
/// `NonMember`, so supply can always be reconciled against every principal
/// ever admitted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MemberRegistry {
    members: BTreeMap<Principal, MemberRecord>,
}

impl MemberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lifecycle state of `principal` (`NonMember` if unknown)
    pub fn state_of(&self, principal: &Principal) -> MemberState {
        self.members
            .get(principal)
            .map(|m| m.state)
            .unwrap_or_default()
    }

    /// Admit a principal, creating or reviving its record
    pub fn admit(&mut self, principal: Principal, now: DateTime<Utc>) -> &MemberRecord {
        let record = self
            .members
            .entry(principal.clone())
            .or_insert_with(|| MemberRecord::new(principal, now));
        record.state = MemberState::Active;
        record.joined_at = now;
        record.left_at = None;
        record
    }

    /// Mark a member as `Left`, starting its cooldown
    pub fn mark_left(&mut self, principal: &Principal, now: DateTime<Utc>) -> Option<&MemberRecord> {
        let record = self.members.get_mut(principal)?;
        record.state = MemberState::Left;
        record.left_at = Some(now);
        Some(record)
    }

    /// Force a member back to `NonMember`
    pub fn mark_removed(&mut self, principal: &Principal) -> Option<&MemberRecord> {
        let record = self.members.get_mut(principal)?;
        record.state = MemberState::NonMember;
        Some(record)
    }

    pub fn get(&self, principal: &Principal) -> Option<&MemberRecord> {
        self.members.get(principal)
    }

    /// Whether the principal is `Active` or `Left`
    pub fn is_member(&self, principal: &Principal) -> bool {
        self.members
            .get(principal)
            .map(|m| m.is_member())
            .unwrap_or(false)
    }

    pub fn is_active(&self, principal: &Principal) -> bool {
        self.members
            .get(principal)
            .map(|m| m.is_active())
            .unwrap_or(false)
    }

    /// Every principal ever admitted
    pub fn principals(&self) -> impl Iterator<Item = &Principal> {
        self.members.keys()
    }

    pub fn records(&self) -> impl Iterator<Item = &MemberRecord> {
        self.members.values()
    }

    /// Number of records (all states)
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.members.values().filter(|m| m.is_active()).count()
    }
}
