//! Error types for the settlement ledger

use crate::{Amount, Principal, Role, Shares};
use chrono::{DateTime, Utc};

/// Errors that can occur in ledger operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Unauthorized: {caller} does not hold the {role} role")]
    Unauthorized { caller: Principal, role: Role },

    #[error("Already a member: {0}")]
    AlreadyMember(Principal),

    #[error("Not a member: {0}")]
    NotAMember(Principal),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Amount, available: Amount },

    #[error("Insufficient allowance: required {required}, allowed {allowed}")]
    InsufficientAllowance { required: Amount, allowed: Amount },

    #[error("Amount exceeds balance: requested {requested}, balance {balance}")]
    ExceedsBalance { requested: Shares, balance: Shares },

    #[error("Not enough shares left: {remaining} would remain, floor is {floor}")]
    BelowFloor { remaining: Shares, floor: Shares },

    #[error("Cooldown not over until {ends_at}: {remaining} would remain, floor is {floor}")]
    CooldownNotElapsed {
        remaining: Shares,
        floor: Shares,
        ends_at: DateTime<Utc>,
    },

    #[error("Malformed settlement batch: {0}")]
    MalformedBatch(String),

    #[error("Ledger already initialized")]
    AlreadyInitialized,

    #[error("Ledger not initialized")]
    NotInitialized,

    #[error("Shares are non-transferable")]
    NonTransferable,

    #[error("Share price undefined: total supply is zero")]
    ZeroSupply,

    #[error("Shares are worthless: the reserve is empty while {supply} shares are outstanding")]
    WorthlessShares { supply: Shares },

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Rejections from the payment-asset ledger
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReserveError {
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Amount, available: Amount },

    #[error("insufficient allowance: required {required}, allowed {allowed}")]
    InsufficientAllowance { required: Amount, allowed: Amount },

    #[error("balance overflow")]
    Overflow,
}

impl From<ReserveError> for LedgerError {
    fn from(err: ReserveError) -> Self {
        match err {
            ReserveError::InsufficientFunds {
                required,
                available,
            } => LedgerError::InsufficientFunds {
                required,
                available,
            },
            ReserveError::InsufficientAllowance { required, allowed } => {
                LedgerError::InsufficientAllowance { required, allowed }
            }
            ReserveError::Overflow => LedgerError::ArithmeticOverflow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_errors_propagate_unchanged() {
        let err: LedgerError = ReserveError::InsufficientAllowance {
            required: Amount::new(100),
            allowed: Amount::new(50),
        }
        .into();
        assert_eq!(
            err,
            LedgerError::InsufficientAllowance {
                required: Amount::new(100),
                allowed: Amount::new(50),
            }
        );
    }

    #[test]
    fn test_error_messages() {
        let err = LedgerError::Unauthorized {
            caller: Principal::new("eve"),
            role: Role::Oracle,
        };
        assert_eq!(err.to_string(), "Unauthorized: eve does not hold the oracle role");
    }
}
