//! Slot replay against an in-memory ledger

use crate::config::SimConfig;
use sedao_runtime::{CooperativeLedger, InMemoryEquity, InMemoryReserve, LedgerHandle};
use sedao_types::{Amount, DaoSettings, LedgerError, PeriodId, Principal, Shares};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

const PAYMENT_ASSET: &str = "payment-token";

/// Errors raised while preparing or running a simulation
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("CSV has no header row")]
    EmptyTable,

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("column refers to member {index}, but only {members} members exist")]
    UnknownMember { index: usize, members: usize },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Parsed slot table: member columns and per-slot Wh deltas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotTable {
    /// 1-based member index for each column
    pub columns: Vec<usize>,
    /// One row of Wh deltas per slot (production positive)
    pub slots: Vec<Vec<i64>>,
}

impl SlotTable {
    /// Parse the CSV text. The first header cell and the first cell of every
    /// row are labels; values are consumption in kWh.
    pub fn parse(text: &str) -> Result<Self, SimError> {
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty());

        let (_, header) = lines.next().ok_or(SimError::EmptyTable)?;
        let columns = header
            .split(',')
            .skip(1)
            .map(|cell| {
                cell.trim().parse::<usize>().map_err(|e| SimError::Parse {
                    line: 1,
                    message: format!("member index {:?}: {}", cell.trim(), e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let slots = lines
            .map(|(i, line)| {
                let cells: Vec<&str> = line.split(',').skip(1).collect();
                if cells.len() != columns.len() {
                    return Err(SimError::Parse {
                        line: i + 1,
                        message: format!("expected {} values, found {}", columns.len(), cells.len()),
                    });
                }
                cells
                    .into_iter()
                    .map(|cell| {
                        let kwh = cell.trim().parse::<f64>().map_err(|e| SimError::Parse {
                            line: i + 1,
                            message: format!("value {:?}: {}", cell.trim(), e),
                        })?;
                        wh_delta(kwh).ok_or_else(|| SimError::Parse {
                            line: i + 1,
                            message: format!("value {:?} is not a representable Wh reading", cell.trim()),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { columns, slots })
    }
}

/// Consumption in kWh to a signed Wh delta (consumption negative)
///
/// None for non-finite readings and for values outside the `i64` range.
fn wh_delta(kwh: f64) -> Option<i64> {
    let wh = (-kwh * 1000.0).floor();
    // i64::MAX rounds up to 2^63 as f64, so the upper bound is exclusive
    if wh.is_finite() && wh >= i64::MIN as f64 && wh < i64::MAX as f64 {
        Some(wh as i64)
    } else {
        None
    }
}

/// Balances of one member after a slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account: Principal,
    pub payment_tokens: Amount,
    pub share_tokens: Shares,
}

/// Report entry for one slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotReport {
    pub slot: PeriodId,
    pub defaults: usize,
    pub balances: Vec<AccountBalance>,
}

/// A prepared simulation: funded members, initialized ledger, oracle
pub struct Simulation {
    config: SimConfig,
    ledger: LedgerHandle,
    admin: Principal,
    oracle: Principal,
    members: Vec<Principal>,
}

impl Simulation {
    /// Fund members, initialize the ledger and admit everyone
    pub async fn setup(config: SimConfig) -> Result<Self, SimError> {
        let admin = Principal::new("admin");
        let oracle = Principal::new("oracle");
        let members: Vec<Principal> = (1..=config.members)
            .map(|i| Principal::new(format!("member-{}", i)))
            .collect();

        let initial_balance = config.initial_balance()?;
        let approval = config.approval_amount()?;

        let mut reserve = InMemoryReserve::new(PAYMENT_ASSET);
        for member in &members {
            reserve.fund(member, initial_balance);
            reserve.approve(member, approval);
        }

        let ledger = LedgerHandle::new(CooperativeLedger::new(reserve, InMemoryEquity::new()));
        ledger
            .initialize(
                &admin,
                DaoSettings::new(PAYMENT_ASSET, config.admission_amount()?),
            )
            .await?;
        ledger.add_oracle(&admin, oracle.clone()).await?;

        for member in &members {
            ledger.join(member).await?;
            debug!(member = %member, "Member joined");
        }
        info!(members = members.len(), "Simulation ledger ready");

        Ok(Self {
            config,
            ledger,
            admin,
            oracle,
            members,
        })
    }

    pub fn ledger(&self) -> &LedgerHandle {
        &self.ledger
    }

    pub fn admin(&self) -> &Principal {
        &self.admin
    }

    /// Submit every slot in order, starting at period 1
    pub async fn run(&self, table: &SlotTable) -> Result<Vec<SlotReport>, SimError> {
        let accounts = table
            .columns
            .iter()
            .map(|&index| {
                index
                    .checked_sub(1)
                    .and_then(|i| self.members.get(i))
                    .cloned()
                    .ok_or(SimError::UnknownMember {
                        index,
                        members: self.members.len(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let wh_price = self.config.wh_price()?;
        let delay = Duration::from_millis(self.config.slot_delay_ms);

        let mut report = Vec::with_capacity(table.slots.len());
        for (slot, deltas) in (1..).zip(&table.slots) {
            debug!(slot, ?deltas, wh_price = wh_price.0, "Submitting slot");
            let settled = self
                .ledger
                .prosumed(&self.oracle, slot, accounts.clone(), deltas.clone(), wh_price)
                .await?;

            let defaults = settled.defaults().count();
            if defaults > 0 {
                warn!(slot, defaults, "Slot settled with defaults");
            }

            let balances = self.balances().await;
            for b in &balances {
                info!(
                    slot,
                    account = %b.account,
                    payment = %b.payment_tokens.format_units(self.config.decimals),
                    shares = b.share_tokens.0,
                    "Balance"
                );
            }
            report.push(SlotReport {
                slot,
                defaults,
                balances,
            });

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        Ok(report)
    }

    async fn balances(&self) -> Vec<AccountBalance> {
        let members = &self.members;
        self.ledger
            .inspect(|ledger| {
                members
                    .iter()
                    .map(|m| AccountBalance {
                        account: m.clone(),
                        payment_tokens: ledger.payment_balance(m),
                        share_tokens: ledger.share_balance(m),
                    })
                    .collect()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "slot,1,2,3,4\n1,-2.1,-0.8,1.3,1.6\n2,0,0,0,0\n";

    fn quick_config(members: usize) -> SimConfig {
        SimConfig {
            members,
            slot_delay_ms: 0,
            kwh_price: "1".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_table() {
        let table = SlotTable::parse(CSV).unwrap();
        assert_eq!(table.columns, vec![1, 2, 3, 4]);
        assert_eq!(table.slots[0], vec![2100, 800, -1300, -1600]);
        assert_eq!(table.slots[1], vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_wh_delta_floors() {
        assert_eq!(wh_delta(0.0005), Some(-1));
        assert_eq!(wh_delta(-0.0005), Some(0));
        assert_eq!(wh_delta(1.25), Some(-1250));
    }

    #[test]
    fn test_wh_delta_rejects_unrepresentable() {
        assert_eq!(wh_delta(f64::NAN), None);
        assert_eq!(wh_delta(f64::INFINITY), None);
        assert_eq!(wh_delta(f64::NEG_INFINITY), None);
        assert_eq!(wh_delta(1e300), None);
        assert_eq!(wh_delta(-1e16), None);
        assert_eq!(wh_delta(-1e15), Some(1_000_000_000_000_000_000));

        for cell in ["NaN", "inf", "-inf", "1e300"] {
            let csv = format!("slot,1,2\n1,0.5,{}\n", cell);
            assert!(matches!(
                SlotTable::parse(&csv),
                Err(SimError::Parse { line: 2, .. })
            ));
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(SlotTable::parse(""), Err(SimError::EmptyTable)));
        assert!(matches!(
            SlotTable::parse("slot,a\n1,1\n"),
            Err(SimError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            SlotTable::parse("slot,1,2\n1,0.5\n"),
            Err(SimError::Parse { line: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_run_balanced_slots() {
        let sim = Simulation::setup(quick_config(4)).await.unwrap();
        let table = SlotTable::parse(CSV).unwrap();
        let report = sim.run(&table).await.unwrap();

        assert_eq!(report.len(), 2);
        assert_eq!(report[0].slot, 1);
        assert_eq!(report[0].defaults, 0);
        // 250 funded, 50 paid to join, 2.1 kWh sold at 1 per kWh
        assert_eq!(report[0].balances[0].payment_tokens, Amount::new(202_100_000));
        assert_eq!(report[0].balances[3].payment_tokens, Amount::new(198_400_000));
        assert_eq!(report[1].balances, report[0].balances);

        let reserve = sim.ledger().inspect(|l| l.reserve_balance()).await;
        assert_eq!(reserve, Amount::new(200_000_000));
    }

    #[tokio::test]
    async fn test_unknown_member_column() {
        let sim = Simulation::setup(quick_config(2)).await.unwrap();
        let table = SlotTable::parse(CSV).unwrap();
        assert!(matches!(
            sim.run(&table).await,
            Err(SimError::UnknownMember { index: 3, members: 2 })
        ));
    }
}
