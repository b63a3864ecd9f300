// ⚖️ Sign-Rule Table - canonical mapping from party role to balance delta
//
// Sign convention: positive balance = the counterparty owes us.
//
// A debt transfer is the one role-driven row: it moves no cash, it only
// changes WHO we owe. The debtor's total is unchanged, our obligation to the
// new creditor grows (more negative), and our obligation to the old creditor
// shrinks (toward zero).

use crate::classify::Classification;
use serde::{Deserialize, Serialize};

/// Comparison tolerance for balances, in currency units.
pub const BALANCE_EPSILON: f64 = 0.01;

// ============================================================================
// PARTY ROLE
// ============================================================================

/// The position an account occupies inside one transaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    /// The account the row is keyed to (debtor, for debt transfers)
    Primary,

    /// Outbound leg; new creditor ("lender") for debt transfers
    Source,

    /// Inbound leg; old creditor ("settled") for debt transfers
    Target,
}

// ============================================================================
// DELTA LOOKUP
// ============================================================================

/// Balance delta contributed by `amount` for an account occupying `role`
/// in a transaction with the given classification.
///
/// | Classification        | Primary | Source  | Target  |
/// |-----------------------|---------|---------|---------|
/// | Revenue / Collection  | +amount | 0       | 0       |
/// | Expense / Payment     | -amount | 0       | 0       |
/// | Transfer (plain)      | 0       | -amount | +amount |
/// | DebtTransfer          | 0       | -amount | +amount |
/// | AdministrativeReset   | 0       | 0       | 0       |
/// | LogOnly               | 0       | 0       | 0       |
pub fn role_delta(class: Classification, role: PartyRole, amount: f64) -> f64 {
    match class {
        Classification::Revenue | Classification::Collection => match role {
            PartyRole::Primary => amount,
            _ => 0.0,
        },
        Classification::Expense | Classification::Payment => match role {
            PartyRole::Primary => -amount,
            _ => 0.0,
        },
        Classification::Transfer | Classification::DebtTransfer => match role {
            PartyRole::Primary => 0.0,
            PartyRole::Source => -amount,
            PartyRole::Target => amount,
        },
        Classification::AdministrativeReset | Classification::LogOnly => 0.0,
    }
}

// ============================================================================
// TESTS
// ============================================================================
