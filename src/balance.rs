// 🧮 Balance Calculator - fold a transaction history into one net balance
//
// Pure read side. Never writes, never caches; the stored balance column is
// owned by the Correction Applier. O(n) full scan over the transaction set -
// ledger-scale volumes (thousands of rows), no index assumed.

use crate::classify::classify;
use crate::signs::{role_delta, PartyRole};
use crate::store::TransactionRecord;

/// Net balance of `account_id` over the given transaction set.
///
/// Skips deleted rows and rows flagged out of balance calculation, then sums
/// the sign-table delta for every party role the account occupies. Positive
/// means the counterparty owes us.
pub fn compute_balance(account_id: &str, transactions: &[TransactionRecord]) -> f64 {
    transactions
        .iter()
        .filter(|tx| !tx.is_deleted && tx.affects_balance)
        .map(|tx| transaction_delta(account_id, tx))
        .sum()
}

/// Delta contributed by a single transaction to one account's balance.
/// An account may in principle occupy more than one role in a malformed row;
/// each matching role contributes its own delta.
pub fn transaction_delta(account_id: &str, tx: &TransactionRecord) -> f64 {
    let class = classify(tx);
    let mut delta = 0.0;

    if tx.primary_party.as_deref() == Some(account_id) {
        delta += role_delta(class, PartyRole::Primary, tx.amount);
    }
    if tx.source_party.as_deref() == Some(account_id) {
        delta += role_delta(class, PartyRole::Source, tx.amount);
    }
    if tx.target_party.as_deref() == Some(account_id) {
        delta += role_delta(class, PartyRole::Target, tx.amount);
    }

    delta
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::TransactionKind;
    use crate::signs::role_delta;
    use crate::store::test_helpers::tx;

    #[test]
    fn test_revenue_minus_expense() {
        // Revenue 1000 minus expense 300 leaves 700
        let txs = vec![
            tx("r1", TransactionKind::Revenue, 1000.0, Some("x"), None, None),
            tx("e1", TransactionKind::Expense, 300.0, Some("x"), None, None),
        ];
        assert_eq!(compute_balance("x", &txs), 700.0);
    }

    #[test]
    fn test_debt_transfer_three_party_view() {
        // Debt transfer of 200: debtor D, new creditor L, old creditor S
        let txs = vec![tx(
            "dt1",
            TransactionKind::DebtTransfer,
            200.0,
            Some("D"),
            Some("L"),
            Some("S"),
        )];
        assert_eq!(compute_balance("D", &txs), 0.0);
        assert_eq!(compute_balance("L", &txs), -200.0);
        assert_eq!(compute_balance("S", &txs), 200.0);
    }

    #[test]
    fn test_legacy_transfer_shape_counts_as_debt_transfer() {
        // Same liability reassignment encoded the old way
        let txs = vec![tx(
            "legacy",
            TransactionKind::Transfer,
            200.0,
            None,
            Some("L"),
            Some("S"),
        )];
        assert_eq!(compute_balance("L", &txs), -200.0);
        assert_eq!(compute_balance("S", &txs), 200.0);
    }

    #[test]
    fn test_deleted_and_hidden_rows_are_skipped() {
        let mut deleted = tx("d", TransactionKind::Revenue, 500.0, Some("x"), None, None);
        deleted.is_deleted = true;
        let mut hidden = tx("h", TransactionKind::Revenue, 500.0, Some("x"), None, None);
        hidden.affects_balance = false;
        let live = tx("l", TransactionKind::Revenue, 100.0, Some("x"), None, None);

        assert_eq!(compute_balance("x", &[deleted, hidden, live]), 100.0);
    }

    #[test]
    fn test_unrelated_account_is_zero() {
        let txs = vec![
            tx("r1", TransactionKind::Revenue, 1000.0, Some("x"), None, None),
            tx("t1", TransactionKind::Transfer, 50.0, None, Some("a"), None),
        ];
        assert_eq!(compute_balance("nobody", &txs), 0.0);
    }

    #[test]
    fn test_matches_brute_force_sum() {
        // compute_balance equals a manual fold using the same sign table
        let txs = vec![
            tx("1", TransactionKind::Revenue, 1500.0, Some("x"), None, None),
            tx("2", TransactionKind::Collection, 200.0, Some("x"), None, None),
            tx("3", TransactionKind::Expense, 75.5, Some("x"), None, None),
            tx("4", TransactionKind::Payment, 24.5, Some("x"), None, None),
            tx("5", TransactionKind::Transfer, 60.0, None, Some("x"), None),
            tx("6", TransactionKind::Transfer, 40.0, None, None, Some("x")),
            tx("7", TransactionKind::DebtTransfer, 30.0, Some("x"), Some("l"), Some("s")),
            tx("8", TransactionKind::AdministrativeReset, 9999.0, Some("x"), None, None),
        ];

        let mut expected = 0.0;
        for t in &txs {
            let class = classify(t);
            if t.primary_party.as_deref() == Some("x") {
                expected += role_delta(class, PartyRole::Primary, t.amount);
            }
            if t.source_party.as_deref() == Some("x") {
                expected += role_delta(class, PartyRole::Source, t.amount);
            }
            if t.target_party.as_deref() == Some("x") {
                expected += role_delta(class, PartyRole::Target, t.amount);
            }
        }

        assert_eq!(compute_balance("x", &txs), expected);
        // 1500 + 200 - 75.5 - 24.5 - 60 + 40 + 0 + 0
        assert!((compute_balance("x", &txs) - 1580.0).abs() < 1e-9);
    }
}
