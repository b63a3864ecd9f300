// 🏷️ Transaction Classifier - the single authority on transaction categories
//
// The legacy system re-derived "is this a debt transfer?" independently at
// five-plus call sites, and the definitions drifted. Every component in this
// crate goes through `classify` / `is_debt_transfer` instead of inspecting
// raw fields on its own.

use crate::store::TransactionRecord;
use serde::{Deserialize, Serialize};

// ============================================================================
// TRANSACTION KIND (closed enum, replaces the legacy string-typed field)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Income earned from a counterparty (increases what they owe us)
    Revenue,

    /// Cost incurred toward a counterparty (decreases what they owe us)
    Expense,

    /// Cash collected against an outstanding receivable
    Collection,

    /// Cash paid against an outstanding payable
    Payment,

    /// Generic transfer between two parties (legacy shape)
    Transfer,

    /// Three-party liability reassignment (canonical form)
    DebtTransfer,

    /// Balance reset / bookkeeping marker with no ledger effect
    AdministrativeReset,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Revenue => "revenue",
            TransactionKind::Expense => "expense",
            TransactionKind::Collection => "collection",
            TransactionKind::Payment => "payment",
            TransactionKind::Transfer => "transfer",
            TransactionKind::DebtTransfer => "debt_transfer",
            TransactionKind::AdministrativeReset => "administrative_reset",
        }
    }

    pub fn from_str(s: &str) -> Option<TransactionKind> {
        match s {
            "revenue" => Some(TransactionKind::Revenue),
            "expense" => Some(TransactionKind::Expense),
            "collection" => Some(TransactionKind::Collection),
            "payment" => Some(TransactionKind::Payment),
            "transfer" => Some(TransactionKind::Transfer),
            "debt_transfer" => Some(TransactionKind::DebtTransfer),
            "administrative_reset" => Some(TransactionKind::AdministrativeReset),
            _ => None,
        }
    }
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// What a transaction *is* for balance purposes, which is not always what its
/// stored kind says: legacy rows encode a debt transfer as a generic transfer
/// carrying both a source and a target party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Revenue,
    Expense,
    Collection,
    Payment,
    Transfer,
    DebtTransfer,
    AdministrativeReset,
    /// Non-transactional log entry, zero ledger effect
    LogOnly,
}

/// Debt-transfer determination. Pure function of (kind, source, target) and
/// nothing else - this is the one place the check may live.
///
/// Rule, in order:
/// 1. explicit DebtTransfer kind → true
/// 2. generic Transfer with BOTH source and target populated → true
/// 3. otherwise → false
pub fn is_debt_transfer(
    kind: TransactionKind,
    source_party: Option<&str>,
    target_party: Option<&str>,
) -> bool {
    match kind {
        TransactionKind::DebtTransfer => true,
        TransactionKind::Transfer => source_party.is_some() && target_party.is_some(),
        _ => false,
    }
}

/// Classify one raw record.
///
/// Debt-transfer detection runs first: a debt transfer stays a debt transfer
/// even when legacy metadata mislabels it as a log entry (the Visibility
/// Normalizer relies on this ordering to find rows it must repair).
pub fn classify(tx: &TransactionRecord) -> Classification {
    if is_debt_transfer(
        tx.kind,
        tx.source_party.as_deref(),
        tx.target_party.as_deref(),
    ) {
        return Classification::DebtTransfer;
    }

    if tx.is_log {
        return Classification::LogOnly;
    }

    match tx.kind {
        TransactionKind::Revenue => Classification::Revenue,
        TransactionKind::Expense => Classification::Expense,
        TransactionKind::Collection => Classification::Collection,
        TransactionKind::Payment => Classification::Payment,
        TransactionKind::Transfer => Classification::Transfer,
        TransactionKind::AdministrativeReset => Classification::AdministrativeReset,
        // Unreachable: is_debt_transfer caught this kind above
        TransactionKind::DebtTransfer => Classification::DebtTransfer,
    }
}

/// Convenience wrapper over [`is_debt_transfer`] for a full record.
pub fn is_debt_transfer_record(tx: &TransactionRecord) -> bool {
    is_debt_transfer(
        tx.kind,
        tx.source_party.as_deref(),
        tx.target_party.as_deref(),
    )
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_helpers::tx;

    #[test]
    fn test_explicit_debt_transfer_kind() {
        assert!(is_debt_transfer(
            TransactionKind::DebtTransfer,
            None,
            None
        ));
        assert!(is_debt_transfer(
            TransactionKind::DebtTransfer,
            Some("l"),
            Some("s")
        ));
    }

    #[test]
    fn test_legacy_transfer_with_both_parties_is_debt_transfer() {
        assert!(is_debt_transfer(
            TransactionKind::Transfer,
            Some("a"),
            Some("b")
        ));
        assert!(!is_debt_transfer(TransactionKind::Transfer, Some("a"), None));
        assert!(!is_debt_transfer(TransactionKind::Transfer, None, Some("b")));
        assert!(!is_debt_transfer(TransactionKind::Transfer, None, None));
    }

    #[test]
    fn test_other_kinds_never_debt_transfers() {
        for kind in [
            TransactionKind::Revenue,
            TransactionKind::Expense,
            TransactionKind::Collection,
            TransactionKind::Payment,
            TransactionKind::AdministrativeReset,
        ] {
            assert!(!is_debt_transfer(kind, Some("a"), Some("b")));
        }
    }

    #[test]
    fn test_classify_maps_kinds_directly() {
        let t = tx("t1", TransactionKind::Revenue, 100.0, Some("acct"), None, None);
        assert_eq!(classify(&t), Classification::Revenue);

        let t = tx("t2", TransactionKind::Expense, 50.0, Some("acct"), None, None);
        assert_eq!(classify(&t), Classification::Expense);
    }

    #[test]
    fn test_classify_log_marker_wins_for_non_debt_transfers() {
        let mut t = tx("t3", TransactionKind::Revenue, 100.0, Some("acct"), None, None);
        t.is_log = true;
        assert_eq!(classify(&t), Classification::LogOnly);
    }

    #[test]
    fn test_classify_debt_transfer_beats_log_marker() {
        let mut t = tx(
            "t4",
            TransactionKind::Transfer,
            200.0,
            Some("debtor"),
            Some("lender"),
            Some("settled"),
        );
        t.is_log = true;
        assert_eq!(classify(&t), Classification::DebtTransfer);
    }

    #[test]
    fn test_classification_is_pure_across_calls() {
        // Determination depends only on (kind, source, target)
        let a = tx(
            "x",
            TransactionKind::Transfer,
            1.0,
            None,
            Some("s"),
            Some("t"),
        );
        let mut b = a.clone();
        b.id = "y".to_string();
        b.amount = 9999.0;
        b.is_deleted = true;
        b.migration_flag = true;
        assert_eq!(is_debt_transfer_record(&a), is_debt_transfer_record(&b));
        assert_eq!(classify(&a), classify(&b));
    }
}
