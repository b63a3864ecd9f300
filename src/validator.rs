// 🔍 Consistency Validator - P&L must survive a migration untouched
//
// A migration batch rewrites transaction *shape*, never economics. Before
// anything is written, aggregate revenue and aggregate expense are computed
// over the original and the proposed sets; if either moves by more than the
// tolerance the whole apply is refused with the diverging totals.

use crate::classify::{classify, Classification};
use crate::signs::BALANCE_EPSILON;
use crate::store::TransactionRecord;
use serde::{Deserialize, Serialize};

// ============================================================================
// AGGREGATE TOTALS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateTotals {
    /// Revenue + collections (cash-bearing income side)
    pub revenue: f64,

    /// Expenses + payments (cash-bearing cost side)
    pub expense: f64,
}

impl AggregateTotals {
    /// Classifier-driven P&L aggregates. Deleted rows, debt transfers and
    /// administrative resets contribute nothing; debt-transfer detection uses
    /// the classifier, so legacy two-party transfer rows are excluded too.
    pub fn compute(transactions: &[TransactionRecord]) -> Self {
        let mut revenue = 0.0;
        let mut expense = 0.0;

        for tx in transactions.iter().filter(|tx| !tx.is_deleted) {
            match classify(tx) {
                Classification::Revenue | Classification::Collection => revenue += tx.amount,
                Classification::Expense | Classification::Payment => expense += tx.amount,
                Classification::Transfer
                | Classification::DebtTransfer
                | Classification::AdministrativeReset
                | Classification::LogOnly => {}
            }
        }

        AggregateTotals { revenue, expense }
    }
}

// ============================================================================
// CONSISTENCY REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub original: AggregateTotals,
    pub proposed: AggregateTotals,
    pub tolerance: f64,
}

impl ConsistencyReport {
    pub fn summary(&self) -> String {
        if self.valid {
            format!(
                "P&L preserved: revenue {:.2}, expense {:.2} (tolerance {:.2})",
                self.original.revenue, self.original.expense, self.tolerance
            )
        } else {
            format!("P&L diverged: {}", self.errors.join("; "))
        }
    }
}

// ============================================================================
// CONSISTENCY VALIDATOR
// ============================================================================

pub struct ConsistencyValidator {
    pub tolerance: f64,
}

impl ConsistencyValidator {
    pub fn new() -> Self {
        ConsistencyValidator {
            tolerance: BALANCE_EPSILON,
        }
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        ConsistencyValidator { tolerance }
    }

    /// Hard gate for migration application: fails if either aggregate differs
    /// by more than the tolerance, reporting the specific totals.
    pub fn validate(
        &self,
        original: &[TransactionRecord],
        proposed: &[TransactionRecord],
    ) -> ConsistencyReport {
        let before = AggregateTotals::compute(original);
        let after = AggregateTotals::compute(proposed);

        let mut errors = Vec::new();

        let revenue_diff = (after.revenue - before.revenue).abs();
        if revenue_diff > self.tolerance {
            errors.push(format!(
                "aggregate revenue changed: {:.2} → {:.2} (diff {:.2})",
                before.revenue, after.revenue, revenue_diff
            ));
        }

        let expense_diff = (after.expense - before.expense).abs();
        if expense_diff > self.tolerance {
            errors.push(format!(
                "aggregate expense changed: {:.2} → {:.2} (diff {:.2})",
                before.expense, after.expense, expense_diff
            ));
        }

        ConsistencyReport {
            valid: errors.is_empty(),
            errors,
            original: before,
            proposed: after,
            tolerance: self.tolerance,
        }
    }
}

impl Default for ConsistencyValidator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::TransactionKind;
    use crate::store::test_helpers::tx;

    fn sample_set() -> Vec<TransactionRecord> {
        vec![
            tx("r1", TransactionKind::Revenue, 1000.0, Some("a"), None, None),
            tx("c1", TransactionKind::Collection, 250.0, Some("a"), None, None),
            tx("e1", TransactionKind::Expense, 400.0, Some("b"), None, None),
            tx("p1", TransactionKind::Payment, 100.0, Some("b"), None, None),
            // legacy debt-transfer shape - excluded from both aggregates
            tx("t1", TransactionKind::Transfer, 500.0, None, Some("x"), Some("y")),
            tx("ar1", TransactionKind::AdministrativeReset, 9999.0, Some("a"), None, None),
        ]
    }

    #[test]
    fn test_aggregates_exclude_debt_transfers_and_resets() {
        let totals = AggregateTotals::compute(&sample_set());
        assert!((totals.revenue - 1250.0).abs() < 1e-9);
        assert!((totals.expense - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_deleted_rows_do_not_count() {
        let mut txs = sample_set();
        txs[0].is_deleted = true;
        let totals = AggregateTotals::compute(&txs);
        assert!((totals.revenue - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_shape_only_rewrite_passes() {
        // Rewriting the legacy transfer into canonical form moves nothing
        let original = sample_set();
        let mut proposed = original.clone();
        proposed[4] = tx(
            "t1",
            TransactionKind::DebtTransfer,
            500.0,
            Some("d"),
            Some("x"),
            Some("y"),
        );

        let report = ConsistencyValidator::new().validate(&original, &proposed);
        assert!(report.valid, "unexpected errors: {:?}", report.errors);
        assert_eq!(report.original, report.proposed);
    }

    #[test]
    fn test_amount_drift_fails_with_specific_totals() {
        let original = sample_set();
        let mut proposed = original.clone();
        proposed[0].amount = 1100.0; // revenue row silently altered

        let report = ConsistencyValidator::new().validate(&original, &proposed);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("revenue"));
        assert!(report.errors[0].contains("1250.00"));
        assert!(report.errors[0].contains("1350.00"));
    }

    #[test]
    fn test_kind_flip_fails_on_both_sides() {
        let original = sample_set();
        let mut proposed = original.clone();
        // A migration bug that turns an expense into revenue moves both sums
        proposed[2].kind = TransactionKind::Revenue;

        let report = ConsistencyValidator::new().validate(&original, &proposed);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn test_sub_tolerance_drift_is_accepted() {
        let original = sample_set();
        let mut proposed = original.clone();
        proposed[0].amount += 0.005;

        let report = ConsistencyValidator::new().validate(&original, &proposed);
        assert!(report.valid);
    }
}
