// 🛠 Correction Planner - stored vs recalculated balances
//
// The read side never writes, the write side never computes: this module
// produces the Correction list (and the human-readable report) for a
// reconciliation pass, and the batch bookkeeping types shared by every apply
// path. Idempotence falls out of the design - corrections always recompute
// from the full current transaction set, so a re-run with no data change
// plans nothing.

use crate::balance::compute_balance;
use crate::signs::BALANCE_EPSILON;
use crate::store::{AccountRecord, TransactionRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// CORRECTION
// ============================================================================

/// One account whose stored balance drifted from its recalculated balance.
/// Exists only for the duration of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub account_id: String,
    pub display_name: String,
    pub stored_balance: f64,
    pub recalculated_balance: f64,
    pub difference: f64,
}

// ============================================================================
// BATCH BOOKKEEPING
// ============================================================================

/// Maximum records per store write batch (the external store commits a batch
/// all-or-nothing; nothing atomic spans batches).
pub const BATCH_LIMIT: usize = 500;

/// Emitted once per successfully committed write batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub batch_index: usize,
    pub batches_total: usize,
    pub records_written: usize,
}

/// A batch the store rejected. The run continues with the remaining batches;
/// the safe remediation is an idempotent re-run, not an automatic retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub batch_index: usize,
    pub record_count: usize,
    pub error: String,
}

/// Split work into store-sized batches (≤ [`BATCH_LIMIT`] records each).
pub fn batches<T>(items: &[T]) -> Vec<&[T]> {
    items.chunks(BATCH_LIMIT).collect()
}

// ============================================================================
// CORRECTION PLANNER
// ============================================================================

pub struct CorrectionPlanner {
    /// Differences at or below this are treated as equal (float noise)
    pub tolerance: f64,
}

impl CorrectionPlanner {
    pub fn new() -> Self {
        CorrectionPlanner {
            tolerance: BALANCE_EPSILON,
        }
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        CorrectionPlanner { tolerance }
    }

    /// Recompute every account against the full current transaction set and
    /// emit a Correction for each one that drifted past the tolerance.
    pub fn plan(
        &self,
        accounts: &[AccountRecord],
        transactions: &[TransactionRecord],
    ) -> Vec<Correction> {
        let mut corrections = Vec::new();

        for account in accounts {
            let recalculated = compute_balance(&account.id, transactions);
            let difference = recalculated - account.stored_balance;

            if difference.abs() > self.tolerance {
                corrections.push(Correction {
                    account_id: account.id.clone(),
                    display_name: account.display_name.clone(),
                    stored_balance: account.stored_balance,
                    recalculated_balance: recalculated,
                    difference,
                });
            }
        }

        corrections
    }

    /// Plain-text report for export alongside the structured summary.
    pub fn report(
        &self,
        checked: usize,
        corrections: &[Correction],
        ran_at: DateTime<Utc>,
    ) -> String {
        let mut out = String::new();
        out.push_str("BALANCE RECONCILIATION REPORT\n");
        out.push_str(&format!("Generated: {}\n", ran_at.to_rfc3339()));
        out.push_str(&format!("Accounts checked: {}\n", checked));
        out.push_str(&format!(
            "Accounts needing correction: {}\n\n",
            corrections.len()
        ));

        if corrections.is_empty() {
            out.push_str("All stored balances match their transaction history.\n");
            return out;
        }

        for c in corrections {
            out.push_str(&format!(
                "  {} ({})\n    stored: {:.2}  recalculated: {:.2}  difference: {:+.2}\n",
                c.display_name, c.account_id, c.stored_balance, c.recalculated_balance, c.difference
            ));
        }

        let total_drift: f64 = corrections.iter().map(|c| c.difference.abs()).sum();
        out.push_str(&format!("\nTotal absolute drift: {:.2}\n", total_drift));
        out
    }
}

impl Default for CorrectionPlanner {
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
    use crate::store::test_helpers::{account, tx};

    #[test]
    fn test_drift_above_epsilon_is_corrected() {
        // Stored 500 vs recalculated 510: a correction is due
        let accounts = vec![account("a", "Acme", Some("external"), 500.0)];
        let txs = vec![tx("r", TransactionKind::Revenue, 510.0, Some("a"), None, None)];

        let corrections = CorrectionPlanner::new().plan(&accounts, &txs);
        assert_eq!(corrections.len(), 1);
        assert!((corrections[0].difference - 10.0).abs() < 1e-9);
        assert_eq!(corrections[0].recalculated_balance, 510.0);
    }

    #[test]
    fn test_drift_within_epsilon_is_ignored() {
        // Stored 500 vs recalculated 500.005: inside tolerance, leave it
        let accounts = vec![account("a", "Acme", Some("external"), 500.0)];
        let txs = vec![tx("r", TransactionKind::Revenue, 500.005, Some("a"), None, None)];

        let corrections = CorrectionPlanner::new().plan(&accounts, &txs);
        assert!(corrections.is_empty());
    }

    #[test]
    fn test_matching_balances_plan_nothing() {
        // A clean ledger plans zero corrections
        let accounts = vec![
            account("a", "Acme", Some("external"), 700.0),
            account("b", "Bank", Some("internal"), 0.0),
        ];
        let txs = vec![
            tx("r", TransactionKind::Revenue, 1000.0, Some("a"), None, None),
            tx("e", TransactionKind::Expense, 300.0, Some("a"), None, None),
        ];

        assert!(CorrectionPlanner::new().plan(&accounts, &txs).is_empty());
    }

    #[test]
    fn test_batching_respects_store_limit() {
        let items: Vec<u32> = (0..1201).collect();
        let chunks = batches(&items);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), BATCH_LIMIT);
        assert_eq!(chunks[1].len(), BATCH_LIMIT);
        assert_eq!(chunks[2].len(), 201);

        let empty: Vec<u32> = Vec::new();
        assert!(batches(&empty).is_empty());
    }

    #[test]
    fn test_report_lists_each_correction() {
        let accounts = vec![account("a", "Acme", Some("external"), 500.0)];
        let txs = vec![tx("r", TransactionKind::Revenue, 510.0, Some("a"), None, None)];
        let planner = CorrectionPlanner::new();

        let corrections = planner.plan(&accounts, &txs);
        let report = planner.report(1, &corrections, Utc::now());
        assert!(report.contains("Accounts checked: 1"));
        assert!(report.contains("Acme"));
        assert!(report.contains("+10.00"));
    }
}
