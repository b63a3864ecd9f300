// 👁 Visibility Normalizer - debt transfers must always count
//
// A historical defect left some debt-transfer rows flagged as non-balance
// log entries, silently dropping them from every balance. The normalizer
// repairs exactly that: anything the classifier identifies as a debt transfer
// gets `affects_balance = true` and its log marker cleared. Migration
// provenance flags stay untouched for audit.

use crate::classify::{classify, Classification};
use crate::store::TransactionRecord;
use serde::{Deserialize, Serialize};

/// Metadata repair for one transaction. Applying it is idempotent: a patched
/// row normalizes to `None` on the next pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityPatch {
    pub transaction_id: String,
    pub set_affects_balance: bool,
    pub clear_log_marker: bool,
}

/// Returns the patch needed to make `tx` visible to balance calculation,
/// or `None` when it is already normal (or not a debt transfer at all).
pub fn normalize(tx: &TransactionRecord) -> Option<VisibilityPatch> {
    if classify(tx) != Classification::DebtTransfer {
        return None;
    }

    let needs_visibility = !tx.affects_balance;
    let needs_log_clear = tx.is_log;

    if !needs_visibility && !needs_log_clear {
        return None;
    }

    Some(VisibilityPatch {
        transaction_id: tx.id.clone(),
        set_affects_balance: needs_visibility,
        clear_log_marker: needs_log_clear,
    })
}

/// Apply a patch to an in-memory record (the store has its own column-level
/// version of this for batched writes).
pub fn apply_patch(tx: &mut TransactionRecord, patch: &VisibilityPatch) {
    if patch.set_affects_balance {
        tx.affects_balance = true;
    }
    if patch.clear_log_marker {
        tx.is_log = false;
    }
}

// ============================================================================
// TESTS
// ============================================================================
