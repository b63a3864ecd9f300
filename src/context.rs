// 📒 Ledger context - per-run account lookup
//
// Built once at the start of a reconciliation or migration pass from the full
// account set, used for every lookup inside that pass, then dropped. The
// legacy system kept this as a module-level mutable cache shared across
// passes; a run-scoped struct removes that lifecycle entirely.

use crate::store::AccountRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// ACCOUNT KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    /// The ledger owner's own cash/bank position
    Internal,

    /// A counterparty
    External,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Internal => "internal",
            AccountKind::External => "external",
        }
    }

    pub fn from_str(s: &str) -> Option<AccountKind> {
        match s {
            "internal" => Some(AccountKind::Internal),
            "external" => Some(AccountKind::External),
            _ => None,
        }
    }

    /// Classify an account from its stored kind when present, otherwise from
    /// display-name patterns. Counterparty (external) is the default: wrongly
    /// treating an internal account as external only widens the review gate,
    /// never silently picks a debtor.
    pub fn infer(stored_kind: Option<&str>, display_name: &str) -> AccountKind {
        if let Some(kind) = stored_kind.and_then(AccountKind::from_str) {
            return kind;
        }

        let name = display_name.to_lowercase();
        const INTERNAL_HINTS: [&str; 5] = ["cash", "bank", "caja", "banco", "wallet"];
        if INTERNAL_HINTS.iter().any(|hint| name.contains(hint)) {
            AccountKind::Internal
        } else {
            AccountKind::External
        }
    }
}

// ============================================================================
// LEDGER CONTEXT
// ============================================================================

/// Account lookup for one pass. Preserves the input ordering of accounts so
/// "first internal account" is deterministic.
pub struct LedgerContext {
    accounts: HashMap<String, AccountRecord>,
    kinds: HashMap<String, AccountKind>,
    internal_ids: Vec<String>,
}

impl LedgerContext {
    pub fn build(accounts: &[AccountRecord]) -> Self {
        let mut by_id = HashMap::with_capacity(accounts.len());
        let mut kinds = HashMap::with_capacity(accounts.len());
        let mut internal_ids = Vec::new();

        for account in accounts {
            let kind = AccountKind::infer(account.kind.as_deref(), &account.display_name);
            if kind == AccountKind::Internal {
                internal_ids.push(account.id.clone());
            }
            kinds.insert(account.id.clone(), kind);
            by_id.insert(account.id.clone(), account.clone());
        }

        LedgerContext {
            accounts: by_id,
            kinds,
            internal_ids,
        }
    }

    pub fn account(&self, id: &str) -> Option<&AccountRecord> {
        self.accounts.get(id)
    }

    /// Kind of a known account; unknown ids classify as External
    /// (an unreferenced counterparty, not one of our books).
    pub fn kind_of(&self, id: &str) -> AccountKind {
        self.kinds.get(id).copied().unwrap_or(AccountKind::External)
    }

    pub fn is_internal(&self, id: &str) -> bool {
        self.kind_of(id) == AccountKind::Internal
    }

    /// Internal account ids in original account-set order.
    pub fn internal_ids(&self) -> &[String] {
        &self.internal_ids
    }

    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.accounts
            .get(id)
            .map(|a| a.display_name.as_str())
            .unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_helpers::account;

    #[test]
    fn test_stored_kind_wins_over_name_patterns() {
        assert_eq!(
            AccountKind::infer(Some("external"), "Main Bank"),
            AccountKind::External
        );
        assert_eq!(
            AccountKind::infer(Some("internal"), "Acme Supplies"),
            AccountKind::Internal
        );
    }

    #[test]
    fn test_name_pattern_inference() {
        assert_eq!(AccountKind::infer(None, "Caja Chica"), AccountKind::Internal);
        assert_eq!(AccountKind::infer(None, "BANCO NORTE"), AccountKind::Internal);
        assert_eq!(AccountKind::infer(None, "Petty Cash"), AccountKind::Internal);
        assert_eq!(AccountKind::infer(None, "Acme Supplies"), AccountKind::External);
    }

    #[test]
    fn test_context_lookup_and_internal_ordering() {
        let accounts = vec![
            account("a1", "Acme Supplies", Some("external"), 0.0),
            account("b1", "Main Bank", Some("internal"), 100.0),
            account("b2", "Caja Chica", None, 50.0),
        ];
        let ctx = LedgerContext::build(&accounts);

        assert_eq!(ctx.len(), 3);
        assert!(!ctx.is_internal("a1"));
        assert!(ctx.is_internal("b1"));
        assert!(ctx.is_internal("b2"));
        assert_eq!(ctx.internal_ids(), &["b1".to_string(), "b2".to_string()]);
        assert_eq!(ctx.display_name("b1"), "Main Bank");
        assert_eq!(ctx.display_name("missing"), "missing");
        assert_eq!(ctx.kind_of("missing"), AccountKind::External);
    }

    #[test]
    fn test_display_name_falls_back_to_the_borrowed_id() {
        let ctx = LedgerContext::build(&[account("b1", "Main Bank", Some("internal"), 0.0)]);
        let id = String::from("counterparty-7");
        assert_eq!(ctx.display_name(&id), "counterparty-7");
    }
}
