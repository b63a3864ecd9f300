// 🔁 Migration Analyzer - legacy two-party transfers → three-party debt transfers
//
// Legacy rows record a liability reassignment as a generic transfer with a
// source and a target, and no debtor. The analyzer proposes the canonical
// three-party reading with a confidence level; only `Ready` (or explicitly
// approved) proposals are eligible for automatic application, everything else
// waits for a human decision.

use crate::classify::{classify, Classification, TransactionKind};
use crate::context::LedgerContext;
use crate::store::TransactionRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// PROPOSAL STATUS & CONFIDENCE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Not yet analyzed
    Pending,

    /// Structurally complete, eligible for automatic application
    Ready,

    /// Requires a human approval/rejection decision
    NeedsReview,

    /// Not a migration candidate (already canonical, internal-to-internal, ...)
    Skipped,

    /// Application was attempted and the write failed
    Failed,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Ready => "ready",
            ProposalStatus::NeedsReview => "needs_review",
            ProposalStatus::Skipped => "skipped",
            ProposalStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

// ============================================================================
// MIGRATION PROPOSAL
// ============================================================================

/// A recommended three-party reading of one legacy transaction. Never mutates
/// the transaction it was derived from; applying it produces a rewritten copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationProposal {
    pub source_transaction_id: String,
    pub status: ProposalStatus,
    pub confidence: Confidence,

    /// Account whose obligation is being reassigned (balance impact zero)
    pub proposed_debtor: Option<String>,

    /// Party now owed (legacy source leg)
    pub proposed_new_creditor: Option<String>,

    /// Party previously owed (legacy target leg)
    pub proposed_old_creditor: Option<String>,

    pub amount: f64,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

impl MigrationProposal {
    fn skipped(tx: &TransactionRecord, reason: &str) -> Self {
        MigrationProposal {
            source_transaction_id: tx.id.clone(),
            status: ProposalStatus::Skipped,
            confidence: Confidence::Low,
            proposed_debtor: None,
            proposed_new_creditor: None,
            proposed_old_creditor: None,
            amount: tx.amount,
            issues: vec![reason.to_string()],
            suggestions: Vec::new(),
            analyzed_at: Utc::now(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == ProposalStatus::Ready
    }

    pub fn is_complete(&self) -> bool {
        self.proposed_debtor.is_some()
            && self.proposed_new_creditor.is_some()
            && self.proposed_old_creditor.is_some()
    }

    /// Structural check: three distinct parties and a positive amount.
    /// Returns the list of violations (empty = sound).
    pub fn structural_issues(&self) -> Vec<String> {
        let mut found = Vec::new();

        if self.amount <= 0.0 {
            found.push(format!("non-positive amount {:.2}", self.amount));
        }

        match (
            &self.proposed_debtor,
            &self.proposed_new_creditor,
            &self.proposed_old_creditor,
        ) {
            (Some(d), Some(n), Some(o)) => {
                if d == n || d == o || n == o {
                    found.push(
                        "debtor, new creditor and old creditor must be three distinct accounts"
                            .to_string(),
                    );
                }
            }
            _ => found.push("proposal is missing at least one party".to_string()),
        }

        found
    }

    /// Rewrite the source transaction into canonical three-party form.
    /// Only valid for complete proposals; provenance flags are set so the
    /// migrated row stays auditable.
    pub fn rewritten(&self, tx: &TransactionRecord) -> Option<TransactionRecord> {
        if !self.is_complete() {
            return None;
        }

        let mut out = tx.clone();
        out.kind = TransactionKind::DebtTransfer;
        out.primary_party = self.proposed_debtor.clone();
        out.source_party = self.proposed_new_creditor.clone();
        out.target_party = self.proposed_old_creditor.clone();
        out.affects_balance = true;
        out.is_log = false;
        out.migration_flag = true;
        out.needs_review = self.status != ProposalStatus::Ready;
        Some(out)
    }

    pub fn summary(&self, ctx: &LedgerContext) -> String {
        let name = |id: &Option<String>| match id {
            Some(id) => ctx.display_name(id).to_string(),
            None => "?".to_string(),
        };
        format!(
            "{} [{} / {:?}] debtor={} new={} old={} amount={:.2}",
            self.source_transaction_id,
            self.status.as_str(),
            self.confidence,
            name(&self.proposed_debtor),
            name(&self.proposed_new_creditor),
            name(&self.proposed_old_creditor),
            self.amount
        )
    }
}

/// Human-supplied party resolution used when approving a NeedsReview proposal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolvedParties {
    pub debtor: Option<String>,
    pub new_creditor: Option<String>,
    pub old_creditor: Option<String>,
}

// ============================================================================
// MIGRATION ANALYZER
// ============================================================================

pub struct MigrationAnalyzer;

impl MigrationAnalyzer {
    pub fn new() -> Self {
        MigrationAnalyzer
    }

    /// Analyze one transaction against the account set of the current run.
    ///
    /// Decision paths:
    /// - not transfer-shaped, or already canonical → Skipped
    /// - both legacy parties internal → Skipped (book-to-book cash move)
    /// - one internal, one external → internal is the provisional debtor, the
    ///   creditor not named in the legacy record stays unresolved → NeedsReview/Medium
    /// - both external, exactly one internal account in the ledger → Ready/High
    /// - both external, several internal accounts → first internal as
    ///   provisional debtor, ambiguity recorded → NeedsReview/Medium
    /// - both external, no internal account → NeedsReview/Low, no proposal
    ///
    /// Complete proposals are then structurally validated (three distinct
    /// parties, positive amount); violations downgrade to NeedsReview/Low.
    pub fn analyze(&self, tx: &TransactionRecord, ctx: &LedgerContext) -> MigrationProposal {
        if tx.kind == TransactionKind::DebtTransfer {
            return MigrationProposal::skipped(tx, "already in canonical debt-transfer form");
        }
        if classify(tx) != Classification::DebtTransfer {
            return MigrationProposal::skipped(tx, "not transfer-shaped (needs source and target)");
        }

        // classify() guarantees both parties are present here
        let source = tx.source_party.clone().unwrap_or_default();
        let target = tx.target_party.clone().unwrap_or_default();

        let source_internal = ctx.is_internal(&source);
        let target_internal = ctx.is_internal(&target);

        let mut proposal = match (source_internal, target_internal) {
            (true, true) => {
                return MigrationProposal::skipped(
                    tx,
                    "both parties are internal accounts; plain cash transfer, not a liability move",
                )
            }

            // Exactly one internal party: it becomes the provisional debtor.
            // The creditor slot the external party does NOT fill is unknown -
            // the legacy record never named it.
            (true, false) | (false, true) => {
                let (debtor, new_creditor, old_creditor, missing) = if source_internal {
                    // External target keeps its old-creditor leg
                    (source.clone(), None, Some(target.clone()), "new creditor")
                } else {
                    (target.clone(), Some(source.clone()), None, "old creditor")
                };

                MigrationProposal {
                    source_transaction_id: tx.id.clone(),
                    status: ProposalStatus::NeedsReview,
                    confidence: Confidence::Medium,
                    proposed_debtor: Some(debtor),
                    proposed_new_creditor: new_creditor,
                    proposed_old_creditor: old_creditor,
                    amount: tx.amount,
                    issues: vec![format!(
                        "one legacy party is an internal account; the {} is not named in the \
                         legacy record and must be resolved manually",
                        missing
                    )],
                    suggestions: vec![
                        "approve with the missing creditor filled in, or reject".to_string()
                    ],
                    analyzed_at: Utc::now(),
                }
            }

            // Both external: the debtor must come from the ledger's internal
            // accounts.
            (false, false) => {
                let internals = ctx.internal_ids();
                match internals.len() {
                    0 => MigrationProposal {
                        source_transaction_id: tx.id.clone(),
                        status: ProposalStatus::NeedsReview,
                        confidence: Confidence::Low,
                        proposed_debtor: None,
                        proposed_new_creditor: None,
                        proposed_old_creditor: None,
                        amount: tx.amount,
                        issues: vec![
                            "no internal account exists to act as debtor".to_string()
                        ],
                        suggestions: vec![
                            "create or classify an internal account, then re-scan".to_string()
                        ],
                        analyzed_at: Utc::now(),
                    },
                    1 => MigrationProposal {
                        source_transaction_id: tx.id.clone(),
                        status: ProposalStatus::Ready,
                        confidence: Confidence::High,
                        proposed_debtor: Some(internals[0].clone()),
                        proposed_new_creditor: Some(source.clone()),
                        proposed_old_creditor: Some(target.clone()),
                        amount: tx.amount,
                        issues: Vec::new(),
                        suggestions: Vec::new(),
                        analyzed_at: Utc::now(),
                    },
                    n => MigrationProposal {
                        source_transaction_id: tx.id.clone(),
                        status: ProposalStatus::NeedsReview,
                        confidence: Confidence::Medium,
                        proposed_debtor: Some(internals[0].clone()),
                        proposed_new_creditor: Some(source.clone()),
                        proposed_old_creditor: Some(target.clone()),
                        amount: tx.amount,
                        issues: vec![format!(
                            "{} internal accounts found; '{}' was picked as provisional debtor \
                             only because it is listed first - ambiguous, confirm before applying",
                            n,
                            ctx.display_name(&internals[0])
                        )],
                        suggestions: vec![
                            "confirm the debtor account or approve with a different one".to_string(),
                        ],
                        analyzed_at: Utc::now(),
                    },
                }
            }
        };

        // Structural gate over complete proposals; incomplete ones already
        // carry a NeedsReview status and an explanatory issue.
        if proposal.is_complete() || proposal.amount <= 0.0 {
            let violations = proposal.structural_issues();
            if !violations.is_empty() {
                proposal.status = ProposalStatus::NeedsReview;
                proposal.confidence = Confidence::Low;
                proposal.issues.extend(violations);
            }
        }

        proposal
    }

    /// Fill a proposal's unresolved parties from a human decision and
    /// re-validate. Succeeds into Ready only when the result is structurally
    /// sound.
    pub fn approve(
        &self,
        proposal: &mut MigrationProposal,
        resolved: &ResolvedParties,
    ) -> Result<(), String> {
        if proposal.status == ProposalStatus::Skipped {
            return Err(format!(
                "proposal for {} was skipped and cannot be approved",
                proposal.source_transaction_id
            ));
        }

        if let Some(d) = &resolved.debtor {
            proposal.proposed_debtor = Some(d.clone());
        }
        if let Some(n) = &resolved.new_creditor {
            proposal.proposed_new_creditor = Some(n.clone());
        }
        if let Some(o) = &resolved.old_creditor {
            proposal.proposed_old_creditor = Some(o.clone());
        }

        let violations = proposal.structural_issues();
        if !violations.is_empty() {
            proposal.issues.extend(violations.clone());
            return Err(format!(
                "approval rejected: {}",
                violations.join("; ")
            ));
        }

        proposal.status = ProposalStatus::Ready;
        proposal.confidence = Confidence::High;
        Ok(())
    }

    /// Mark a proposal rejected; it drops out of every apply path.
    pub fn reject(&self, proposal: &mut MigrationProposal, reason: &str) {
        proposal.status = ProposalStatus::Skipped;
        proposal.issues.push(format!("rejected: {}", reason));
    }
}

impl Default for MigrationAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
