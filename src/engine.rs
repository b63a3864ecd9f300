// 🚦 Ledger Engine - operational entry points over the record store
//
// One engine instance per session. Reads are bulk, writes are batched through
// the store, and every apply path recomputes from the full current record set
// so re-running after a partial failure is always safe. Proposals from the
// last migration scan are held in memory for approve/reject and discarded
// with the engine.

use crate::context::LedgerContext;
use crate::corrections::{batches, BatchFailure, BatchProgress, Correction, CorrectionPlanner};
use crate::migration::{
    MigrationAnalyzer, MigrationProposal, ProposalStatus, ResolvedParties,
};
use crate::store::{Store, TransactionRecord};
use crate::validator::{AggregateTotals, ConsistencyReport, ConsistencyValidator};
use crate::visibility::{normalize, VisibilityPatch};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

// ============================================================================
// RUN SUMMARIES
// ============================================================================

/// Dry-run output: the correction list and a text report, nothing written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationRun {
    pub checked_accounts: usize,
    pub corrections: Vec<Correction>,
    pub report: String,
    pub ran_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Apply output. `batch_events` carries one entry per committed batch;
/// `batch_failures` per rejected batch. Any failure flips
/// `rerun_recommended` - a re-run is always safe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplySummary {
    pub checked_accounts: usize,
    pub corrected: usize,
    pub failed: usize,
    pub corrections: Vec<Correction>,
    pub batch_events: Vec<BatchProgress>,
    pub batch_failures: Vec<BatchFailure>,
    pub rerun_recommended: bool,
    pub report: String,
    pub ran_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationScan {
    pub scanned: usize,
    pub ready: usize,
    pub needs_review: usize,
    pub skipped: usize,
    pub proposals: Vec<MigrationProposal>,
    pub ran_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationApplySummary {
    /// The P&L gate result; when invalid, `aborted` is true and nothing was written
    pub validation: ConsistencyReport,
    pub aborted: bool,
    pub migrated: usize,
    pub failed: usize,
    pub skipped: usize,
    pub batch_events: Vec<BatchProgress>,
    pub batch_failures: Vec<BatchFailure>,
    /// The reconciliation pass that follows a successful migration write
    pub reconciliation: Option<ApplySummary>,
    pub rerun_recommended: bool,
    pub report: String,
    pub ran_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeSummary {
    pub scanned: usize,
    pub patched: usize,
    pub failed: usize,
    pub batch_events: Vec<BatchProgress>,
    pub batch_failures: Vec<BatchFailure>,
    pub rerun_recommended: bool,
    pub ran_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReport {
    pub clean: bool,
    pub corrections_outstanding: usize,
    pub totals: AggregateTotals,
    pub report: String,
    pub ran_at: DateTime<Utc>,
}

// ============================================================================
// LEDGER ENGINE
// ============================================================================

pub struct LedgerEngine {
    store: Store,
    planner: CorrectionPlanner,
    analyzer: MigrationAnalyzer,
    validator: ConsistencyValidator,
    /// Proposals from the last scan, session-scoped
    proposals: Vec<MigrationProposal>,
}

impl LedgerEngine {
    pub fn new(store: Store) -> Self {
        LedgerEngine {
            store,
            planner: CorrectionPlanner::new(),
            analyzer: MigrationAnalyzer::new(),
            validator: ConsistencyValidator::new(),
            proposals: Vec::new(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn proposals(&self) -> &[MigrationProposal] {
        &self.proposals
    }

    // ========================================================================
    // RECONCILIATION
    // ========================================================================

    /// Pure reporting pass: recompute every account, list the drifted ones.
    pub fn dry_run_reconciliation(&self) -> Result<ReconciliationRun> {
        let started = Instant::now();
        let ran_at = Utc::now();

        let accounts = self.store.load_accounts()?;
        let transactions = self.store.load_transactions()?;
        let corrections = self.planner.plan(&accounts, &transactions);
        let report = self.planner.report(accounts.len(), &corrections, ran_at);

        Ok(ReconciliationRun {
            checked_accounts: accounts.len(),
            corrections,
            report,
            ran_at,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Recompute and persist. Batches of ≤500; a failing batch is recorded and
    /// the run moves on to the next one.
    pub fn apply_reconciliation(&mut self) -> Result<ApplySummary> {
        let started = Instant::now();
        let ran_at = Utc::now();

        let accounts = self.store.load_accounts()?;
        let transactions = self.store.load_transactions()?;
        let corrections = self.planner.plan(&accounts, &transactions);
        let report = self.planner.report(accounts.len(), &corrections, ran_at);

        let (corrected, batch_events, batch_failures) =
            write_batched(&corrections, |batch| self.store.write_balance_batch(batch))?;

        let failed = corrections.len() - corrected;
        Ok(ApplySummary {
            checked_accounts: accounts.len(),
            corrected,
            failed,
            corrections,
            rerun_recommended: !batch_failures.is_empty(),
            batch_events,
            batch_failures,
            report,
            ran_at,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    // ========================================================================
    // MIGRATION
    // ========================================================================

    /// Scan the whole transaction set for legacy two-party transfers and hold
    /// the resulting proposals for this session.
    pub fn analyze_migration_candidates(&mut self) -> Result<MigrationScan> {
        let started = Instant::now();
        let ran_at = Utc::now();

        let accounts = self.store.load_accounts()?;
        let transactions = self.store.load_transactions()?;
        let ctx = LedgerContext::build(&accounts);

        let proposals: Vec<MigrationProposal> = transactions
            .iter()
            .filter(|tx| !tx.is_deleted)
            .map(|tx| self.analyzer.analyze(tx, &ctx))
            .collect();

        let ready = count_status(&proposals, ProposalStatus::Ready);
        let needs_review = count_status(&proposals, ProposalStatus::NeedsReview);
        let skipped = count_status(&proposals, ProposalStatus::Skipped);

        self.proposals = proposals.clone();

        Ok(MigrationScan {
            scanned: transactions.len(),
            ready,
            needs_review,
            skipped,
            proposals,
            ran_at,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Human approval of a held proposal, with the unresolved parties filled in.
    pub fn approve_proposal(
        &mut self,
        transaction_id: &str,
        resolved: &ResolvedParties,
    ) -> Result<&MigrationProposal> {
        let analyzer = &self.analyzer;
        let proposal = self
            .proposals
            .iter_mut()
            .find(|p| p.source_transaction_id == transaction_id)
            .ok_or_else(|| anyhow!("No held proposal for transaction {}", transaction_id))?;

        analyzer
            .approve(proposal, resolved)
            .map_err(|msg| anyhow!(msg))?;
        Ok(proposal)
    }

    /// Human rejection of a held proposal.
    pub fn reject_proposal(
        &mut self,
        transaction_id: &str,
        reason: &str,
    ) -> Result<&MigrationProposal> {
        let analyzer = &self.analyzer;
        let proposal = self
            .proposals
            .iter_mut()
            .find(|p| p.source_transaction_id == transaction_id)
            .ok_or_else(|| anyhow!("No held proposal for transaction {}", transaction_id))?;

        analyzer.reject(proposal, reason);
        Ok(proposal)
    }

    /// Apply a set of proposals: rewrite the Ready ones into canonical form,
    /// gate on P&L consistency, write in batches, then reconcile (shape
    /// rewrites change downstream balances).
    pub fn apply_migration(
        &mut self,
        proposals: &[MigrationProposal],
    ) -> Result<MigrationApplySummary> {
        let started = Instant::now();
        let ran_at = Utc::now();

        let transactions = self.store.load_transactions()?;

        let mut rewrites: Vec<TransactionRecord> = Vec::new();
        let mut skipped = 0;
        let mut unmatched = 0;
        for proposal in proposals {
            if !proposal.is_ready() {
                skipped += 1;
                continue;
            }
            // A stale proposal must not block the rest of the run
            let original = match transactions
                .iter()
                .find(|tx| tx.id == proposal.source_transaction_id)
            {
                Some(original) => original,
                None => {
                    unmatched += 1;
                    if let Some(held) = self
                        .proposals
                        .iter_mut()
                        .find(|p| p.source_transaction_id == proposal.source_transaction_id)
                    {
                        held.status = ProposalStatus::Failed;
                        held.issues.push(format!(
                            "source transaction {} not found in store",
                            proposal.source_transaction_id
                        ));
                    }
                    continue;
                }
            };
            match proposal.rewritten(original) {
                Some(rewritten) => rewrites.push(rewritten),
                None => skipped += 1,
            }
        }

        // Build the proposed full set and run the hard P&L gate
        let mut proposed = transactions.clone();
        for rewritten in &rewrites {
            if let Some(slot) = proposed.iter_mut().find(|tx| tx.id == rewritten.id) {
                *slot = rewritten.clone();
            }
        }
        let validation = self.validator.validate(&transactions, &proposed);

        if !validation.valid {
            let report = format!(
                "MIGRATION ABORTED (nothing written)\n{}\n",
                validation.summary()
            );
            return Ok(MigrationApplySummary {
                validation,
                aborted: true,
                migrated: 0,
                failed: unmatched + rewrites.len(),
                skipped,
                batch_events: Vec::new(),
                batch_failures: Vec::new(),
                reconciliation: None,
                rerun_recommended: false,
                report,
                ran_at,
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }

        let (migrated, batch_events, batch_failures) =
            write_batched(&rewrites, |batch| self.store.write_rewrite_batch(batch))?;
        let failed = unmatched + rewrites.len() - migrated;

        // Mark held proposals whose batch was rejected so the session state
        // reflects what actually landed
        for failure in &batch_failures {
            let start = failure.batch_index * crate::corrections::BATCH_LIMIT;
            for rewritten in rewrites.iter().skip(start).take(failure.record_count) {
                if let Some(held) = self
                    .proposals
                    .iter_mut()
                    .find(|p| p.source_transaction_id == rewritten.id)
                {
                    held.status = ProposalStatus::Failed;
                    held.issues.push(format!("batch write failed: {}", failure.error));
                }
            }
        }

        // Rewriting transaction shape changes downstream balances
        let reconciliation = self.apply_reconciliation()?;

        let rerun_recommended = !batch_failures.is_empty() || reconciliation.rerun_recommended;
        let report = format!(
            "MIGRATION REPORT\nGenerated: {}\nMigrated: {}\nFailed: {}\nSkipped (not ready): {}\n{}\n\n{}",
            ran_at.to_rfc3339(),
            migrated,
            failed,
            skipped,
            validation.summary(),
            reconciliation.report
        );

        Ok(MigrationApplySummary {
            validation,
            aborted: false,
            migrated,
            failed,
            skipped,
            batch_events,
            batch_failures,
            reconciliation: Some(reconciliation),
            rerun_recommended,
            report,
            ran_at,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    // ========================================================================
    // VISIBILITY REPAIR
    // ========================================================================

    /// Repair debt-transfer rows hidden from balance calculation.
    pub fn normalize_visibility(&mut self) -> Result<NormalizeSummary> {
        let started = Instant::now();
        let ran_at = Utc::now();

        let transactions = self.store.load_transactions()?;
        let patches: Vec<VisibilityPatch> = transactions
            .iter()
            .filter(|tx| !tx.is_deleted)
            .filter_map(normalize)
            .collect();

        let (patched, batch_events, batch_failures) =
            write_batched(&patches, |batch| self.store.write_visibility_batch(batch))?;

        Ok(NormalizeSummary {
            scanned: transactions.len(),
            patched,
            failed: patches.len() - patched,
            rerun_recommended: !batch_failures.is_empty(),
            batch_events,
            batch_failures,
            ran_at,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    // ========================================================================
    // VERIFICATION
    // ========================================================================

    /// Post-apply check: a clean ledger has zero outstanding corrections.
    /// Also snapshots the P&L aggregates for the report.
    pub fn verify_post_apply(&self) -> Result<VerifyReport> {
        let ran_at = Utc::now();
        let run = self.dry_run_reconciliation()?;
        let transactions = self.store.load_transactions()?;
        let totals = AggregateTotals::compute(&transactions);

        let clean = run.corrections.is_empty();
        let report = format!(
            "POST-APPLY VERIFICATION\nGenerated: {}\nOutstanding corrections: {}\nAggregate revenue: {:.2}\nAggregate expense: {:.2}\nStatus: {}\n",
            ran_at.to_rfc3339(),
            run.corrections.len(),
            totals.revenue,
            totals.expense,
            if clean { "CLEAN" } else { "DRIFT REMAINS - re-run reconciliation" }
        );

        Ok(VerifyReport {
            clean,
            corrections_outstanding: run.corrections.len(),
            totals,
            report,
            ran_at,
        })
    }
}

// ============================================================================
// BATCH DRIVER
// ============================================================================

/// Drive one batched write: chunk, commit batch by batch, record progress per
/// committed batch and keep going past failures.
fn write_batched<T, F>(
    items: &[T],
    mut write: F,
) -> Result<(usize, Vec<BatchProgress>, Vec<BatchFailure>)>
where
    F: FnMut(&[T]) -> Result<usize>,
{
    let chunks = batches(items);
    let batches_total = chunks.len();

    let mut written = 0;
    let mut events = Vec::new();
    let mut failures = Vec::new();

    for (batch_index, chunk) in chunks.into_iter().enumerate() {
        match write(chunk) {
            Ok(count) => {
                written += count;
                events.push(BatchProgress {
                    batch_index,
                    batches_total,
                    records_written: count,
                });
            }
            Err(e) => failures.push(BatchFailure {
                batch_index,
                record_count: chunk.len(),
                error: e.to_string(),
            }),
        }
    }

    Ok((written, events, failures))
}

fn count_status(proposals: &[MigrationProposal], status: ProposalStatus) -> usize {
    proposals.iter().filter(|p| p.status == status).count()
}

// ============================================================================
// TESTS
// ============================================================================
