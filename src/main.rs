use anyhow::{anyhow, Result};
use std::env;
use std::path::{Path, PathBuf};

use ledgerbook::{LedgerEngine, Store};

const DEFAULT_DB: &str = "ledgerbook.db";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let accounts_csv = args
                .get(2)
                .ok_or_else(|| anyhow!("Usage: ledgerbook import <accounts.csv> <transactions.csv> [db]"))?;
            let transactions_csv = args
                .get(3)
                .ok_or_else(|| anyhow!("Usage: ledgerbook import <accounts.csv> <transactions.csv> [db]"))?;
            let db = db_path(args.get(4));
            run_import(Path::new(accounts_csv), Path::new(transactions_csv), &db)
        }
        Some("check") => run_check(&db_path(args.get(2))),
        Some("fix") => run_fix(&db_path(args.get(2))),
        Some("migrate-scan") => run_migrate_scan(&db_path(args.get(2))),
        Some("migrate-apply") => run_migrate_apply(&db_path(args.get(2))),
        Some("normalize") => run_normalize(&db_path(args.get(2))),
        Some("verify") => run_verify(&db_path(args.get(2))),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn db_path(arg: Option<&String>) -> PathBuf {
    arg.map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_DB))
}

fn print_usage() {
    println!("ledgerbook {} - balance reconciliation & debt-transfer migration", ledgerbook::VERSION);
    println!();
    println!("Usage:");
    println!("  ledgerbook import <accounts.csv> <transactions.csv> [db]");
    println!("  ledgerbook check [db]          dry-run reconciliation (no writes)");
    println!("  ledgerbook fix [db]            apply balance corrections");
    println!("  ledgerbook migrate-scan [db]   propose legacy transfer migrations");
    println!("  ledgerbook migrate-apply [db]  apply ready migration proposals");
    println!("  ledgerbook normalize [db]      repair hidden debt-transfer rows");
    println!("  ledgerbook verify [db]         post-apply verification");
}

fn run_import(accounts_csv: &Path, transactions_csv: &Path, db: &Path) -> Result<()> {
    let store = Store::open(db)?;

    println!("📂 Importing accounts from {:?}...", accounts_csv);
    let accounts = store.import_accounts_csv(accounts_csv)?;
    println!("✓ Imported {} accounts", accounts);

    println!("📂 Importing transactions from {:?}...", transactions_csv);
    let transactions = store.import_transactions_csv(transactions_csv)?;
    println!("✓ Imported {} transactions (duplicates skipped)", transactions);

    println!(
        "✓ Store now holds {} accounts, {} transactions",
        store.count_accounts()?,
        store.count_transactions()?
    );
    Ok(())
}

fn run_check(db: &Path) -> Result<()> {
    let engine = LedgerEngine::new(Store::open(db)?);
    let run = engine.dry_run_reconciliation()?;

    print!("{}", run.report);
    println!(
        "✓ Dry run complete in {} ms ({} accounts checked, {} corrections needed)",
        run.elapsed_ms,
        run.checked_accounts,
        run.corrections.len()
    );
    Ok(())
}

fn run_fix(db: &Path) -> Result<()> {
    let mut engine = LedgerEngine::new(Store::open(db)?);
    let summary = engine.apply_reconciliation()?;

    print!("{}", summary.report);
    for event in &summary.batch_events {
        println!(
            "✓ Batch {}/{} committed ({} balances)",
            event.batch_index + 1,
            event.batches_total,
            event.records_written
        );
    }
    for failure in &summary.batch_failures {
        println!(
            "✗ Batch {} FAILED ({} records): {}",
            failure.batch_index + 1,
            failure.record_count,
            failure.error
        );
    }
    println!(
        "✓ Corrected {} accounts ({} failed) in {} ms",
        summary.corrected, summary.failed, summary.elapsed_ms
    );
    if summary.rerun_recommended {
        println!("⚠ Some batches failed - a re-run is safe and recommended.");
    }
    Ok(())
}

fn run_migrate_scan(db: &Path) -> Result<()> {
    let store = Store::open(db)?;
    let mut engine = LedgerEngine::new(store);
    let scan = engine.analyze_migration_candidates()?;

    println!(
        "✓ Scanned {} transactions: {} ready, {} need review, {} skipped",
        scan.scanned, scan.ready, scan.needs_review, scan.skipped
    );

    let accounts = engine.store().load_accounts()?;
    let ctx = ledgerbook::LedgerContext::build(&accounts);
    for proposal in scan
        .proposals
        .iter()
        .filter(|p| p.status != ledgerbook::ProposalStatus::Skipped)
    {
        println!("  {}", proposal.summary(&ctx));
        for issue in &proposal.issues {
            println!("    issue: {}", issue);
        }
    }
    Ok(())
}

fn run_migrate_apply(db: &Path) -> Result<()> {
    let mut engine = LedgerEngine::new(Store::open(db)?);

    // Fresh scan; only Ready proposals are applied automatically,
    // NeedsReview ones keep waiting for a human decision.
    let scan = engine.analyze_migration_candidates()?;
    let summary = engine.apply_migration(&scan.proposals)?;

    print!("{}", summary.report);
    if summary.aborted {
        println!("✗ Migration aborted: {}", summary.validation.summary());
        return Ok(());
    }
    println!(
        "✓ Migrated {} transactions ({} failed, {} skipped) in {} ms",
        summary.migrated, summary.failed, summary.skipped, summary.elapsed_ms
    );
    if summary.rerun_recommended {
        println!("⚠ Some batches failed - a re-run is safe and recommended.");
    }
    Ok(())
}

fn run_normalize(db: &Path) -> Result<()> {
    let mut engine = LedgerEngine::new(Store::open(db)?);
    let summary = engine.normalize_visibility()?;

    println!(
        "✓ Scanned {} transactions, repaired {} hidden debt transfers ({} failed)",
        summary.scanned, summary.patched, summary.failed
    );
    if summary.patched > 0 {
        println!("  Run `ledgerbook fix` next - repaired rows change balances.");
    }
    Ok(())
}

fn run_verify(db: &Path) -> Result<()> {
    let engine = LedgerEngine::new(Store::open(db)?);
    let verify = engine.verify_post_apply()?;
    print!("{}", verify.report);
    Ok(())
}
