use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::classify::TransactionKind;
use crate::corrections::Correction;
use crate::visibility::VisibilityPatch;

// ============================================================================
// RECORDS
// ============================================================================

fn default_true() -> bool {
    true
}

/// One transaction document. Immutable once settled; repairs and migrations
/// rewrite it in place and leave provenance flags behind. Rows are never
/// physically deleted, only flagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(default)]
    pub id: String,

    pub kind: TransactionKind,

    /// Non-negative; the sign table decides direction per party role
    pub amount: f64,

    /// The account the row is keyed to (debtor, for debt transfers)
    #[serde(default)]
    pub primary_party: Option<String>,

    /// Outbound leg / new creditor
    #[serde(default)]
    pub source_party: Option<String>,

    /// Inbound leg / old creditor
    #[serde(default)]
    pub target_party: Option<String>,

    #[serde(default = "default_true")]
    pub affects_balance: bool,

    #[serde(default)]
    pub is_deleted: bool,

    /// Log-only marker; a row so flagged is invisible to balances unless the
    /// classifier says it is a debt transfer
    #[serde(default)]
    pub is_log: bool,

    /// Provenance: row was rewritten by a migration
    #[serde(default)]
    pub migration_flag: bool,

    /// Provenance: migration outcome still awaits human review
    #[serde(default)]
    pub needs_review: bool,

    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl TransactionRecord {
    /// Idempotency hash for import deduplication (identity stays in `id`).
    pub fn idempotency_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{:.4}|{}|{}|{}",
            self.kind.as_str(),
            self.amount,
            self.primary_party.as_deref().unwrap_or(""),
            self.source_party.as_deref().unwrap_or(""),
            self.target_party.as_deref().unwrap_or(""),
        ));
        if let Some(at) = self.occurred_at {
            hasher.update(at.to_rfc3339());
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn ensure_id(&mut self) {
        if self.id.is_empty() {
            self.id = uuid::Uuid::new_v4().to_string();
        }
    }
}

/// One counterparty or internal book account. `stored_balance` is a cache of
/// the balance calculator's output, written only by the correction applier
/// (and the excluded transaction-entry flow).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(default)]
    pub id: String,

    pub display_name: String,

    /// Stored classification hint ("internal" / "external"), nullable;
    /// missing hints fall back to display-name pattern inference
    #[serde(default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub stored_balance: f64,
}

impl AccountRecord {
    pub fn ensure_id(&mut self) {
        if self.id.is_empty() {
            self.id = uuid::Uuid::new_v4().to_string();
        }
    }
}

/// Audit-trail event; every balance correction and migration rewrite appends one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(event_type: &str, entity_id: &str, data: serde_json::Value) -> Self {
        Event {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
        }
    }
}

// ============================================================================
// STORE
// ============================================================================

/// SQLite-backed record store. Stands in for the external document store:
/// bulk reads, batched writes with per-batch atomicity (each write call runs
/// inside one SQL transaction), nothing atomic across calls.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open ledger database at {:?}", path))?;
        let store = Store { conn };
        store.setup()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let store = Store { conn };
        store.setup()?;
        Ok(store)
    }

    fn setup(&self) -> Result<()> {
        // WAL for crash recovery (no effect on in-memory connections)
        let _ = self.conn.pragma_update(None, "journal_mode", "WAL");

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL UNIQUE,
                kind TEXT,
                stored_balance REAL NOT NULL DEFAULT 0
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                idempotency_hash TEXT UNIQUE NOT NULL,
                kind TEXT NOT NULL,
                amount REAL NOT NULL,
                primary_party TEXT,
                source_party TEXT,
                target_party TEXT,
                affects_balance INTEGER NOT NULL DEFAULT 1,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                is_log INTEGER NOT NULL DEFAULT 0,
                migration_flag INTEGER NOT NULL DEFAULT 0,
                needs_review INTEGER NOT NULL DEFAULT 0,
                occurred_at TEXT,
                recorded_at TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id TEXT UNIQUE NOT NULL,
                timestamp TEXT NOT NULL,
                event_type TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                data TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tx_kind ON transactions(kind)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tx_primary ON transactions(primary_party)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_id)",
            [],
        )?;

        Ok(())
    }

    // ========================================================================
    // BULK READS
    // ========================================================================

    pub fn load_accounts(&self) -> Result<Vec<AccountRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, display_name, kind, stored_balance FROM accounts ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok(AccountRecord {
                id: row.get(0)?,
                display_name: row.get(1)?,
                kind: row.get(2)?,
                stored_balance: row.get(3)?,
            })
        })?;

        let mut accounts = Vec::new();
        for row in rows {
            accounts.push(row?);
        }
        Ok(accounts)
    }

    pub fn load_transactions(&self) -> Result<Vec<TransactionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, amount, primary_party, source_party, target_party,
                    affects_balance, is_deleted, is_log, migration_flag, needs_review,
                    occurred_at, recorded_at
             FROM transactions ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, bool>(6)?,
                row.get::<_, bool>(7)?,
                row.get::<_, bool>(8)?,
                row.get::<_, bool>(9)?,
                row.get::<_, bool>(10)?,
                row.get::<_, Option<String>>(11)?,
                row.get::<_, Option<String>>(12)?,
            ))
        })?;

        let mut transactions = Vec::new();
        for row in rows {
            let (
                id,
                kind_str,
                amount,
                primary_party,
                source_party,
                target_party,
                affects_balance,
                is_deleted,
                is_log,
                migration_flag,
                needs_review,
                occurred_at,
                recorded_at,
            ) = row?;

            let kind = TransactionKind::from_str(&kind_str)
                .ok_or_else(|| anyhow!("Unknown transaction kind '{}' in row {}", kind_str, id))?;

            transactions.push(TransactionRecord {
                id,
                kind,
                amount,
                primary_party,
                source_party,
                target_party,
                affects_balance,
                is_deleted,
                is_log,
                migration_flag,
                needs_review,
                occurred_at: parse_timestamp(occurred_at)?,
                recorded_at: parse_timestamp(recorded_at)?,
            });
        }
        Ok(transactions)
    }

    pub fn count_transactions(&self) -> Result<i64> {
        let count =
            self.conn
                .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn count_accounts(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
        Ok(count)
    }

    // ========================================================================
    // SEEDING / IMPORT
    // ========================================================================

    /// Insert accounts, skipping id and display-name duplicates. Seed rows
    /// usually arrive without ids (a fresh one is assigned), so the name is
    /// what makes re-seeding the same file a no-op.
    pub fn insert_accounts(&self, accounts: &[AccountRecord]) -> Result<usize> {
        let mut inserted = 0;
        for account in accounts {
            let mut account = account.clone();
            account.ensure_id();
            let changed = self.conn.execute(
                "INSERT OR IGNORE INTO accounts (id, display_name, kind, stored_balance)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    account.id,
                    account.display_name,
                    account.kind,
                    account.stored_balance
                ],
            )?;
            inserted += changed;
        }
        Ok(inserted)
    }

    /// Insert transactions, skipping idempotency-hash duplicates so re-seeding
    /// the same file is a no-op.
    pub fn insert_transactions(&self, transactions: &[TransactionRecord]) -> Result<usize> {
        let mut inserted = 0;
        for tx in transactions {
            let mut tx = tx.clone();
            tx.ensure_id();
            let hash = tx.idempotency_hash();

            let result = self.conn.execute(
                "INSERT INTO transactions (
                    id, idempotency_hash, kind, amount, primary_party, source_party,
                    target_party, affects_balance, is_deleted, is_log, migration_flag,
                    needs_review, occurred_at, recorded_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    tx.id,
                    hash,
                    tx.kind.as_str(),
                    tx.amount,
                    tx.primary_party,
                    tx.source_party,
                    tx.target_party,
                    tx.affects_balance,
                    tx.is_deleted,
                    tx.is_log,
                    tx.migration_flag,
                    tx.needs_review,
                    tx.occurred_at.map(|dt| dt.to_rfc3339()),
                    tx.recorded_at.map(|dt| dt.to_rfc3339()),
                ],
            );

            match result {
                Ok(_) => inserted += 1,
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == rusqlite::ErrorCode::ConstraintViolation => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(inserted)
    }

    pub fn import_accounts_csv(&self, csv_path: &Path) -> Result<usize> {
        let mut rdr = csv::Reader::from_path(csv_path)
            .with_context(|| format!("Failed to open accounts CSV {:?}", csv_path))?;
        let mut accounts = Vec::new();
        for result in rdr.deserialize() {
            let account: AccountRecord = result.context("Failed to parse account row")?;
            accounts.push(account);
        }
        self.insert_accounts(&accounts)
    }

    pub fn import_transactions_csv(&self, csv_path: &Path) -> Result<usize> {
        let mut rdr = csv::Reader::from_path(csv_path)
            .with_context(|| format!("Failed to open transactions CSV {:?}", csv_path))?;
        let mut transactions = Vec::new();
        for (index, result) in rdr.deserialize().enumerate() {
            let tx: TransactionRecord = result.context("Failed to parse transaction row")?;
            // Amounts are magnitudes; direction comes from the party slots
            if tx.amount < 0.0 {
                return Err(anyhow!(
                    "Rejected transaction row {}: negative amount {:.2}",
                    index + 1,
                    tx.amount
                ));
            }
            transactions.push(tx);
        }
        self.insert_transactions(&transactions)
    }

    // ========================================================================
    // BATCHED WRITES (one SQL transaction per call = one store batch)
    // ========================================================================

    /// Persist one batch of balance corrections. All-or-nothing.
    pub fn write_balance_batch(&mut self, corrections: &[Correction]) -> Result<usize> {
        let txn = self.conn.transaction()?;
        for c in corrections {
            let changed = txn.execute(
                "UPDATE accounts SET stored_balance = ?1 WHERE id = ?2",
                params![c.recalculated_balance, c.account_id],
            )?;
            if changed == 0 {
                return Err(anyhow!("Account {} not found during balance write", c.account_id));
            }
            insert_event_in(
                &txn,
                &Event::new(
                    "balance_corrected",
                    &c.account_id,
                    serde_json::json!({
                        "stored": c.stored_balance,
                        "recalculated": c.recalculated_balance,
                        "difference": c.difference,
                    }),
                ),
            )?;
        }
        txn.commit().context("Failed to commit balance batch")?;
        Ok(corrections.len())
    }

    /// Persist one batch of migrated transaction rewrites. All-or-nothing.
    pub fn write_rewrite_batch(&mut self, rows: &[TransactionRecord]) -> Result<usize> {
        let txn = self.conn.transaction()?;
        for tx in rows {
            let changed = txn.execute(
                "UPDATE transactions SET
                    kind = ?1, amount = ?2, primary_party = ?3, source_party = ?4,
                    target_party = ?5, affects_balance = ?6, is_log = ?7,
                    migration_flag = ?8, needs_review = ?9
                 WHERE id = ?10",
                params![
                    tx.kind.as_str(),
                    tx.amount,
                    tx.primary_party,
                    tx.source_party,
                    tx.target_party,
                    tx.affects_balance,
                    tx.is_log,
                    tx.migration_flag,
                    tx.needs_review,
                    tx.id,
                ],
            )?;
            if changed == 0 {
                return Err(anyhow!("Transaction {} not found during rewrite", tx.id));
            }
            insert_event_in(
                &txn,
                &Event::new(
                    "transaction_migrated",
                    &tx.id,
                    serde_json::json!({
                        "kind": tx.kind.as_str(),
                        "primary_party": tx.primary_party,
                        "source_party": tx.source_party,
                        "target_party": tx.target_party,
                    }),
                ),
            )?;
        }
        txn.commit().context("Failed to commit rewrite batch")?;
        Ok(rows.len())
    }

    /// Persist one batch of visibility repairs. All-or-nothing.
    pub fn write_visibility_batch(&mut self, patches: &[VisibilityPatch]) -> Result<usize> {
        let txn = self.conn.transaction()?;
        for patch in patches {
            let changed = txn.execute(
                "UPDATE transactions SET
                    affects_balance = CASE WHEN ?1 THEN 1 ELSE affects_balance END,
                    is_log = CASE WHEN ?2 THEN 0 ELSE is_log END
                 WHERE id = ?3",
                params![
                    patch.set_affects_balance,
                    patch.clear_log_marker,
                    patch.transaction_id,
                ],
            )?;
            if changed == 0 {
                return Err(anyhow!(
                    "Transaction {} not found during visibility repair",
                    patch.transaction_id
                ));
            }
            insert_event_in(
                &txn,
                &Event::new(
                    "visibility_normalized",
                    &patch.transaction_id,
                    serde_json::json!({
                        "set_affects_balance": patch.set_affects_balance,
                        "clear_log_marker": patch.clear_log_marker,
                    }),
                ),
            )?;
        }
        txn.commit().context("Failed to commit visibility batch")?;
        Ok(patches.len())
    }

    // ========================================================================
    // AUDIT TRAIL
    // ========================================================================

    pub fn events_for(&self, entity_id: &str) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, timestamp, event_type, entity_id, data
             FROM events WHERE entity_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![entity_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (event_id, timestamp, event_type, entity_id, data) = row?;
            events.push(Event {
                event_id,
                timestamp: DateTime::parse_from_rfc3339(&timestamp)
                    .context("Bad event timestamp")?
                    .with_timezone(&Utc),
                event_type,
                entity_id,
                data: serde_json::from_str(&data).context("Bad event payload")?,
            });
        }
        Ok(events)
    }
}

fn insert_event_in(txn: &rusqlite::Transaction<'_>, event: &Event) -> Result<()> {
    txn.execute(
        "INSERT INTO events (event_id, timestamp, event_type, entity_id, data)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_id,
            serde_json::to_string(&event.data)?,
        ],
    )?;
    Ok(())
}

fn parse_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    match value {
        None => Ok(None),
        Some(s) => {
            let dt = DateTime::parse_from_rfc3339(&s)
                .with_context(|| format!("Bad timestamp '{}'", s))?;
            Ok(Some(dt.with_timezone(&Utc)))
        }
    }
}

// ============================================================================
// TEST HELPERS (shared by the unit tests across modules)
// ============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;

    pub fn tx(
        id: &str,
        kind: TransactionKind,
        amount: f64,
        primary: Option<&str>,
        source: Option<&str>,
        target: Option<&str>,
    ) -> TransactionRecord {
        TransactionRecord {
            id: id.to_string(),
            kind,
            amount,
            primary_party: primary.map(str::to_string),
            source_party: source.map(str::to_string),
            target_party: target.map(str::to_string),
            affects_balance: true,
            is_deleted: false,
            is_log: false,
            migration_flag: false,
            needs_review: false,
            occurred_at: None,
            recorded_at: None,
        }
    }

    pub fn account(id: &str, name: &str, kind: Option<&str>, balance: f64) -> AccountRecord {
        AccountRecord {
            id: id.to_string(),
            display_name: name.to_string(),
            kind: kind.map(str::to_string),
            stored_balance: balance,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::test_helpers::{account, tx};
    use super::*;

    #[test]
    fn test_roundtrip_accounts_and_transactions() {
        let store = Store::open_in_memory().unwrap();

        store
            .insert_accounts(&[
                account("a1", "Acme Supplies", Some("external"), 120.5),
                account("b1", "Main Bank", Some("internal"), 0.0),
            ])
            .unwrap();

        store
            .insert_transactions(&[
                tx("t1", TransactionKind::Revenue, 100.0, Some("a1"), None, None),
                tx(
                    "t2",
                    TransactionKind::Transfer,
                    50.0,
                    None,
                    Some("a1"),
                    Some("b1"),
                ),
            ])
            .unwrap();

        let accounts = store.load_accounts().unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].id, "a1");
        assert_eq!(accounts[0].stored_balance, 120.5);

        let txs = store.load_transactions().unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].kind, TransactionKind::Revenue);
        assert!(txs[0].affects_balance);
        assert_eq!(txs[1].source_party.as_deref(), Some("a1"));
    }

    #[test]
    fn test_duplicate_inserts_are_ignored() {
        let store = Store::open_in_memory().unwrap();
        let rows = vec![tx("t1", TransactionKind::Revenue, 100.0, Some("a"), None, None)];

        assert_eq!(store.insert_transactions(&rows).unwrap(), 1);
        // Same id AND same idempotency hash: both constraints skip it
        assert_eq!(store.insert_transactions(&rows).unwrap(), 0);
        assert_eq!(store.count_transactions().unwrap(), 1);
    }

    #[test]
    fn test_reseeding_idless_accounts_is_a_noop() {
        let store = Store::open_in_memory().unwrap();
        // Rows without an id, as a seed CSV without an id column produces them
        let seed = vec![
            account("", "Main Bank", Some("internal"), 0.0),
            account("", "Acme Supplies", Some("external"), 120.5),
        ];

        assert_eq!(store.insert_accounts(&seed).unwrap(), 2);
        assert_eq!(store.insert_accounts(&seed).unwrap(), 0);
        assert_eq!(store.count_accounts().unwrap(), 2);
    }

    #[test]
    fn test_import_rejects_negative_amounts() {
        let store = Store::open_in_memory().unwrap();
        let path = std::env::temp_dir().join(format!("ledgerbook-{}.csv", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "kind,amount,primary_party\nrevenue,100.0,a1\nexpense,-40.0,a1\n",
        )
        .unwrap();

        let result = store.import_transactions_csv(&path);
        std::fs::remove_file(&path).unwrap();

        let err = result.unwrap_err().to_string();
        assert!(err.contains("negative amount"), "got: {}", err);
        assert_eq!(store.count_transactions().unwrap(), 0);
    }

    #[test]
    fn test_balance_batch_updates_and_logs_event() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .insert_accounts(&[account("a1", "Acme", Some("external"), 500.0)])
            .unwrap();

        let correction = Correction {
            account_id: "a1".to_string(),
            display_name: "Acme".to_string(),
            stored_balance: 500.0,
            recalculated_balance: 510.0,
            difference: 10.0,
        };
        store.write_balance_batch(&[correction]).unwrap();

        let accounts = store.load_accounts().unwrap();
        assert_eq!(accounts[0].stored_balance, 510.0);

        let events = store.events_for("a1").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "balance_corrected");
    }

    #[test]
    fn test_balance_batch_is_atomic() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .insert_accounts(&[account("a1", "Acme", Some("external"), 500.0)])
            .unwrap();

        let good = Correction {
            account_id: "a1".to_string(),
            display_name: "Acme".to_string(),
            stored_balance: 500.0,
            recalculated_balance: 510.0,
            difference: 10.0,
        };
        let bad = Correction {
            account_id: "ghost".to_string(),
            display_name: "Ghost".to_string(),
            stored_balance: 0.0,
            recalculated_balance: 1.0,
            difference: 1.0,
        };

        assert!(store.write_balance_batch(&[good, bad]).is_err());

        // The failing batch rolled back entirely
        let accounts = store.load_accounts().unwrap();
        assert_eq!(accounts[0].stored_balance, 500.0);
        assert!(store.events_for("a1").unwrap().is_empty());
    }

    #[test]
    fn test_visibility_batch_repairs_flags() {
        let mut store = Store::open_in_memory().unwrap();
        let mut hidden = tx(
            "t1",
            TransactionKind::DebtTransfer,
            200.0,
            Some("d"),
            Some("l"),
            Some("s"),
        );
        hidden.affects_balance = false;
        hidden.is_log = true;
        store.insert_transactions(&[hidden]).unwrap();

        store
            .write_visibility_batch(&[VisibilityPatch {
                transaction_id: "t1".to_string(),
                set_affects_balance: true,
                clear_log_marker: true,
            }])
            .unwrap();

        let txs = store.load_transactions().unwrap();
        assert!(txs[0].affects_balance);
        assert!(!txs[0].is_log);
    }

    #[test]
    fn test_rewrite_batch_rewrites_row() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .insert_transactions(&[tx(
                "t1",
                TransactionKind::Transfer,
                200.0,
                None,
                Some("e1"),
                Some("e2"),
            )])
            .unwrap();

        let mut rewritten = tx(
            "t1",
            TransactionKind::DebtTransfer,
            200.0,
            Some("b1"),
            Some("e1"),
            Some("e2"),
        );
        rewritten.migration_flag = true;
        store.write_rewrite_batch(&[rewritten]).unwrap();

        let txs = store.load_transactions().unwrap();
        assert_eq!(txs[0].kind, TransactionKind::DebtTransfer);
        assert_eq!(txs[0].primary_party.as_deref(), Some("b1"));
        assert!(txs[0].migration_flag);
        assert_eq!(store.events_for("t1").unwrap().len(), 1);
    }
}
