// Ledgerbook - counterparty bookkeeping core
// Balance reconciliation and liability-transfer migration over a record store.

pub mod balance;
pub mod classify;
pub mod context;
pub mod corrections;
pub mod engine;
pub mod migration;
pub mod signs;
pub mod store;
pub mod validator;
pub mod visibility;

// Re-export commonly used types
pub use balance::{compute_balance, transaction_delta};
pub use classify::{classify, is_debt_transfer, Classification, TransactionKind};
pub use context::{AccountKind, LedgerContext};
pub use corrections::{BatchFailure, BatchProgress, Correction, CorrectionPlanner, BATCH_LIMIT};
pub use engine::{
    ApplySummary, LedgerEngine, MigrationApplySummary, MigrationScan, NormalizeSummary,
    ReconciliationRun, VerifyReport,
};
pub use migration::{
    Confidence, MigrationAnalyzer, MigrationProposal, ProposalStatus, ResolvedParties,
};
pub use signs::{role_delta, PartyRole, BALANCE_EPSILON};
pub use store::{AccountRecord, Event, Store, TransactionRecord};
pub use validator::{AggregateTotals, ConsistencyReport, ConsistencyValidator};
pub use visibility::{normalize, VisibilityPatch};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
