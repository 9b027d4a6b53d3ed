//! # Offline Debt Sync
//!
//! Terminals that lost connectivity keep recording debts locally, each
//! with a terminal-assigned `local_id`. When they reconnect they push the
//! whole backlog in one call.
//!
//! ## Flow
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                           │
//! │   for each debt:                                                 │
//! │     local_id already stored? ──yes──► skipped                   │
//! │     invalid?                 ──yes──► error (index, kind)       │
//! │     SAVEPOINT                                                    │
//! │       insert debt + items                                        │
//! │       ok  ──► RELEASE   (created)                                │
//! │       err ──► ROLLBACK TO   (error, batch continues)             │
//! │  COMMIT                                                          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Re-sending the same batch is harmless: every item comes back skipped.

use pdv_core::validation::validate_new_debt;
use pdv_core::NewDebt;
use pdv_db::{DbError, DebtRepository};
use serde::{Deserialize, Serialize};
use sqlx::Connection;
use tracing::{debug, info, warn};

use crate::debts::insert_debt;
use crate::error::{ErrorKind, LedgerError, LedgerResult};
use crate::idempotency::Applied;
use crate::Ledger;

/// Overall result of a sync batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Every item was created or already present.
    Ok,
    /// At least one item failed; the rest were kept.
    Partial,
}

/// A batch item that was not stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncItemError {
    /// Position in the submitted batch.
    pub index: usize,
    pub local_id: Option<i64>,
    pub kind: ErrorKind,
    pub detail: String,
}

/// Counts returned to the terminal after a sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub status: SyncStatus,
    pub created: usize,
    pub skipped: usize,
    pub errors: Vec<SyncItemError>,
}

impl SyncReport {
    fn new() -> Self {
        SyncReport {
            status: SyncStatus::Ok,
            created: 0,
            skipped: 0,
            errors: Vec::new(),
        }
    }

    fn fail(&mut self, index: usize, local_id: Option<i64>, err: &LedgerError) {
        warn!(index, local_id = ?local_id, error = %err, "Sync item rejected");
        self.status = SyncStatus::Partial;
        self.errors.push(SyncItemError {
            index,
            local_id,
            kind: err.kind(),
            detail: err.to_string(),
        });
    }
}

/// Batch operations on a [`Ledger`].
pub struct BatchSync<'a> {
    ledger: &'a Ledger,
}

impl<'a> BatchSync<'a> {
    pub(crate) fn new(ledger: &'a Ledger) -> Self {
        BatchSync { ledger }
    }

    /// Stores a backlog of offline debts.
    ///
    /// Item failures never abort the batch. Only a store failure on the
    /// outer transaction is returned as an error, in which case nothing
    /// from the batch is kept.
    pub async fn sync_debts(&self, debts: Vec<NewDebt>) -> LedgerResult<SyncReport> {
        let mut report = SyncReport::new();
        let mut tx = self.ledger.db.begin().await?;

        for (index, request) in debts.iter().enumerate() {
            if let Some(local_id) = request.local_id {
                if DebtRepository::find_by_local_id(&mut tx, local_id).await?.is_some() {
                    debug!(index, local_id, "Sync item already stored");
                    report.skipped += 1;
                    continue;
                }
            }

            let ids = match validate_new_debt(request) {
                Ok(ids) => ids,
                Err(e) => {
                    report.fail(index, request.local_id, &LedgerError::from(e));
                    continue;
                }
            };

            let mut savepoint = Connection::begin(&mut *tx).await.map_err(DbError::transaction)?;
            match insert_debt(&mut savepoint, request, &ids).await {
                Ok(Applied::Created(debt)) => {
                    savepoint.commit().await.map_err(DbError::transaction)?;
                    debug!(index, debt_id = %debt.id, "Sync item stored");
                    report.created += 1;
                }
                Ok(Applied::Replayed(_)) => {
                    savepoint.rollback().await.map_err(DbError::transaction)?;
                    report.skipped += 1;
                }
                Err(e) => {
                    savepoint.rollback().await.map_err(DbError::transaction)?;
                    report.fail(index, request.local_id, &e);
                }
            }
        }

        tx.commit().await.map_err(DbError::transaction)?;

        info!(
            submitted = debts.len(),
            created = report.created,
            skipped = report.skipped,
            failed = report.errors.len(),
            "Debt sync complete"
        );
        Ok(report)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ledger, new_id, ProductFixture};
    use pdv_core::{DebtFilter, NewDebtItem};

    fn offline_debt(local_id: i64, product: &str, value: f64) -> NewDebt {
        NewDebt::new()
            .with_local_id(local_id)
            .item(NewDebtItem::new(product, 1.0, value))
    }

    #[tokio::test]
    async fn test_sync_skips_known_local_ids() {
        let ledger = ledger().await;
        let product = ProductFixture::new("Pão").insert(&ledger).await;

        ledger
            .debts()
            .create_debt(offline_debt(7, &product, 12.0))
            .await
            .unwrap();

        let batch = vec![
            offline_debt(7, &product, 12.0),
            offline_debt(8, &product, 3.0),
            offline_debt(9, &product, 4.5),
        ];

        let report = ledger.sync().sync_debts(batch.clone()).await.unwrap();
        assert_eq!(report.status, SyncStatus::Ok);
        assert_eq!(report.created, 2);
        assert_eq!(report.skipped, 1);
        assert!(report.errors.is_empty());

        let report = ledger.sync().sync_debts(batch).await.unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(report.skipped, 3);

        let all = ledger.debts().list_debts(DebtFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_sync_keeps_good_items_around_bad_ones() {
        let ledger = ledger().await;
        let product = ProductFixture::new("Leite").insert(&ledger).await;

        let batch = vec![
            offline_debt(1, &product, 5.0),
            // unknown product
            offline_debt(2, &new_id(), 5.0),
            // no items
            NewDebt::new().with_local_id(3),
            offline_debt(4, &product, 6.0),
        ];

        let report = ledger.sync().sync_debts(batch).await.unwrap();
        assert_eq!(report.status, SyncStatus::Partial);
        assert_eq!(report.created, 2);
        assert_eq!(report.errors.len(), 2);

        assert_eq!(report.errors[0].index, 1);
        assert_eq!(report.errors[0].local_id, Some(2));
        assert_eq!(report.errors[0].kind, ErrorKind::Referential);
        assert_eq!(report.errors[1].index, 2);
        assert_eq!(report.errors[1].kind, ErrorKind::Validation);

        let all = ledger.debts().list_debts(DebtFilter::default()).await.unwrap();
        let mut local_ids: Vec<_> = all.items.iter().filter_map(|view| view.debt.local_id).collect();
        local_ids.sort_unstable();
        assert_eq!(local_ids, vec![1, 4]);

        // the failed debt left no orphan lines behind
        let (orphans,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM debt_items WHERE debt_id NOT IN (SELECT id FROM debts)",
        )
        .fetch_one(ledger.database().pool())
        .await
        .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_sync_duplicate_within_batch() {
        let ledger = ledger().await;
        let product = ProductFixture::new("Ovos").insert(&ledger).await;

        let batch = vec![offline_debt(11, &product, 9.0), offline_debt(11, &product, 9.0)];
        let report = ledger.sync().sync_debts(batch).await.unwrap();

        assert_eq!(report.status, SyncStatus::Ok);
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn test_sync_empty_batch() {
        let ledger = ledger().await;
        let report = ledger.sync().sync_debts(Vec::new()).await.unwrap();

        assert_eq!(report.status, SyncStatus::Ok);
        assert_eq!(report.created + report.skipped, 0);
    }

    #[test]
    fn test_report_serialization() {
        let mut report = SyncReport::new();
        report.fail(0, Some(5), &LedgerError::UnknownProduct("p".into()));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "partial");
        assert_eq!(json["errors"][0]["kind"], "REFERENTIAL");
        assert_eq!(json["errors"][0]["local_id"], 5);
    }
}
