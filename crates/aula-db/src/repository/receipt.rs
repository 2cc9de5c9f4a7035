//! # Receipt Repository
//!
//! Issuing receipts, settling them idempotently, and the compensating
//! transitions (cancel, refund).
//!
//! ## Pay Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       pay(receipt, key)                                 │
//! │                                                                         │
//! │  payment with this key?  ──yes──► same receipt? ──yes──► replay        │
//! │         │ no                           │ no                             │
//! │         │                              └──► Conflict                    │
//! │         ▼                                                               │
//! │  BEGIN                                                                  │
//! │    UPDATE receipts SET PAID WHERE status = 'PENDING'  (first write)     │
//! │      no row? ──► key bound meanwhile? replay/Conflict                   │
//! │                  else NotFound / InvalidState                           │
//! │    INSERT payment (idempotency_key UNIQUE)                              │
//! │      unique violation? ──► rollback, re-read the winner                 │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::sequence;
use aula_core::context::perms;
use aula_core::requests::{IssueReceiptRequest, PayReceiptRequest, ReasonRequest};
use aula_core::validation::validate_idempotency_key;
use aula_core::{CoreError, Payment, PaymentOutcome, Receipt, ReceiptStatus, RequestContext};

/// Repository for receipts and their payments.
#[derive(Debug, Clone)]
pub struct ReceiptRepository {
    pool: SqlitePool,
}

impl ReceiptRepository {
    /// Creates a new ReceiptRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReceiptRepository { pool }
    }

    /// Issues a PENDING receipt with the next number of its concept series.
    pub async fn issue(&self, ctx: &RequestContext, req: IssueReceiptRequest) -> DbResult<Receipt> {
        ctx.require(perms::RECEIPTS_ISSUE)?;
        let req = req.validated()?;
        debug!(concept = req.concept.as_str(), amount = req.amount_cents, "Issuing receipt");

        let mut tx = self.pool.begin().await?;
        let receipt_number = sequence::next_receipt_number(&mut tx, req.concept).await?;

        let receipt = sqlx::query_as::<_, Receipt>(
            r#"
            INSERT INTO receipts (
                id, receipt_number, concept, amount_cents, customer_name,
                customer_document, status, issued_at, due_date, issued_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'PENDING', ?7, ?8, ?9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&receipt_number)
        .bind(req.concept)
        .bind(req.amount_cents)
        .bind(&req.customer_name)
        .bind(&req.customer_document)
        .bind(Utc::now())
        .bind(req.due_date)
        .bind(ctx.actor_id())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            id = %receipt.id,
            receipt_number = %receipt.receipt_number,
            amount = %receipt.amount(),
            "Receipt issued"
        );
        Ok(receipt)
    }

    /// Settles a PENDING receipt exactly once per idempotency key.
    ///
    /// ## Outcomes
    /// - New key, PENDING receipt: payment written, receipt PAID
    /// - Key already used for this receipt: the stored payment, `replayed`
    /// - Key already used for another receipt: `Conflict`
    /// - Receipt not PENDING: `InvalidState`
    pub async fn pay(
        &self,
        ctx: &RequestContext,
        receipt_id: &str,
        req: PayReceiptRequest,
        idempotency_key: &str,
    ) -> DbResult<PaymentOutcome> {
        let key = validate_idempotency_key(idempotency_key)?;
        ctx.require(perms::RECEIPTS_PAY)?;
        let req = req.validated()?;
        debug!(receipt_id = %receipt_id, key = %key, "Paying receipt");

        if let Some(existing) = self.find_payment_by_key(&key).await? {
            return replay_or_conflict(existing, receipt_id);
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let paid = sqlx::query_as::<_, Receipt>(
            r#"
            UPDATE receipts SET status = 'PAID', paid_at = ?2
            WHERE id = ?1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(receipt_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(receipt) = paid else {
            if let Some(existing) = payment_by_key(&mut tx, &key).await? {
                return replay_or_conflict(existing, receipt_id);
            }
            let err = transition_error(&mut tx, receipt_id, "pay").await;
            return Err(err);
        };

        let inserted = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO receipt_payments (
                id, receipt_id, receipt_number, amount_cents, method,
                reference, idempotency_key, applied_by, applied_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&receipt.id)
        .bind(&receipt.receipt_number)
        .bind(receipt.amount_cents)
        .bind(req.payment_method)
        .bind(&req.payment_reference)
        .bind(&key)
        .bind(ctx.actor_id())
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(DbError::from);

        let payment = match inserted {
            Ok(payment) => payment,
            Err(e) if e.is_unique_violation_on("idempotency_key") => {
                drop(tx);
                return match self.find_payment_by_key(&key).await? {
                    Some(existing) => replay_or_conflict(existing, receipt_id),
                    None => Err(e.into_domain()),
                };
            }
            Err(e) => return Err(e.into_domain()),
        };

        tx.commit().await?;

        info!(
            receipt_id = %receipt.id,
            receipt_number = %receipt.receipt_number,
            payment_id = %payment.id,
            amount = %payment.amount(),
            "Receipt paid"
        );
        Ok(PaymentOutcome {
            payment,
            replayed: false,
        })
    }

    /// PENDING or PAID → CANCELLED.
    pub async fn cancel(
        &self,
        ctx: &RequestContext,
        receipt_id: &str,
        req: ReasonRequest,
    ) -> DbResult<Receipt> {
        ctx.require(perms::RECEIPTS_CANCEL)?;
        let req = req.validated()?;
        self.transition(receipt_id, ReceiptStatus::Cancelled, &req.reason).await
    }

    /// PAID → REFUNDED.
    pub async fn refund(
        &self,
        ctx: &RequestContext,
        receipt_id: &str,
        req: ReasonRequest,
    ) -> DbResult<Receipt> {
        ctx.require(perms::RECEIPTS_REFUND)?;
        let req = req.validated()?;
        self.transition(receipt_id, ReceiptStatus::Refunded, &req.reason).await
    }

    async fn transition(
        &self,
        receipt_id: &str,
        target: ReceiptStatus,
        reason: &str,
    ) -> DbResult<Receipt> {
        let operation = match target {
            ReceiptStatus::Refunded => "refund",
            _ => "cancel",
        };
        debug!(receipt_id = %receipt_id, target = target.as_str(), "Receipt transition");

        let (at_column, reason_column) = match target {
            ReceiptStatus::Refunded => ("refunded_at", "refund_reason"),
            _ => ("cancelled_at", "cancellation_reason"),
        };
        let sources = ReceiptStatus::sources_of(target)
            .iter()
            .map(|s| format!("'{}'", s.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE receipts SET status = ?2, {at_column} = ?3, {reason_column} = ?4 \
             WHERE id = ?1 AND status IN ({sources}) RETURNING *"
        );

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Receipt>(&sql)
            .bind(receipt_id)
            .bind(target)
            .bind(Utc::now())
            .bind(reason)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(receipt) = updated else {
            let err = transition_error(&mut tx, receipt_id, operation).await;
            return Err(err);
        };

        tx.commit().await?;

        info!(
            id = %receipt.id,
            receipt_number = %receipt.receipt_number,
            status = receipt.status.as_str(),
            "Receipt status changed"
        );
        Ok(receipt)
    }

    /// Gets a receipt by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Receipt>> {
        let receipt = sqlx::query_as::<_, Receipt>("SELECT * FROM receipts WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(receipt)
    }

    /// Receipts, newest first, optionally filtered by status.
    pub async fn list(&self, status: Option<ReceiptStatus>, limit: i64) -> DbResult<Vec<Receipt>> {
        let receipts = sqlx::query_as::<_, Receipt>(
            r#"
            SELECT * FROM receipts
            WHERE ?1 IS NULL OR status = ?1
            ORDER BY issued_at DESC, receipt_number DESC
            LIMIT ?2
            "#,
        )
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(receipts)
    }

    /// The payment that settled a receipt, if any.
    pub async fn get_payment(&self, receipt_id: &str) -> DbResult<Option<Payment>> {
        let payment =
            sqlx::query_as::<_, Payment>("SELECT * FROM receipt_payments WHERE receipt_id = ?1")
                .bind(receipt_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(payment)
    }

    /// The payment bound to an idempotency key, if any.
    pub async fn find_payment_by_key(&self, key: &str) -> DbResult<Option<Payment>> {
        let mut conn = self.pool.acquire().await?;
        payment_by_key(&mut conn, key).await
    }
}

async fn payment_by_key(conn: &mut SqliteConnection, key: &str) -> DbResult<Option<Payment>> {
    let payment =
        sqlx::query_as::<_, Payment>("SELECT * FROM receipt_payments WHERE idempotency_key = ?1")
            .bind(key)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(payment)
}

/// A key bound to a different receipt is a `Conflict`, never a replay of
/// that receipt's payment. The key check runs before any state check, so
/// the answer is the same whether the target receipt is PENDING or PAID.
fn replay_or_conflict(existing: Payment, receipt_id: &str) -> DbResult<PaymentOutcome> {
    if existing.receipt_id == receipt_id {
        info!(
            receipt_id = %receipt_id,
            payment_id = %existing.id,
            "Idempotent replay of receipt payment"
        );
        Ok(PaymentOutcome {
            payment: existing,
            replayed: true,
        })
    } else {
        warn!(
            receipt_id = %receipt_id,
            bound_to = %existing.receipt_id,
            "Idempotency key already used for another receipt"
        );
        Err(CoreError::conflict(format!(
            "idempotency key already used for receipt {}",
            existing.receipt_number
        ))
        .into())
    }
}

/// Error for a conditional receipt update that matched no row.
async fn transition_error(conn: &mut SqliteConnection, receipt_id: &str, operation: &str) -> DbError {
    let status: Result<Option<ReceiptStatus>, sqlx::Error> =
        sqlx::query_scalar("SELECT status FROM receipts WHERE id = ?1")
            .bind(receipt_id)
            .fetch_optional(&mut *conn)
            .await;

    match status {
        Ok(None) => DbError::not_found("Receipt", receipt_id).into_domain(),
        Ok(Some(current)) => {
            warn!(receipt_id = %receipt_id, status = current.as_str(), operation, "Receipt transition rejected");
            CoreError::invalid_state("Receipt", receipt_id, current.as_str(), operation).into()
        }
        Err(e) => e.into(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use aula_core::{PaymentMethod, ReceiptConcept};

    fn treasurer() -> RequestContext {
        RequestContext::new(
            "treasurer-1",
            [
                perms::RECEIPTS_ISSUE,
                perms::RECEIPTS_PAY,
                perms::RECEIPTS_CANCEL,
                perms::RECEIPTS_REFUND,
            ],
        )
    }

    fn tuition(amount_cents: i64) -> IssueReceiptRequest {
        IssueReceiptRequest {
            concept: ReceiptConcept::Tuition,
            amount_cents,
            customer_name: "Ana Quispe".to_string(),
            customer_document: "45678912".to_string(),
            due_date: None,
        }
    }

    fn cash() -> PayReceiptRequest {
        PayReceiptRequest {
            payment_method: PaymentMethod::Cash,
            payment_reference: None,
        }
    }

    fn reason(text: &str) -> ReasonRequest {
        ReasonRequest {
            reason: text.to_string(),
        }
    }

    async fn setup() -> (Database, Receipt) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let receipt = db.receipts().issue(&treasurer(), tuition(35_000)).await.unwrap();
        (db, receipt)
    }

    #[tokio::test]
    async fn test_issue_numbers_per_concept() {
        let (db, first) = setup().await;
        let second = db.receipts().issue(&treasurer(), tuition(35_000)).await.unwrap();
        let cert = db
            .receipts()
            .issue(
                &treasurer(),
                IssueReceiptRequest {
                    concept: ReceiptConcept::Certificate,
                    customer_document: "20100047218".to_string(),
                    ..tuition(1_500)
                },
            )
            .await
            .unwrap();

        assert_eq!(first.receipt_number, "PEN-000001");
        assert_eq!(second.receipt_number, "PEN-000002");
        assert_eq!(cert.receipt_number, "CER-000001");
        assert_eq!(first.status, ReceiptStatus::Pending);
        assert_eq!(first.issued_by, "treasurer-1");
    }

    #[tokio::test]
    async fn test_issue_rejects_invalid_document() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .receipts()
            .issue(
                &treasurer(),
                IssueReceiptRequest {
                    customer_document: "20100047217".to_string(),
                    ..tuition(35_000)
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
        assert!(db.receipts().list(None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pay_once() {
        let (db, receipt) = setup().await;

        let outcome = db
            .receipts()
            .pay(&treasurer(), &receipt.id, cash(), "key-1")
            .await
            .unwrap();

        assert!(!outcome.replayed);
        assert_eq!(outcome.payment.amount_cents, 35_000);
        assert_eq!(outcome.payment.receipt_number, receipt.receipt_number);

        let stored = db.receipts().get_by_id(&receipt.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReceiptStatus::Paid);
        assert!(stored.paid_at.is_some());
    }

    #[tokio::test]
    async fn test_pay_replay_returns_same_payment() {
        let (db, receipt) = setup().await;
        let repo = db.receipts();

        let first = repo.pay(&treasurer(), &receipt.id, cash(), "key-1").await.unwrap();
        let second = repo.pay(&treasurer(), &receipt.id, cash(), "key-1").await.unwrap();

        assert!(second.replayed);
        assert_eq!(first.payment, second.payment);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM receipt_payments")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_pay_paid_receipt_with_new_key_is_invalid_state() {
        let (db, receipt) = setup().await;
        let repo = db.receipts();

        repo.pay(&treasurer(), &receipt.id, cash(), "key-1").await.unwrap();
        let err = repo
            .pay(&treasurer(), &receipt.id, cash(), "key-2")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_key_bound_to_other_receipt_conflicts() {
        let (db, receipt) = setup().await;
        let other = db.receipts().issue(&treasurer(), tuition(20_000)).await.unwrap();

        db.receipts()
            .pay(&treasurer(), &receipt.id, cash(), "key-1")
            .await
            .unwrap();
        let err = db
            .receipts()
            .pay(&treasurer(), &other.id, cash(), "key-1")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Conflict { .. })));

        let other = db.receipts().get_by_id(&other.id).await.unwrap().unwrap();
        assert_eq!(other.status, ReceiptStatus::Pending);
    }

    #[tokio::test]
    async fn test_key_of_other_receipt_conflicts_even_when_target_paid() {
        let (db, receipt) = setup().await;
        let other = db.receipts().issue(&treasurer(), tuition(20_000)).await.unwrap();

        db.receipts()
            .pay(&treasurer(), &receipt.id, cash(), "key-a")
            .await
            .unwrap();
        db.receipts()
            .pay(&treasurer(), &other.id, cash(), "key-b")
            .await
            .unwrap();

        let err = db
            .receipts()
            .pay(&treasurer(), &other.id, cash(), "key-a")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Conflict { .. })));

        let replay = db
            .receipts()
            .pay(&treasurer(), &other.id, cash(), "key-b")
            .await
            .unwrap();
        assert!(replay.replayed);
        assert_eq!(replay.payment.receipt_id, other.id);
    }

    #[tokio::test]
    async fn test_pay_requires_key() {
        let (db, receipt) = setup().await;
        let err = db
            .receipts()
            .pay(&treasurer(), &receipt.id, cash(), "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let err = db
            .receipts()
            .pay(&treasurer(), "missing", cash(), "key-9")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_cancel_and_refund_transitions() {
        let (db, receipt) = setup().await;
        let repo = db.receipts();

        // Refund needs a PAID receipt
        let err = repo
            .refund(&treasurer(), &receipt.id, reason("Retiro del alumno"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidState { .. })));

        repo.pay(&treasurer(), &receipt.id, cash(), "key-1").await.unwrap();
        let refunded = repo
            .refund(&treasurer(), &receipt.id, reason("Retiro del alumno"))
            .await
            .unwrap();
        assert_eq!(refunded.status, ReceiptStatus::Refunded);
        assert_eq!(refunded.refund_reason.as_deref(), Some("Retiro del alumno"));

        // Terminal
        let err = repo
            .cancel(&treasurer(), &receipt.id, reason("Error"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidState { .. })));

        // The payment row survives the refund
        assert!(repo.get_payment(&receipt.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cancel_pending_blocks_payment() {
        let (db, receipt) = setup().await;
        let repo = db.receipts();

        let err = repo.cancel(&treasurer(), &receipt.id, reason(" ")).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let cancelled = repo
            .cancel(&treasurer(), &receipt.id, reason("Emitido por error"))
            .await
            .unwrap();
        assert_eq!(cancelled.status, ReceiptStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());

        let err = repo.pay(&treasurer(), &receipt.id, cash(), "key-1").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_refund_requires_permission() {
        let (db, receipt) = setup().await;
        db.receipts()
            .pay(&treasurer(), &receipt.id, cash(), "key-1")
            .await
            .unwrap();

        let cashier = RequestContext::new("cashier-1", [perms::RECEIPTS_PAY, perms::RECEIPTS_CANCEL]);
        let err = db
            .receipts()
            .refund(&cashier, &receipt.id, reason("Retiro"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let (db, receipt) = setup().await;
        db.receipts().issue(&treasurer(), tuition(10_000)).await.unwrap();
        db.receipts()
            .pay(&treasurer(), &receipt.id, cash(), "key-1")
            .await
            .unwrap();

        assert_eq!(db.receipts().list(None, 50).await.unwrap().len(), 2);
        let paid = db.receipts().list(Some(ReceiptStatus::Paid), 50).await.unwrap();
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].id, receipt.id);
    }
}
