//! # Cash Session Repository
//!
//! Opening, closing and reading cashier sessions.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Session Lifecycle                                 │
//! │                                                                         │
//! │  1. OPEN                                                                │
//! │     └── open() → CashSession { status: OPEN, totals: 0 }                │
//! │         (partial unique index: one OPEN session per cashier)            │
//! │                                                                         │
//! │  2. RECORD (CashMovementRepository)                                     │
//! │     └── record_movement() → totals += amount, movement appended         │
//! │                                                                         │
//! │  3. CLOSE                                                               │
//! │     └── close() → CashSession { status: CLOSED, discrepancy }           │
//! │         UPDATE .. WHERE status = 'OPEN': exactly one close wins         │
//! │                                                                         │
//! │  4. IMMUTABLE                                                           │
//! │     └── trigger rejects any UPDATE once status = 'CLOSED'               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::sequence;
use aula_core::context::perms;
use aula_core::requests::{CloseSessionRequest, OpenSessionRequest};
use aula_core::{
    CashMovement, CashSession, CoreError, RequestContext, SessionAudit, SessionStatus,
    SessionWithMovements,
};

/// Repository for cash session operations.
#[derive(Debug, Clone)]
pub struct CashSessionRepository {
    pool: SqlitePool,
}

impl CashSessionRepository {
    /// Creates a new CashSessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashSessionRepository { pool }
    }

    /// Opens a session for the calling cashier.
    ///
    /// ## Errors
    /// - `Forbidden` without `cash.sessions.open`
    /// - `Validation` for a negative initial amount
    /// - `Conflict` when the cashier already has an OPEN session
    pub async fn open(&self, ctx: &RequestContext, req: OpenSessionRequest) -> DbResult<CashSession> {
        ctx.require(perms::CASH_SESSIONS_OPEN)?;
        let req = req.validated()?;
        let cashier_id = ctx.actor_id();
        debug!(cashier_id = %cashier_id, initial = req.initial_amount_cents, "Opening cash session");

        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        let mut tx = self.pool.begin().await?;
        let session_number = sequence::next_session_number(&mut tx, now).await?;

        let inserted = sqlx::query_as::<_, CashSession>(
            r#"
            INSERT INTO cash_sessions (
                id, cashier_id, session_number, initial_amount_cents,
                total_income_cents, total_expense_cents, movement_count,
                expected_final_amount_cents, status, opened_at
            ) VALUES (?1, ?2, ?3, ?4, 0, 0, 0, ?4, 'OPEN', ?5)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(cashier_id)
        .bind(&session_number)
        .bind(req.initial_amount_cents)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(DbError::from);

        let session = match inserted {
            Ok(session) => session,
            Err(e) if e.is_unique_violation_on("cashier_id") => {
                warn!(cashier_id = %cashier_id, "Cashier already has an open session");
                return Err(CoreError::conflict(format!(
                    "cashier {cashier_id} already has an open cash session"
                ))
                .into());
            }
            Err(e) => return Err(e),
        };

        tx.commit().await?;

        info!(
            id = %session.id,
            session_number = %session.session_number,
            cashier_id = %cashier_id,
            "Cash session opened"
        );
        Ok(session)
    }

    /// Closes an OPEN session with the counted cash.
    ///
    /// The expected amount is frozen at its current value and
    /// `discrepancy = actual − expected` is stored with it.
    pub async fn close(
        &self,
        ctx: &RequestContext,
        session_id: &str,
        req: CloseSessionRequest,
    ) -> DbResult<CashSession> {
        ctx.require(perms::CASH_SESSIONS_CLOSE)?;
        let req = req.validated()?;
        debug!(id = %session_id, actual = req.final_amount_cents, "Closing cash session");

        let mut tx = self.pool.begin().await?;

        let closed = sqlx::query_as::<_, CashSession>(
            r#"
            UPDATE cash_sessions SET
                status = 'CLOSED',
                actual_final_amount_cents = ?2,
                discrepancy_cents = ?2 - expected_final_amount_cents,
                closed_at = ?3,
                closing_notes = ?4
            WHERE id = ?1 AND status = 'OPEN'
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(req.final_amount_cents)
        .bind(Utc::now())
        .bind(&req.closing_notes)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(session) = closed else {
            let err = missing_or_not_open(&mut tx, session_id, "close").await;
            return Err(err);
        };

        tx.commit().await?;

        info!(
            id = %session.id,
            session_number = %session.session_number,
            expected = session.expected_final_amount_cents,
            discrepancy = ?session.discrepancy_cents,
            "Cash session closed"
        );
        Ok(session)
    }

    /// The cashier's OPEN session with its movements, if any.
    pub async fn get_current(&self, cashier_id: &str) -> DbResult<Option<SessionWithMovements>> {
        let session = sqlx::query_as::<_, CashSession>(
            "SELECT * FROM cash_sessions WHERE cashier_id = ?1 AND status = 'OPEN'",
        )
        .bind(cashier_id)
        .fetch_optional(&self.pool)
        .await?;

        match session {
            Some(session) => {
                let movements = self.list_movements(&session.id).await?;
                Ok(Some(SessionWithMovements { session, movements }))
            }
            None => Ok(None),
        }
    }

    /// Gets a session by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashSession>> {
        let session = sqlx::query_as::<_, CashSession>("SELECT * FROM cash_sessions WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// A session with its full movement log.
    pub async fn get_with_movements(&self, id: &str) -> DbResult<SessionWithMovements> {
        let session = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("CashSession", id).into_domain())?;
        let movements = self.list_movements(id).await?;
        Ok(SessionWithMovements { session, movements })
    }

    /// Movements of a session in ledger order.
    pub async fn list_movements(&self, session_id: &str) -> DbResult<Vec<CashMovement>> {
        let movements = sqlx::query_as::<_, CashMovement>(
            "SELECT * FROM cash_movements WHERE session_id = ?1 ORDER BY movement_number",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Recomputes a session's totals from its movement log and compares them
    /// to the stored running totals.
    pub async fn audit(&self, id: &str) -> DbResult<SessionAudit> {
        let SessionWithMovements { session, movements } = self.get_with_movements(id).await?;
        let audit = SessionAudit::compute(&session, &movements);
        if !audit.consistent {
            warn!(
                id = %id,
                stored_income = audit.stored_income_cents,
                ledger_income = audit.ledger_income_cents,
                stored_expense = audit.stored_expense_cents,
                ledger_expense = audit.ledger_expense_cents,
                "Cash session totals disagree with the movement log"
            );
        }
        Ok(audit)
    }
}

/// Error for a conditional update on a session that matched no row.
pub(crate) async fn missing_or_not_open(
    conn: &mut SqliteConnection,
    session_id: &str,
    operation: &str,
) -> DbError {
    let status: Result<Option<SessionStatus>, sqlx::Error> =
        sqlx::query_scalar("SELECT status FROM cash_sessions WHERE id = ?1")
            .bind(session_id)
            .fetch_optional(&mut *conn)
            .await;

    match status {
        Ok(None) => DbError::not_found("CashSession", session_id).into_domain(),
        Ok(Some(current)) => {
            warn!(id = %session_id, status = current.as_str(), operation, "Cash session is not open");
            CoreError::invalid_state("CashSession", session_id, current.as_str(), operation).into()
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
    use aula_core::requests::RecordCashMovementRequest;
    use aula_core::CashMovementType;

    fn cashier(id: &str) -> RequestContext {
        RequestContext::new(
            id,
            [
                perms::CASH_SESSIONS_OPEN,
                perms::CASH_SESSIONS_CLOSE,
                perms::CASH_MOVEMENTS_CREATE,
            ],
        )
    }

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn movement(session_id: &str, movement_type: CashMovementType, amount: i64) -> RecordCashMovementRequest {
        RecordCashMovementRequest {
            cash_session_id: session_id.to_string(),
            movement_type,
            amount_cents: amount,
            concept: "Pensión marzo".to_string(),
            description: None,
            cost_center: None,
        }
    }

    #[tokio::test]
    async fn test_open_session() {
        let db = setup().await;
        let ctx = cashier("cashier-1");

        let session = db
            .cash_sessions()
            .open(&ctx, OpenSessionRequest { initial_amount_cents: 10_000 })
            .await
            .unwrap();

        assert_eq!(session.status, SessionStatus::Open);
        assert_eq!(session.expected_final_amount_cents, 10_000);
        assert_eq!(session.movement_count, 0);
        assert!(session.session_number.starts_with("CS-"));
        assert!(session.session_number.ends_with("-0001"));
    }

    #[tokio::test]
    async fn test_second_open_session_conflicts() {
        let db = setup().await;
        let ctx = cashier("cashier-1");
        let repo = db.cash_sessions();

        repo.open(&ctx, OpenSessionRequest { initial_amount_cents: 0 }).await.unwrap();
        let err = repo
            .open(&ctx, OpenSessionRequest { initial_amount_cents: 0 })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Conflict { .. })));

        // Another cashier is independent
        let other = repo
            .open(&cashier("cashier-2"), OpenSessionRequest { initial_amount_cents: 0 })
            .await
            .unwrap();
        assert!(other.session_number.ends_with("-0002"));
    }

    #[tokio::test]
    async fn test_open_requires_permission_and_valid_amount() {
        let db = setup().await;
        let repo = db.cash_sessions();

        let nobody = RequestContext::new("cashier-1", Vec::<String>::new());
        let err = repo
            .open(&nobody, OpenSessionRequest { initial_amount_cents: 0 })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Forbidden { .. })));

        let err = repo
            .open(&cashier("cashier-1"), OpenSessionRequest { initial_amount_cents: -1 })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_close_with_discrepancy() {
        let db = setup().await;
        let ctx = cashier("cashier-1");
        let session = db
            .cash_sessions()
            .open(&ctx, OpenSessionRequest { initial_amount_cents: 10_000 })
            .await
            .unwrap();

        let ledger = db.cash_movements();
        ledger
            .record_movement(&ctx, movement(&session.id, CashMovementType::Income, 5_000))
            .await
            .unwrap();
        ledger
            .record_movement(&ctx, movement(&session.id, CashMovementType::Expense, 2_000))
            .await
            .unwrap();

        let closed = db
            .cash_sessions()
            .close(
                &ctx,
                &session.id,
                CloseSessionRequest {
                    final_amount_cents: 12_500,
                    closing_notes: Some("Faltante de S/ 5".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(closed.status, SessionStatus::Closed);
        assert_eq!(closed.expected_final_amount_cents, 13_000);
        assert_eq!(closed.actual_final_amount_cents, Some(12_500));
        assert_eq!(closed.discrepancy_cents, Some(-500));
        assert!(closed.closed_at.is_some());

        // No current session after close
        assert!(db.cash_sessions().get_current("cashier-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_close_twice_is_invalid_state() {
        let db = setup().await;
        let ctx = cashier("cashier-1");
        let repo = db.cash_sessions();
        let session = repo
            .open(&ctx, OpenSessionRequest { initial_amount_cents: 0 })
            .await
            .unwrap();

        let close = CloseSessionRequest {
            final_amount_cents: 0,
            closing_notes: None,
        };
        repo.close(&ctx, &session.id, close.clone()).await.unwrap();

        let err = repo.close(&ctx, &session.id, close.clone()).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidState { .. })));

        let err = repo.close(&ctx, "missing", close).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_closed_session_is_immutable_in_storage() {
        let db = setup().await;
        let ctx = cashier("cashier-1");
        let repo = db.cash_sessions();
        let session = repo
            .open(&ctx, OpenSessionRequest { initial_amount_cents: 0 })
            .await
            .unwrap();
        repo.close(
            &ctx,
            &session.id,
            CloseSessionRequest {
                final_amount_cents: 0,
                closing_notes: None,
            },
        )
        .await
        .unwrap();

        let result = sqlx::query("UPDATE cash_sessions SET closing_notes = 'edited' WHERE id = ?1")
            .bind(&session.id)
            .execute(db.pool())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_current_session_and_audit() {
        let db = setup().await;
        let ctx = cashier("cashier-1");
        let session = db
            .cash_sessions()
            .open(&ctx, OpenSessionRequest { initial_amount_cents: 10_000 })
            .await
            .unwrap();
        db.cash_movements()
            .record_movement(&ctx, movement(&session.id, CashMovementType::Income, 2_500))
            .await
            .unwrap();

        let current = db.cash_sessions().get_current("cashier-1").await.unwrap().unwrap();
        assert_eq!(current.session.id, session.id);
        assert_eq!(current.movements.len(), 1);

        let audit = db.cash_sessions().audit(&session.id).await.unwrap();
        assert!(audit.consistent);
        assert_eq!(audit.expected_final_amount_cents, 12_500);

        let err = db.cash_sessions().audit("missing").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::NotFound { .. })));
    }
}
