//! # Cash Movement Ledger
//!
//! Append-only income/expense lines of an OPEN session.
//!
//! ## Transaction Shape
//! ```text
//! BEGIN
//!   UPDATE cash_sessions SET totals += amount, movement_count += 1
//!     WHERE id = ? AND status = 'OPEN'
//!     RETURNING movement_count        ← first write: session is locked
//!   INSERT INTO cash_movements (movement_number = movement_count, ...)
//! COMMIT
//! ```
//! A close racing with a movement either runs first (the UPDATE matches no
//! row) or waits for the movement to commit, so totals frozen at close always
//! include every accepted movement.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::cash_session::missing_or_not_open;
use aula_core::context::perms;
use aula_core::requests::RecordCashMovementRequest;
use aula_core::{CashMovement, CashMovementType, RequestContext};

/// Repository for the cash movement ledger.
#[derive(Debug, Clone)]
pub struct CashMovementRepository {
    pool: SqlitePool,
}

impl CashMovementRepository {
    /// Creates a new CashMovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashMovementRepository { pool }
    }

    /// Appends a movement and bumps the session's running totals in the same
    /// transaction.
    ///
    /// ## Errors
    /// - `Validation` for a non-positive amount or blank concept
    /// - `NotFound` for an unknown session
    /// - `InvalidState` when the session is CLOSED
    pub async fn record_movement(
        &self,
        ctx: &RequestContext,
        req: RecordCashMovementRequest,
    ) -> DbResult<CashMovement> {
        ctx.require(perms::CASH_MOVEMENTS_CREATE)?;
        let req = req.validated()?;
        debug!(
            session_id = %req.cash_session_id,
            movement_type = req.movement_type.as_str(),
            amount = req.amount_cents,
            "Recording cash movement"
        );

        let (income, expense) = match req.movement_type {
            CashMovementType::Income => (req.amount_cents, 0),
            CashMovementType::Expense => (0, req.amount_cents),
        };

        let mut tx = self.pool.begin().await?;

        let movement_number: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE cash_sessions SET
                total_income_cents = total_income_cents + ?2,
                total_expense_cents = total_expense_cents + ?3,
                expected_final_amount_cents = expected_final_amount_cents + ?2 - ?3,
                movement_count = movement_count + 1
            WHERE id = ?1 AND status = 'OPEN'
            RETURNING movement_count
            "#,
        )
        .bind(&req.cash_session_id)
        .bind(income)
        .bind(expense)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(movement_number) = movement_number else {
            let err = missing_or_not_open(&mut tx, &req.cash_session_id, "record_movement").await;
            return Err(err);
        };

        let movement = sqlx::query_as::<_, CashMovement>(
            r#"
            INSERT INTO cash_movements (
                id, session_id, movement_number, movement_type, amount_cents,
                concept, description, cost_center, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&req.cash_session_id)
        .bind(movement_number)
        .bind(req.movement_type)
        .bind(req.amount_cents)
        .bind(&req.concept)
        .bind(&req.description)
        .bind(&req.cost_center)
        .bind(ctx.actor_id())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            session_id = %movement.session_id,
            movement_number = movement.movement_number,
            movement_type = movement.movement_type.as_str(),
            amount = %movement.amount(),
            "Cash movement recorded"
        );
        Ok(movement)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
