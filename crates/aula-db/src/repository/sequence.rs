//! # Business Number Sequences
//!
//! Human-readable numbers (`CS-20250301-0001`, `PEN-000042`) come from the
//! `number_sequences` counter table, incremented inside the caller's
//! transaction. A rolled-back transaction gives its number back.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::error::DbResult;
use aula_core::ReceiptConcept;

/// Increments the counter for `scope` and returns the new value (1 for a
/// fresh scope).
///
/// This is a write, so calling it first in a transaction takes the database
/// write lock before anything is read.
pub(crate) async fn next_value(conn: &mut SqliteConnection, scope: &str) -> DbResult<i64> {
    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO number_sequences (scope, last_value) VALUES (?1, 1)
        ON CONFLICT(scope) DO UPDATE SET last_value = last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(scope)
    .fetch_one(&mut *conn)
    .await?;

    Ok(value)
}

/// `CS-YYYYMMDD-NNNN`, numbered per day.
pub(crate) async fn next_session_number(
    conn: &mut SqliteConnection,
    now: DateTime<Utc>,
) -> DbResult<String> {
    let day = now.format("%Y%m%d").to_string();
    let seq = next_value(conn, &format!("cash_session:{day}")).await?;
    Ok(format!("CS-{day}-{seq:04}"))
}

/// `PREFIX-NNNNNN`, numbered per concept.
pub(crate) async fn next_receipt_number(
    conn: &mut SqliteConnection,
    concept: ReceiptConcept,
) -> DbResult<String> {
    let prefix = concept.prefix();
    let seq = next_value(conn, &format!("receipt:{prefix}")).await?;
    Ok(format!("{prefix}-{seq:06}"))
}
