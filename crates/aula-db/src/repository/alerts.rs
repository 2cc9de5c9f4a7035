//! # Alert Repository
//!
//! Read-only evaluation of stock alerts. Nothing is persisted: every call
//! evaluates the current items and lots.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::inventory::movements_of;
use aula_core::alerts::{evaluate_expiring_lots, evaluate_low_stock, ExpiryAlert, StockAlert};
use aula_core::fifo::{Lot, LotQueue};
use aula_core::InventoryItem;

/// Repository for low-stock and expiry alerts.
#[derive(Debug, Clone)]
pub struct AlertRepository {
    pool: SqlitePool,
}

impl AlertRepository {
    /// Creates a new AlertRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AlertRepository { pool }
    }

    /// Items at or below their minimum stock, critical (empty) first.
    pub async fn low_stock(&self) -> DbResult<Vec<StockAlert>> {
        let items = sqlx::query_as::<_, InventoryItem>(
            "SELECT * FROM inventory_items WHERE current_stock <= min_stock ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?;

        let alerts = evaluate_low_stock(&items);
        debug!(count = alerts.len(), "Evaluated low stock alerts");
        Ok(alerts)
    }

    /// Remaining lots expiring within `window_days` of `today`, expired ones
    /// included.
    pub async fn expiring_lots(&self, today: NaiveDate, window_days: i64) -> DbResult<Vec<ExpiryAlert>> {
        let mut tx = self.pool.begin().await?;

        let items = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT * FROM inventory_items
            WHERE current_stock > 0 AND id IN (
                SELECT DISTINCT item_id FROM inventory_movements
                WHERE expiry_date IS NOT NULL
            )
            ORDER BY code
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        let mut stock: Vec<(InventoryItem, Vec<Lot>)> = Vec::with_capacity(items.len());
        for item in items {
            let movements = movements_of(&mut tx, &item.id).await?;
            let queue = LotQueue::replay(&item.code, &movements)?;
            stock.push((item, queue.lots().cloned().collect()));
        }
        tx.commit().await?;

        let alerts = evaluate_expiring_lots(
            stock.iter().map(|(item, lots)| (item, lots.as_slice())),
            today,
            window_days,
        );
        debug!(count = alerts.len(), window_days, "Evaluated expiry alerts");
        Ok(alerts)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use aula_core::alerts::AlertSeverity;
    use aula_core::context::perms;
    use aula_core::requests::{RecordInventoryMovementRequest, RegisterItemRequest};
    use aula_core::{InventoryMovementType, RequestContext};

    fn keeper() -> RequestContext {
        RequestContext::new(
            "almacen-1",
            [perms::INVENTORY_ITEMS_CREATE, perms::INVENTORY_MOVEMENTS_CREATE],
        )
    }

    async fn register(db: &Database, code: &str, min_stock: i64, max_stock: i64) -> InventoryItem {
        db.inventory()
            .register_item(
                &keeper(),
                RegisterItemRequest {
                    code: code.to_string(),
                    name: code.to_string(),
                    unit_of_measure: "UND".to_string(),
                    min_stock,
                    max_stock,
                    unit_cost_cents: 500,
                },
            )
            .await
            .unwrap()
    }

    fn entry(
        item_id: &str,
        quantity: i64,
        batch: Option<&str>,
        expiry_date: Option<NaiveDate>,
    ) -> RecordInventoryMovementRequest {
        RecordInventoryMovementRequest {
            item_id: item_id.to_string(),
            movement_type: InventoryMovementType::Entry,
            quantity,
            unit_cost_cents: Some(500),
            batch_number: batch.map(str::to_string),
            expiry_date,
            reason: None,
            destination_item_id: None,
        }
    }

    #[tokio::test]
    async fn test_low_stock_alerts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let empty = register(&db, "TONER-HP", 2, 10).await;
        let low = register(&db, "PAPEL-A4", 20, 200).await;
        let ok = register(&db, "TIZA", 5, 50).await;

        db.inventory().record_movement(&keeper(), entry(&low.id, 15, None, None)).await.unwrap();
        db.inventory().record_movement(&keeper(), entry(&ok.id, 30, None, None)).await.unwrap();

        let alerts = db.alerts().low_stock().await.unwrap();
        assert_eq!(alerts.len(), 2);

        assert_eq!(alerts[0].item_id, empty.id);
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
        assert_eq!(alerts[0].suggested_reorder_quantity, 10);

        assert_eq!(alerts[1].code, "PAPEL-A4");
        assert_eq!(alerts[1].severity, AlertSeverity::Low);
        assert_eq!(alerts[1].suggested_reorder_quantity, 185);
    }

    #[tokio::test]
    async fn test_expiry_alerts_follow_remaining_lots() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let gel = register(&db, "ALCOHOL-GEL", 0, 100).await;
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        let soon = NaiveDate::from_ymd_opt(2025, 3, 10);
        let later = NaiveDate::from_ymd_opt(2025, 9, 1);
        db.inventory()
            .record_movement(&keeper(), entry(&gel.id, 10, Some("L-1"), soon))
            .await
            .unwrap();
        db.inventory()
            .record_movement(&keeper(), entry(&gel.id, 10, Some("L-2"), later))
            .await
            .unwrap();

        let alerts = db.alerts().expiring_lots(today, 30).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].batch_number.as_deref(), Some("L-1"));
        assert_eq!(alerts[0].remaining_quantity, 10);
        assert_eq!(alerts[0].days_until_expiry, 9);
        assert!(!alerts[0].expired);

        // Consuming the first lot clears its alert
        db.inventory()
            .record_movement(
                &keeper(),
                RecordInventoryMovementRequest {
                    unit_cost_cents: None,
                    batch_number: None,
                    expiry_date: None,
                    movement_type: InventoryMovementType::Exit,
                    ..entry(&gel.id, 10, None, None)
                },
            )
            .await
            .unwrap();
        assert!(db.alerts().expiring_lots(today, 30).await.unwrap().is_empty());
    }
}
