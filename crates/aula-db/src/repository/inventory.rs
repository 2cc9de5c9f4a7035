//! # Inventory Repository
//!
//! Item registration, FIFO-costed kardex movements, and kardex reads.
//!
//! ## Movement Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    record_movement(item, ...)                           │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    UPDATE inventory_items SET updated_at WHERE id = item   (1st write)  │
//! │    [TRANSFER] same for the destination item                             │
//! │    SELECT movements ──► LotQueue::replay (oldest lot first)             │
//! │    plan_movement()    ──► rows + realized FIFO cost                     │
//! │                           InsufficientStock? rollback, nothing written  │
//! │    INSERT movement row(s)                                               │
//! │    UPDATE cached stock / unit cost / value from the queue               │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! The movement log is the source of truth. The cached figures on the item
//! row are rewritten from the replayed queue in the same transaction.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use aula_core::context::perms;
use aula_core::fifo::{plan_movement, Lot, LotQueue, PlannedRow};
use aula_core::kardex::Kardex;
use aula_core::requests::{RecordInventoryMovementRequest, RegisterItemRequest};
use aula_core::{
    CoreError, InventoryItem, InventoryMovement, InventoryMovementType, Money, MovementReceipt,
    RequestContext,
};

/// Repository for inventory items and their kardex.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Registers an item with no stock.
    ///
    /// The registered cost is the item's unit cost until its first entry.
    pub async fn register_item(
        &self,
        ctx: &RequestContext,
        req: RegisterItemRequest,
    ) -> DbResult<InventoryItem> {
        ctx.require(perms::INVENTORY_ITEMS_CREATE)?;
        let req = req.validated()?;
        debug!(code = %req.code, "Registering inventory item");

        let now = Utc::now();
        let inserted = sqlx::query_as::<_, InventoryItem>(
            r#"
            INSERT INTO inventory_items (
                id, code, name, unit_of_measure, min_stock, max_stock,
                current_stock, unit_cost_cents, stock_value_cents,
                reference_cost_cents, movement_count, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, 0, ?7, 0, ?8, ?8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&req.code)
        .bind(&req.name)
        .bind(&req.unit_of_measure)
        .bind(req.min_stock)
        .bind(req.max_stock)
        .bind(req.unit_cost_cents)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from);

        match inserted {
            Ok(item) => {
                info!(id = %item.id, code = %item.code, "Inventory item registered");
                Ok(item)
            }
            Err(e) if e.is_unique_violation_on("code") => {
                warn!(code = %req.code, "Duplicate inventory item code");
                Err(CoreError::conflict(format!("item code {} already exists", req.code)).into())
            }
            Err(e) => Err(e),
        }
    }

    /// Records an ENTRY, EXIT, TRANSFER or ADJUSTMENT.
    ///
    /// ## Errors
    /// - `Validation` for malformed input (see `RecordInventoryMovementRequest`)
    /// - `NotFound` for an unknown item or destination
    /// - `InsufficientStock` when an outbound quantity exceeds the stock
    pub async fn record_movement(
        &self,
        ctx: &RequestContext,
        req: RecordInventoryMovementRequest,
    ) -> DbResult<MovementReceipt> {
        ctx.require(perms::INVENTORY_MOVEMENTS_CREATE)?;
        let req = req.validated()?;
        debug!(
            item_id = %req.item_id,
            movement_type = req.movement_type.as_str(),
            quantity = req.quantity,
            "Recording inventory movement"
        );

        let mut tx = self.pool.begin().await?;

        let item = claim_item(&mut tx, &req.item_id).await?;
        let destination = match &req.destination_item_id {
            Some(dest_id) => Some(claim_item(&mut tx, dest_id).await?),
            None => None,
        };

        let history = movements_of(&mut tx, &item.id).await?;
        let mut queue = LotQueue::replay(&item.code, &history)?;

        let dest_history = match &destination {
            Some(dest) => movements_of(&mut tx, &dest.id).await?,
            None => Vec::new(),
        };

        // Never earlier than the last movement of either side
        let now = history
            .iter()
            .chain(dest_history.iter())
            .map(|m| m.created_at)
            .fold(Utc::now(), |latest, at| latest.max(at));

        let plan = match plan_movement(&mut queue, &item.code, &req, item.unit_cost(), now) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(item_id = %item.id, code = %item.code, error = %e, "Inventory movement rejected");
                return Err(e.into());
            }
        };

        let transfer_id = destination.as_ref().map(|_| Uuid::new_v4().to_string());
        let source_row = NewMovement {
            item_id: &item.id,
            movement_number: item.movement_count + 1,
            movement_type: req.movement_type,
            row: &plan.source,
            reason: req.reason.as_deref(),
            transfer_id: transfer_id.as_deref(),
            counterpart_item_id: destination.as_ref().map(|d| d.id.as_str()),
            created_by: ctx.actor_id(),
            created_at: now,
        };
        let mut movements = vec![insert_movement(&mut tx, &source_row).await?];

        let valuation = queue.valuation(item.unit_cost());
        let item = store_valuation(
            &mut tx,
            &item.id,
            valuation.current_stock,
            valuation.unit_cost,
            valuation.stock_value,
            1,
            now,
        )
        .await?;

        let destination = match destination {
            Some(dest) => {
                let mut dest_queue = LotQueue::replay(&dest.code, &dest_history)?;
                for (offset, row) in plan.destination.iter().enumerate() {
                    let dest_row = NewMovement {
                        item_id: &dest.id,
                        movement_number: dest.movement_count + 1 + offset as i64,
                        movement_type: InventoryMovementType::Transfer,
                        row,
                        reason: req.reason.as_deref(),
                        transfer_id: transfer_id.as_deref(),
                        counterpart_item_id: Some(&item.id),
                        created_by: ctx.actor_id(),
                        created_at: now,
                    };
                    movements.push(insert_movement(&mut tx, &dest_row).await?);
                    if let Some(lot) = row.as_lot(now) {
                        dest_queue.push(lot);
                    }
                }

                let dest_valuation = dest_queue.valuation(dest.unit_cost());
                let updated = store_valuation(
                    &mut tx,
                    &dest.id,
                    dest_valuation.current_stock,
                    dest_valuation.unit_cost,
                    dest_valuation.stock_value,
                    plan.destination.len() as i64,
                    now,
                )
                .await?;
                Some(updated)
            }
            None => None,
        };

        tx.commit().await?;

        info!(
            item_id = %item.id,
            code = %item.code,
            movement_type = req.movement_type.as_str(),
            quantity = req.quantity,
            total_cost = %Money::from_cents(plan.source.total_cost_cents),
            stock = item.current_stock,
            "Inventory movement recorded"
        );
        Ok(MovementReceipt {
            item,
            movements,
            destination,
        })
    }

    /// Gets an item by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory_items WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }

    /// Gets an item by its business code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<InventoryItem>> {
        let item =
            sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory_items WHERE code = ?1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;

        Ok(item)
    }

    /// Items ordered by code.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(
            "SELECT * FROM inventory_items ORDER BY code LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Movements of an item in kardex order.
    pub async fn list_movements(&self, item_id: &str) -> DbResult<Vec<InventoryMovement>> {
        let mut conn = self.pool.acquire().await?;
        movements_of(&mut conn, item_id).await
    }

    /// Stock card of an item, recomputed from its movement log.
    pub async fn kardex(&self, item_id: &str) -> DbResult<Kardex> {
        let (_, kardex) = self.stock_card(item_id).await?;
        Ok(kardex)
    }

    /// The item together with its kardex, both read in one transaction.
    ///
    /// The item's `current_stock` and `stock_value_cents` match the last
    /// entry's running totals; a movement committed in between cannot
    /// split them.
    pub async fn stock_card(&self, item_id: &str) -> DbResult<(InventoryItem, Kardex)> {
        let mut tx = self.pool.begin().await?;
        let item = item_of(&mut tx, item_id).await?;
        let movements = movements_of(&mut tx, item_id).await?;
        tx.commit().await?;

        let kardex = Kardex::new(movements, Money::from_cents(item.reference_cost_cents));
        Ok((item, kardex))
    }

    /// FIFO lots still holding stock, oldest first.
    pub async fn remaining_lots(&self, item_id: &str) -> DbResult<Vec<Lot>> {
        let mut tx = self.pool.begin().await?;
        let item = item_of(&mut tx, item_id).await?;
        let movements = movements_of(&mut tx, item_id).await?;
        tx.commit().await?;

        let queue = LotQueue::replay(&item.code, &movements)?;
        Ok(queue.lots().cloned().collect())
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Touches the item row so the transaction holds the write lock before the
/// movement log is read.
async fn claim_item(conn: &mut SqliteConnection, item_id: &str) -> DbResult<InventoryItem> {
    let item = sqlx::query_as::<_, InventoryItem>(
        "UPDATE inventory_items SET updated_at = ?2 WHERE id = ?1 RETURNING *",
    )
    .bind(item_id)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    item.ok_or_else(|| DbError::not_found("InventoryItem", item_id).into_domain())
}

pub(crate) async fn item_of(conn: &mut SqliteConnection, item_id: &str) -> DbResult<InventoryItem> {
    let item = sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory_items WHERE id = ?1")
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;

    item.ok_or_else(|| DbError::not_found("InventoryItem", item_id).into_domain())
}

pub(crate) async fn movements_of(
    conn: &mut SqliteConnection,
    item_id: &str,
) -> DbResult<Vec<InventoryMovement>> {
    let movements = sqlx::query_as::<_, InventoryMovement>(
        r#"
        SELECT * FROM inventory_movements
        WHERE item_id = ?1
        ORDER BY created_at, movement_number
        "#,
    )
    .bind(item_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(movements)
}

struct NewMovement<'a> {
    item_id: &'a str,
    movement_number: i64,
    movement_type: InventoryMovementType,
    row: &'a PlannedRow,
    reason: Option<&'a str>,
    transfer_id: Option<&'a str>,
    counterpart_item_id: Option<&'a str>,
    created_by: &'a str,
    created_at: DateTime<Utc>,
}

async fn insert_movement(
    conn: &mut SqliteConnection,
    m: &NewMovement<'_>,
) -> DbResult<InventoryMovement> {
    let movement = sqlx::query_as::<_, InventoryMovement>(
        r#"
        INSERT INTO inventory_movements (
            id, item_id, movement_number, movement_type, direction, quantity,
            unit_cost_cents, total_cost_cents, batch_number, expiry_date, reason,
            transfer_id, counterpart_item_id, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        RETURNING *
        "#,
    )
    .bind(&m.row.id)
    .bind(m.item_id)
    .bind(m.movement_number)
    .bind(m.movement_type)
    .bind(m.row.direction)
    .bind(m.row.quantity)
    .bind(m.row.unit_cost_cents)
    .bind(m.row.total_cost_cents)
    .bind(&m.row.batch_number)
    .bind(m.row.expiry_date)
    .bind(m.reason)
    .bind(m.transfer_id)
    .bind(m.counterpart_item_id)
    .bind(m.created_by)
    .bind(m.created_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(movement)
}

async fn store_valuation(
    conn: &mut SqliteConnection,
    item_id: &str,
    current_stock: i64,
    unit_cost: Money,
    stock_value: Money,
    added_movements: i64,
    now: DateTime<Utc>,
) -> DbResult<InventoryItem> {
    let item = sqlx::query_as::<_, InventoryItem>(
        r#"
        UPDATE inventory_items SET
            current_stock = ?2,
            unit_cost_cents = ?3,
            stock_value_cents = ?4,
            movement_count = movement_count + ?5,
            updated_at = ?6
        WHERE id = ?1
        RETURNING *
        "#,
    )
    .bind(item_id)
    .bind(current_stock)
    .bind(unit_cost.cents())
    .bind(stock_value.cents())
    .bind(added_movements)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(item)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use aula_core::MovementDirection;
    use chrono::NaiveDate;

    fn keeper() -> RequestContext {
        RequestContext::new(
            "almacen-1",
            [perms::INVENTORY_ITEMS_CREATE, perms::INVENTORY_MOVEMENTS_CREATE],
        )
    }

    fn item_request(code: &str) -> RegisterItemRequest {
        RegisterItemRequest {
            code: code.to_string(),
            name: format!("{code} item"),
            unit_of_measure: "UND".to_string(),
            min_stock: 20,
            max_stock: 200,
            unit_cost_cents: 900,
        }
    }

    fn movement(
        item_id: &str,
        movement_type: InventoryMovementType,
        quantity: i64,
    ) -> RecordInventoryMovementRequest {
        RecordInventoryMovementRequest {
            item_id: item_id.to_string(),
            movement_type,
            quantity,
            unit_cost_cents: None,
            batch_number: None,
            expiry_date: None,
            reason: None,
            destination_item_id: None,
        }
    }

    fn entry(item_id: &str, quantity: i64, unit_cost_cents: i64) -> RecordInventoryMovementRequest {
        RecordInventoryMovementRequest {
            unit_cost_cents: Some(unit_cost_cents),
            ..movement(item_id, InventoryMovementType::Entry, quantity)
        }
    }

    async fn setup(code: &str) -> (Database, InventoryItem) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let item = db.inventory().register_item(&keeper(), item_request(code)).await.unwrap();
        (db, item)
    }

    #[tokio::test]
    async fn test_register_item() {
        let (db, item) = setup("PAPEL-A4").await;
        assert_eq!(item.current_stock, 0);
        assert_eq!(item.unit_cost_cents, 900);
        assert_eq!(item.reference_cost_cents, 900);

        let err = db
            .inventory()
            .register_item(&keeper(), item_request("PAPEL-A4"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Conflict { .. })));

        let found = db.inventory().get_by_code("PAPEL-A4").await.unwrap().unwrap();
        assert_eq!(found.id, item.id);
    }

    #[tokio::test]
    async fn test_fifo_exit_realizes_oldest_costs() {
        let (db, item) = setup("PAPEL-A4").await;
        let inv = db.inventory();

        inv.record_movement(&keeper(), entry(&item.id, 100, 1_000)).await.unwrap();
        inv.record_movement(&keeper(), entry(&item.id, 50, 1_200)).await.unwrap();
        let exit = inv
            .record_movement(&keeper(), movement(&item.id, InventoryMovementType::Exit, 120))
            .await
            .unwrap();

        let row = &exit.movements[0];
        assert_eq!(row.direction, MovementDirection::Out);
        assert_eq!(row.total_cost_cents, 124_000);
        assert_eq!(row.movement_number, 3);

        assert_eq!(exit.item.current_stock, 30);
        assert_eq!(exit.item.stock_value_cents, 36_000);
        assert_eq!(exit.item.unit_cost_cents, 1_200);
        assert_eq!(exit.item.movement_count, 3);

        let lots = inv.remaining_lots(&item.id).await.unwrap();
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].quantity, 30);
        assert_eq!(lots[0].unit_cost_cents, 1_200);
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let (db, item) = setup("TONER-HP").await;
        let inv = db.inventory();
        inv.record_movement(&keeper(), entry(&item.id, 5, 25_000)).await.unwrap();

        let err = inv
            .record_movement(&keeper(), movement(&item.id, InventoryMovementType::Exit, 6))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock {
                available: 5,
                requested: 6,
                ..
            })
        ));

        let stored = inv.get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.current_stock, 5);
        assert_eq!(stored.movement_count, 1);
        assert_eq!(inv.list_movements(&item.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exit_on_unknown_item() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .inventory()
            .record_movement(&keeper(), movement("missing", InventoryMovementType::Exit, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_transfer_carries_lot_costs() {
        let (db, source) = setup("PAPEL-A4").await;
        let inv = db.inventory();
        let dest = inv.register_item(&keeper(), item_request("PAPEL-A4-AULA")).await.unwrap();

        inv.record_movement(&keeper(), entry(&source.id, 10, 1_000)).await.unwrap();
        inv.record_movement(&keeper(), entry(&source.id, 10, 1_200)).await.unwrap();

        let transfer = inv
            .record_movement(
                &keeper(),
                RecordInventoryMovementRequest {
                    destination_item_id: Some(dest.id.clone()),
                    ..movement(&source.id, InventoryMovementType::Transfer, 15)
                },
            )
            .await
            .unwrap();

        // One OUT at the source, one IN per consumed lot at the destination
        assert_eq!(transfer.movements.len(), 3);
        let out = &transfer.movements[0];
        assert_eq!(out.direction, MovementDirection::Out);
        assert_eq!(out.total_cost_cents, 10 * 1_000 + 5 * 1_200);
        let transfer_id = out.transfer_id.clone().unwrap();
        assert!(transfer.movements.iter().all(|m| m.transfer_id.as_deref() == Some(transfer_id.as_str())));
        assert_eq!(out.counterpart_item_id.as_deref(), Some(dest.id.as_str()));

        assert_eq!(transfer.item.current_stock, 5);
        assert_eq!(transfer.item.stock_value_cents, 6_000);

        let dest = transfer.destination.unwrap();
        assert_eq!(dest.current_stock, 15);
        assert_eq!(dest.stock_value_cents, 16_000);
        assert_eq!(dest.movement_count, 2);

        let dest_lots = inv.remaining_lots(&dest.id).await.unwrap();
        let costs: Vec<i64> = dest_lots.iter().map(|l| l.unit_cost_cents).collect();
        assert_eq!(costs, vec![1_000, 1_200]);
    }

    #[tokio::test]
    async fn test_transfer_to_unknown_destination() {
        let (db, source) = setup("PAPEL-A4").await;
        let inv = db.inventory();
        inv.record_movement(&keeper(), entry(&source.id, 10, 1_000)).await.unwrap();

        let err = inv
            .record_movement(
                &keeper(),
                RecordInventoryMovementRequest {
                    destination_item_id: Some("missing".to_string()),
                    ..movement(&source.id, InventoryMovementType::Transfer, 5)
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::NotFound { .. })));
        assert_eq!(inv.get_by_id(&source.id).await.unwrap().unwrap().current_stock, 10);
    }

    #[tokio::test]
    async fn test_adjustments() {
        let (db, item) = setup("TIZA-BLANCA").await;
        let inv = db.inventory();

        // Positive adjustment on an empty item uses the registered cost
        let up = inv
            .record_movement(
                &keeper(),
                RecordInventoryMovementRequest {
                    reason: Some("Conteo físico".to_string()),
                    ..movement(&item.id, InventoryMovementType::Adjustment, 10)
                },
            )
            .await
            .unwrap();
        assert_eq!(up.movements[0].unit_cost_cents, Some(900));
        assert_eq!(up.item.current_stock, 10);

        let down = inv
            .record_movement(
                &keeper(),
                RecordInventoryMovementRequest {
                    reason: Some("Merma".to_string()),
                    ..movement(&item.id, InventoryMovementType::Adjustment, -4)
                },
            )
            .await
            .unwrap();
        assert_eq!(down.movements[0].direction, MovementDirection::Out);
        assert_eq!(down.movements[0].quantity, 4);
        assert_eq!(down.item.current_stock, 6);
        assert_eq!(down.item.stock_value_cents, 5_400);
    }

    #[tokio::test]
    async fn test_empty_item_keeps_last_unit_cost() {
        let (db, item) = setup("GUANTES").await;
        let inv = db.inventory();
        inv.record_movement(&keeper(), entry(&item.id, 3, 1_500)).await.unwrap();
        let exit = inv
            .record_movement(&keeper(), movement(&item.id, InventoryMovementType::Exit, 3))
            .await
            .unwrap();

        assert_eq!(exit.item.current_stock, 0);
        assert_eq!(exit.item.stock_value_cents, 0);
        assert_eq!(exit.item.unit_cost_cents, 1_500);
    }

    #[tokio::test]
    async fn test_kardex_running_totals() {
        let (db, item) = setup("PAPEL-A4").await;
        let inv = db.inventory();
        inv.record_movement(&keeper(), entry(&item.id, 100, 1_000)).await.unwrap();
        inv.record_movement(&keeper(), entry(&item.id, 50, 1_200)).await.unwrap();
        inv.record_movement(&keeper(), movement(&item.id, InventoryMovementType::Exit, 120))
            .await
            .unwrap();

        let kardex = inv.kardex(&item.id).await.unwrap();
        assert_eq!(kardex.len(), 3);

        let stock: Vec<i64> = kardex.clone().map(|e| e.running_stock).collect();
        assert_eq!(stock, vec![100, 150, 30]);

        let last = kardex.last().unwrap();
        assert_eq!(last.running_value_cents, 36_000);
        assert_eq!(last.running_unit_cost_cents, 1_200);
    }

    #[tokio::test]
    async fn test_stock_card_item_matches_last_entry() {
        let (db, item) = setup("PAPEL-A4").await;
        let inv = db.inventory();
        inv.record_movement(&keeper(), entry(&item.id, 40, 1_000)).await.unwrap();
        inv.record_movement(&keeper(), entry(&item.id, 60, 1_100)).await.unwrap();
        inv.record_movement(&keeper(), movement(&item.id, InventoryMovementType::Exit, 55))
            .await
            .unwrap();

        let (card_item, kardex) = inv.stock_card(&item.id).await.unwrap();
        let last = kardex.last().unwrap();
        assert_eq!(card_item.id, item.id);
        assert_eq!(card_item.current_stock, last.running_stock);
        assert_eq!(card_item.stock_value_cents, last.running_value_cents);
        assert_eq!(card_item.current_stock, 45);

        let err = inv.stock_card("missing").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_movement_times_never_go_backwards() {
        let (db, item) = setup("PAPEL-A4").await;
        let inv = db.inventory();
        for qty in [5, 6, 7] {
            inv.record_movement(&keeper(), entry(&item.id, qty, 1_000)).await.unwrap();
        }
        let movements = inv.list_movements(&item.id).await.unwrap();
        assert!(movements.windows(2).all(|w| w[0].created_at <= w[1].created_at));
        let numbers: Vec<i64> = movements.iter().map(|m| m.movement_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_entry_lot_data_is_kept() {
        let (db, item) = setup("ALCOHOL-GEL").await;
        let inv = db.inventory();
        let expiry = NaiveDate::from_ymd_opt(2026, 1, 31);
        inv.record_movement(
            &keeper(),
            RecordInventoryMovementRequest {
                batch_number: Some("L-2025-01".to_string()),
                expiry_date: expiry,
                ..entry(&item.id, 24, 850)
            },
        )
        .await
        .unwrap();

        let lots = inv.remaining_lots(&item.id).await.unwrap();
        assert_eq!(lots[0].batch_number.as_deref(), Some("L-2025-01"));
        assert_eq!(lots[0].expiry_date, expiry);
    }

    #[tokio::test]
    async fn test_movements_are_append_only() {
        let (db, item) = setup("PAPEL-A4").await;
        let receipt = db
            .inventory()
            .record_movement(&keeper(), entry(&item.id, 10, 1_000))
            .await
            .unwrap();

        let result = sqlx::query("DELETE FROM inventory_movements WHERE id = ?1")
            .bind(&receipt.movements[0].id)
            .execute(db.pool())
            .await;
        assert!(result.is_err());
    }
}
