//! Concurrency tests against a file-backed database with a real pool.
//!
//! The in-memory database used by the unit tests has a single connection, so
//! it cannot interleave transactions. These tests can.

use std::path::PathBuf;

use aula_core::context::perms;
use aula_core::requests::{
    IssueReceiptRequest, OpenSessionRequest, PayReceiptRequest, RecordCashMovementRequest,
    RecordInventoryMovementRequest, RegisterItemRequest,
};
use aula_core::{
    CashMovementType, CoreError, InventoryMovementType, PaymentMethod, ReceiptConcept,
    ReceiptStatus, RequestContext,
};
use aula_db::{Database, DbConfig, DbError};
use uuid::Uuid;

struct TempDb {
    db: Database,
    path: PathBuf,
}

impl TempDb {
    async fn new() -> Self {
        let path = std::env::temp_dir().join(format!("aula-test-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(8))
            .await
            .unwrap();
        TempDb { db, path }
    }

    async fn cleanup(self) {
        self.db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

fn admin(actor: &str) -> RequestContext {
    RequestContext::new(
        actor,
        [
            perms::CASH_SESSIONS_OPEN,
            perms::CASH_SESSIONS_CLOSE,
            perms::CASH_MOVEMENTS_CREATE,
            perms::RECEIPTS_ISSUE,
            perms::RECEIPTS_PAY,
            perms::INVENTORY_ITEMS_CREATE,
            perms::INVENTORY_MOVEMENTS_CREATE,
        ],
    )
}

fn inventory_movement(
    item_id: &str,
    movement_type: InventoryMovementType,
    quantity: i64,
    unit_cost_cents: Option<i64>,
) -> RecordInventoryMovementRequest {
    RecordInventoryMovementRequest {
        item_id: item_id.to_string(),
        movement_type,
        quantity,
        unit_cost_cents,
        batch_number: None,
        expiry_date: None,
        reason: None,
        destination_item_id: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_pay_with_same_key_writes_one_payment() {
    let tmp = TempDb::new().await;
    let db = tmp.db.clone();
    let ctx = admin("treasurer-1");

    let receipt = db
        .receipts()
        .issue(
            &ctx,
            IssueReceiptRequest {
                concept: ReceiptConcept::Tuition,
                amount_cents: 35_000,
                customer_name: "Ana Quispe".to_string(),
                customer_document: "45678912".to_string(),
                due_date: None,
            },
        )
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let db = db.clone();
        let ctx = ctx.clone();
        let receipt_id = receipt.id.clone();
        handles.push(tokio::spawn(async move {
            db.receipts()
                .pay(
                    &ctx,
                    &receipt_id,
                    PayReceiptRequest {
                        payment_method: PaymentMethod::Transfer,
                        payment_reference: Some("OP-778812".to_string()),
                    },
                    "pay-PEN-000001-attempt",
                )
                .await
        }));
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap().unwrap());
    }

    let first_id = &outcomes[0].payment.id;
    assert!(outcomes.iter().all(|o| &o.payment.id == first_id));
    assert_eq!(outcomes.iter().filter(|o| !o.replayed).count(), 1);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM receipt_payments")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);

    let stored = db.receipts().get_by_id(&receipt.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ReceiptStatus::Paid);

    tmp.cleanup().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_exits_never_drive_stock_negative() {
    let tmp = TempDb::new().await;
    let db = tmp.db.clone();
    let ctx = admin("almacen-1");

    let item = db
        .inventory()
        .register_item(
            &ctx,
            RegisterItemRequest {
                code: "PAPEL-A4".to_string(),
                name: "Papel bond A4".to_string(),
                unit_of_measure: "MLL".to_string(),
                min_stock: 10,
                max_stock: 200,
                unit_cost_cents: 1_000,
            },
        )
        .await
        .unwrap();
    db.inventory()
        .record_movement(
            &ctx,
            inventory_movement(&item.id, InventoryMovementType::Entry, 100, Some(1_000)),
        )
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let db = db.clone();
        let ctx = ctx.clone();
        let item_id = item.id.clone();
        handles.push(tokio::spawn(async move {
            db.inventory()
                .record_movement(
                    &ctx,
                    inventory_movement(&item_id, InventoryMovementType::Exit, 10, None),
                )
                .await
        }));
    }

    let mut accepted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(DbError::Domain(CoreError::InsufficientStock { .. })) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(accepted, 10);
    assert_eq!(rejected, 6);

    let stored = db.inventory().get_by_id(&item.id).await.unwrap().unwrap();
    assert_eq!(stored.current_stock, 0);
    assert_eq!(stored.stock_value_cents, 0);
    assert_eq!(stored.movement_count, 11);

    let numbers: Vec<i64> = db
        .inventory()
        .list_movements(&item.id)
        .await
        .unwrap()
        .iter()
        .map(|m| m.movement_number)
        .collect();
    assert_eq!(numbers, (1..=11).collect::<Vec<_>>());

    tmp.cleanup().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cash_movements_keep_totals() {
    let tmp = TempDb::new().await;
    let db = tmp.db.clone();
    let ctx = admin("cashier-1");

    let session = db
        .cash_sessions()
        .open(&ctx, OpenSessionRequest { initial_amount_cents: 10_000 })
        .await
        .unwrap();

    let mut handles = Vec::new();
    for n in 0..20 {
        let db = db.clone();
        let ctx = ctx.clone();
        let session_id = session.id.clone();
        let movement_type = if n % 4 == 0 {
            CashMovementType::Expense
        } else {
            CashMovementType::Income
        };
        handles.push(tokio::spawn(async move {
            db.cash_movements()
                .record_movement(
                    &ctx,
                    RecordCashMovementRequest {
                        cash_session_id: session_id,
                        movement_type,
                        amount_cents: 500,
                        concept: format!("Movimiento {n}"),
                        description: None,
                        cost_center: None,
                    },
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = db.cash_sessions().get_by_id(&session.id).await.unwrap().unwrap();
    assert_eq!(stored.movement_count, 20);
    assert_eq!(stored.total_income_cents, 15 * 500);
    assert_eq!(stored.total_expense_cents, 5 * 500);
    assert_eq!(stored.expected_final_amount_cents, 10_000 + 10 * 500);

    let audit = db.cash_sessions().audit(&session.id).await.unwrap();
    assert!(audit.consistent);

    tmp.cleanup().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_open_allows_one_session_per_cashier() {
    let tmp = TempDb::new().await;
    let db = tmp.db.clone();
    let ctx = admin("cashier-1");

    let mut handles = Vec::new();
    for _ in 0..6 {
        let db = db.clone();
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            db.cash_sessions()
                .open(&ctx, OpenSessionRequest { initial_amount_cents: 0 })
                .await
        }));
    }

    let mut opened = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => opened += 1,
            Err(DbError::Domain(CoreError::Conflict { .. })) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(opened, 1);

    tmp.cleanup().await;
}
