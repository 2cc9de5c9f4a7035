//! # Seed Data Generator
//!
//! Populates the database with demo data for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./aula_dev.db
//! cargo run -p aula-db --bin seed
//!
//! # Specify database path
//! cargo run -p aula-db --bin seed -- --db ./data/aula.db
//! ```
//!
//! ## Generated Data
//! - Warehouse items (paper, toner, chalk, hand gel...) with FIFO entries,
//!   a few exits, and dated lots for the expiry alerts
//! - One open cash session with incomes and expenses
//! - Tuition and certificate receipts, some of them paid

use std::env;

use anyhow::Context;
use aula_core::context::perms;
use aula_core::requests::{
    IssueReceiptRequest, OpenSessionRequest, PayReceiptRequest, RecordCashMovementRequest,
    RecordInventoryMovementRequest, RegisterItemRequest,
};
use aula_core::{
    CashMovementType, InventoryMovementType, PaymentMethod, ReceiptConcept, RequestContext,
};
use aula_db::{Database, DbConfig};
use chrono::{Duration, Utc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// (code, name, unit, min, max, [(quantity, unit cost)], exit, expiry in days)
type ItemSeed = (&'static str, &'static str, &'static str, i64, i64, &'static [(i64, i64)], i64, Option<i64>);

const ITEMS: &[ItemSeed] = &[
    ("PAPEL-A4", "Papel bond A4 75g (millar)", "MLL", 20, 200, &[(100, 1_000), (50, 1_200)], 120, None),
    ("TONER-HP85A", "Tóner HP 85A", "UND", 2, 10, &[(3, 25_000)], 3, None),
    ("TIZA-BLANCA", "Tiza blanca (caja x 100)", "CJA", 10, 80, &[(40, 450)], 12, None),
    ("PLUMON-ACR", "Plumón acrílico azul", "UND", 30, 300, &[(60, 350), (60, 380)], 25, None),
    ("ALCOHOL-GEL", "Alcohol en gel 1L", "UND", 5, 60, &[(24, 850), (24, 900)], 10, Some(20)),
    ("UNIF-POLO-12", "Polo de educación física talla 12", "UND", 10, 100, &[(40, 2_500)], 35, None),
];

/// (concept, amount, customer, document, paid)
const RECEIPTS: &[(ReceiptConcept, i64, &str, &str, bool)] = &[
    (ReceiptConcept::Enrollment, 45_000, "Ana Quispe Mamani", "45678912", true),
    (ReceiptConcept::Tuition, 35_000, "Ana Quispe Mamani", "45678912", true),
    (ReceiptConcept::Tuition, 35_000, "Luis Huamán Torres", "41234567", false),
    (ReceiptConcept::Certificate, 1_500, "Comercial Los Andes SAC", "20100047218", false),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./aula_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Aula Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./aula_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(path = %db_path, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening database at {db_path}"))?;

    if !db.inventory().list(1).await?.is_empty() {
        warn!("Database already has inventory items; skipping seed to avoid duplicates");
        return Ok(());
    }

    let admin = RequestContext::new(
        "seed-admin",
        [
            perms::CASH_SESSIONS_OPEN,
            perms::CASH_SESSIONS_CLOSE,
            perms::CASH_MOVEMENTS_CREATE,
            perms::RECEIPTS_ISSUE,
            perms::RECEIPTS_PAY,
            perms::RECEIPTS_CANCEL,
            perms::RECEIPTS_REFUND,
            perms::INVENTORY_ITEMS_CREATE,
            perms::INVENTORY_MOVEMENTS_CREATE,
        ],
    );

    seed_inventory(&db, &admin).await?;
    seed_treasury(&db, &admin).await?;

    let low = db.alerts().low_stock().await?;
    let expiring = db
        .alerts()
        .expiring_lots(Utc::now().date_naive(), aula_core::DEFAULT_EXPIRY_WINDOW_DAYS)
        .await?;
    info!(low_stock = low.len(), expiring = expiring.len(), "Seed complete");

    Ok(())
}

async fn seed_inventory(db: &Database, ctx: &RequestContext) -> anyhow::Result<()> {
    let today = Utc::now().date_naive();

    for &(code, name, unit, min_stock, max_stock, entries, exit, expiry_days) in ITEMS {
        let item = db
            .inventory()
            .register_item(
                ctx,
                RegisterItemRequest {
                    code: code.to_string(),
                    name: name.to_string(),
                    unit_of_measure: unit.to_string(),
                    min_stock,
                    max_stock,
                    unit_cost_cents: entries.first().map(|e| e.1).unwrap_or_default(),
                },
            )
            .await
            .with_context(|| format!("registering {code}"))?;

        for (n, &(quantity, unit_cost_cents)) in entries.iter().enumerate() {
            let expiry_date = expiry_days.map(|days| today + Duration::days(days * (n as i64 + 1)));
            db.inventory()
                .record_movement(
                    ctx,
                    RecordInventoryMovementRequest {
                        item_id: item.id.clone(),
                        movement_type: InventoryMovementType::Entry,
                        quantity,
                        unit_cost_cents: Some(unit_cost_cents),
                        batch_number: expiry_date.map(|_| format!("L-{code}-{}", n + 1)),
                        expiry_date,
                        reason: None,
                        destination_item_id: None,
                    },
                )
                .await
                .with_context(|| format!("entry for {code}"))?;
        }

        let receipt = db
            .inventory()
            .record_movement(
                ctx,
                RecordInventoryMovementRequest {
                    item_id: item.id.clone(),
                    movement_type: InventoryMovementType::Exit,
                    quantity: exit,
                    unit_cost_cents: None,
                    batch_number: None,
                    expiry_date: None,
                    reason: Some("Entrega a aulas".to_string()),
                    destination_item_id: None,
                },
            )
            .await
            .with_context(|| format!("exit for {code}"))?;

        info!(
            code,
            stock = receipt.item.current_stock,
            value = %receipt.item.stock_value(),
            "Seeded item"
        );
    }

    Ok(())
}

async fn seed_treasury(db: &Database, ctx: &RequestContext) -> anyhow::Result<()> {
    let session = db
        .cash_sessions()
        .open(ctx, OpenSessionRequest { initial_amount_cents: 20_000 })
        .await?;

    for (n, &(concept, amount_cents, customer, document, paid)) in RECEIPTS.iter().enumerate() {
        let receipt = db
            .receipts()
            .issue(
                ctx,
                IssueReceiptRequest {
                    concept,
                    amount_cents,
                    customer_name: customer.to_string(),
                    customer_document: document.to_string(),
                    due_date: Some(Utc::now().date_naive() + Duration::days(15)),
                },
            )
            .await?;

        if paid {
            db.receipts()
                .pay(
                    ctx,
                    &receipt.id,
                    PayReceiptRequest {
                        payment_method: PaymentMethod::Cash,
                        payment_reference: None,
                    },
                    &format!("seed-payment-{n}"),
                )
                .await?;
            db.cash_movements()
                .record_movement(
                    ctx,
                    RecordCashMovementRequest {
                        cash_session_id: session.id.clone(),
                        movement_type: CashMovementType::Income,
                        amount_cents,
                        concept: format!("Cobro {}", receipt.receipt_number),
                        description: Some(customer.to_string()),
                        cost_center: None,
                    },
                )
                .await?;
        }
    }

    db.cash_movements()
        .record_movement(
            ctx,
            RecordCashMovementRequest {
                cash_session_id: session.id.clone(),
                movement_type: CashMovementType::Expense,
                amount_cents: 4_500,
                concept: "Movilidad de personal".to_string(),
                description: None,
                cost_center: Some("ADMINISTRACION".to_string()),
            },
        )
        .await?;

    let current = db.cash_sessions().audit(&session.id).await?;
    info!(
        session_number = %current.session_number,
        expected = current.expected_final_amount_cents,
        consistent = current.consistent,
        "Seeded cash session"
    );

    Ok(())
}
