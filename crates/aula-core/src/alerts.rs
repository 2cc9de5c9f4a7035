//! # Stock Alerts
//!
//! Pure evaluation over current items and their remaining lots. Alerts are
//! computed on demand and never persisted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::fifo::Lot;
use crate::types::InventoryItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    /// At or below the minimum.
    Low,
    /// Out of stock.
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAlert {
    pub item_id: String,
    pub code: String,
    pub name: String,
    pub current_stock: i64,
    pub min_stock: i64,
    pub max_stock: i64,
    pub severity: AlertSeverity,
    /// Units needed to get back to `max_stock`.
    pub suggested_reorder_quantity: i64,
}

/// Items with `current_stock <= min_stock`, critical ones first.
pub fn evaluate_low_stock<'a>(items: impl IntoIterator<Item = &'a InventoryItem>) -> Vec<StockAlert> {
    let mut alerts: Vec<StockAlert> = items
        .into_iter()
        .filter(|item| item.current_stock <= item.min_stock)
        .map(|item| StockAlert {
            item_id: item.id.clone(),
            code: item.code.clone(),
            name: item.name.clone(),
            current_stock: item.current_stock,
            min_stock: item.min_stock,
            max_stock: item.max_stock,
            severity: if item.current_stock == 0 {
                AlertSeverity::Critical
            } else {
                AlertSeverity::Low
            },
            suggested_reorder_quantity: (item.max_stock - item.current_stock).max(0),
        })
        .collect();

    alerts.sort_by(|a, b| {
        let rank = |s: AlertSeverity| match s {
            AlertSeverity::Critical => 0,
            AlertSeverity::Low => 1,
        };
        rank(a.severity)
            .cmp(&rank(b.severity))
            .then_with(|| a.code.cmp(&b.code))
    });
    alerts
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpiryAlert {
    pub item_id: String,
    pub code: String,
    pub batch_number: Option<String>,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    pub remaining_quantity: i64,
    /// Negative once expired.
    pub days_until_expiry: i64,
    pub expired: bool,
}

/// Remaining lots that expire within `window_days` of `today` (or already
/// have), soonest first. Lots without an expiry date are skipped.
pub fn evaluate_expiring_lots<'a>(
    stock: impl IntoIterator<Item = (&'a InventoryItem, &'a [Lot])>,
    today: NaiveDate,
    window_days: i64,
) -> Vec<ExpiryAlert> {
    let mut alerts: Vec<ExpiryAlert> = stock
        .into_iter()
        .flat_map(|(item, lots)| {
            lots.iter().filter_map(move |lot| {
                let expiry_date = lot.expiry_date?;
                let days = (expiry_date - today).num_days();
                (days <= window_days && lot.quantity > 0).then(|| ExpiryAlert {
                    item_id: item.id.clone(),
                    code: item.code.clone(),
                    batch_number: lot.batch_number.clone(),
                    expiry_date,
                    remaining_quantity: lot.quantity,
                    days_until_expiry: days,
                    expired: days < 0,
                })
            })
        })
        .collect();

    alerts.sort_by(|a, b| {
        a.expiry_date
            .cmp(&b.expiry_date)
            .then_with(|| a.code.cmp(&b.code))
    });
    alerts
}
