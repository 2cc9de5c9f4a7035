//! # Kardex
//!
//! The running stock card of an item, recomputed from its movement log.
//!
//! ```text
//! #  type     dir  qty  total     │ stock  value    unit cost
//! ───────────────────────────────┼───────────────────────────
//! 1  ENTRY    IN   100  1,000.00  │   100  1,000.00   10.00
//! 2  ENTRY    IN    50    600.00  │   150  1,600.00   10.67
//! 3  EXIT     OUT  120  1,240.00  │    30    360.00   12.00
//! ```
//!
//! Nothing here is stored. OUT rows carry their realized FIFO cost, so the
//! running value is a plain signed sum of `total_cost` and always equals the
//! value of the lots left in the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::fifo::in_kardex_order;
use crate::money::Money;
use crate::types::{InventoryMovement, InventoryMovementType, MovementDirection};

/// One line of the stock card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct KardexEntry {
    pub movement_id: String,
    pub movement_number: i64,
    pub movement_type: InventoryMovementType,
    pub direction: MovementDirection,
    pub quantity: i64,
    pub unit_cost_cents: Option<i64>,
    pub total_cost_cents: i64,
    pub batch_number: Option<String>,
    pub reason: Option<String>,
    pub running_stock: i64,
    pub running_value_cents: i64,
    pub running_unit_cost_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Lazy iterator over an item's kardex entries.
///
/// Finite (one entry per movement) and restartable: clone it before
/// iterating to walk the card again.
#[derive(Debug, Clone)]
pub struct Kardex {
    movements: std::vec::IntoIter<InventoryMovement>,
    stock: i64,
    value: Money,
    unit_cost: Money,
}

impl Kardex {
    /// `opening_unit_cost` is reported until the first movement sets one.
    pub fn new(movements: Vec<InventoryMovement>, opening_unit_cost: Money) -> Self {
        let ordered: Vec<InventoryMovement> =
            in_kardex_order(&movements).into_iter().cloned().collect();
        Kardex {
            movements: ordered.into_iter(),
            stock: 0,
            value: Money::zero(),
            unit_cost: opening_unit_cost,
        }
    }
}

impl Iterator for Kardex {
    type Item = KardexEntry;

    fn next(&mut self) -> Option<KardexEntry> {
        let m = self.movements.next()?;

        self.stock += m.signed_quantity();
        match m.direction {
            MovementDirection::In => self.value += m.total_cost(),
            MovementDirection::Out => self.value -= m.total_cost(),
        }
        if let Some(unit) = self.value.per_unit(self.stock) {
            self.unit_cost = unit;
        }

        Some(KardexEntry {
            movement_id: m.id,
            movement_number: m.movement_number,
            movement_type: m.movement_type,
            direction: m.direction,
            quantity: m.quantity,
            unit_cost_cents: m.unit_cost_cents,
            total_cost_cents: m.total_cost_cents,
            batch_number: m.batch_number,
            reason: m.reason,
            running_stock: self.stock,
            running_value_cents: self.value.cents(),
            running_unit_cost_cents: self.unit_cost.cents(),
            created_at: m.created_at,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.movements.size_hint()
    }
}

impl ExactSizeIterator for Kardex {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn mv(
        n: i64,
        movement_type: InventoryMovementType,
        direction: MovementDirection,
        quantity: i64,
        total_cost_cents: i64,
        created_at: DateTime<Utc>,
    ) -> InventoryMovement {
        InventoryMovement {
            id: format!("m-{n}"),
            item_id: "item-1".to_string(),
            movement_number: n,
            movement_type,
            direction,
            quantity,
            unit_cost_cents: None,
            total_cost_cents,
            batch_number: None,
            expiry_date: None,
            reason: None,
            transfer_id: None,
            counterpart_item_id: None,
            created_by: "almacen-1".to_string(),
            created_at,
        }
    }

    #[test]
    fn test_running_totals() {
        use InventoryMovementType::*;
        use MovementDirection::*;
        let t = Utc::now();
        let log = vec![
            mv(1, Entry, In, 100, 100_000, t),
            mv(2, Entry, In, 50, 60_000, t + Duration::seconds(1)),
            mv(3, Exit, Out, 120, 124_000, t + Duration::seconds(2)),
        ];

        let entries: Vec<KardexEntry> = Kardex::new(log, Money::zero()).collect();
        let running: Vec<(i64, i64, i64)> = entries
            .iter()
            .map(|e| (e.running_stock, e.running_value_cents, e.running_unit_cost_cents))
            .collect();
        assert_eq!(
            running,
            vec![(100, 100_000, 1_000), (150, 160_000, 1_067), (30, 36_000, 1_200)]
        );
    }

    #[test]
    fn test_orders_by_time_then_number() {
        use InventoryMovementType::*;
        use MovementDirection::*;
        let t = Utc::now();
        // Same timestamp: movement_number decides
        let log = vec![
            mv(2, Exit, Out, 5, 500, t),
            mv(1, Entry, In, 10, 1_000, t),
        ];
        let numbers: Vec<i64> = Kardex::new(log, Money::zero())
            .map(|e| e.movement_number)
            .collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_restartable_and_finite() {
        use InventoryMovementType::*;
        use MovementDirection::*;
        let t = Utc::now();
        let kardex = Kardex::new(vec![mv(1, Entry, In, 10, 1_000, t)], Money::from_cents(90));
        assert_eq!(kardex.len(), 1);

        let first: Vec<KardexEntry> = kardex.clone().collect();
        let second: Vec<KardexEntry> = kardex.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_drained_stock_keeps_last_unit_cost() {
        use InventoryMovementType::*;
        use MovementDirection::*;
        let t = Utc::now();
        let log = vec![
            mv(1, Entry, In, 10, 5_000, t),
            mv(2, Exit, Out, 10, 5_000, t + Duration::seconds(1)),
        ];
        let last = Kardex::new(log, Money::zero()).last();
        let last = last.map(|e| (e.running_stock, e.running_value_cents, e.running_unit_cost_cents));
        assert_eq!(last, Some((0, 0, 500)));
    }
}
