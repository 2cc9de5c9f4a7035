//! # FIFO Lot Queue
//!
//! Cost basis of an inventory item as a queue of lots, oldest first.
//!
//! ## Costing Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PAPEL-A4                                                               │
//! │                                                                         │
//! │  ENTRY 100 @ 10.00   queue: [100@10]                                   │
//! │  ENTRY  50 @ 12.00   queue: [100@10, 50@12]                            │
//! │  EXIT  120           slices: 100@10 + 20@12 = 1,240.00 realized        │
//! │                      queue: [30@12]  value 360.00, unit cost 12.00     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The queue is never stored. It is rebuilt from the append-only movement
//! log ([`LotQueue::replay`]) inside the transaction that appends the next
//! movement, so the log stays the only source of truth.

use std::collections::VecDeque;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::requests::RecordInventoryMovementRequest;
use crate::types::{InventoryMovement, InventoryMovementType, MovementDirection};

// =============================================================================
// Lots
// =============================================================================

/// Units received together at one cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Lot {
    /// The IN movement that created this lot.
    pub source_movement_id: String,
    /// Units still on hand.
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub batch_number: Option<String>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    #[ts(as = "String")]
    pub received_at: DateTime<Utc>,
}

impl Lot {
    #[inline]
    pub fn value(&self) -> Money {
        Money::from_cents(self.unit_cost_cents).multiply_quantity(self.quantity)
    }
}

/// Part of a lot taken by an outbound movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LotSlice {
    pub source_movement_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub batch_number: Option<String>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
}

impl LotSlice {
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.unit_cost_cents).multiply_quantity(self.quantity)
    }
}

/// What an outbound movement took from the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumption {
    pub slices: Vec<LotSlice>,
    pub quantity: i64,
    /// Σ slice quantity × slice cost.
    pub total_cost: Money,
}

impl Consumption {
    /// Realized cost per unit, rounded. Display only; `total_cost` is exact.
    pub fn average_unit_cost(&self) -> Option<Money> {
        self.total_cost.per_unit(self.quantity)
    }
}

/// Requested more than the queue holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortfall {
    pub available: i64,
    pub requested: i64,
}

impl Shortfall {
    pub fn into_error(self, code: &str) -> CoreError {
        CoreError::InsufficientStock {
            code: code.to_string(),
            available: self.available,
            requested: self.requested,
        }
    }
}

// =============================================================================
// Lot Queue
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LotQueue {
    lots: VecDeque<Lot>,
}

impl LotQueue {
    pub fn new() -> Self {
        LotQueue::default()
    }

    /// Rebuilds the queue by replaying an item's movements in kardex order.
    ///
    /// Fails with `InsufficientStock` when the log takes out more than it put
    /// in, which only a corrupted log can do.
    pub fn replay(code: &str, movements: &[InventoryMovement]) -> CoreResult<Self> {
        let mut queue = LotQueue::new();
        for m in in_kardex_order(movements) {
            match m.direction {
                MovementDirection::In => {
                    let unit_cost_cents = m.unit_cost_cents.unwrap_or_else(|| {
                        m.total_cost()
                            .per_unit(m.quantity)
                            .unwrap_or_default()
                            .cents()
                    });
                    queue.push(Lot {
                        source_movement_id: m.id.clone(),
                        quantity: m.quantity,
                        unit_cost_cents,
                        batch_number: m.batch_number.clone(),
                        expiry_date: m.expiry_date,
                        received_at: m.created_at,
                    });
                }
                MovementDirection::Out => {
                    queue
                        .consume(m.quantity)
                        .map_err(|shortfall| shortfall.into_error(code))?;
                }
            }
        }
        Ok(queue)
    }

    /// Appends a lot at the back. Empty lots are ignored.
    pub fn push(&mut self, lot: Lot) {
        if lot.quantity > 0 {
            self.lots.push_back(lot);
        }
    }

    /// Takes `quantity` units from the oldest lots.
    ///
    /// All-or-nothing: on `Shortfall` the queue is untouched.
    pub fn consume(&mut self, quantity: i64) -> Result<Consumption, Shortfall> {
        let available = self.total_quantity();
        if quantity <= 0 || quantity > available {
            return Err(Shortfall {
                available,
                requested: quantity,
            });
        }

        let mut remaining = quantity;
        let mut slices = Vec::new();
        while remaining > 0 {
            let Some(front) = self.lots.front_mut() else {
                break;
            };
            let take = remaining.min(front.quantity);
            slices.push(LotSlice {
                source_movement_id: front.source_movement_id.clone(),
                quantity: take,
                unit_cost_cents: front.unit_cost_cents,
                batch_number: front.batch_number.clone(),
                expiry_date: front.expiry_date,
            });
            front.quantity -= take;
            remaining -= take;
            if front.quantity == 0 {
                self.lots.pop_front();
            }
        }

        let total_cost = slices.iter().map(LotSlice::cost).sum();
        Ok(Consumption {
            slices,
            quantity,
            total_cost,
        })
    }

    pub fn total_quantity(&self) -> i64 {
        self.lots.iter().map(|l| l.quantity).sum()
    }

    pub fn total_value(&self) -> Money {
        self.lots.iter().map(Lot::value).sum()
    }

    /// Weighted cost of the remaining lots; `None` when empty.
    pub fn weighted_unit_cost(&self) -> Option<Money> {
        self.total_value().per_unit(self.total_quantity())
    }

    /// Remaining lots, oldest first.
    pub fn lots(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    /// Stock figures cached on the item. `previous_unit_cost` is kept when no
    /// lots remain.
    pub fn valuation(&self, previous_unit_cost: Money) -> Valuation {
        Valuation {
            current_stock: self.total_quantity(),
            stock_value: self.total_value(),
            unit_cost: self.weighted_unit_cost().unwrap_or(previous_unit_cost),
        }
    }
}

/// Snapshot written to the item row after each movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Valuation {
    pub current_stock: i64,
    pub stock_value: Money,
    pub unit_cost: Money,
}

/// Movements sorted by `created_at`, then `movement_number`.
pub fn in_kardex_order(movements: &[InventoryMovement]) -> Vec<&InventoryMovement> {
    let mut ordered: Vec<&InventoryMovement> = movements.iter().collect();
    ordered.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then(a.movement_number.cmp(&b.movement_number))
    });
    ordered
}

// =============================================================================
// Movement Planning
// =============================================================================

/// A movement row computed against the lot queue, ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRow {
    pub id: String,
    pub direction: MovementDirection,
    pub quantity: i64,
    pub unit_cost_cents: Option<i64>,
    pub total_cost_cents: i64,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

impl PlannedRow {
    fn inbound(
        quantity: i64,
        unit_cost: Money,
        batch_number: Option<String>,
        expiry_date: Option<NaiveDate>,
    ) -> Self {
        PlannedRow {
            id: Uuid::new_v4().to_string(),
            direction: MovementDirection::In,
            quantity,
            unit_cost_cents: Some(unit_cost.cents()),
            total_cost_cents: unit_cost.multiply_quantity(quantity).cents(),
            batch_number,
            expiry_date,
        }
    }

    fn outbound(consumption: &Consumption) -> Self {
        PlannedRow {
            id: Uuid::new_v4().to_string(),
            direction: MovementDirection::Out,
            quantity: consumption.quantity,
            unit_cost_cents: consumption.average_unit_cost().map(|m| m.cents()),
            total_cost_cents: consumption.total_cost.cents(),
            batch_number: None,
            expiry_date: None,
        }
    }

    /// The lot an IN row adds to a queue.
    pub fn as_lot(&self, received_at: DateTime<Utc>) -> Option<Lot> {
        match (self.direction, self.unit_cost_cents) {
            (MovementDirection::In, Some(unit_cost_cents)) => Some(Lot {
                source_movement_id: self.id.clone(),
                quantity: self.quantity,
                unit_cost_cents,
                batch_number: self.batch_number.clone(),
                expiry_date: self.expiry_date,
                received_at,
            }),
            _ => None,
        }
    }
}

/// Rows for one recorded movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementPlan {
    /// Exactly one row on the source item.
    pub source: PlannedRow,
    /// TRANSFER only: one IN row per consumed slice, at the slice's cost.
    pub destination: Vec<PlannedRow>,
}

/// Applies a validated movement to the source item's queue and returns the
/// rows to write.
///
/// `current_unit_cost` prices a positive adjustment when the queue is empty.
pub fn plan_movement(
    queue: &mut LotQueue,
    code: &str,
    req: &RecordInventoryMovementRequest,
    current_unit_cost: Money,
    now: DateTime<Utc>,
) -> CoreResult<MovementPlan> {
    let plan = match req.movement_type {
        InventoryMovementType::Entry => {
            let cost = Money::from_cents(req.unit_cost_cents.unwrap_or_default());
            let row = PlannedRow::inbound(
                req.quantity,
                cost,
                req.batch_number.clone(),
                req.expiry_date,
            );
            MovementPlan {
                source: row,
                destination: Vec::new(),
            }
        }
        InventoryMovementType::Exit => {
            let consumption = queue
                .consume(req.quantity)
                .map_err(|s| s.into_error(code))?;
            MovementPlan {
                source: PlannedRow::outbound(&consumption),
                destination: Vec::new(),
            }
        }
        InventoryMovementType::Transfer => {
            let consumption = queue
                .consume(req.quantity)
                .map_err(|s| s.into_error(code))?;
            let destination = consumption
                .slices
                .iter()
                .map(|s| {
                    PlannedRow::inbound(
                        s.quantity,
                        Money::from_cents(s.unit_cost_cents),
                        s.batch_number.clone(),
                        s.expiry_date,
                    )
                })
                .collect();
            MovementPlan {
                source: PlannedRow::outbound(&consumption),
                destination,
            }
        }
        InventoryMovementType::Adjustment if req.quantity > 0 => {
            let cost = queue.weighted_unit_cost().unwrap_or(current_unit_cost);
            MovementPlan {
                source: PlannedRow::inbound(
                    req.quantity,
                    cost,
                    req.batch_number.clone(),
                    req.expiry_date,
                ),
                destination: Vec::new(),
            }
        }
        InventoryMovementType::Adjustment => {
            let consumption = queue
                .consume(-req.quantity)
                .map_err(|s| s.into_error(code))?;
            MovementPlan {
                source: PlannedRow::outbound(&consumption),
                destination: Vec::new(),
            }
        }
    };

    if let Some(lot) = plan.source.as_lot(now) {
        queue.push(lot);
    }

    Ok(plan)
}

// =============================================================================
// Unit Tests
// =============================================================================
