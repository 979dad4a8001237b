use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

stockledger_core::define_id!(
    /// Catalog item identifier.
    ItemId,
    "ItemId"
);

/// Whether an item is a stock-tracked good or an untracked service.
///
/// Service lines are never stock-managed: they reserve fully and touch no
/// balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Goods,
    Service,
}

/// A stockable catalog entry.
///
/// `on_hand` is a materialized balance: it must always equal the sum of the
/// item's movement deltas. `version` increments on every stock write and is
/// the optimistic-concurrency token for compare-and-swap commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    /// Primary matching key.
    pub name: String,
    /// Secondary matching text (long description, internal reference).
    pub detail: String,
    pub kind: ItemKind,
    pub on_hand: i64,
    pub version: u64,
}

impl CatalogItem {
    pub fn new(name: impl Into<String>, detail: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            detail: detail.into(),
            kind,
            on_hand: 0,
            version: 0,
        }
    }

    pub fn is_tracked(&self) -> bool {
        self.kind == ItemKind::Goods
    }

    /// Quantity available for reservation, floored at zero.
    ///
    /// `on_hand` can dip negative through external corrections; reservation
    /// must never treat a negative balance as reservable.
    pub fn available(&self) -> i64 {
        self.on_hand.max(0)
    }
}

/// Why a stock balance changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    /// Stock earmarked against a confirmed order line.
    OrderReservation,
    /// Reservation handed back when an order reverts to draft.
    ReservationReversal,
    /// Replenishment from a received purchase line.
    PurchaseReceipt,
    /// Received stock consumed immediately by an outstanding backorder.
    BackorderFulfillment,
}

/// One signed adjustment in the append-only stock journal.
///
/// The journal is the source of truth for `on_hand`: the materialized balance
/// is the running sum of `delta` per item. `seq` is assigned by the store at
/// commit and is monotonically increasing across the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub seq: u64,
    pub item_id: ItemId,
    pub delta: i64,
    pub reason: MovementReason,
    pub occurred_at: DateTime<Utc>,
}
