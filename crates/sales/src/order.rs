use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_catalog::ItemId;
use stockledger_core::{LedgerError, LedgerResult};

stockledger_core::define_id!(
    /// Sales order identifier.
    SalesOrderId,
    "SalesOrderId"
);

stockledger_core::define_id!(
    /// Sales order line identifier.
    ///
    /// UUIDv7, so ascending ids double as the deterministic tiebreak for FIFO
    /// backorder clearing when two lines share a `created_at`.
    OrderLineId,
    "OrderLineId"
);

/// Sales order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Draft,
    Confirmed,
    Cancelled,
}

/// One ordered line: free-text description plus the reservation split.
///
/// While the parent order is confirmed, `reserved_qty + backordered_qty ==
/// ordered_qty`; while draft, both are zero. Neither ever exceeds
/// `ordered_qty`. The quantities are written only by the reservation engine
/// (confirm/revert) and the receiving engine (backorder clearing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrderLine {
    pub id: OrderLineId,
    pub order_id: SalesOrderId,
    /// Free-form matching text; the join key to catalog, delivery, and
    /// purchase lines.
    pub description: String,
    pub ordered_qty: i64,
    pub reserved_qty: i64,
    pub backordered_qty: i64,
    /// Catalog link persisted on first successful match. Lines resolve by id
    /// when present; text matching is the fallback for unlinked lines.
    pub item_id: Option<ItemId>,
    /// FIFO ordering key for backorder clearing.
    pub created_at: DateTime<Utc>,
}

impl SalesOrderLine {
    pub fn new(
        order_id: SalesOrderId,
        description: impl Into<String>,
        ordered_qty: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderLineId::new(),
            order_id,
            description: description.into(),
            ordered_qty,
            reserved_qty: 0,
            backordered_qty: 0,
            item_id: None,
            created_at,
        }
    }

    /// True once the reservation split accounts for the full ordered
    /// quantity. Confirm skips settled lines, which is what makes a retry
    /// after a partial failure safe.
    pub fn reservation_settled(&self) -> bool {
        self.reserved_qty + self.backordered_qty == self.ordered_qty
    }

    pub fn has_backorder(&self) -> bool {
        self.backordered_qty > 0
    }
}

/// A customer order: identity, status machine, and its ordered lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrder {
    id: SalesOrderId,
    status: OrderStatus,
    lines: Vec<SalesOrderLine>,
    created_at: DateTime<Utc>,
}

impl SalesOrder {
    /// Create an empty draft order.
    pub fn new() -> Self {
        Self {
            id: SalesOrderId::new(),
            status: OrderStatus::Draft,
            lines: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> SalesOrderId {
        self.id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn lines(&self) -> &[SalesOrderLine] {
        &self.lines
    }

    pub fn line(&self, line_id: OrderLineId) -> Option<&SalesOrderLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    pub fn line_mut(&mut self, line_id: OrderLineId) -> Option<&mut SalesOrderLine> {
        self.lines.iter_mut().find(|l| l.id == line_id)
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, OrderStatus::Draft)
    }

    /// Append a new line in draft.
    pub fn add_line(
        &mut self,
        description: impl Into<String>,
        ordered_qty: i64,
        created_at: DateTime<Utc>,
    ) -> LedgerResult<OrderLineId> {
        let line = SalesOrderLine::new(self.id, description, ordered_qty, created_at);
        let id = line.id;
        self.attach_line(line)?;
        Ok(id)
    }

    /// Attach a prebuilt line (quotation copy, data import). Same guards as
    /// `add_line`.
    pub fn attach_line(&mut self, line: SalesOrderLine) -> LedgerResult<()> {
        if !self.is_modifiable() {
            return Err(LedgerError::invalid_transition(
                "cannot modify order lines once the order is confirmed or cancelled",
            ));
        }
        if line.order_id != self.id {
            return Err(LedgerError::validation("line belongs to a different order"));
        }
        if line.description.trim().is_empty() {
            return Err(LedgerError::validation("line description cannot be empty"));
        }
        if line.ordered_qty <= 0 {
            return Err(LedgerError::validation("ordered quantity must be positive"));
        }
        if line.reserved_qty != 0 || line.backordered_qty != 0 {
            return Err(LedgerError::validation(
                "draft lines must carry no reservation split",
            ));
        }

        self.lines.push(line);
        Ok(())
    }

    /// Move to `new_status`, enforcing the state machine:
    /// draft → confirmed (confirm), confirmed → draft (revert),
    /// confirmed → cancelled. Everything else is rejected.
    pub fn transition_to(&mut self, new_status: OrderStatus) -> LedgerResult<()> {
        use OrderStatus::*;

        let allowed = matches!(
            (self.status, new_status),
            (Draft, Confirmed) | (Confirmed, Draft) | (Confirmed, Cancelled)
        );
        if !allowed {
            return Err(LedgerError::invalid_transition(format!(
                "sales order cannot move from {:?} to {:?}",
                self.status, new_status
            )));
        }

        self.status = new_status;
        Ok(())
    }

    /// Guard used by the reservation engine before planning a confirm.
    pub fn ensure_confirmable(&self) -> LedgerResult<()> {
        if self.status != OrderStatus::Draft {
            return Err(LedgerError::invalid_transition(
                "only draft orders can be confirmed",
            ));
        }
        if self.lines.is_empty() {
            return Err(LedgerError::validation("cannot confirm order without lines"));
        }
        Ok(())
    }

    /// Guard used by the reservation engine before planning a revert.
    pub fn ensure_revertible(&self) -> LedgerResult<()> {
        if self.status != OrderStatus::Confirmed {
            return Err(LedgerError::invalid_transition(
                "only confirmed orders can revert to draft",
            ));
        }
        Ok(())
    }
}

impl Default for SalesOrder {
    fn default() -> Self {
        Self::new()
    }
}
