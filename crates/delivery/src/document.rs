use serde::{Deserialize, Serialize};

use stockledger_catalog::description_key;
use stockledger_core::{LedgerError, LedgerResult};
use stockledger_sales::SalesOrderId;

stockledger_core::define_id!(
    /// Delivery document identifier.
    DeliveryDocId,
    "DeliveryDocId"
);

/// Delivery document status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    Cancelled,
}

/// One shipped line. The description is the join key back to the sales order
/// line: trimmed, case-insensitive equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryLine {
    pub line_no: u32,
    pub description: String,
    pub shipped_qty: i64,
}

impl DeliveryLine {
    /// True when this line ships against an order line carrying `text` as
    /// its description.
    pub fn matches(&self, text: &str) -> bool {
        description_key(&self.description) == description_key(text)
    }
}

/// An outbound shipment against one sales order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDocument {
    id: DeliveryDocId,
    sales_order_id: SalesOrderId,
    status: DeliveryStatus,
    lines: Vec<DeliveryLine>,
}

impl DeliveryDocument {
    /// Create an empty pending delivery for `sales_order_id`.
    pub fn new(sales_order_id: SalesOrderId) -> Self {
        Self {
            id: DeliveryDocId::new(),
            sales_order_id,
            status: DeliveryStatus::Pending,
            lines: Vec::new(),
        }
    }

    pub fn id(&self) -> DeliveryDocId {
        self.id
    }

    pub fn sales_order_id(&self) -> SalesOrderId {
        self.sales_order_id
    }

    pub fn status(&self) -> DeliveryStatus {
        self.status
    }

    pub fn lines(&self) -> &[DeliveryLine] {
        &self.lines
    }

    /// Cancelled deliveries release their shipped quantities; everything else
    /// consumes remaining quantity on the order.
    pub fn counts_toward_fulfillment(&self) -> bool {
        self.status != DeliveryStatus::Cancelled
    }

    /// Append a line while pending. Line numbers are assigned in order,
    /// starting at 1.
    pub fn add_line(
        &mut self,
        description: impl Into<String>,
        shipped_qty: i64,
    ) -> LedgerResult<u32> {
        if self.status != DeliveryStatus::Pending {
            return Err(LedgerError::invalid_transition(
                "cannot modify delivery lines once delivered or cancelled",
            ));
        }
        let description = description.into();
        if description.trim().is_empty() {
            return Err(LedgerError::validation("delivery line description cannot be empty"));
        }
        if shipped_qty <= 0 {
            return Err(LedgerError::validation("shipped quantity must be positive"));
        }

        let line_no = self.lines.len() as u32 + 1;
        self.lines.push(DeliveryLine {
            line_no,
            description,
            shipped_qty,
        });
        Ok(line_no)
    }

    /// Move to `new_status`: pending → delivered, pending → cancelled only.
    pub fn transition_to(&mut self, new_status: DeliveryStatus) -> LedgerResult<()> {
        use DeliveryStatus::*;

        let allowed = matches!(
            (self.status, new_status),
            (Pending, Delivered) | (Pending, Cancelled)
        );
        if !allowed {
            return Err(LedgerError::invalid_transition(format!(
                "delivery cannot move from {:?} to {:?}",
                self.status, new_status
            )));
        }
        if new_status == Delivered && self.lines.is_empty() {
            return Err(LedgerError::validation("cannot deliver without lines"));
        }

        self.status = new_status;
        Ok(())
    }
}
