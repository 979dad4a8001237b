use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_catalog::{ItemId, MovementReason};
use stockledger_core::ExpectedVersion;
use stockledger_delivery::{DeliveryDocId, DeliveryStatus};
use stockledger_purchasing::{PurchaseDocId, PurchaseStatus};
use stockledger_sales::{OrderLineId, OrderStatus, SalesOrderId};

/// One signed stock adjustment against a catalog item.
///
/// `expected_version` is evaluated against the item's version as of the start
/// of the commit. A batch may carry several writes for the same item (a
/// receipt posts `+received` and `-cleared` as separate journal entries);
/// they all carry the version from the engine's single read, and the item's
/// version advances by one per applied movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockWrite {
    pub item_id: ItemId,
    pub delta: i64,
    pub reason: MovementReason,
    pub expected_version: ExpectedVersion,
}

/// Overwrite of one order line's reservation split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineQuantityWrite {
    pub line_id: OrderLineId,
    pub reserved_qty: i64,
    pub backordered_qty: i64,
}

/// Persist a resolved catalog link on an order line. First match wins:
/// relinking to a different item is rejected at commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineLinkWrite {
    pub line_id: OrderLineId,
    pub item_id: ItemId,
}

/// Append one shipped line to a pending delivery document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryLineAppend {
    pub doc_id: DeliveryDocId,
    pub description: String,
    pub shipped_qty: i64,
}

/// Mark one purchase line as posted so a receive retry skips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedMark {
    pub doc_id: PurchaseDocId,
    pub line_no: u32,
}

/// Document status transition, validated against the document's state
/// machine at commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusWrite {
    Order(SalesOrderId, OrderStatus),
    Delivery(DeliveryDocId, DeliveryStatus),
    Purchase(PurchaseDocId, PurchaseStatus),
}

/// An atomic multi-row mutation.
///
/// Everything one engine operation decides is collected here and committed
/// through [`crate::TransactionalStore::commit`] in a single transaction:
/// either every write lands or none do. `occurred_at` stamps every stock
/// movement the batch produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteBatch {
    pub occurred_at: DateTime<Utc>,
    pub stock: Vec<StockWrite>,
    pub line_quantities: Vec<LineQuantityWrite>,
    pub line_links: Vec<LineLinkWrite>,
    pub delivery_appends: Vec<DeliveryLineAppend>,
    pub posted_marks: Vec<PostedMark>,
    pub statuses: Vec<StatusWrite>,
}

impl WriteBatch {
    pub fn new(occurred_at: DateTime<Utc>) -> Self {
        Self {
            occurred_at,
            stock: Vec::new(),
            line_quantities: Vec::new(),
            line_links: Vec::new(),
            delivery_appends: Vec::new(),
            posted_marks: Vec::new(),
            statuses: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stock.is_empty()
            && self.line_quantities.is_empty()
            && self.line_links.is_empty()
            && self.delivery_appends.is_empty()
            && self.posted_marks.is_empty()
            && self.statuses.is_empty()
    }

    pub fn adjust_stock(
        &mut self,
        item_id: ItemId,
        delta: i64,
        reason: MovementReason,
        expected_version: ExpectedVersion,
    ) -> &mut Self {
        self.stock.push(StockWrite {
            item_id,
            delta,
            reason,
            expected_version,
        });
        self
    }

    pub fn set_line_quantities(
        &mut self,
        line_id: OrderLineId,
        reserved_qty: i64,
        backordered_qty: i64,
    ) -> &mut Self {
        self.line_quantities.push(LineQuantityWrite {
            line_id,
            reserved_qty,
            backordered_qty,
        });
        self
    }

    pub fn link_line(&mut self, line_id: OrderLineId, item_id: ItemId) -> &mut Self {
        self.line_links.push(LineLinkWrite { line_id, item_id });
        self
    }

    pub fn append_delivery_line(
        &mut self,
        doc_id: DeliveryDocId,
        description: impl Into<String>,
        shipped_qty: i64,
    ) -> &mut Self {
        self.delivery_appends.push(DeliveryLineAppend {
            doc_id,
            description: description.into(),
            shipped_qty,
        });
        self
    }

    pub fn mark_posted(&mut self, doc_id: PurchaseDocId, line_no: u32) -> &mut Self {
        self.posted_marks.push(PostedMark { doc_id, line_no });
        self
    }

    pub fn set_order_status(&mut self, order_id: SalesOrderId, status: OrderStatus) -> &mut Self {
        self.statuses.push(StatusWrite::Order(order_id, status));
        self
    }

    pub fn set_delivery_status(
        &mut self,
        doc_id: DeliveryDocId,
        status: DeliveryStatus,
    ) -> &mut Self {
        self.statuses.push(StatusWrite::Delivery(doc_id, status));
        self
    }

    pub fn set_purchase_status(
        &mut self,
        doc_id: PurchaseDocId,
        status: PurchaseStatus,
    ) -> &mut Self {
        self.statuses.push(StatusWrite::Purchase(doc_id, status));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_batch_is_empty_until_first_write() {
        let mut batch = WriteBatch::new(Utc::now());
        assert!(batch.is_empty());

        batch.set_order_status(SalesOrderId::new(), OrderStatus::Confirmed);
        assert!(!batch.is_empty());
    }

    #[test]
    fn builder_collects_writes_in_declaration_order() {
        let item = ItemId::new();
        let line = OrderLineId::new();
        let doc = PurchaseDocId::new();

        let mut batch = WriteBatch::new(Utc::now());
        batch
            .adjust_stock(item, 3, MovementReason::PurchaseReceipt, ExpectedVersion::Exact(2))
            .adjust_stock(item, -3, MovementReason::BackorderFulfillment, ExpectedVersion::Exact(2))
            .set_line_quantities(line, 8, 0)
            .mark_posted(doc, 1)
            .set_purchase_status(doc, PurchaseStatus::Received);

        assert_eq!(batch.stock.len(), 2);
        assert_eq!(batch.stock[0].delta, 3);
        assert_eq!(batch.stock[1].delta, -3);
        assert_eq!(batch.line_quantities[0].reserved_qty, 8);
        assert_eq!(batch.posted_marks[0].line_no, 1);
        assert_eq!(batch.statuses.len(), 1);
    }
}
