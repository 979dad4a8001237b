//! Operation results reported back to callers.
//!
//! Outcomes are plain data. They describe what an engine decided and
//! committed; nothing downstream branches on them except display code.

use serde::{Deserialize, Serialize};
use stockledger_catalog::ItemId;
use stockledger_purchasing::PurchaseDocId;
use stockledger_sales::{OrderLineId, SalesOrderId};

/// Reservation split decided for one order line at confirm time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineReservation {
    pub line_id: OrderLineId,
    pub description: String,
    pub ordered_qty: i64,
    pub reserved_qty: i64,
    pub backordered_qty: i64,
    /// `None` when the line matched no catalog item and was reserved
    /// untracked.
    pub item_id: Option<ItemId>,
}

/// Result of confirming a sales order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmOutcome {
    pub order_id: SalesOrderId,
    /// Total quantity across all lines waiting on incoming stock. Drives
    /// the shortage notice shown to the user.
    pub total_backordered: i64,
    pub lines: Vec<LineReservation>,
}

impl ConfirmOutcome {
    pub fn lines_processed(&self) -> usize {
        self.lines.len()
    }

    pub fn has_shortage(&self) -> bool {
        self.total_backordered > 0
    }
}

/// Result of reverting a confirmed sales order back to draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevertOutcome {
    pub order_id: SalesOrderId,
    pub lines_reset: usize,
    /// Reserved quantity returned to the stock pool. Untracked and service
    /// reservations release without contributing here.
    pub stock_restored: i64,
}

/// One backorder consumed by a receipt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearedBackorder {
    pub line_id: OrderLineId,
    pub cleared_qty: i64,
}

/// Receipt of one purchase line: the stock posted and the backorders it
/// settled, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineReceipt {
    pub line_no: u32,
    /// Cleaned description the catalog matching ran against.
    pub description: String,
    pub item_id: Option<ItemId>,
    pub received_qty: i64,
    pub cleared: Vec<ClearedBackorder>,
    /// Portion of the received quantity not consumed by backorders. It
    /// stays on hand for future orders.
    pub leftover_qty: i64,
}

/// Result of receiving a purchase document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveOutcome {
    pub doc_id: PurchaseDocId,
    /// Lines posted by this call. Lines posted by an earlier, partially
    /// failed attempt are skipped and do not reappear here.
    pub receipts: Vec<LineReceipt>,
}

impl ReceiveOutcome {
    pub fn total_cleared(&self) -> i64 {
        self.receipts
            .iter()
            .flat_map(|receipt| receipt.cleared.iter())
            .map(|cleared| cleared.cleared_qty)
            .sum()
    }
}

/// An order line with undelivered quantity, as offered on delivery
/// composition screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverableLine {
    pub line_id: OrderLineId,
    pub description: String,
    pub ordered_qty: i64,
    pub remaining_qty: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_outcome_round_trips_through_json() {
        let line_id = OrderLineId::new();
        let outcome = ConfirmOutcome {
            order_id: SalesOrderId::new(),
            total_backordered: 3,
            lines: vec![LineReservation {
                line_id,
                description: "Steel Bolt M6".to_string(),
                ordered_qty: 8,
                reserved_qty: 5,
                backordered_qty: 3,
                item_id: None,
            }],
        };

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["total_backordered"], 3);
        assert_eq!(json["lines"][0]["reserved_qty"], 5);
        assert!(json["lines"][0]["item_id"].is_null());

        let back: ConfirmOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, outcome);
    }

    #[test]
    fn receive_outcome_totals_span_all_receipts() {
        let outcome = ReceiveOutcome {
            doc_id: PurchaseDocId::new(),
            receipts: vec![
                LineReceipt {
                    line_no: 1,
                    description: "Gear".to_string(),
                    item_id: None,
                    received_qty: 4,
                    cleared: vec![
                        ClearedBackorder {
                            line_id: OrderLineId::new(),
                            cleared_qty: 3,
                        },
                        ClearedBackorder {
                            line_id: OrderLineId::new(),
                            cleared_qty: 1,
                        },
                    ],
                    leftover_qty: 0,
                },
                LineReceipt {
                    line_no: 2,
                    description: "Gear".to_string(),
                    item_id: None,
                    received_qty: 2,
                    cleared: vec![ClearedBackorder {
                        line_id: OrderLineId::new(),
                        cleared_qty: 2,
                    }],
                    leftover_qty: 0,
                },
            ],
        };

        assert_eq!(outcome.total_cleared(), 6);
    }
}
