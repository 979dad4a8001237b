//! Purchase receipt: stock posting and FIFO backorder settlement.

use chrono::Utc;

use stockledger_catalog::{
    CatalogItem, Matcher, MovementReason, clean_received_description, description_key,
};
use stockledger_core::{ExpectedVersion, LedgerError, LedgerResult};
use stockledger_purchasing::{PurchaseDocId, PurchaseLine, PurchaseStatus};
use stockledger_sales::SalesOrderLine;
use stockledger_store::{
    CatalogStore, PurchasingStore, SalesStore, TransactionalStore, WriteBatch,
};

use crate::outcome::{ClearedBackorder, LineReceipt, ReceiveOutcome};
use crate::policy::{ReservationPolicy, UnmatchedLinePolicy};

/// Posts received stock and settles outstanding backorders oldest-first.
///
/// Each purchase line commits in its own batch: the stock increment, every
/// backorder it clears, and the line's posted mark land together or not at
/// all. A failure on one line leaves earlier lines posted; re-running the
/// receipt skips posted lines and finishes the rest.
#[derive(Debug)]
pub struct ReceivingEngine<S, M> {
    store: S,
    matcher: M,
    policy: ReservationPolicy,
}

impl<S, M> ReceivingEngine<S, M> {
    pub fn new(store: S, matcher: M) -> Self {
        Self {
            store,
            matcher,
            policy: ReservationPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ReservationPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<S, M> ReceivingEngine<S, M>
where
    S: CatalogStore + SalesStore + PurchasingStore + TransactionalStore,
    M: Matcher,
{
    /// Receive a pending purchase document line by line.
    ///
    /// The document moves to `Received` only once every line has posted. If
    /// some lines fail, the error reports which lines committed and which
    /// did not, and the document stays pending for a retry.
    pub fn receive(&self, doc_id: PurchaseDocId) -> LedgerResult<ReceiveOutcome> {
        let doc = self.store.purchase(doc_id)?;
        doc.ensure_receivable()?;

        let items = self.store.all_items()?;
        let mut receipts = Vec::new();
        let mut applied = Vec::new();
        let mut failed = Vec::new();

        for line in doc.lines() {
            if line.posted {
                tracing::debug!(
                    "purchase line {} on {doc_id} already posted, skipping",
                    line.line_no
                );
                continue;
            }
            match self.receive_line(doc_id, line, &items) {
                Ok(receipt) => {
                    applied.push(line.line_no);
                    receipts.push(receipt);
                }
                Err(e) => {
                    tracing::warn!("purchase line {} on {doc_id} failed: {e}", line.line_no);
                    failed.push((line.line_no, e.to_string()));
                }
            }
        }

        if !failed.is_empty() {
            return Err(LedgerError::PartialFailure { applied, failed });
        }

        let mut batch = WriteBatch::new(Utc::now());
        batch.set_purchase_status(doc_id, PurchaseStatus::Received);
        self.store.commit(batch)?;

        let outcome = ReceiveOutcome { doc_id, receipts };
        tracing::info!(
            "received purchase document {doc_id}: {} line(s) posted, {} unit(s) applied to backorders",
            outcome.receipts.len(),
            outcome.total_cleared()
        );
        Ok(outcome)
    }

    fn receive_line(
        &self,
        doc_id: PurchaseDocId,
        line: &PurchaseLine,
        items: &[CatalogItem],
    ) -> LedgerResult<LineReceipt> {
        let cleaned = clean_received_description(&line.description);
        let Some(matched) = self.matcher.resolve(cleaned, items) else {
            if self.policy.unmatched_line == UnmatchedLinePolicy::Reject {
                return Err(LedgerError::validation(format!(
                    "no catalog item matches received line '{cleaned}'"
                )));
            }
            tracing::warn!(
                "received line '{cleaned}' matches no catalog item, posting without a stock effect"
            );
            let mut batch = WriteBatch::new(Utc::now());
            batch.mark_posted(doc_id, line.line_no);
            self.store.commit(batch)?;
            return Ok(LineReceipt {
                line_no: line.line_no,
                description: cleaned.to_string(),
                item_id: None,
                received_qty: line.received_qty,
                cleared: Vec::new(),
                leftover_qty: 0,
            });
        };

        if !matched.is_tracked() {
            tracing::debug!("received line '{cleaned}' matches a service item, nothing to post");
            let mut batch = WriteBatch::new(Utc::now());
            batch.mark_posted(doc_id, line.line_no);
            self.store.commit(batch)?;
            return Ok(LineReceipt {
                line_no: line.line_no,
                description: cleaned.to_string(),
                item_id: Some(matched.id),
                received_qty: line.received_qty,
                cleared: Vec::new(),
                leftover_qty: 0,
            });
        }

        // Earlier lines of this document may already have moved this item,
        // so re-read it rather than trusting the snapshot's version.
        let item = self.store.item(matched.id)?;

        let mut batch = WriteBatch::new(Utc::now());
        batch.adjust_stock(
            item.id,
            line.received_qty,
            MovementReason::PurchaseReceipt,
            ExpectedVersion::Exact(item.version),
        );

        let mut remaining = line.received_qty;
        let mut cleared = Vec::new();
        for backorder in self.matching_backorders(Some(&item), cleaned)? {
            if remaining == 0 {
                break;
            }
            let clear = remaining.min(backorder.backordered_qty);
            batch.set_line_quantities(
                backorder.id,
                backorder.reserved_qty + clear,
                backorder.backordered_qty - clear,
            );
            cleared.push(ClearedBackorder {
                line_id: backorder.id,
                cleared_qty: clear,
            });
            remaining -= clear;
        }

        let consumed = line.received_qty - remaining;
        if consumed > 0 {
            batch.adjust_stock(
                item.id,
                -consumed,
                MovementReason::BackorderFulfillment,
                ExpectedVersion::Exact(item.version),
            );
        }
        batch.mark_posted(doc_id, line.line_no);
        self.store.commit(batch)?;

        Ok(LineReceipt {
            line_no: line.line_no,
            description: cleaned.to_string(),
            item_id: Some(item.id),
            received_qty: line.received_qty,
            cleared,
            leftover_qty: remaining,
        })
    }

    /// Open backorders a receipt of `item` may settle, in clearing order:
    /// oldest line first, ties broken by line id so reruns clear in the same
    /// order. Linked lines match by id; unlinked legacy lines match by
    /// normalized description.
    fn matching_backorders(
        &self,
        item: Option<&CatalogItem>,
        cleaned: &str,
    ) -> LedgerResult<Vec<SalesOrderLine>> {
        let key = description_key(cleaned);
        let mut lines: Vec<SalesOrderLine> = self
            .store
            .open_backorders()?
            .into_iter()
            .filter(|line| match (line.item_id, item) {
                (Some(linked), Some(item)) => linked == item.id,
                (Some(_), None) => false,
                (None, _) => description_key(&line.description) == key,
            })
            .collect();
        lines.sort_by_key(|line| (line.created_at, line.id));
        Ok(lines)
    }

    /// Every outstanding backorder across confirmed orders, in the order a
    /// receipt would clear them. Feeds shortage review screens.
    pub fn outstanding_backorders(&self) -> LedgerResult<Vec<SalesOrderLine>> {
        let mut lines = self.store.open_backorders()?;
        lines.sort_by_key(|line| (line.created_at, line.id));
        Ok(lines)
    }

    /// The backorders a receipt line with this description would settle,
    /// scoped the same way `receive` scopes its clearing walk.
    pub fn outstanding_backorders_for(&self, text: &str) -> LedgerResult<Vec<SalesOrderLine>> {
        let items = self.store.all_items()?;
        let cleaned = clean_received_description(text);
        self.matching_backorders(self.matcher.resolve(cleaned, &items), cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use chrono::TimeZone;
    use uuid::Uuid;

    use stockledger_catalog::{CatalogItem, ItemKind, SubstringMatcher};
    use stockledger_purchasing::PurchaseDocument;
    use stockledger_sales::{OrderLineId, SalesOrder, SalesOrderId};
    use stockledger_store::InMemoryLedgerStore;

    use crate::reservation::ReservationEngine;

    type TestEngine = ReceivingEngine<Arc<InMemoryLedgerStore>, SubstringMatcher>;

    fn setup() -> (Arc<InMemoryLedgerStore>, TestEngine) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let receiving = ReceivingEngine::new(Arc::clone(&store), SubstringMatcher::new());
        (store, receiving)
    }

    fn seed_item(store: &InMemoryLedgerStore, name: &str, on_hand: i64) -> CatalogItem {
        let mut item = CatalogItem::new(name, format!("{name} detail"), ItemKind::Goods);
        item.on_hand = on_hand;
        store.insert_item(item.clone()).unwrap();
        item
    }

    fn confirm_order(store: &Arc<InMemoryLedgerStore>, lines: &[(&str, i64)]) -> SalesOrderId {
        let mut order = SalesOrder::new();
        for (description, qty) in lines {
            order.add_line(*description, *qty, Utc::now()).unwrap();
        }
        let order_id = order.id();
        store.insert_order(order).unwrap();
        ReservationEngine::new(Arc::clone(store), SubstringMatcher::new())
            .confirm(order_id)
            .unwrap();
        order_id
    }

    fn seed_purchase(store: &InMemoryLedgerStore, lines: &[(&str, i64)]) -> PurchaseDocId {
        let mut doc = PurchaseDocument::new();
        for (description, qty) in lines {
            doc.add_line(*description, *qty).unwrap();
        }
        let id = doc.id();
        store.insert_purchase(doc).unwrap();
        id
    }

    #[test]
    fn receipt_clears_the_backorder_and_marks_the_document_received() {
        let (store, receiving) = setup();
        let item = seed_item(&store, "Steel Bolt M6", 5);
        let order_id = confirm_order(&store, &[("Steel Bolt M6", 8)]);
        let doc_id = seed_purchase(&store, &[("Steel Bolt M6", 3)]);

        let outcome = receiving.receive(doc_id).unwrap();

        assert_eq!(outcome.receipts.len(), 1);
        assert_eq!(outcome.total_cleared(), 3);
        assert_eq!(outcome.receipts[0].leftover_qty, 0);

        // Cleared stock became reserved stock, so on hand is back to zero.
        let stored_item = store.item(item.id).unwrap();
        assert_eq!(stored_item.on_hand, 0);

        let order = store.order(order_id).unwrap();
        assert_eq!(order.lines()[0].reserved_qty, 8);
        assert_eq!(order.lines()[0].backordered_qty, 0);

        let doc = store.purchase(doc_id).unwrap();
        assert_eq!(doc.status(), PurchaseStatus::Received);
        assert!(doc.lines()[0].posted);

        let reasons: Vec<_> = store
            .movements_for(item.id)
            .unwrap()
            .into_iter()
            .map(|m| m.reason)
            .collect();
        assert_eq!(
            reasons,
            vec![
                MovementReason::OrderReservation,
                MovementReason::PurchaseReceipt,
                MovementReason::BackorderFulfillment,
            ]
        );
    }

    #[test]
    fn leftover_stock_stays_on_hand() {
        let (store, receiving) = setup();
        let item = seed_item(&store, "Hex Nut", 0);
        confirm_order(&store, &[("Hex Nut", 3)]);
        let doc_id = seed_purchase(&store, &[("Hex Nut", 10)]);

        let outcome = receiving.receive(doc_id).unwrap();

        assert_eq!(outcome.total_cleared(), 3);
        assert_eq!(outcome.receipts[0].leftover_qty, 7);
        assert_eq!(store.item(item.id).unwrap().on_hand, 7);
    }

    #[test]
    fn backorders_clear_oldest_first_across_orders() {
        let (store, receiving) = setup();
        seed_item(&store, "Bearing", 0);
        let first_order = confirm_order(&store, &[("Bearing", 6)]);
        let second_order = confirm_order(&store, &[("Bearing", 4)]);

        // Two deliveries arrive: 2 units, then 5 units.
        let first_doc = seed_purchase(&store, &[("Bearing", 2)]);
        receiving.receive(first_doc).unwrap();

        let first = store.order(first_order).unwrap();
        assert_eq!(first.lines()[0].reserved_qty, 2);
        assert_eq!(first.lines()[0].backordered_qty, 4);
        let second = store.order(second_order).unwrap();
        assert_eq!(second.lines()[0].backordered_qty, 4);

        let second_doc = seed_purchase(&store, &[("Bearing", 5)]);
        receiving.receive(second_doc).unwrap();

        // The older order fills completely before the newer one gets any.
        let first = store.order(first_order).unwrap();
        assert_eq!(first.lines()[0].reserved_qty, 6);
        assert_eq!(first.lines()[0].backordered_qty, 0);
        let second = store.order(second_order).unwrap();
        assert_eq!(second.lines()[0].reserved_qty, 1);
        assert_eq!(second.lines()[0].backordered_qty, 3);
    }

    #[test]
    fn equal_timestamps_break_ties_by_line_id() {
        let (store, receiving) = setup();
        seed_item(&store, "Washer", 0);

        let moment = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut order = SalesOrder::new();
        let mut low = SalesOrderLine::new(order.id(), "Washer", 4, moment);
        low.id = OrderLineId::from_uuid(Uuid::from_u128(1));
        let mut high = SalesOrderLine::new(order.id(), "Washer", 4, moment);
        high.id = OrderLineId::from_uuid(Uuid::from_u128(2));
        let low_id = low.id;
        let high_id = high.id;
        // Attach in reverse id order so declared order and id order differ.
        order.attach_line(high).unwrap();
        order.attach_line(low).unwrap();
        let order_id = order.id();
        store.insert_order(order).unwrap();
        ReservationEngine::new(Arc::clone(&store), SubstringMatcher::new())
            .confirm(order_id)
            .unwrap();

        let doc_id = seed_purchase(&store, &[("Washer", 3)]);
        let outcome = receiving.receive(doc_id).unwrap();

        assert_eq!(outcome.receipts[0].cleared.len(), 1);
        assert_eq!(outcome.receipts[0].cleared[0].line_id, low_id);

        let order = store.order(order_id).unwrap();
        assert_eq!(order.line(low_id).unwrap().backordered_qty, 1);
        assert_eq!(order.line(high_id).unwrap().backordered_qty, 4);
    }

    #[test]
    fn received_description_is_cleaned_before_matching() {
        let (store, receiving) = setup();
        let item = seed_item(&store, "Steel Bolt M6", 0);
        confirm_order(&store, &[("Steel Bolt M6", 2)]);
        let doc_id = seed_purchase(&store, &[("[Vendor] Steel Bolt M6 (SO:1042)", 2)]);

        let outcome = receiving.receive(doc_id).unwrap();

        assert_eq!(outcome.receipts[0].description, "Steel Bolt M6");
        assert_eq!(outcome.receipts[0].item_id, Some(item.id));
        assert_eq!(outcome.total_cleared(), 2);
    }

    #[test]
    fn unmatched_lines_post_without_stock_by_default() {
        let (store, receiving) = setup();
        let doc_id = seed_purchase(&store, &[("Mystery Part", 4)]);

        let outcome = receiving.receive(doc_id).unwrap();

        assert_eq!(outcome.receipts[0].item_id, None);
        assert_eq!(outcome.total_cleared(), 0);
        let doc = store.purchase(doc_id).unwrap();
        assert_eq!(doc.status(), PurchaseStatus::Received);
        assert!(doc.lines()[0].posted);
    }

    #[test]
    fn reject_policy_reports_the_unmatched_line_as_failed() {
        let (store, receiving) = setup();
        seed_item(&store, "Known Part", 0);
        let doc_id = seed_purchase(&store, &[("Known Part", 2), ("Mystery Part", 4)]);

        let strict = receiving.with_policy(ReservationPolicy {
            unmatched_line: UnmatchedLinePolicy::Reject,
        });
        let err = strict.receive(doc_id).unwrap_err();
        match err {
            LedgerError::PartialFailure { applied, failed } => {
                assert_eq!(applied, vec![1]);
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].0, 2);
            }
            other => panic!("expected partial failure, got {other:?}"),
        }

        // The matched line committed; the document awaits a retry.
        let doc = store.purchase(doc_id).unwrap();
        assert_eq!(doc.status(), PurchaseStatus::Pending);
        assert!(doc.lines()[0].posted);
        assert!(!doc.lines()[1].posted);
    }

    #[test]
    fn retry_skips_posted_lines() {
        let (store, receiving) = setup();
        let item = seed_item(&store, "Bolt", 0);
        let doc_id = seed_purchase(&store, &[("Bolt", 5), ("Bolt", 2)]);

        // First line already posted by an earlier, partially failed run.
        let mut batch = WriteBatch::new(Utc::now());
        batch
            .adjust_stock(
                item.id,
                5,
                MovementReason::PurchaseReceipt,
                ExpectedVersion::Exact(0),
            )
            .mark_posted(doc_id, 1);
        store.commit(batch).unwrap();

        let outcome = receiving.receive(doc_id).unwrap();

        // Only the second line posts; the first one's stock is not doubled.
        assert_eq!(outcome.receipts.len(), 1);
        assert_eq!(outcome.receipts[0].line_no, 2);
        assert_eq!(store.item(item.id).unwrap().on_hand, 7);
        assert_eq!(store.purchase(doc_id).unwrap().status(), PurchaseStatus::Received);
    }

    #[test]
    fn receive_requires_a_pending_document() {
        let (store, receiving) = setup();
        seed_item(&store, "Bolt", 0);
        let doc_id = seed_purchase(&store, &[("Bolt", 1)]);

        receiving.receive(doc_id).unwrap();
        let err = receiving.receive(doc_id).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition(_)));

        let empty = PurchaseDocument::new();
        let empty_id = empty.id();
        store.insert_purchase(empty).unwrap();
        assert!(receiving.receive(empty_id).is_err());
    }

    #[test]
    fn service_receipts_post_without_stock() {
        let (store, receiving) = setup();
        let service = CatalogItem::new("Installation", "on-site install", ItemKind::Service);
        let service_id = service.id;
        store.insert_item(service).unwrap();
        let doc_id = seed_purchase(&store, &[("Installation", 1)]);

        let outcome = receiving.receive(doc_id).unwrap();

        assert_eq!(outcome.receipts[0].item_id, Some(service_id));
        assert!(store.movements_for(service_id).unwrap().is_empty());
    }

    #[test]
    fn scoped_backorder_view_matches_the_clearing_scope() {
        let (store, receiving) = setup();
        seed_item(&store, "Gear", 0);
        seed_item(&store, "Bolt", 0);
        let gear_order = confirm_order(&store, &[("Gear", 2)]);
        confirm_order(&store, &[("Bolt", 5)]);

        let scoped = receiving
            .outstanding_backorders_for("[Vendor] Gear (SO:77)")
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].order_id, gear_order);

        assert_eq!(receiving.outstanding_backorders().unwrap().len(), 2);
    }

    #[test]
    fn outstanding_backorders_come_back_in_clearing_order() {
        let (store, receiving) = setup();
        seed_item(&store, "Bearing", 0);
        let first = confirm_order(&store, &[("Bearing", 2)]);
        let second = confirm_order(&store, &[("Bearing", 3)]);

        let outstanding = receiving.outstanding_backorders().unwrap();
        assert_eq!(outstanding.len(), 2);
        assert_eq!(outstanding[0].order_id, first);
        assert_eq!(outstanding[1].order_id, second);
        assert!(outstanding[0].created_at <= outstanding[1].created_at);
    }
}
