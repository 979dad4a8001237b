//! Remaining-quantity tracking across partial deliveries.
//!
//! Delivery lines reference order lines by description text. All sums here
//! run over the normalized form of that text, so casing and stray whitespace
//! on hand-typed delivery lines never split a line's fulfillment history.

use chrono::Utc;

use stockledger_catalog::description_key;
use stockledger_core::{LedgerError, LedgerResult};
use stockledger_delivery::{DeliveryDocId, DeliveryStatus};
use stockledger_sales::{OrderStatus, SalesOrderId, SalesOrderLine};
use stockledger_store::{DeliveryStore, SalesStore, TransactionalStore, WriteBatch};

use crate::outcome::DeliverableLine;

/// Computes undelivered quantities and validates shipment assignments.
#[derive(Debug)]
pub struct FulfillmentTracker<S> {
    store: S,
}

impl<S> FulfillmentTracker<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> FulfillmentTracker<S>
where
    S: SalesStore + DeliveryStore + TransactionalStore,
{
    /// Quantity of `line` still waiting to ship: ordered minus everything
    /// shipped on non-cancelled delivery documents, floored at zero.
    ///
    /// `excluding` drops one document from the sum. Editing screens pass the
    /// document being edited so its own rows do not count against it.
    pub fn remaining(
        &self,
        line: &SalesOrderLine,
        excluding: Option<DeliveryDocId>,
    ) -> LedgerResult<i64> {
        let shipped = self.shipped_for(line.order_id, &line.description, excluding)?;
        Ok((line.ordered_qty - shipped).max(0))
    }

    fn shipped_for(
        &self,
        order_id: SalesOrderId,
        description: &str,
        excluding: Option<DeliveryDocId>,
    ) -> LedgerResult<i64> {
        let key = description_key(description);
        let shipped = self
            .store
            .deliveries_for_order(order_id)?
            .iter()
            .filter(|doc| doc.counts_toward_fulfillment())
            .filter(|doc| Some(doc.id()) != excluding)
            .flat_map(|doc| doc.lines())
            .filter(|line| description_key(&line.description) == key)
            .map(|line| line.shipped_qty)
            .sum();
        Ok(shipped)
    }

    /// Lines of a confirmed order with anything left to ship, in declared
    /// order. This is the picker list for composing a new delivery.
    pub fn deliverable_lines(&self, order_id: SalesOrderId) -> LedgerResult<Vec<DeliverableLine>> {
        let order = self.store.order(order_id)?;
        if order.status() != OrderStatus::Confirmed {
            return Err(LedgerError::invalid_transition(
                "deliveries can only be composed for confirmed orders",
            ));
        }

        let mut deliverable = Vec::new();
        for line in order.lines() {
            let remaining = self.remaining(line, None)?;
            if remaining > 0 {
                deliverable.push(DeliverableLine {
                    line_id: line.id,
                    description: line.description.clone(),
                    ordered_qty: line.ordered_qty,
                    remaining_qty: remaining,
                });
            }
        }
        Ok(deliverable)
    }

    /// Validate a candidate assignment of `shipped_qty` against what is
    /// still undelivered on `line`, without writing anything.
    pub fn check_assignment(
        &self,
        line: &SalesOrderLine,
        shipped_qty: i64,
        excluding: Option<DeliveryDocId>,
    ) -> LedgerResult<()> {
        self.ensure_within_remaining(line, shipped_qty, excluding)?;
        Ok(())
    }

    fn ensure_within_remaining(
        &self,
        line: &SalesOrderLine,
        shipped_qty: i64,
        excluding: Option<DeliveryDocId>,
    ) -> LedgerResult<i64> {
        let remaining = self.remaining(line, excluding)?;
        if shipped_qty > remaining {
            return Err(LedgerError::QuantityViolation {
                requested: shipped_qty,
                remaining,
            });
        }
        Ok(remaining)
    }

    /// Validate one shipment row and append it to a pending delivery
    /// document. Returns the quantity still undelivered after the append.
    pub fn append_delivery_line(
        &self,
        doc_id: DeliveryDocId,
        description: &str,
        shipped_qty: i64,
    ) -> LedgerResult<i64> {
        let doc = self.store.delivery(doc_id)?;
        if doc.status() != DeliveryStatus::Pending {
            return Err(LedgerError::invalid_transition(
                "delivery lines can only be added while the document is pending",
            ));
        }
        if shipped_qty <= 0 {
            return Err(LedgerError::validation("shipped quantity must be positive"));
        }

        let order = self.store.order(doc.sales_order_id())?;
        let line = match_order_line(order.lines(), description).ok_or_else(|| {
            LedgerError::validation(format!("no order line matches delivery text '{description}'"))
        })?;

        let remaining = self.ensure_within_remaining(line, shipped_qty, None)?;

        let mut batch = WriteBatch::new(Utc::now());
        batch.append_delivery_line(doc_id, description, shipped_qty);
        self.store.commit(batch)?;

        tracing::debug!("assigned {shipped_qty} of '{description}' to delivery {doc_id}");
        Ok(remaining - shipped_qty)
    }

    /// Re-validate a whole document against quantities remaining on the rest
    /// of the order's deliveries. Run before marking a document delivered,
    /// and after edits made outside `append_delivery_line`.
    ///
    /// Rows are summed per normalized description first, so two rows of the
    /// same line cannot each pass individually while jointly overshipping.
    pub fn validate_document(&self, doc_id: DeliveryDocId) -> LedgerResult<()> {
        let doc = self.store.delivery(doc_id)?;
        if !doc.counts_toward_fulfillment() {
            return Ok(());
        }
        let order = self.store.order(doc.sales_order_id())?;

        let mut totals: Vec<(String, String, i64)> = Vec::new();
        for row in doc.lines() {
            let key = description_key(&row.description);
            match totals.iter_mut().find(|(existing, _, _)| *existing == key) {
                Some(entry) => entry.2 += row.shipped_qty,
                None => totals.push((key, row.description.clone(), row.shipped_qty)),
            }
        }

        for (_, description, assigned) in &totals {
            let line = match_order_line(order.lines(), description).ok_or_else(|| {
                LedgerError::validation(format!(
                    "no order line matches delivery text '{description}'"
                ))
            })?;
            self.ensure_within_remaining(line, *assigned, Some(doc_id))?;
        }
        Ok(())
    }
}

fn match_order_line<'a>(
    lines: &'a [SalesOrderLine],
    description: &str,
) -> Option<&'a SalesOrderLine> {
    let key = description_key(description);
    lines.iter().find(|line| description_key(&line.description) == key)
}
