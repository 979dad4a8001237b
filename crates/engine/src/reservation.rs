//! Stock reservation at order confirmation, and its inverse.

use std::collections::HashMap;

use chrono::Utc;

use stockledger_catalog::{CatalogItem, ItemId, Matcher, MovementReason};
use stockledger_core::{ExpectedVersion, LedgerError, LedgerResult};
use stockledger_sales::{OrderStatus, SalesOrderId, SalesOrderLine};
use stockledger_store::{CatalogStore, SalesStore, TransactionalStore, WriteBatch};

use crate::outcome::{ConfirmOutcome, LineReservation, RevertOutcome};
use crate::policy::{ReservationPolicy, UnmatchedLinePolicy};

/// Decides and commits reservation splits.
///
/// Every mutation of one confirm or revert lands in a single write batch, so
/// a failed operation leaves the order exactly as it found it and a retry
/// starts from clean state.
#[derive(Debug)]
pub struct ReservationEngine<S, M> {
    store: S,
    matcher: M,
    policy: ReservationPolicy,
}

impl<S, M> ReservationEngine<S, M> {
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

impl<S, M> ReservationEngine<S, M>
where
    S: CatalogStore + SalesStore + TransactionalStore,
    M: Matcher,
{
    /// Reserve stock for every line of a draft order and confirm it.
    ///
    /// Lines are decided in declared order against one catalog snapshot,
    /// with a shared per-item pool so two lines of the same item cannot both
    /// reserve the last unit. Lines already carrying a full split keep it,
    /// which makes re-running a partially persisted confirm safe.
    pub fn confirm(&self, order_id: SalesOrderId) -> LedgerResult<ConfirmOutcome> {
        let order = self.store.order(order_id)?;
        order.ensure_confirmable()?;

        let items = self.store.all_items()?;
        let mut batch = WriteBatch::new(Utc::now());
        let mut available: HashMap<ItemId, i64> = HashMap::new();
        let mut lines = Vec::with_capacity(order.lines().len());
        let mut total_backordered = 0;

        for line in order.lines() {
            let decided = if line.reservation_settled() {
                tracing::debug!("order line '{}' already settled, keeping its split", line.description);
                LineReservation {
                    line_id: line.id,
                    description: line.description.clone(),
                    ordered_qty: line.ordered_qty,
                    reserved_qty: line.reserved_qty,
                    backordered_qty: line.backordered_qty,
                    item_id: line.item_id,
                }
            } else {
                self.decide_line(line, &items, &mut available, &mut batch)?
            };
            total_backordered += decided.backordered_qty;
            lines.push(decided);
        }

        batch.set_order_status(order_id, OrderStatus::Confirmed);
        self.store.commit(batch)?;

        tracing::info!(
            "confirmed sales order {order_id}: {} line(s), {total_backordered} backordered",
            lines.len()
        );
        Ok(ConfirmOutcome {
            order_id,
            total_backordered,
            lines,
        })
    }

    fn decide_line(
        &self,
        line: &SalesOrderLine,
        items: &[CatalogItem],
        available: &mut HashMap<ItemId, i64>,
        batch: &mut WriteBatch,
    ) -> LedgerResult<LineReservation> {
        let Some(item) = self.resolve(line, items) else {
            if self.policy.unmatched_line == UnmatchedLinePolicy::Reject {
                return Err(LedgerError::validation(format!(
                    "no catalog item matches order line '{}'",
                    line.description
                )));
            }
            tracing::warn!(
                "order line '{}' matches no catalog item, reserving untracked",
                line.description
            );
            batch.set_line_quantities(line.id, line.ordered_qty, 0);
            return Ok(LineReservation {
                line_id: line.id,
                description: line.description.clone(),
                ordered_qty: line.ordered_qty,
                reserved_qty: line.ordered_qty,
                backordered_qty: 0,
                item_id: None,
            });
        };

        if line.item_id.is_none() {
            batch.link_line(line.id, item.id);
        }

        if !item.is_tracked() {
            // Service lines reserve in full without touching stock.
            batch.set_line_quantities(line.id, line.ordered_qty, 0);
            return Ok(LineReservation {
                line_id: line.id,
                description: line.description.clone(),
                ordered_qty: line.ordered_qty,
                reserved_qty: line.ordered_qty,
                backordered_qty: 0,
                item_id: Some(item.id),
            });
        }

        let pool = available.entry(item.id).or_insert_with(|| item.available());
        let reserved = line.ordered_qty.min(*pool);
        let backordered = line.ordered_qty - reserved;
        *pool -= reserved;

        if reserved > 0 {
            batch.adjust_stock(
                item.id,
                -reserved,
                MovementReason::OrderReservation,
                ExpectedVersion::Exact(item.version),
            );
        }
        batch.set_line_quantities(line.id, reserved, backordered);

        Ok(LineReservation {
            line_id: line.id,
            description: line.description.clone(),
            ordered_qty: line.ordered_qty,
            reserved_qty: reserved,
            backordered_qty: backordered,
            item_id: Some(item.id),
        })
    }

    /// Return a confirmed order to draft, releasing its reservations.
    ///
    /// Reserved stock goes back on hand; backorder bookkeeping is discarded,
    /// not parked. Re-confirming later re-derives the split from whatever is
    /// on hand then.
    pub fn revert(&self, order_id: SalesOrderId) -> LedgerResult<RevertOutcome> {
        let order = self.store.order(order_id)?;
        order.ensure_revertible()?;

        let items = self.store.all_items()?;
        let mut batch = WriteBatch::new(Utc::now());
        let mut stock_restored = 0;

        for line in order.lines() {
            if line.reserved_qty > 0 {
                match self.resolve(line, &items) {
                    Some(item) if item.is_tracked() => {
                        batch.adjust_stock(
                            item.id,
                            line.reserved_qty,
                            MovementReason::ReservationReversal,
                            ExpectedVersion::Exact(item.version),
                        );
                        stock_restored += line.reserved_qty;
                    }
                    // Service reservations took no stock, so none comes back.
                    Some(_) => {}
                    None => {
                        tracing::warn!(
                            "order line '{}' was reserved without a catalog match, releasing without a stock restore",
                            line.description
                        );
                    }
                }
            }
            batch.set_line_quantities(line.id, 0, 0);
        }

        batch.set_order_status(order_id, OrderStatus::Draft);
        self.store.commit(batch)?;

        tracing::info!("reverted sales order {order_id} to draft, restored {stock_restored} to stock");
        Ok(RevertOutcome {
            order_id,
            lines_reset: order.lines().len(),
            stock_restored,
        })
    }

    /// Resolve a line to its catalog item. A persisted link wins; free-text
    /// matching is the fallback for unlinked legacy lines. A link pointing
    /// at a deleted item resolves to nothing rather than falling through to
    /// the fuzzy path.
    fn resolve<'a>(
        &self,
        line: &SalesOrderLine,
        items: &'a [CatalogItem],
    ) -> Option<&'a CatalogItem> {
        match line.item_id {
            Some(id) => items.iter().find(|item| item.id == id),
            None => self.matcher.resolve(&line.description, items),
        }
    }
}
