use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::RwLock;

use stockledger_catalog::{CatalogItem, ItemId, StockMovement, description_key};
use stockledger_delivery::{DeliveryDocId, DeliveryDocument};
use stockledger_purchasing::{PurchaseDocId, PurchaseDocument};
use stockledger_sales::{OrderLineId, OrderStatus, SalesOrder, SalesOrderId, SalesOrderLine};

use crate::batch::{StatusWrite, WriteBatch};
use crate::contract::{
    CatalogStore, DeliveryStore, PurchasingStore, SalesStore, TransactionalStore,
};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct StoreInner {
    items: HashMap<ItemId, CatalogItem>,
    /// Journal of every applied stock write, in commit order.
    movements: Vec<StockMovement>,
    next_seq: u64,
    orders: HashMap<SalesOrderId, SalesOrder>,
    line_index: HashMap<OrderLineId, SalesOrderId>,
    deliveries: HashMap<DeliveryDocId, DeliveryDocument>,
    purchases: HashMap<PurchaseDocId, PurchaseDocument>,
}

/// In-memory ledger store.
///
/// Intended for tests/dev. Not optimized for performance. Commit takes the
/// single write lock, validates the whole batch against staged copies, and
/// only then writes anything back, so a failed batch leaves no trace.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Clone-on-first-touch staging: later writes in the same batch see earlier
/// staged changes, the underlying store sees none until apply.
fn stage_one<'a, K, V>(
    staged: &'a mut HashMap<K, V>,
    source: &HashMap<K, V>,
    key: K,
    what: &str,
) -> Result<&'a mut V, StoreError>
where
    K: Copy + Eq + Hash + Display,
    V: Clone,
{
    match staged.entry(key) {
        Entry::Occupied(e) => Ok(e.into_mut()),
        Entry::Vacant(e) => {
            let value = source
                .get(&key)
                .cloned()
                .ok_or_else(|| StoreError::not_found(format!("{what} {key}")))?;
            Ok(e.insert(value))
        }
    }
}

impl TransactionalStore for InMemoryLedgerStore {
    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut guard = self
            .inner
            .write()
            .map_err(|_| StoreError::storage("lock poisoned"))?;
        let inner = &mut *guard;

        // Stage phase: every write validated against private copies.
        // Tuple value keeps the version seen at commit start, which is what
        // each write's expected_version is checked against.
        let mut staged_items: HashMap<ItemId, (u64, CatalogItem)> = HashMap::new();
        let mut staged_orders: HashMap<SalesOrderId, SalesOrder> = HashMap::new();
        let mut staged_deliveries: HashMap<DeliveryDocId, DeliveryDocument> = HashMap::new();
        let mut staged_purchases: HashMap<PurchaseDocId, PurchaseDocument> = HashMap::new();
        let mut staged_movements: Vec<StockMovement> = Vec::with_capacity(batch.stock.len());
        let mut seq = inner.next_seq;

        for w in &batch.stock {
            let (start_version, staged) = match staged_items.entry(w.item_id) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => {
                    let item = inner
                        .items
                        .get(&w.item_id)
                        .cloned()
                        .ok_or_else(|| {
                            StoreError::not_found(format!("catalog item {}", w.item_id))
                        })?;
                    e.insert((item.version, item))
                }
            };

            if !w.expected_version.matches(*start_version) {
                return Err(StoreError::concurrency(format!(
                    "catalog item {}: expected {:?}, found {}",
                    w.item_id, w.expected_version, start_version
                )));
            }

            staged.on_hand += w.delta;
            staged.version += 1;
            seq += 1;
            staged_movements.push(StockMovement {
                seq,
                item_id: w.item_id,
                delta: w.delta,
                reason: w.reason,
                occurred_at: batch.occurred_at,
            });
        }

        for w in &batch.line_quantities {
            let order_id = inner
                .line_index
                .get(&w.line_id)
                .copied()
                .ok_or_else(|| StoreError::not_found(format!("order line {}", w.line_id)))?;
            let order = stage_one(&mut staged_orders, &inner.orders, order_id, "sales order")?;
            let line = order
                .line_mut(w.line_id)
                .ok_or_else(|| StoreError::not_found(format!("order line {}", w.line_id)))?;

            if w.reserved_qty < 0 || w.backordered_qty < 0 {
                return Err(StoreError::invalid_write(format!(
                    "order line {}: negative quantity split {}/{}",
                    w.line_id, w.reserved_qty, w.backordered_qty
                )));
            }
            if w.reserved_qty + w.backordered_qty > line.ordered_qty {
                return Err(StoreError::invalid_write(format!(
                    "order line {}: split {} + {} exceeds ordered {}",
                    w.line_id, w.reserved_qty, w.backordered_qty, line.ordered_qty
                )));
            }

            line.reserved_qty = w.reserved_qty;
            line.backordered_qty = w.backordered_qty;
        }

        for w in &batch.line_links {
            if !inner.items.contains_key(&w.item_id) {
                return Err(StoreError::not_found(format!("catalog item {}", w.item_id)));
            }
            let order_id = inner
                .line_index
                .get(&w.line_id)
                .copied()
                .ok_or_else(|| StoreError::not_found(format!("order line {}", w.line_id)))?;
            let order = stage_one(&mut staged_orders, &inner.orders, order_id, "sales order")?;
            let line = order
                .line_mut(w.line_id)
                .ok_or_else(|| StoreError::not_found(format!("order line {}", w.line_id)))?;

            match line.item_id {
                Some(existing) if existing != w.item_id => {
                    return Err(StoreError::invalid_write(format!(
                        "order line {} already linked to a different item",
                        w.line_id
                    )));
                }
                _ => line.item_id = Some(w.item_id),
            }
        }

        for w in &batch.delivery_appends {
            let doc = stage_one(
                &mut staged_deliveries,
                &inner.deliveries,
                w.doc_id,
                "delivery document",
            )?;
            doc.add_line(w.description.clone(), w.shipped_qty)
                .map_err(|e| {
                    StoreError::invalid_write(format!("delivery document {}: {e}", w.doc_id))
                })?;
        }

        for w in &batch.posted_marks {
            let doc = stage_one(
                &mut staged_purchases,
                &inner.purchases,
                w.doc_id,
                "purchase document",
            )?;
            let line = doc.line_mut(w.line_no).ok_or_else(|| {
                StoreError::not_found(format!("purchase line {} on {}", w.line_no, w.doc_id))
            })?;
            if line.posted {
                return Err(StoreError::invalid_write(format!(
                    "purchase line {} on {} already posted",
                    w.line_no, w.doc_id
                )));
            }
            line.posted = true;
        }

        for w in &batch.statuses {
            match w {
                StatusWrite::Order(order_id, status) => {
                    let order =
                        stage_one(&mut staged_orders, &inner.orders, *order_id, "sales order")?;
                    order
                        .transition_to(*status)
                        .map_err(|e| StoreError::invalid_write(e.to_string()))?;
                }
                StatusWrite::Delivery(doc_id, status) => {
                    let doc = stage_one(
                        &mut staged_deliveries,
                        &inner.deliveries,
                        *doc_id,
                        "delivery document",
                    )?;
                    doc.transition_to(*status)
                        .map_err(|e| StoreError::invalid_write(e.to_string()))?;
                }
                StatusWrite::Purchase(doc_id, status) => {
                    let doc = stage_one(
                        &mut staged_purchases,
                        &inner.purchases,
                        *doc_id,
                        "purchase document",
                    )?;
                    doc.transition_to(*status)
                        .map_err(|e| StoreError::invalid_write(e.to_string()))?;
                }
            }
        }

        // Nonzero reservation splits only exist on confirmed orders; a zero
        // split is the revert shape and may land alongside a draft
        // transition. This check runs after status staging so it sees the
        // order state the batch leaves behind, which is what rejects a
        // receive racing a concurrent revert.
        for w in &batch.line_quantities {
            if w.reserved_qty == 0 && w.backordered_qty == 0 {
                continue;
            }
            let order_id = inner
                .line_index
                .get(&w.line_id)
                .copied()
                .ok_or_else(|| StoreError::not_found(format!("order line {}", w.line_id)))?;
            let order = staged_orders
                .get(&order_id)
                .ok_or_else(|| StoreError::storage("line quantity staging lost its order"))?;
            if order.status() != OrderStatus::Confirmed {
                return Err(StoreError::invalid_write(format!(
                    "order line {}: nonzero reservation split on a {:?} order",
                    w.line_id,
                    order.status()
                )));
            }
        }

        // A line's shipped total across counting documents never exceeds its
        // ordered quantity. The sum runs over the state the batch leaves
        // behind, which is what rejects the later of two appends built from
        // the same stale remaining. Rows with no matching order line are not
        // capped here.
        let mut shipped_checks: Vec<(SalesOrderId, String)> = Vec::new();
        for w in &batch.delivery_appends {
            let doc = staged_deliveries
                .get(&w.doc_id)
                .ok_or_else(|| StoreError::storage("delivery append staging lost its document"))?;
            let pair = (doc.sales_order_id(), description_key(&w.description));
            if !shipped_checks.contains(&pair) {
                shipped_checks.push(pair);
            }
        }
        for (order_id, key) in &shipped_checks {
            let order = match staged_orders.get(order_id).or_else(|| inner.orders.get(order_id)) {
                Some(order) => order,
                None => continue,
            };
            let Some(line) = order
                .lines()
                .iter()
                .find(|l| description_key(&l.description) == *key)
            else {
                continue;
            };

            let shipped: i64 = inner
                .deliveries
                .values()
                .filter(|d| d.sales_order_id() == *order_id)
                .map(|d| staged_deliveries.get(&d.id()).unwrap_or(d))
                .filter(|d| d.counts_toward_fulfillment())
                .flat_map(|d| d.lines())
                .filter(|l| description_key(&l.description) == *key)
                .map(|l| l.shipped_qty)
                .sum();
            if shipped > line.ordered_qty {
                return Err(StoreError::invalid_write(format!(
                    "order line '{}': shipped total {} exceeds ordered {}",
                    line.description, shipped, line.ordered_qty
                )));
            }
        }

        // Apply phase: nothing below can fail.
        inner.next_seq = seq;
        inner.movements.extend(staged_movements);
        for (id, (_, item)) in staged_items {
            inner.items.insert(id, item);
        }
        for (id, order) in staged_orders {
            inner.orders.insert(id, order);
        }
        for (id, doc) in staged_deliveries {
            inner.deliveries.insert(id, doc);
        }
        for (id, doc) in staged_purchases {
            inner.purchases.insert(id, doc);
        }

        Ok(())
    }
}

impl CatalogStore for InMemoryLedgerStore {
    fn item(&self, item_id: ItemId) -> Result<CatalogItem, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::storage("lock poisoned"))?;
        inner
            .items
            .get(&item_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("catalog item {item_id}")))
    }

    fn all_items(&self) -> Result<Vec<CatalogItem>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::storage("lock poisoned"))?;
        let mut items: Vec<CatalogItem> = inner.items.values().cloned().collect();
        // UUIDv7 ids are time-ordered, so "first match wins" resolves to the
        // oldest item and stays stable across calls.
        items.sort_by_key(|i| i.id);
        Ok(items)
    }

    fn movements_for(&self, item_id: ItemId) -> Result<Vec<StockMovement>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::storage("lock poisoned"))?;
        Ok(inner
            .movements
            .iter()
            .filter(|m| m.item_id == item_id)
            .cloned()
            .collect())
    }

    fn insert_item(&self, item: CatalogItem) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::storage("lock poisoned"))?;
        match inner.items.entry(item.id) {
            Entry::Occupied(_) => Err(StoreError::invalid_write(format!(
                "catalog item {} already exists",
                item.id
            ))),
            Entry::Vacant(e) => {
                e.insert(item);
                Ok(())
            }
        }
    }
}

impl SalesStore for InMemoryLedgerStore {
    fn order(&self, order_id: SalesOrderId) -> Result<SalesOrder, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::storage("lock poisoned"))?;
        inner
            .orders
            .get(&order_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("sales order {order_id}")))
    }

    fn insert_order(&self, order: SalesOrder) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::storage("lock poisoned"))?;
        if inner.orders.contains_key(&order.id()) {
            return Err(StoreError::invalid_write(format!(
                "sales order {} already exists",
                order.id()
            )));
        }
        for line in order.lines() {
            inner.line_index.insert(line.id, order.id());
        }
        inner.orders.insert(order.id(), order);
        Ok(())
    }

    fn open_backorders(&self) -> Result<Vec<SalesOrderLine>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::storage("lock poisoned"))?;
        Ok(inner
            .orders
            .values()
            .filter(|o| o.status() == OrderStatus::Confirmed)
            .flat_map(|o| o.lines().iter().filter(|l| l.backordered_qty > 0).cloned())
            .collect())
    }
}

impl DeliveryStore for InMemoryLedgerStore {
    fn delivery(&self, doc_id: DeliveryDocId) -> Result<DeliveryDocument, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::storage("lock poisoned"))?;
        inner
            .deliveries
            .get(&doc_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("delivery document {doc_id}")))
    }

    fn insert_delivery(&self, doc: DeliveryDocument) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::storage("lock poisoned"))?;
        if inner.deliveries.contains_key(&doc.id()) {
            return Err(StoreError::invalid_write(format!(
                "delivery document {} already exists",
                doc.id()
            )));
        }
        inner.deliveries.insert(doc.id(), doc);
        Ok(())
    }

    fn deliveries_for_order(
        &self,
        order_id: SalesOrderId,
    ) -> Result<Vec<DeliveryDocument>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::storage("lock poisoned"))?;
        let mut docs: Vec<DeliveryDocument> = inner
            .deliveries
            .values()
            .filter(|d| d.sales_order_id() == order_id)
            .cloned()
            .collect();
        docs.sort_by_key(|d| d.id());
        Ok(docs)
    }
}

impl PurchasingStore for InMemoryLedgerStore {
    fn purchase(&self, doc_id: PurchaseDocId) -> Result<PurchaseDocument, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::storage("lock poisoned"))?;
        inner
            .purchases
            .get(&doc_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("purchase document {doc_id}")))
    }

    fn insert_purchase(&self, doc: PurchaseDocument) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::storage("lock poisoned"))?;
        if inner.purchases.contains_key(&doc.id()) {
            return Err(StoreError::invalid_write(format!(
                "purchase document {} already exists",
                doc.id()
            )));
        }
        inner.purchases.insert(doc.id(), doc);
        Ok(())
    }
}
