use std::sync::Arc;

use stockledger_catalog::{CatalogItem, ItemId, StockMovement};
use stockledger_delivery::{DeliveryDocId, DeliveryDocument};
use stockledger_purchasing::{PurchaseDocId, PurchaseDocument};
use stockledger_sales::{SalesOrder, SalesOrderId, SalesOrderLine};

use crate::batch::WriteBatch;
use crate::error::StoreError;

/// Catalog item reads plus the movement journal behind each balance.
pub trait CatalogStore: Send + Sync {
    fn item(&self, item_id: ItemId) -> Result<CatalogItem, StoreError>;

    /// Candidate set for text matching. The matcher itself stays outside the
    /// store so its semantics remain swappable.
    fn all_items(&self) -> Result<Vec<CatalogItem>, StoreError>;

    /// Journal entries for one item, in commit order.
    fn movements_for(&self, item_id: ItemId) -> Result<Vec<StockMovement>, StoreError>;

    /// Register a new item (opening balance allowed, version starts at 0).
    fn insert_item(&self, item: CatalogItem) -> Result<(), StoreError>;
}

/// Sales order reads.
pub trait SalesStore: Send + Sync {
    fn order(&self, order_id: SalesOrderId) -> Result<SalesOrder, StoreError>;

    fn insert_order(&self, order: SalesOrder) -> Result<(), StoreError>;

    /// Every line of a confirmed order with `backordered_qty > 0`, across all
    /// orders. Callers filter by description/item and impose FIFO order.
    fn open_backorders(&self) -> Result<Vec<SalesOrderLine>, StoreError>;
}

/// Delivery document reads.
pub trait DeliveryStore: Send + Sync {
    fn delivery(&self, doc_id: DeliveryDocId) -> Result<DeliveryDocument, StoreError>;

    fn insert_delivery(&self, doc: DeliveryDocument) -> Result<(), StoreError>;

    /// All delivery documents raised against one sales order, any status.
    fn deliveries_for_order(
        &self,
        order_id: SalesOrderId,
    ) -> Result<Vec<DeliveryDocument>, StoreError>;
}

/// Purchase document reads.
pub trait PurchasingStore: Send + Sync {
    fn purchase(&self, doc_id: PurchaseDocId) -> Result<PurchaseDocument, StoreError>;

    fn insert_purchase(&self, doc: PurchaseDocument) -> Result<(), StoreError>;
}

/// Atomic multi-row commit.
///
/// ## Commit Semantics
///
/// `commit()`:
/// - Validates every write first (rows exist, quantity bounds hold, status
///   transitions are legal, stock versions match expected)
/// - Applies all writes only if validation passed in full
/// - Assigns monotonically increasing journal sequence numbers to stock
///   movements
///
/// A failed commit leaves the store exactly as it was. This is what turns
/// each engine operation's read-then-write span into a single transaction:
/// two concurrent reservations against the same item cannot both commit,
/// because the second one's expected stock version no longer matches.
///
/// ## Implementation Requirements
///
/// Implementations must:
/// - apply the whole batch or none of it
/// - evaluate each stock write's `expected_version` against the item version
///   as of the start of the commit, and advance the version by one per
///   applied movement
/// - reject quantity splits where `reserved_qty + backordered_qty` exceeds
///   the line's ordered quantity, or either is negative
pub trait TransactionalStore: Send + Sync {
    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

/// The full persistence surface the engines operate against.
pub trait LedgerStore:
    CatalogStore + SalesStore + DeliveryStore + PurchasingStore + TransactionalStore
{
}

impl<S> LedgerStore for S where
    S: CatalogStore + SalesStore + DeliveryStore + PurchasingStore + TransactionalStore
{
}

impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    fn item(&self, item_id: ItemId) -> Result<CatalogItem, StoreError> {
        (**self).item(item_id)
    }

    fn all_items(&self) -> Result<Vec<CatalogItem>, StoreError> {
        (**self).all_items()
    }

    fn movements_for(&self, item_id: ItemId) -> Result<Vec<StockMovement>, StoreError> {
        (**self).movements_for(item_id)
    }

    fn insert_item(&self, item: CatalogItem) -> Result<(), StoreError> {
        (**self).insert_item(item)
    }
}

impl<S> SalesStore for Arc<S>
where
    S: SalesStore + ?Sized,
{
    fn order(&self, order_id: SalesOrderId) -> Result<SalesOrder, StoreError> {
        (**self).order(order_id)
    }

    fn insert_order(&self, order: SalesOrder) -> Result<(), StoreError> {
        (**self).insert_order(order)
    }

    fn open_backorders(&self) -> Result<Vec<SalesOrderLine>, StoreError> {
        (**self).open_backorders()
    }
}

impl<S> DeliveryStore for Arc<S>
where
    S: DeliveryStore + ?Sized,
{
    fn delivery(&self, doc_id: DeliveryDocId) -> Result<DeliveryDocument, StoreError> {
        (**self).delivery(doc_id)
    }

    fn insert_delivery(&self, doc: DeliveryDocument) -> Result<(), StoreError> {
        (**self).insert_delivery(doc)
    }

    fn deliveries_for_order(
        &self,
        order_id: SalesOrderId,
    ) -> Result<Vec<DeliveryDocument>, StoreError> {
        (**self).deliveries_for_order(order_id)
    }
}

impl<S> PurchasingStore for Arc<S>
where
    S: PurchasingStore + ?Sized,
{
    fn purchase(&self, doc_id: PurchaseDocId) -> Result<PurchaseDocument, StoreError> {
        (**self).purchase(doc_id)
    }

    fn insert_purchase(&self, doc: PurchaseDocument) -> Result<(), StoreError> {
        (**self).insert_purchase(doc)
    }
}

impl<S> TransactionalStore for Arc<S>
where
    S: TransactionalStore + ?Sized,
{
    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        (**self).commit(batch)
    }
}
