//! Storage layer: persistence contracts and the in-memory reference store.
//!
//! The engines never touch storage directly. They read through the narrow
//! store traits in [`contract`] and commit every multi-row mutation as one
//! [`WriteBatch`], which implementations apply atomically with optimistic
//! version checks on stock rows.

pub mod batch;
pub mod contract;
pub mod error;
pub mod memory;

pub use batch::{
    DeliveryLineAppend, LineLinkWrite, LineQuantityWrite, PostedMark, StatusWrite, StockWrite,
    WriteBatch,
};
pub use contract::{
    CatalogStore, DeliveryStore, LedgerStore, PurchasingStore, SalesStore, TransactionalStore,
};
pub use error::StoreError;
pub use memory::InMemoryLedgerStore;
