//! Catalog items, stock movements, and line matching.
//!
//! The catalog owns item identity and the materialized on-hand balance. The
//! reservation and receiving engines may adjust `on_hand` (through the store),
//! never create or delete items.

pub mod item;
pub mod matcher;

pub use item::{CatalogItem, ItemId, ItemKind, MovementReason, StockMovement};
pub use matcher::{clean_received_description, description_key, Matcher, SubstringMatcher};
