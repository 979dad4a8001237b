//! `stockledger-engine` implements the three workflows that move stock:
//! reservation at order confirmation, remaining-quantity tracking across
//! partial deliveries, and purchase receipt with backorder settlement.
//!
//! Engines are orchestration only. Each operation reads current state
//! through the store contracts, makes its per-line decisions in memory, and
//! commits the result as atomic write batches. Domain rules live in the
//! domain crates; persistence rules live in `stockledger-store`.

pub mod fulfillment;
pub mod outcome;
pub mod policy;
pub mod receiving;
pub mod reservation;

pub use fulfillment::FulfillmentTracker;
pub use outcome::{
    ClearedBackorder, ConfirmOutcome, DeliverableLine, LineReceipt, LineReservation,
    ReceiveOutcome, RevertOutcome,
};
pub use policy::{ReservationPolicy, UnmatchedLinePolicy};
pub use receiving::ReceivingEngine;
pub use reservation::ReservationEngine;
