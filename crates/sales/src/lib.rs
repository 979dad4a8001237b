//! Sales orders and their reservation-bearing lines.

pub mod order;

pub use order::{OrderLineId, OrderStatus, SalesOrder, SalesOrderId, SalesOrderLine};
