// core/src/model/mod.rs

//! Order data structures: raw source records, the status vocabulary and the
//! normalised order.

pub mod order;
pub mod raw;
pub mod status;

pub use order::{LineItem, NormalizedOrder};
pub use raw::{RawBilling, RawLineItem, RawOrder};
pub use status::{OrderStatus, StatusView};
