//! Common types used across the application.

pub mod amount;
pub mod id;
pub mod pagination;

pub use amount::{Currency, MAX_QUANTITY, MAX_UNIT_PRICE_CENTS, QUANTITY_SCALE, QuantityError};
pub use id::*;
pub use pagination::{PageMeta, PageRequest, PageResponse};
