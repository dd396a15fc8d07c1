//! Activity entry inputs and patches.

pub mod types;

pub use types::{EntryPatch, NewEntry, ValidEntry};
