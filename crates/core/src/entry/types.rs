//! Entry domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

/// Unvalidated input for creating an entry.
///
/// `unit_price_cents` is read as a decimal so that fractional cents are
/// reported as a rule violation instead of a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEntry {
    /// Work item the entry bills against.
    pub work_item_id: Option<Uuid>,
    /// Day the work happened.
    pub date: Option<NaiveDate>,
    /// Days worked, at most two fractional digits.
    pub quantity: Option<Decimal>,
    /// Price of one day in cents.
    pub unit_price_cents: Option<Decimal>,
    /// Free text.
    pub description: Option<String>,
}

/// Validated entry fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidEntry {
    /// Work item the entry bills against.
    pub work_item_id: Uuid,
    /// Day the work happened.
    pub date: NaiveDate,
    /// Days worked.
    pub quantity: Decimal,
    /// Price of one day in cents.
    pub unit_price_cents: i64,
    /// Free text.
    pub description: Option<String>,
}

/// Unvalidated partial update of an entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryPatch {
    /// New work item; swaps the entry's work-item link.
    pub work_item_id: Option<Uuid>,
    /// New date.
    pub date: Option<NaiveDate>,
    /// New quantity.
    pub quantity: Option<Decimal>,
    /// New unit price in cents.
    pub unit_price_cents: Option<Decimal>,
    /// New description.
    pub description: Option<String>,
}

impl EntryPatch {
    /// Returns true if the patch carries no field at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.work_item_id.is_none()
            && self.date.is_none()
            && self.quantity.is_none()
            && self.unit_price_cents.is_none()
            && self.description.is_none()
    }

    /// Overlays the patch on the current entry, producing a full input to validate.
    #[must_use]
    pub fn merge_onto(self, current: NewEntry) -> NewEntry {
        NewEntry {
            work_item_id: self.work_item_id.or(current.work_item_id),
            date: self.date.or(current.date),
            quantity: self.quantity.or(current.quantity),
            unit_price_cents: self.unit_price_cents.or(current.unit_price_cents),
            description: self.description.or(current.description),
        }
    }
}

impl From<&ValidEntry> for NewEntry {
    fn from(entry: &ValidEntry) -> Self {
        Self {
            work_item_id: Some(entry.work_item_id),
            date: Some(entry.date),
            quantity: Some(entry.quantity),
            unit_price_cents: Some(Decimal::from(entry.unit_price_cents)),
            description: entry.description.clone(),
        }
    }
}
