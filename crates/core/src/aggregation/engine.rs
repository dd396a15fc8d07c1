//! Aggregation engine.

use cadence_shared::types::amount::{checked_sum_cents, line_total_cents};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ActivityError;

/// Label used when an entry has no resolvable work item.
pub const UNLINKED_WORK_ITEM_LABEL: &str = "(unlinked work item)";

/// One entry as seen through the report's join rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryLine {
    /// Entry id.
    pub entry_id: Uuid,
    /// Day the work happened.
    pub date: NaiveDate,
    /// Days worked.
    pub quantity: Decimal,
    /// Price of one day in cents.
    pub unit_price_cents: i64,
    /// Linked work item. Set whenever the entry has a link, even if the
    /// work-item row itself is gone.
    pub work_item_id: Option<Uuid>,
    /// Label of the linked work item, `None` once the item no longer resolves.
    pub work_item_label: Option<String>,
    /// Free text.
    pub description: Option<String>,
    /// False once the entry is soft-deleted.
    pub is_active: bool,
}

/// Report totals over active entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReportTotals {
    /// Sum of quantities.
    pub total_days: Decimal,
    /// Sum of line totals in cents.
    pub total_amount_cents: i64,
}

impl ReportTotals {
    /// Totals of a report without entries.
    pub const ZERO: Self = Self {
        total_days: Decimal::ZERO,
        total_amount_cents: 0,
    };
}

/// Stateless totals arithmetic.
pub struct AggregationEngine;

impl AggregationEngine {
    /// Computes one line total, rounded half-up to whole cents.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError::AmountOverflow` if the product does not fit.
    pub fn line_total(quantity: Decimal, unit_price_cents: i64) -> Result<i64, ActivityError> {
        line_total_cents(quantity, unit_price_cents)
            .map_err(|_| ActivityError::AmountOverflow("line total"))
    }

    /// Sums quantities and line totals over the active lines.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError::AmountOverflow` if any sum does not fit.
    pub fn recalculate(lines: &[EntryLine]) -> Result<ReportTotals, ActivityError> {
        let active = lines.iter().filter(|l| l.is_active);

        let total_days = active
            .clone()
            .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.quantity))
            .ok_or(ActivityError::AmountOverflow("total days"))?;

        let line_totals = active
            .map(|l| Self::line_total(l.quantity, l.unit_price_cents))
            .collect::<Result<Vec<_>, _>>()?;
        let total_amount_cents = checked_sum_cents(line_totals)
            .map_err(|_| ActivityError::AmountOverflow("total amount"))?;

        Ok(ReportTotals {
            total_days: total_days.normalize(),
            total_amount_cents,
        })
    }

    /// Number of active lines.
    #[must_use]
    pub fn active_count(lines: &[EntryLine]) -> usize {
        lines.iter().filter(|l| l.is_active).count()
    }

    /// Work-item label, or the placeholder for orphaned links.
    #[must_use]
    pub fn label_for(line: &EntryLine) -> &str {
        line.work_item_label
            .as_deref()
            .unwrap_or(UNLINKED_WORK_ITEM_LABEL)
    }

    /// Sorts by date, then work-item label, then entry id.
    pub fn sort_chronological(lines: &mut [EntryLine]) {
        lines.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| Self::label_for(a).cmp(Self::label_for(b)))
                .then_with(|| a.entry_id.cmp(&b.entry_id))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(day: u32, quantity: Decimal, price: i64, label: Option<&str>) -> EntryLine {
        EntryLine {
            entry_id: Uuid::now_v7(),
            date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            quantity,
            unit_price_cents: price,
            work_item_id: label.map(|_| Uuid::now_v7()),
            work_item_label: label.map(str::to_string),
            description: None,
            is_active: true,
        }
    }

    #[test]
    fn test_empty_set_is_zero() {
        assert_eq!(AggregationEngine::recalculate(&[]).unwrap(), ReportTotals::ZERO);
    }

    #[test]
    fn test_two_half_days() {
        let lines = vec![
            line(2, dec!(0.5), 60000, Some("Audit")),
            line(3, dec!(0.5), 70000, Some("Audit")),
        ];
        let totals = AggregationEngine::recalculate(&lines).unwrap();
        assert_eq!(totals.total_days, dec!(1));
        assert_eq!(totals.total_amount_cents, 65000);
    }

    #[test]
    fn test_inactive_lines_ignored() {
        let mut deleted = line(4, dec!(2), 10000, Some("Audit"));
        deleted.is_active = false;
        let lines = vec![line(2, dec!(1), 10000, Some("Audit")), deleted];

        let totals = AggregationEngine::recalculate(&lines).unwrap();
        assert_eq!(totals.total_days, dec!(1));
        assert_eq!(totals.total_amount_cents, 10000);
        assert_eq!(AggregationEngine::active_count(&lines), 1);
    }

    #[test]
    fn test_orphaned_link_gets_placeholder() {
        let orphan = line(2, dec!(1), 100, None);
        assert_eq!(AggregationEngine::label_for(&orphan), UNLINKED_WORK_ITEM_LABEL);
        assert_eq!(AggregationEngine::recalculate(&[orphan]).unwrap().total_amount_cents, 100);
    }

    #[test]
    fn test_overflow_is_an_error() {
        let lines = vec![
            line(2, dec!(1), i64::MAX, Some("A")),
            line(3, dec!(1), 1, Some("A")),
        ];
        assert!(matches!(
            AggregationEngine::recalculate(&lines),
            Err(ActivityError::AmountOverflow(_))
        ));
    }

    #[test]
    fn test_chronological_order() {
        let mut lines = vec![
            line(5, dec!(1), 1, Some("B")),
            line(2, dec!(1), 1, Some("Z")),
            line(5, dec!(1), 1, Some("A")),
        ];
        AggregationEngine::sort_chronological(&mut lines);
        let order: Vec<_> = lines
            .iter()
            .map(|l| (l.date.format("%d").to_string(), AggregationEngine::label_for(l).to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("02".to_string(), "Z".to_string()),
                ("05".to_string(), "A".to_string()),
                ("05".to_string(), "B".to_string()),
            ]
        );
    }
}
