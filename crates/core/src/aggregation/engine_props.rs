//! Property-based tests for the aggregation engine.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::aggregation::engine::{AggregationEngine, EntryLine};

/// Quantities between 0.01 and 30.00 days.
fn arb_quantity() -> impl Strategy<Value = Decimal> {
    (1_i64..=3000).prop_map(|h| Decimal::new(h, 2))
}

/// Day rates up to 5 000.00.
fn arb_price() -> impl Strategy<Value = i64> {
    0_i64..=500_000
}

fn arb_line() -> impl Strategy<Value = EntryLine> {
    (
        arb_quantity(),
        arb_price(),
        1_u32..=28,
        any::<bool>(),
        any::<u128>(),
    )
        .prop_map(|(quantity, price, day, is_active, id)| EntryLine {
            entry_id: Uuid::from_u128(id),
            date: NaiveDate::from_ymd_opt(2026, 2, day).unwrap_or_default(),
            quantity,
            unit_price_cents: price,
            work_item_id: None,
            work_item_label: None,
            description: None,
            is_active,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Totals equal the sum over active lines.
    #[test]
    fn prop_totals_match_active_lines(lines in prop::collection::vec(arb_line(), 0..40)) {
        let totals = AggregationEngine::recalculate(&lines).unwrap();

        let mut days = Decimal::ZERO;
        let mut cents = 0_i64;
        for l in lines.iter().filter(|l| l.is_active) {
            days += l.quantity;
            cents += AggregationEngine::line_total(l.quantity, l.unit_price_cents).unwrap();
        }
        prop_assert_eq!(totals.total_days, days);
        prop_assert_eq!(totals.total_amount_cents, cents);
    }

    /// Line order never changes the totals.
    #[test]
    fn prop_totals_independent_of_order(lines in prop::collection::vec(arb_line(), 0..20)) {
        let forward = AggregationEngine::recalculate(&lines).unwrap();
        let mut reversed = lines.clone();
        reversed.reverse();
        prop_assert_eq!(forward, AggregationEngine::recalculate(&reversed).unwrap());
    }

    /// A line total is within half a cent of the exact product.
    #[test]
    fn prop_line_total_rounding_bound(quantity in arb_quantity(), price in arb_price()) {
        let exact = quantity * Decimal::from(price);
        let rounded = Decimal::from(AggregationEngine::line_total(quantity, price).unwrap());
        prop_assert!((rounded - exact).abs() <= Decimal::new(5, 1));
    }

    /// Sorting is stable under re-sorting.
    #[test]
    fn prop_sort_is_idempotent(lines in prop::collection::vec(arb_line(), 0..20)) {
        let mut once = lines.clone();
        AggregationEngine::sort_chronological(&mut once);
        let mut twice = once.clone();
        AggregationEngine::sort_chronological(&mut twice);
        prop_assert_eq!(once, twice);
    }
}
