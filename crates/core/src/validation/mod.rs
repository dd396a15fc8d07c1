//! Field and business-rule validation.
//!
//! The gate collects every violated rule instead of stopping at the first
//! one, and returns them as a typed [`ValidationFailure`].

use cadence_shared::config::ActivitySettings;
use cadence_shared::types::{Currency, MAX_QUANTITY, MAX_UNIT_PRICE_CENTS, QUANTITY_SCALE};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::fmt;

use crate::entry::{EntryPatch, NewEntry, ValidEntry};
use crate::report::{
    NewReport, ReportFilter, ReportPatch, ReportPeriod, ReportQuery, ReportStatus, ValidReport,
    ValidReportPatch,
};

/// A validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Field is missing.
    Required,
    /// Value lies outside the accepted range.
    OutOfRange,
    /// Currency is not in the allow-list.
    UnsupportedCurrency,
    /// Value must be strictly positive.
    MustBePositive,
    /// More than two fractional digits.
    TooPrecise,
    /// Value must be a whole number.
    MustBeInteger,
    /// Value must be zero or more.
    MustNotBeNegative,
    /// Date lies in the future.
    InFuture,
    /// Text exceeds the maximum length.
    TooLong,
    /// Update carries no field.
    EmptyPatch,
    /// Report has no active entry.
    NoActiveEntries,
    /// Status name is not one of the known states.
    UnknownStatus,
}

impl Rule {
    /// Returns the rule name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::OutOfRange => "out_of_range",
            Self::UnsupportedCurrency => "unsupported_currency",
            Self::MustBePositive => "must_be_positive",
            Self::TooPrecise => "too_precise",
            Self::MustBeInteger => "must_be_integer",
            Self::MustNotBeNegative => "must_not_be_negative",
            Self::InFuture => "in_future",
            Self::TooLong => "too_long",
            Self::EmptyPatch => "empty_patch",
            Self::NoActiveEntries => "no_active_entries",
            Self::UnknownStatus => "unknown_status",
        }
    }
}

/// One violated rule on one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Field name as received.
    pub field: &'static str,
    /// Violated rule.
    pub rule: Rule,
}

impl Violation {
    /// Creates a violation.
    #[must_use]
    pub const fn new(field: &'static str, rule: Rule) -> Self {
        Self { field, rule }
    }
}

/// Every rule violated by an input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    /// Violations in field order.
    pub violations: Vec<Violation>,
}

impl ValidationFailure {
    /// Creates a failure with one violation.
    #[must_use]
    pub fn single(violation: Violation) -> Self {
        Self {
            violations: vec![violation],
        }
    }

    /// Returns true if `rule` was violated on any field.
    #[must_use]
    pub fn has_rule(&self, rule: Rule) -> bool {
        self.violations.iter().any(|v| v.rule == rule)
    }

    /// Returns true if `field` violated `rule`.
    #[must_use]
    pub fn has(&self, field: &str, rule: Rule) -> bool {
        self.violations
            .iter()
            .any(|v| v.field == field && v.rule == rule)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", v.field, v.rule.as_str())?;
        }
        Ok(())
    }
}

/// Configurable bounds applied by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Earliest accepted report year.
    pub min_year: i32,
    /// Latest accepted report year.
    pub max_year: i32,
    /// Maximum description length in characters.
    pub max_description_len: usize,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::from(&ActivitySettings::default())
    }
}

impl From<&ActivitySettings> for ValidationPolicy {
    fn from(settings: &ActivitySettings) -> Self {
        Self {
            min_year: settings.min_year,
            max_year: settings.max_year,
            max_description_len: settings.max_description_len,
        }
    }
}

/// Collects violations while fields are checked.
#[derive(Default)]
struct Collector {
    violations: Vec<Violation>,
}

impl Collector {
    fn push(&mut self, field: &'static str, rule: Rule) {
        self.violations.push(Violation::new(field, rule));
    }

    fn required<T: Copy>(&mut self, field: &'static str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.push(field, Rule::Required);
        }
        value
    }

    fn finish<T>(self, value: impl FnOnce() -> Option<T>) -> Result<T, ValidationFailure> {
        if self.violations.is_empty() {
            // Every field checked above was present and valid.
            value().ok_or_else(|| ValidationFailure {
                violations: vec![Violation::new("payload", Rule::Required)],
            })
        } else {
            Err(ValidationFailure {
                violations: self.violations,
            })
        }
    }
}

/// Stateless field and business-rule checks.
pub struct ValidationGate;

impl ValidationGate {
    /// Validates input for a new report.
    ///
    /// # Errors
    ///
    /// Returns every violated rule.
    pub fn validate_new_report(
        input: &NewReport,
        policy: &ValidationPolicy,
    ) -> Result<ValidReport, ValidationFailure> {
        let mut c = Collector::default();

        let month = c
            .required("month", input.month)
            .and_then(|m| check_month(&mut c, m));
        let year = c
            .required("year", input.year)
            .and_then(|y| check_year(&mut c, y, policy));
        let currency = match input.currency.as_deref() {
            None => {
                c.push("currency", Rule::Required);
                None
            }
            Some(code) => check_currency(&mut c, code),
        };
        check_description(&mut c, input.description.as_deref(), policy);

        c.finish(|| {
            Some(ValidReport {
                period: ReportPeriod {
                    year: year?,
                    month: month?,
                },
                currency: currency?,
                description: input.description.clone(),
            })
        })
    }

    /// Validates the non-status fields of a report patch.
    ///
    /// # Errors
    ///
    /// Returns every violated rule, or `empty_patch` if the patch carries nothing.
    pub fn validate_report_patch(
        patch: &ReportPatch,
        policy: &ValidationPolicy,
    ) -> Result<ValidReportPatch, ValidationFailure> {
        if patch.is_empty() {
            return Err(ValidationFailure::single(Violation::new(
                "report",
                Rule::EmptyPatch,
            )));
        }

        let mut c = Collector::default();
        let month = patch.month.and_then(|m| check_month(&mut c, m));
        let year = patch.year.and_then(|y| check_year(&mut c, y, policy));
        let currency = patch
            .currency
            .as_deref()
            .and_then(|code| check_currency(&mut c, code));
        check_description(&mut c, patch.description.as_deref(), policy);

        c.finish(|| {
            Some(ValidReportPatch {
                month,
                year,
                currency,
                description: patch.description.clone(),
            })
        })
    }

    /// Validates input for a new entry.
    ///
    /// # Arguments
    /// * `input` - The unvalidated entry
    /// * `today` - Reference date for the future-date rule
    /// * `policy` - Configured bounds
    ///
    /// # Errors
    ///
    /// Returns every violated rule.
    pub fn validate_new_entry(
        input: &NewEntry,
        today: NaiveDate,
        policy: &ValidationPolicy,
    ) -> Result<ValidEntry, ValidationFailure> {
        let mut c = Collector::default();

        let work_item_id = c.required("work_item_id", input.work_item_id);
        let date = c.required("date", input.date).and_then(|d| {
            if d > today {
                c.push("date", Rule::InFuture);
                None
            } else {
                Some(d)
            }
        });
        let quantity = c
            .required("quantity", input.quantity)
            .and_then(|q| check_quantity(&mut c, q));
        let unit_price_cents = c
            .required("unit_price_cents", input.unit_price_cents)
            .and_then(|p| check_unit_price(&mut c, p));
        check_description(&mut c, input.description.as_deref(), policy);

        c.finish(|| {
            Some(ValidEntry {
                work_item_id: work_item_id?,
                date: date?,
                quantity: quantity?,
                unit_price_cents: unit_price_cents?,
                description: input.description.clone(),
            })
        })
    }

    /// Validates list filters. Absent filters stay absent.
    ///
    /// # Errors
    ///
    /// Returns every violated rule.
    pub fn validate_report_query(
        query: &ReportQuery,
        policy: &ValidationPolicy,
    ) -> Result<ReportFilter, ValidationFailure> {
        let mut c = Collector::default();

        let status = query.status.as_deref().map(|raw| {
            let parsed = ReportStatus::parse(raw);
            if parsed.is_none() {
                c.push("status", Rule::UnknownStatus);
            }
            parsed
        });
        let year = query.year.map(|y| check_year(&mut c, y, policy));
        let month = query.month.map(|m| check_month(&mut c, m));

        c.finish(|| {
            Some(ReportFilter {
                status: status.flatten(),
                year: year.flatten(),
                month: month.flatten(),
            })
        })
    }

    /// Rejects an entry patch that carries no field.
    ///
    /// # Errors
    ///
    /// Returns `empty_patch` on the `entry` field.
    pub fn ensure_entry_patch_not_empty(patch: &EntryPatch) -> Result<(), ValidationFailure> {
        if patch.is_empty() {
            Err(ValidationFailure::single(Violation::new(
                "entry",
                Rule::EmptyPatch,
            )))
        } else {
            Ok(())
        }
    }
}

fn check_month(c: &mut Collector, month: i64) -> Option<u32> {
    match u32::try_from(month) {
        Ok(m) if (1..=12).contains(&m) => Some(m),
        _ => {
            c.push("month", Rule::OutOfRange);
            None
        }
    }
}

fn check_year(c: &mut Collector, year: i64, policy: &ValidationPolicy) -> Option<i32> {
    match i32::try_from(year) {
        Ok(y) if (policy.min_year..=policy.max_year).contains(&y) => Some(y),
        _ => {
            c.push("year", Rule::OutOfRange);
            None
        }
    }
}

fn check_currency(c: &mut Collector, code: &str) -> Option<Currency> {
    if let Ok(currency) = code.parse::<Currency>() {
        Some(currency)
    } else {
        c.push("currency", Rule::UnsupportedCurrency);
        None
    }
}

fn check_description(c: &mut Collector, description: Option<&str>, policy: &ValidationPolicy) {
    if let Some(text) = description
        && text.chars().count() > policy.max_description_len
    {
        c.push("description", Rule::TooLong);
    }
}

fn check_quantity(c: &mut Collector, quantity: Decimal) -> Option<Decimal> {
    let mut ok = true;
    if quantity <= Decimal::ZERO {
        c.push("quantity", Rule::MustBePositive);
        ok = false;
    }
    if quantity.normalize().scale() > QUANTITY_SCALE {
        c.push("quantity", Rule::TooPrecise);
        ok = false;
    }
    if quantity > MAX_QUANTITY {
        c.push("quantity", Rule::OutOfRange);
        ok = false;
    }
    ok.then(|| quantity.normalize())
}

fn check_unit_price(c: &mut Collector, price: Decimal) -> Option<i64> {
    if !price.fract().is_zero() {
        c.push("unit_price_cents", Rule::MustBeInteger);
        return None;
    }
    if price.is_sign_negative() && !price.is_zero() {
        c.push("unit_price_cents", Rule::MustNotBeNegative);
        return None;
    }
    match price.to_i64() {
        Some(cents) if cents <= MAX_UNIT_PRICE_CENTS => Some(cents),
        _ => {
            c.push("unit_price_cents", Rule::OutOfRange);
            None
        }
    }
}
