use std::collections::BTreeMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::errors::{EngineError, Result};
use crate::money::Money;

use super::calendar::YearMonth;
use super::entry::{EntryKind, PunctualEntry, RecurrenceRule};
use super::filter::EntryFilter;
use super::policy::QueryPolicy;
use super::recurring::{expand, Occurrence};

/// Income and expense tracked separately inside one grouping bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionalTotals {
    pub income: Money,
    pub expense: Money,
}

impl DirectionalTotals {
    fn record(&mut self, kind: EntryKind, amount: Money) {
        match kind {
            EntryKind::Income => self.income += amount,
            EntryKind::Expense => self.expense += amount,
        }
    }

    pub fn net(&self) -> Money {
        self.income - self.expense
    }
}

/// Aggregated view over one query interval.
///
/// `occurrences` is the merged, date-ordered union of expanded rule
/// occurrences and punctual entries. A corrupt rule lands in
/// `rule_errors` instead of aborting the whole query, so a dashboard can
/// keep serving while making the corruption visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerResult {
    pub total_income: Money,
    pub total_expense: Money,
    pub net_balance: Money,
    pub by_day: BTreeMap<NaiveDate, DirectionalTotals>,
    pub by_month: BTreeMap<YearMonth, DirectionalTotals>,
    pub by_category: BTreeMap<Option<Uuid>, DirectionalTotals>,
    pub occurrences: Vec<Occurrence>,
    pub rule_errors: BTreeMap<Uuid, EngineError>,
}

/// Merges expanded recurring occurrences with punctual entries over
/// `[from, to]` (inclusive calendar-date bounds, absent bound = unbounded
/// side) and computes totals and group-bys.
///
/// Filters apply to both record kinds before expansion; occurrences are
/// sorted ascending by date with ties kept in input order, so results are
/// reproducible regardless of expansion order.
pub fn aggregate(
    rules: &[RecurrenceRule],
    punctual: &[PunctualEntry],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: Option<NaiveDate>,
    policy: QueryPolicy,
    filter: &EntryFilter,
) -> Result<LedgerResult> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(EngineError::InvalidInterval { from, to });
        }
    }
    if policy.truncate_current_month_at_today && today.is_none() {
        return Err(EngineError::ClockNotProvided);
    }

    let mut merged: Vec<Occurrence> = Vec::new();
    for entry in punctual.iter().filter(|entry| filter.admits_entry(entry)) {
        if from.is_some_and(|from| entry.date < from) {
            continue;
        }
        if to.is_some_and(|to| entry.date > to) {
            continue;
        }
        merged.push(Occurrence::from_punctual(entry));
    }

    let mut rule_errors = BTreeMap::new();
    for rule in rules.iter().filter(|rule| filter.admits_rule(rule)) {
        match expand(rule, from, to, today, policy) {
            Ok(expansion) => merged.extend(expansion),
            Err(err) => {
                tracing::warn!(rule = %rule.id, error = %err, "skipping rule during aggregation");
                rule_errors.insert(rule.id, err);
            }
        }
    }

    // Stable sort: ties keep the punctual-then-rules input order.
    merged.sort_by_key(|occurrence| occurrence.date);

    let mut totals = DirectionalTotals::default();
    let mut by_day: BTreeMap<NaiveDate, DirectionalTotals> = BTreeMap::new();
    let mut by_month: BTreeMap<YearMonth, DirectionalTotals> = BTreeMap::new();
    let mut by_category: BTreeMap<Option<Uuid>, DirectionalTotals> = BTreeMap::new();
    for occurrence in &merged {
        totals.record(occurrence.kind, occurrence.amount);
        by_day
            .entry(occurrence.date)
            .or_default()
            .record(occurrence.kind, occurrence.amount);
        by_month
            .entry(YearMonth::of(occurrence.date))
            .or_default()
            .record(occurrence.kind, occurrence.amount);
        by_category
            .entry(occurrence.category_id)
            .or_default()
            .record(occurrence.kind, occurrence.amount);
    }

    tracing::debug!(
        occurrences = merged.len(),
        failed_rules = rule_errors.len(),
        "aggregated ledger window"
    );

    Ok(LedgerResult {
        total_income: totals.income,
        total_expense: totals.expense,
        net_balance: totals.net(),
        by_day,
        by_month,
        by_category,
        occurrences: merged,
        rule_errors,
    })
}

/// Accumulated balance through `through`: the same aggregation with an
/// unbounded lower interval, never a separate code path.
pub fn accumulated_through(
    rules: &[RecurrenceRule],
    punctual: &[PunctualEntry],
    through: NaiveDate,
    today: Option<NaiveDate>,
    policy: QueryPolicy,
    filter: &EntryFilter,
) -> Result<LedgerResult> {
    aggregate(rules, punctual, None, Some(through), today, policy, filter)
}
