use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use crate::errors::{EngineError, Result};
use crate::money::Money;

use super::calendar::{self, YearMonth};
use super::entry::{EntryKind, PunctualEntry, RecurrenceRule};
use super::policy::{QueryPolicy, UnboundedRuleBehavior};

/// One concrete dated instance materialized from a recurring rule.
///
/// Punctual entries are projected through the same type when merged into
/// an aggregation, so the union sequence stays homogeneous. Occurrences
/// are ephemeral: recomputed on every query, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub source_id: Uuid,
    pub date: NaiveDate,
    pub amount: Money,
    pub kind: EntryKind,
    pub category_id: Option<Uuid>,
    pub key: String,
}

impl Occurrence {
    fn from_rule(rule: &RecurrenceRule, date: NaiveDate) -> Self {
        Self {
            source_id: rule.id,
            date,
            amount: rule.amount,
            kind: rule.kind,
            category_id: rule.category_id,
            key: occurrence_key(rule.id, date),
        }
    }

    pub(crate) fn from_punctual(entry: &PunctualEntry) -> Self {
        Self {
            source_id: entry.id,
            date: entry.date,
            amount: entry.amount,
            kind: entry.kind,
            category_id: entry.category_id,
            key: occurrence_key(entry.id, entry.date),
        }
    }
}

/// Stable identity of a logical occurrence across repeated expansions.
/// UI layers use it as a list key and idempotency token; the format is a
/// contract and must not change.
pub fn occurrence_key(source_id: Uuid, date: NaiveDate) -> String {
    format!("{}::{}", source_id, calendar::to_iso_date(date))
}

/// Expands a rule into its dated occurrences inside the query interval.
///
/// The returned sequence is lazy, finite, ascending by date, and a pure
/// function of its inputs: expanding the same arguments twice (including
/// the injected `today`) yields identical occurrences. `today` is the
/// caller's notion of the current date; the engine never reads a clock.
pub fn expand<'a>(
    rule: &'a RecurrenceRule,
    query_from: Option<NaiveDate>,
    query_to: Option<NaiveDate>,
    today: Option<NaiveDate>,
    policy: QueryPolicy,
) -> Result<Expansion<'a>> {
    rule.validate()?;
    if policy.truncate_current_month_at_today && today.is_none() {
        return Err(EngineError::ClockNotProvided);
    }

    let effective_from = match query_from {
        Some(from) if from > rule.effective_start() => from,
        _ => rule.effective_start(),
    };
    let effective_to = match (rule.series_end, query_to) {
        (Some(end), Some(to)) => Some(end.min(to)),
        (Some(end), None) => Some(end),
        (None, Some(to)) => Some(to),
        (None, None) => None,
    };

    match effective_to {
        Some(effective_to) => Ok(Expansion::months(
            rule,
            effective_from,
            effective_to,
            today,
            policy,
        )),
        None => match policy.unbounded_rule_behavior {
            UnboundedRuleBehavior::Reject => Err(EngineError::UnboundedQuery(rule.id)),
            UnboundedRuleBehavior::EmitSingleOccurrence => {
                Ok(Expansion::synthetic(rule, effective_from, today, policy))
            }
        },
    }
}

/// Lazy candidate walk over one rule, one calendar month at a time.
pub struct Expansion<'a> {
    rule: &'a RecurrenceRule,
    today: Option<NaiveDate>,
    policy: QueryPolicy,
    state: State,
}

#[derive(Clone, Copy)]
enum State {
    /// Legacy single-occurrence mode for fully unbounded rules.
    Synthetic { date: NaiveDate },
    Months {
        cursor: YearMonth,
        last: YearMonth,
        from: NaiveDate,
        to: NaiveDate,
        remaining: u32,
    },
    Done,
}

impl<'a> Expansion<'a> {
    fn synthetic(
        rule: &'a RecurrenceRule,
        date: NaiveDate,
        today: Option<NaiveDate>,
        policy: QueryPolicy,
    ) -> Self {
        Self {
            rule,
            today,
            policy,
            state: State::Synthetic { date },
        }
    }

    fn months(
        rule: &'a RecurrenceRule,
        from: NaiveDate,
        to: NaiveDate,
        today: Option<NaiveDate>,
        policy: QueryPolicy,
    ) -> Self {
        let state = if from > to {
            State::Done
        } else {
            State::Months {
                cursor: YearMonth::of(from),
                last: YearMonth::of(to),
                from,
                to,
                remaining: policy.max_months_per_rule,
            }
        };
        Self {
            rule,
            today,
            policy,
            state,
        }
    }

    fn passes_gates(&self, candidate: NaiveDate) -> bool {
        if self.policy.honor_exclusions && self.rule.is_excluded(candidate) {
            return false;
        }
        if self.policy.truncate_current_month_at_today {
            if let Some(today) = self.today {
                if YearMonth::of(candidate) == YearMonth::of(today)
                    && candidate.day() > today.day()
                {
                    return false;
                }
            }
        }
        true
    }
}

impl Iterator for Expansion<'_> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        loop {
            match self.state {
                State::Done => return None,
                State::Synthetic { date } => {
                    self.state = State::Done;
                    if self.passes_gates(date) {
                        return Some(Occurrence::from_rule(self.rule, date));
                    }
                    return None;
                }
                State::Months {
                    cursor,
                    last,
                    from,
                    to,
                    remaining,
                } => {
                    if remaining == 0 || cursor > last {
                        self.state = State::Done;
                        return None;
                    }
                    self.state = State::Months {
                        cursor: cursor.next(),
                        last,
                        from,
                        to,
                        remaining: remaining - 1,
                    };
                    let candidate = cursor.day_clamped(self.rule.effective_day());
                    if candidate < from || candidate > to {
                        continue;
                    }
                    if !self.passes_gates(candidate) {
                        continue;
                    }
                    return Some(Occurrence::from_rule(self.rule, candidate));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use crate::errors::EngineError;
    use crate::money::Money;

    use super::super::entry::{EntryKind, RecurrenceRule};
    use super::super::policy::{QueryPolicy, UnboundedRuleBehavior};
    use super::{expand, occurrence_key};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn monthly_rule(day_of_month: u32, start: NaiveDate) -> RecurrenceRule {
        RecurrenceRule::new(EntryKind::Expense, Money::from_minor_units(1500), start)
            .with_day_of_month(day_of_month)
            .with_series_start(start)
    }

    fn dates(
        rule: &RecurrenceRule,
        from: NaiveDate,
        to: NaiveDate,
        policy: QueryPolicy,
        today: Option<NaiveDate>,
    ) -> Vec<NaiveDate> {
        expand(rule, Some(from), Some(to), today, policy)
            .expect("expansion succeeds")
            .map(|occurrence| occurrence.date)
            .collect()
    }

    #[test]
    fn day_31_clamps_to_every_month_end_without_skipping() {
        let rule = monthly_rule(31, date(2024, 1, 1));
        let expanded = dates(
            &rule,
            date(2024, 1, 1),
            date(2024, 4, 30),
            QueryPolicy::strict(),
            None,
        );
        assert_eq!(
            expanded,
            vec![
                date(2024, 1, 31),
                date(2024, 2, 29),
                date(2024, 3, 31),
                date(2024, 4, 30),
            ]
        );
    }

    #[test]
    fn expansion_is_deterministic() {
        let rule = monthly_rule(15, date(2023, 11, 3));
        let first = dates(
            &rule,
            date(2024, 1, 1),
            date(2024, 6, 30),
            QueryPolicy::strict(),
            None,
        );
        let second = dates(
            &rule,
            date(2024, 1, 1),
            date(2024, 6, 30),
            QueryPolicy::strict(),
            None,
        );
        assert_eq!(first, second);
    }

    #[test]
    fn excluding_a_date_removes_exactly_that_occurrence() {
        let mut rule = monthly_rule(10, date(2024, 1, 1));
        let before = dates(
            &rule,
            date(2024, 1, 1),
            date(2024, 5, 31),
            QueryPolicy::strict(),
            None,
        );
        rule.exclude_date(date(2024, 3, 10));
        let after = dates(
            &rule,
            date(2024, 1, 1),
            date(2024, 5, 31),
            QueryPolicy::strict(),
            None,
        );
        assert_eq!(before.len(), after.len() + 1);
        let removed: Vec<_> = before
            .iter()
            .filter(|occurrence| !after.contains(occurrence))
            .collect();
        assert_eq!(removed, vec![&date(2024, 3, 10)]);
    }

    #[test]
    fn exclusions_are_ignored_when_the_policy_disables_them() {
        let mut rule = monthly_rule(10, date(2024, 1, 1));
        rule.exclude_date(date(2024, 3, 10));
        let policy = QueryPolicy {
            honor_exclusions: false,
            ..QueryPolicy::strict()
        };
        let expanded = dates(&rule, date(2024, 1, 1), date(2024, 5, 31), policy, None);
        assert!(expanded.contains(&date(2024, 3, 10)));
    }

    #[test]
    fn series_bounds_intersect_with_the_query_interval() {
        let rule = monthly_rule(10, date(2024, 1, 10)).with_series_end(date(2024, 3, 5));
        let expanded = dates(
            &rule,
            date(2024, 2, 1),
            date(2024, 12, 31),
            QueryPolicy::strict(),
            None,
        );
        assert_eq!(expanded, vec![date(2024, 2, 10)]);
    }

    #[test]
    fn series_ending_before_the_query_yields_nothing() {
        let rule = monthly_rule(5, date(2023, 1, 5)).with_series_end(date(2023, 6, 30));
        let expanded = dates(
            &rule,
            date(2024, 1, 1),
            date(2024, 12, 31),
            QueryPolicy::strict(),
            None,
        );
        assert!(expanded.is_empty());
    }

    #[test]
    fn truncation_holds_back_the_current_month_until_the_day_arrives() {
        let rule = monthly_rule(20, date(2024, 1, 1));
        let policy = QueryPolicy::strict().with_truncation(true);
        let before = dates(
            &rule,
            date(2024, 6, 1),
            date(2024, 6, 30),
            policy,
            Some(date(2024, 6, 15)),
        );
        assert!(before.is_empty());
        let after = dates(
            &rule,
            date(2024, 6, 1),
            date(2024, 6, 30),
            policy,
            Some(date(2024, 6, 25)),
        );
        assert_eq!(after, vec![date(2024, 6, 20)]);
    }

    #[test]
    fn truncation_does_not_touch_past_months() {
        let rule = monthly_rule(31, date(2024, 1, 1));
        let policy = QueryPolicy::strict().with_truncation(true);
        let expanded = dates(
            &rule,
            date(2024, 2, 1),
            date(2024, 2, 29),
            policy,
            Some(date(2024, 3, 1)),
        );
        assert_eq!(expanded, vec![date(2024, 2, 29)]);
    }

    #[test]
    fn truncation_without_a_reference_date_fails() {
        let rule = monthly_rule(20, date(2024, 1, 1));
        let policy = QueryPolicy::strict().with_truncation(true);
        let err = expand(
            &rule,
            Some(date(2024, 6, 1)),
            Some(date(2024, 6, 30)),
            None,
            policy,
        )
        .err()
        .expect("missing today");
        assert_eq!(err, EngineError::ClockNotProvided);
    }

    #[test]
    fn unbounded_rule_is_rejected_in_strict_mode() {
        let rule = monthly_rule(1, date(2024, 1, 1));
        let err = expand(
            &rule,
            Some(date(2024, 1, 1)),
            None,
            None,
            QueryPolicy::strict(),
        )
        .err()
        .expect("no upper bound anywhere");
        assert_eq!(err, EngineError::UnboundedQuery(rule.id));
    }

    #[test]
    fn unbounded_rule_collapses_to_one_occurrence_in_legacy_mode() {
        let rule = monthly_rule(1, date(2024, 3, 1));
        let policy = QueryPolicy {
            unbounded_rule_behavior: UnboundedRuleBehavior::EmitSingleOccurrence,
            ..QueryPolicy::strict()
        };
        let occurrences: Vec<_> = expand(&rule, Some(date(2024, 5, 1)), None, None, policy)
            .expect("legacy mode")
            .collect();
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].date, date(2024, 5, 1));
    }

    #[test]
    fn month_budget_bounds_the_walk() {
        let rule = monthly_rule(1, date(2020, 1, 1));
        let policy = QueryPolicy::strict().with_max_months(6);
        let expanded = dates(&rule, date(2020, 1, 1), date(2024, 12, 31), policy, None);
        assert_eq!(expanded.len(), 6);
        assert_eq!(expanded.last(), Some(&date(2020, 6, 1)));
    }

    #[test]
    fn invalid_rules_fail_before_any_occurrence_is_produced() {
        let rule = monthly_rule(10, date(2024, 6, 1)).with_series_end(date(2024, 1, 1));
        assert!(matches!(
            expand(
                &rule,
                Some(date(2024, 1, 1)),
                Some(date(2024, 12, 31)),
                None,
                QueryPolicy::strict(),
            ),
            Err(EngineError::RuleInvariantViolated(_))
        ));
    }

    #[test]
    fn occurrence_keys_are_stable_and_iso_formatted() {
        let id = Uuid::from_u128(7);
        assert_eq!(
            occurrence_key(id, date(2024, 2, 29)),
            "00000000-0000-0000-0000-000000000007::2024-02-29"
        );
    }

    #[test]
    fn scenario_day_31_expense_over_february_under_truncation() {
        let rule = RecurrenceRule::new(
            EntryKind::Expense,
            Money::from_minor_units(1500),
            date(2024, 1, 1),
        )
        .with_day_of_month(31)
        .with_series_start(date(2024, 1, 1));
        let policy = QueryPolicy::strict().with_truncation(true);
        let occurrences: Vec<_> = expand(
            &rule,
            Some(date(2024, 2, 1)),
            Some(date(2024, 2, 29)),
            Some(date(2024, 3, 1)),
            policy,
        )
        .expect("expansion succeeds")
        .collect();
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].date, date(2024, 2, 29));
        assert_eq!(occurrences[0].amount, Money::from_minor_units(1500));
    }
}
