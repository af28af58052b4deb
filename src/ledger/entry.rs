use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{EngineError, Result};
use crate::money::Money;

/// Direction of a ledger movement. Amounts are stored as positive
/// magnitudes; the sign is implied by the kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryKind {
    Income,
    Expense,
}

/// Stored definition of a repeating monthly ledger entry.
///
/// Owned by the external ledger store; the engine only reads it. One rule
/// yields at most one occurrence per calendar month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub id: Uuid,
    pub kind: EntryKind,
    pub amount: Money,
    /// Date the record was created on; supplies the default target day.
    pub anchor_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_end: Option<NaiveDate>,
    /// Calendar dates on which this series has no occurrence — a deleted
    /// single instance, not a terminated series.
    #[serde(default)]
    pub excluded_dates: BTreeSet<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_id: Option<Uuid>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl RecurrenceRule {
    pub fn new(kind: EntryKind, amount: Money, anchor_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            amount,
            anchor_date,
            day_of_month: None,
            series_start: None,
            series_end: None,
            excluded_dates: BTreeSet::new(),
            category_id: None,
            wallet_id: None,
            tags: BTreeSet::new(),
        }
    }

    pub fn with_day_of_month(mut self, day: u32) -> Self {
        self.day_of_month = Some(day);
        self
    }

    pub fn with_series_start(mut self, start: NaiveDate) -> Self {
        self.series_start = Some(start);
        self
    }

    pub fn with_series_end(mut self, end: NaiveDate) -> Self {
        self.series_end = Some(end);
        self
    }

    pub fn with_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_wallet(mut self, wallet_id: Uuid) -> Self {
        self.wallet_id = Some(wallet_id);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Removes a single occurrence date without ending the series.
    pub fn exclude_date(&mut self, date: NaiveDate) {
        self.excluded_dates.insert(date);
    }

    /// First date on which an occurrence may exist.
    pub fn effective_start(&self) -> NaiveDate {
        self.series_start.unwrap_or(self.anchor_date)
    }

    /// Target day-of-month before clamping, derived from the anchor date
    /// when no explicit day is stored.
    pub fn effective_day(&self) -> u32 {
        self.day_of_month.unwrap_or_else(|| self.anchor_date.day())
    }

    pub fn is_excluded(&self, date: NaiveDate) -> bool {
        self.excluded_dates.contains(&date)
    }

    /// Defensive shape check; a violation fails this rule's expansion
    /// instead of silently producing wrong totals.
    pub fn validate(&self) -> Result<()> {
        if let Some(day) = self.day_of_month {
            if !(1..=31).contains(&day) {
                return Err(EngineError::RuleInvariantViolated(format!(
                    "rule {}: day_of_month {} is outside 1-31",
                    self.id, day
                )));
            }
        }
        if let Some(end) = self.series_end {
            if self.effective_start() > end {
                return Err(EngineError::RuleInvariantViolated(format!(
                    "rule {}: series starts {} after it ends {}",
                    self.id,
                    self.effective_start(),
                    end
                )));
            }
        }
        if self.amount.is_negative() {
            return Err(EngineError::RuleInvariantViolated(format!(
                "rule {}: amount must be a positive magnitude",
                self.id
            )));
        }
        Ok(())
    }
}

/// One-off, non-repeating ledger record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PunctualEntry {
    pub id: Uuid,
    pub kind: EntryKind,
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_id: Option<Uuid>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl PunctualEntry {
    pub fn new(kind: EntryKind, amount: Money, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            amount,
            date,
            category_id: None,
            wallet_id: None,
            tags: BTreeSet::new(),
        }
    }

    pub fn with_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_wallet(mut self, wallet_id: Uuid) -> Self {
        self.wallet_id = Some(wallet_id);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}
