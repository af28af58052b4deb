use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entry::{PunctualEntry, RecurrenceRule};

/// Entry selection applied before expansion, with one predicate shared by
/// the punctual and recurring paths so their semantics cannot drift.
///
/// `None` means the facet is unconstrained. Tag matching is any-of. An
/// uncategorized entry never matches a category constraint and can never
/// hit the exclusion set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<BTreeSet<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallets: Option<BTreeSet<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    /// Categories suppressed from every aggregate, e.g. internal
    /// transfers.
    #[serde(default)]
    pub excluded_categories: BTreeSet<Uuid>,
}

impl EntryFilter {
    pub fn admit_all() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category_id: Uuid) -> Self {
        self.categories
            .get_or_insert_with(BTreeSet::new)
            .insert(category_id);
        self
    }

    pub fn with_wallet(mut self, wallet_id: Uuid) -> Self {
        self.wallets
            .get_or_insert_with(BTreeSet::new)
            .insert(wallet_id);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.get_or_insert_with(BTreeSet::new).insert(tag.into());
        self
    }

    pub fn without_category(mut self, category_id: Uuid) -> Self {
        self.excluded_categories.insert(category_id);
        self
    }

    pub fn admits_rule(&self, rule: &RecurrenceRule) -> bool {
        self.admits(rule.category_id, rule.wallet_id, &rule.tags)
    }

    pub fn admits_entry(&self, entry: &PunctualEntry) -> bool {
        self.admits(entry.category_id, entry.wallet_id, &entry.tags)
    }

    fn admits(
        &self,
        category_id: Option<Uuid>,
        wallet_id: Option<Uuid>,
        tags: &BTreeSet<String>,
    ) -> bool {
        if let Some(category) = category_id {
            if self.excluded_categories.contains(&category) {
                return false;
            }
        }
        if let Some(allowed) = &self.categories {
            match category_id {
                Some(category) if allowed.contains(&category) => {}
                _ => return false,
            }
        }
        if let Some(allowed) = &self.wallets {
            match wallet_id {
                Some(wallet) if allowed.contains(&wallet) => {}
                _ => return false,
            }
        }
        if let Some(required) = &self.tags {
            if !tags.iter().any(|tag| required.contains(tag)) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use crate::money::Money;

    use super::super::entry::{EntryKind, PunctualEntry, RecurrenceRule};
    use super::EntryFilter;

    fn entry() -> PunctualEntry {
        PunctualEntry::new(
            EntryKind::Expense,
            Money::from_minor_units(500),
            NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
        )
    }

    #[test]
    fn default_filter_admits_everything() {
        let filter = EntryFilter::admit_all();
        assert!(filter.admits_entry(&entry()));
        assert!(filter.admits_entry(&entry().with_category(Uuid::new_v4())));
    }

    #[test]
    fn excluded_categories_suppress_transfers() {
        let transfers = Uuid::new_v4();
        let filter = EntryFilter::admit_all().without_category(transfers);
        assert!(!filter.admits_entry(&entry().with_category(transfers)));
        assert!(filter.admits_entry(&entry()));
    }

    #[test]
    fn category_constraint_rejects_uncategorized_entries() {
        let groceries = Uuid::new_v4();
        let filter = EntryFilter::admit_all().with_category(groceries);
        assert!(filter.admits_entry(&entry().with_category(groceries)));
        assert!(!filter.admits_entry(&entry()));
        assert!(!filter.admits_entry(&entry().with_category(Uuid::new_v4())));
    }

    #[test]
    fn tag_matching_is_any_of() {
        let filter = EntryFilter::admit_all().with_tag("shared").with_tag("travel");
        assert!(filter.admits_entry(&entry().with_tag("shared")));
        assert!(!filter.admits_entry(&entry().with_tag("solo")));
        assert!(!filter.admits_entry(&entry()));
    }

    #[test]
    fn rule_and_entry_paths_share_the_same_predicate() {
        let wallet = Uuid::new_v4();
        let filter = EntryFilter::admit_all().with_wallet(wallet);
        let rule = RecurrenceRule::new(
            EntryKind::Expense,
            Money::from_minor_units(100),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        assert!(!filter.admits_rule(&rule));
        assert!(filter.admits_rule(&rule.with_wallet(wallet)));
    }
}
