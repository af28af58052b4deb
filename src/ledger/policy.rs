use serde::{Deserialize, Serialize};

/// Default bound on candidate months examined per rule.
pub const DEFAULT_MAX_MONTHS_PER_RULE: u32 = 24;

/// What to do with a rule that has no series end when the query also has
/// no upper bound.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum UnboundedRuleBehavior {
    /// Compatibility mode: emit one synthetic occurrence at the window's
    /// lower bound.
    EmitSingleOccurrence,
    /// Strict mode: fail that rule's expansion.
    #[default]
    Reject,
}

/// Per-query knobs that historically varied between call sites. A plain
/// value, selected in one line where the engine is invoked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryPolicy {
    /// Count the current month's occurrence only once its scheduled day
    /// has arrived (relative to the injected "today").
    pub truncate_current_month_at_today: bool,
    pub unbounded_rule_behavior: UnboundedRuleBehavior,
    pub max_months_per_rule: u32,
    /// Always true in the unified design; kept as a knob for parity
    /// testing against historical behavior.
    pub honor_exclusions: bool,
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self {
            truncate_current_month_at_today: false,
            unbounded_rule_behavior: UnboundedRuleBehavior::Reject,
            max_months_per_rule: DEFAULT_MAX_MONTHS_PER_RULE,
            honor_exclusions: true,
        }
    }
}

impl QueryPolicy {
    /// Strict profile: rejects unbounded rules, no truncation.
    pub fn strict() -> Self {
        Self::default()
    }

    /// Reproduces the historical call-site behavior: current-month
    /// truncation on, unbounded rules collapse to a single occurrence.
    pub fn legacy() -> Self {
        Self {
            truncate_current_month_at_today: true,
            unbounded_rule_behavior: UnboundedRuleBehavior::EmitSingleOccurrence,
            ..Self::default()
        }
    }

    pub fn with_truncation(mut self, truncate: bool) -> Self {
        self.truncate_current_month_at_today = truncate;
        self
    }

    pub fn with_max_months(mut self, months: u32) -> Self {
        self.max_months_per_rule = months;
        self
    }
}
