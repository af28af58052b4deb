//! Recurrence expansion and aggregation over ledger records.
//!
//! The engine is a pure read-side projection: the external store owns the
//! records, a caller-injected "today" stands in for the wall clock, and
//! every query recomputes its occurrences from scratch.

pub mod aggregate;
pub mod calendar;
pub mod entry;
pub mod filter;
pub mod policy;
pub mod recurring;

pub use aggregate::{accumulated_through, aggregate, DirectionalTotals, LedgerResult};
pub use calendar::YearMonth;
pub use entry::{EntryKind, PunctualEntry, RecurrenceRule};
pub use filter::EntryFilter;
pub use policy::{QueryPolicy, UnboundedRuleBehavior, DEFAULT_MAX_MONTHS_PER_RULE};
pub use recurring::{expand, occurrence_key, Expansion, Occurrence};
