//! Upgrades persisted state of any vintage to the current schema.
//!
//! The pipeline runs once per load, before anything else touches the state.
//! Every step is total and idempotent: it never fails, leaves data it cannot
//! interpret alone, and changes nothing when run over already-migrated state.
//!
//! The first step works on the raw JSON document, since the legacy fields it
//! rewrites are not part of the typed model. The rest work on [`State`].

use std::fmt;

use serde_json::Value;
use tracing::instrument;

use crate::domain::State;

mod backfill;
mod counters;
mod fields;
mod renumber;
mod values;

/// A migration step, in the order the pipeline runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    /// Legacy `title`/`description` fields moved to `requirement`/`rationale`.
    LegacyFields,
    /// Legacy draft identifiers renumbered densely per project.
    Renumber,
    /// Per-project draft counters raised to the highest identifier in use.
    Counters,
    /// Missing project system codes and subsystems, and requirement subsystem
    /// codes, filled in.
    ProjectFields,
    /// Missing global identifiers assigned and short ones widened.
    GlobalIds,
    /// Legacy enumerated values rewritten.
    EnumValues,
}

impl Step {
    /// Every step, in pipeline order.
    pub const ALL: [Self; 6] = [
        Self::LegacyFields,
        Self::Renumber,
        Self::Counters,
        Self::ProjectFields,
        Self::GlobalIds,
        Self::EnumValues,
    ];
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LegacyFields => "legacy field names",
            Self::Renumber => "draft renumbering",
            Self::Counters => "counter reconstruction",
            Self::ProjectFields => "project field backfill",
            Self::GlobalIds => "global identifiers",
            Self::EnumValues => "enumerated values",
        })
    }
}

/// How many records each step changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    changes: Vec<(Step, usize)>,
}

impl Report {
    fn record(&mut self, step: Step, changed: usize) {
        if changed > 0 {
            tracing::info!("Migration step '{step}' changed {changed} records");
        }
        self.changes.push((step, changed));
    }

    /// Records changed by `step`.
    #[must_use]
    pub fn changed(&self, step: Step) -> usize {
        self.changes
            .iter()
            .filter(|(s, _)| *s == step)
            .map(|(_, n)| n)
            .sum()
    }

    /// Total records changed across every step.
    #[must_use]
    pub fn total(&self) -> usize {
        self.changes.iter().map(|(_, n)| n).sum()
    }

    /// Whether the pipeline changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Per-step change counts, in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (Step, usize)> + '_ {
        self.changes.iter().copied()
    }
}

/// Migrate a raw state document.
#[must_use]
pub fn migrate(raw: Value) -> State {
    migrate_with_report(raw).0
}

/// Migrate a raw state document, reporting what changed.
#[must_use]
#[instrument(level = "debug", skip(raw))]
pub fn migrate_with_report(mut raw: Value) -> (State, Report) {
    let mut report = Report::default();
    report.record(Step::LegacyFields, fields::migrate(&mut raw));

    let mut state = State::from_value(raw);
    upgrade(&mut state, &mut report);
    (state, report)
}

/// Run the typed steps over an already decoded state.
fn upgrade(state: &mut State, report: &mut Report) {
    report.record(Step::Renumber, renumber::migrate(state));
    report.record(Step::Counters, counters::migrate(state));
    report.record(Step::ProjectFields, backfill::project_fields(state));
    report.record(Step::GlobalIds, backfill::global_ids(state));
    report.record(Step::EnumValues, values::migrate(state));
}
