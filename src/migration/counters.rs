use std::collections::BTreeMap;

use crate::domain::{DraftId, State};

/// Raise every per-project draft counter to at least the highest draft number
/// in use in that project.
///
/// Counters are never lowered, so a number issued before a deletion is never
/// issued again. Returns the number of counters changed.
pub fn migrate(state: &mut State) -> usize {
    let mut observed: BTreeMap<String, u64> = BTreeMap::new();
    for requirement in &state.requirements {
        let Ok(id) = requirement.id.parse::<DraftId>() else {
            continue;
        };
        let highest = observed
            .entry(State::counter_key(requirement.project_id))
            .or_default();
        *highest = (*highest).max(id.number() as u64);
    }

    let mut changed = 0;
    for (key, highest) in observed {
        let counter = state.project_counters.entry(key).or_default();
        if *counter < highest {
            *counter = highest;
            changed += 1;
        }
    }
    changed
}
