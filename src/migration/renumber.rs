use std::collections::{BTreeMap, BTreeSet};

use crate::{
    domain::{DraftId, ProjectId, State},
    engine::rename_in,
};

/// Renumber the draft identifiers of every project still using legacy
/// numbering.
///
/// A project is renumbered if any of its draft identifiers is not in
/// canonical form, or if two of its requirements share one. Drafts are ordered
/// by number, then creation time, then position, and numbered densely from 1.
/// Parent references and baseline copies follow the new numbering.
///
/// Returns the number of records changed.
pub fn migrate(state: &mut State) -> usize {
    let scopes: BTreeSet<Option<ProjectId>> = state
        .requirements
        .iter()
        .filter(|req| req.id.parse::<DraftId>().is_ok())
        .map(|req| req.project_id)
        .collect();

    scopes
        .into_iter()
        .map(|scope| renumber_scope(state, scope))
        .sum()
}

fn renumber_scope(state: &mut State, scope: Option<ProjectId>) -> usize {
    let mut drafts: Vec<(usize, DraftId)> = state
        .requirements
        .iter()
        .enumerate()
        .filter(|(_, req)| req.project_id == scope)
        .filter_map(|(index, req)| req.id.parse().ok().map(|id| (index, id)))
        .collect();

    let mut seen = BTreeSet::new();
    let legacy = drafts.iter().any(|(index, id)| {
        let current = &state.requirements[*index].id;
        !DraftId::is_canonical(current) || !seen.insert(*id)
    });
    if !legacy {
        return 0;
    }

    drafts.sort_by_key(|(index, id)| (*id, state.requirements[*index].created_at, *index));

    let mut mapping = BTreeMap::new();
    let mut assigned = Vec::with_capacity(drafts.len());
    for (position, (index, _)) in drafts.iter().enumerate() {
        let new = DraftId::from_counter(position + 1)
            .map(|id| id.to_string())
            .unwrap_or_default();
        mapping
            .entry(state.requirements[*index].id.clone())
            .or_insert_with(|| new.clone());
        assigned.push((*index, new));
    }

    let renamed = assigned
        .iter()
        .filter(|(index, new)| state.requirements[*index].id != *new)
        .count();
    let report = rename_in(state, scope, &mapping);

    // Duplicates were all mapped to the first one's new identifier.
    for (index, new) in assigned {
        state.requirements[index].id = new;
    }
    tracing::info!(
        "Renumbered {renamed} drafts in project {}",
        scope.map_or_else(|| "(none)".to_string(), |id| id.to_string())
    );
    renamed + report.parent_refs + report.baseline_copies
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ids(state: &State) -> Vec<&str> {
        state.requirements.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn canonical_projects_are_untouched() {
        let mut state = State::from_value(json!({
            "requirements": [
                {"id": "REQ-0004", "projectId": 1},
                {"id": "REQ-0002", "projectId": 1},
            ],
        }));
        assert_eq!(migrate(&mut state), 0);
        assert_eq!(ids(&state), vec!["REQ-0004", "REQ-0002"]);
    }

    #[test]
    fn legacy_numbers_become_dense() {
        let mut state = State::from_value(json!({
            "requirements": [
                {"id": "REQ-20", "projectId": 1},
                {"id": "REQ-0005", "projectId": 1, "parentId": "REQ-20"},
                {"id": "REQ-9", "projectId": 2},
            ],
        }));
        assert!(migrate(&mut state) > 0);
        assert_eq!(ids(&state), vec!["REQ-0002", "REQ-0001", "REQ-0001"]);
        assert!(state.requirements[1].is_child_of("REQ-0002"));
    }

    #[test]
    fn duplicates_are_split_by_creation_time() {
        let mut state = State::from_value(json!({
            "requirements": [
                {"id": "REQ-0001", "projectId": 1, "createdAt": "2024-02-01T00:00:00Z"},
                {"id": "REQ-0001", "projectId": 1, "createdAt": "2024-01-01T00:00:00Z"},
                {"id": "REQ-0002", "projectId": 1},
            ],
        }));
        assert!(migrate(&mut state) > 0);
        assert_eq!(ids(&state), vec!["REQ-0002", "REQ-0001", "REQ-0003"]);
        assert_eq!(migrate(&mut state), 0);
    }

    #[test]
    fn requirements_without_project_are_renumbered_together() {
        let mut state = State::from_value(json!({
            "requirements": [{"id": "req-3"}, {"id": "REQ-1"}],
        }));
        migrate(&mut state);
        assert_eq!(ids(&state), vec!["REQ-0002", "REQ-0001"]);
    }
}
