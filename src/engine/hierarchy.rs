//! Parent/child structure checks.
//!
//! Parent references are plain identifier strings, so the graph is rebuilt on
//! demand from a project's requirements. Edges point from child to parent.

use std::collections::BTreeMap;

use petgraph::{
    algo::{has_path_connecting, tarjan_scc},
    graphmap::DiGraphMap,
};

use crate::domain::{ProjectId, State};

/// Build the child → parent graph of a project.
fn graph(state: &State, project: ProjectId) -> DiGraphMap<&str, ()> {
    let mut graph = DiGraphMap::new();
    for requirement in state.requirements_in(project) {
        graph.add_node(requirement.id.as_str());
        if let Some(parent) = requirement.parent_id.as_deref() {
            graph.add_edge(requirement.id.as_str(), parent, ());
        }
    }
    graph
}

/// Whether making `parent` the parent of `child` would close a cycle.
#[must_use]
pub fn would_cycle(state: &State, project: ProjectId, child: &str, parent: &str) -> bool {
    if child == parent {
        return true;
    }
    let mut graph = graph(state, project);
    graph.add_node(child);
    graph.add_node(parent);
    has_path_connecting(&graph, parent, child, None)
}

/// Structural problems in a project's hierarchy.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HierarchyReport {
    /// Groups of identifiers that are each other's ancestors.
    pub cycles: Vec<Vec<String>>,
    /// `(child, parent)` pairs whose parent does not exist in the project.
    pub dangling: Vec<(String, String)>,
    /// Identifiers used by more than one requirement.
    pub duplicates: Vec<String>,
}

impl HierarchyReport {
    /// Whether the report found nothing.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.cycles.is_empty() && self.dangling.is_empty() && self.duplicates.is_empty()
    }
}

/// Check a project's hierarchy for cycles, dangling parents and duplicate
/// identifiers.
#[must_use]
pub fn report(state: &State, project: ProjectId) -> HierarchyReport {
    let graph = graph(state, project);

    let mut cycles: Vec<Vec<String>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1 || graph.contains_edge(component[0], component[0])
        })
        .map(|component| {
            let mut members: Vec<String> = component.into_iter().map(str::to_string).collect();
            members.sort();
            members
        })
        .collect();
    cycles.sort();

    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dangling = Vec::new();
    for requirement in state.requirements_in(project) {
        *seen.entry(requirement.id.as_str()).or_default() += 1;
        if let Some(parent) = requirement.parent_id.as_deref() {
            if !state.contains_id(project, parent) {
                dangling.push((requirement.id.clone(), parent.to_string()));
            }
        }
    }

    let duplicates = seen
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(id, _)| id.to_string())
        .collect();

    HierarchyReport {
        cycles,
        dangling,
        duplicates,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn state() -> State {
        State::from_value(json!({
            "projects": [{"id": 1}],
            "requirements": [
                {"id": "REQ-0001", "projectId": 1},
                {"id": "REQ-0002", "projectId": 1, "parentId": "REQ-0001"},
                {"id": "REQ-0003", "projectId": 1, "parentId": "REQ-0002"},
                {"id": "REQ-0004", "projectId": 2, "parentId": "REQ-0003"},
            ],
        }))
    }

    #[test]
    fn descendant_cannot_become_parent() {
        let state = state();
        assert!(would_cycle(&state, ProjectId(1), "REQ-0001", "REQ-0003"));
        assert!(would_cycle(&state, ProjectId(1), "REQ-0002", "REQ-0002"));
        assert!(!would_cycle(&state, ProjectId(1), "REQ-0003", "REQ-0001"));
    }

    #[test]
    fn other_projects_do_not_count() {
        let state = state();
        assert!(!would_cycle(&state, ProjectId(2), "REQ-0003", "REQ-0004"));
    }

    #[test]
    fn clean_hierarchy_reports_nothing() {
        assert!(report(&state(), ProjectId(1)).is_clean());
    }

    #[test]
    fn report_lists_cycles_dangling_and_duplicates() {
        let state = State::from_value(json!({
            "requirements": [
                {"id": "REQ-0001", "projectId": 1, "parentId": "REQ-0002"},
                {"id": "REQ-0002", "projectId": 1, "parentId": "REQ-0001"},
                {"id": "REQ-0003", "projectId": 1, "parentId": "REQ-0003"},
                {"id": "REQ-0004", "projectId": 1, "parentId": "REQ-0099"},
                {"id": "REQ-0004", "projectId": 1},
            ],
        }));

        let report = report(&state, ProjectId(1));

        assert_eq!(
            report.cycles,
            vec![
                vec!["REQ-0001".to_string(), "REQ-0002".to_string()],
                vec!["REQ-0003".to_string()],
            ]
        );
        assert_eq!(
            report.dangling,
            vec![("REQ-0004".to_string(), "REQ-0099".to_string())]
        );
        assert_eq!(report.duplicates, vec!["REQ-0004".to_string()]);
    }
}
