use crate::domain::{
    project::{default_subsystems, DEFAULT_SYSTEM_CODE},
    requirement::DEFAULT_SUBSYSTEM,
    GlobalId, State,
};

/// Give every project a system code and a subsystem list, and every
/// requirement (live or archived) a subsystem code.
///
/// Returns the number of records changed.
pub fn project_fields(state: &mut State) -> usize {
    let mut changed = 0;
    for project in &mut state.projects {
        let mut touched = false;
        if project.system_code.trim().is_empty() {
            DEFAULT_SYSTEM_CODE.clone_into(&mut project.system_code);
            touched = true;
        }
        if project.subsystems.is_empty() {
            project.subsystems = default_subsystems();
            touched = true;
        }
        changed += usize::from(touched);
    }

    let copies = state
        .baselines
        .iter_mut()
        .flat_map(|baseline| baseline.requirements.iter_mut());
    for requirement in state.requirements.iter_mut().chain(copies) {
        if requirement.subsystem_code.trim().is_empty() {
            DEFAULT_SUBSYSTEM.clone_into(&mut requirement.subsystem_code);
            changed += 1;
        }
    }
    changed
}

/// Assign global identifiers to requirements that lack one and widen legacy
/// short ones.
///
/// Baseline copies take the identifier of their live counterpart when it
/// still exists. The global counter is first raised past every identifier in
/// use, including those on entries kept verbatim. Returns the number of records changed.
pub fn global_ids(state: &mut State) -> usize {
    let kept = state
        .unrecognized
        .requirements
        .iter()
        .filter_map(|raw| raw.get("globalId")?.as_str());
    let highest = state
        .requirements
        .iter()
        .chain(state.baselines.iter().flat_map(|b| b.requirements.iter()))
        .map(|req| req.global_id.as_str())
        .chain(kept)
        .filter_map(|id| id.parse::<GlobalId>().ok())
        .map(|id| id.number() as u64)
        .max()
        .unwrap_or(0);
    let mut changed = usize::from(state.next_id <= highest);
    state.next_id = state.next_id.max(highest + 1);

    for index in 0..state.requirements.len() {
        let current = state.requirements[index].global_id.clone();
        let updated = normalized(&current).unwrap_or_else(|| issue(state));
        if updated != current {
            state.requirements[index].global_id = updated;
            changed += 1;
        }
    }

    for b in 0..state.baselines.len() {
        let project = state.baselines[b].project_id;
        for r in 0..state.baselines[b].requirements.len() {
            let copy = &state.baselines[b].requirements[r];
            let current = copy.global_id.clone();
            let live = state
                .requirements
                .iter()
                .find(|live| live.project_id == project && live.id == copy.id)
                .map(|live| live.global_id.clone())
                .filter(|id| !id.is_empty());
            let updated = normalized(&current)
                .or(live)
                .unwrap_or_else(|| issue(state));
            if updated != current {
                state.baselines[b].requirements[r].global_id = updated;
                changed += 1;
            }
        }
    }
    changed
}

/// The canonical form of `value`, or `None` if it is blank.
///
/// Values that are not global identifiers at all are kept as they are.
fn normalized(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(
        trimmed
            .parse::<GlobalId>()
            .map_or_else(|_| value.to_string(), |id| id.to_string()),
    )
}

fn issue(state: &mut State) -> String {
    let number = usize::try_from(state.next_id.max(1)).unwrap_or(usize::MAX);
    state.next_id = (number as u64).saturating_add(1);
    GlobalId::from_counter(number).map_or_else(String::new, |id| id.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn projects_get_codes_and_subsystems() {
        let mut state = State::from_value(json!({
            "projects": [
                {"id": 1},
                {"id": 2, "systemCode": "XYZ", "subsystems": [{"code": "RAD", "label": "R"}]},
            ],
            "requirements": [{"id": "REQ-0001"}, {"id": "REQ-0002", "subsystemCode": "RAD"}],
        }));

        assert_eq!(project_fields(&mut state), 2);
        assert_eq!(state.projects[0].system_code, "SYS");
        assert_eq!(state.projects[0].subsystems, default_subsystems());
        assert_eq!(state.projects[1].system_code, "XYZ");
        assert_eq!(state.requirements[0].subsystem_code, "GEN");
        assert_eq!(state.requirements[1].subsystem_code, "RAD");
        assert_eq!(project_fields(&mut state), 0);
    }

    #[test]
    fn global_ids_are_assigned_after_the_highest_in_use() {
        let mut state = State::from_value(json!({
            "nextId": 1,
            "requirements": [
                {"id": "REQ-0001", "projectId": 1},
                {"id": "REQ-0002", "projectId": 1, "globalId": "req-0040"},
            ],
            "baselines": [{
                "projectId": 1,
                "requirements": [
                    {"id": "REQ-0001", "projectId": 1},
                    {"id": "REQ-0009", "projectId": 1},
                    {"id": "REQ-0002", "projectId": 1, "globalId": "LEGACY"},
                ],
            }],
        }));

        assert!(global_ids(&mut state) > 0);

        assert_eq!(state.requirements[0].global_id, "REQ-0000041");
        assert_eq!(state.requirements[1].global_id, "REQ-0000040");
        let copies = &state.baselines[0].requirements;
        assert_eq!(copies[0].global_id, "REQ-0000041");
        assert_eq!(copies[1].global_id, "REQ-0000042");
        assert_eq!(copies[2].global_id, "LEGACY");
        assert_eq!(state.next_id, 43);
        assert_eq!(global_ids(&mut state), 0);
    }

    #[test]
    fn global_ids_skip_those_held_by_entries_kept_verbatim() {
        let mut state = State::from_value(json!({
            "requirements": [
                {"id": "REQ-0001", "projectId": 1},
                {"id": "REQ-0001", "projectId": "P1", "globalId": "REQ-0000007"},
            ],
        }));

        global_ids(&mut state);

        assert_eq!(state.requirements[0].global_id, "REQ-0000008");
        assert_eq!(state.next_id, 9);
    }
}
