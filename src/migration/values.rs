use crate::domain::{Requirement, State};

/// Legacy target quarter labels and their current equivalents.
const QUARTERS: [(&str, &str); 4] = [
    ("Q1", "Faz1"),
    ("Q2", "Faz2"),
    ("Q3", "Faz3"),
    ("Q4", "Faz4"),
];

/// Rewrite legacy enumerated values on live requirements and baseline
/// copies. Returns the number of records changed.
pub fn migrate(state: &mut State) -> usize {
    let copies = state
        .baselines
        .iter_mut()
        .flat_map(|baseline| baseline.requirements.iter_mut());
    state
        .requirements
        .iter_mut()
        .chain(copies)
        .map(|requirement| usize::from(remap_quarter(requirement)))
        .sum()
}

fn remap_quarter(requirement: &mut Requirement) -> bool {
    let Some((_, current)) = QUARTERS
        .iter()
        .find(|(legacy, _)| *legacy == requirement.target_quarter)
    else {
        return false;
    };
    (*current).clone_into(&mut requirement.target_quarter);
    true
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn quarters_are_remapped_everywhere() {
        let mut state = State::from_value(json!({
            "requirements": [
                {"id": "REQ-0001", "targetQuarter": "Q3"},
                {"id": "REQ-0002", "targetQuarter": "Faz2"},
                {"id": "REQ-0003", "targetQuarter": "Q7"},
            ],
            "baselines": [{"requirements": [{"id": "REQ-0001", "targetQuarter": "Q4"}]}],
        }));

        assert_eq!(migrate(&mut state), 2);
        assert_eq!(state.requirements[0].target_quarter, "Faz3");
        assert_eq!(state.requirements[1].target_quarter, "Faz2");
        assert_eq!(state.requirements[2].target_quarter, "Q7");
        assert_eq!(state.baselines[0].requirements[0].target_quarter, "Faz4");
        assert_eq!(migrate(&mut state), 0);
    }
}
