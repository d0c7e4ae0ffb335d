use serde_json::{Map, Value};

/// Legacy requirement field names and their current equivalents.
const RENAMED: [(&str, &str); 2] = [("title", "requirement"), ("description", "rationale")];

/// Move legacy field values into their current names on every requirement
/// record: live ones, baseline copies, and the snapshots nested in their
/// histories.
///
/// A legacy value is only copied if the current field is empty; the legacy
/// field is removed either way. Returns the number of records changed.
pub fn migrate(state: &mut Value) -> usize {
    let Some(root) = state.as_object_mut() else {
        return 0;
    };

    let mut changed = 0;
    if let Some(Value::Array(requirements)) = root.get_mut("requirements") {
        changed += requirements.iter_mut().map(migrate_record).sum::<usize>();
    }
    if let Some(Value::Array(baselines)) = root.get_mut("baselines") {
        for baseline in baselines {
            if let Some(Value::Array(copies)) = baseline.get_mut("requirements") {
                changed += copies.iter_mut().map(migrate_record).sum::<usize>();
            }
        }
    }
    changed
}

fn migrate_record(record: &mut Value) -> usize {
    let Some(fields) = record.as_object_mut() else {
        return 0;
    };

    let mut changed = usize::from(rename_fields(fields));
    if let Some(Value::Array(versions)) = fields.get_mut("versions") {
        for version in versions {
            if let Some(snapshot) = version.get_mut("snapshot") {
                changed += migrate_record(snapshot);
            }
        }
    }
    changed
}

fn rename_fields(fields: &mut Map<String, Value>) -> bool {
    let mut changed = false;
    for (legacy, current) in RENAMED {
        let Some(value) = fields.remove(legacy) else {
            continue;
        };
        changed = true;
        if is_blank(fields.get(current)) && !is_blank(Some(&value)) {
            fields.insert(current.to_string(), value);
        }
    }
    changed
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Bool(b)) => !b,
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn legacy_values_fill_empty_fields() {
        let mut state = json!({
            "requirements": [
                {"id": "REQ-0001", "title": "Old", "requirement": ""},
                {"id": "REQ-0002", "title": "Ignored", "requirement": "Current", "description": "Why"},
            ],
        });

        assert_eq!(migrate(&mut state), 2);
        assert_eq!(
            state["requirements"],
            json!([
                {"id": "REQ-0001", "requirement": "Old"},
                {"id": "REQ-0002", "requirement": "Current", "rationale": "Why"},
            ])
        );
    }

    #[test]
    fn nested_snapshots_and_baselines_are_migrated() {
        let mut state = json!({
            "requirements": [{
                "id": "REQ-0001",
                "versions": [{"snapshot": {"title": "v1", "versions": [{"snapshot": {"title": "v0"}}]}}],
            }],
            "baselines": [{"requirements": [{"title": "copy"}]}],
        });

        assert_eq!(migrate(&mut state), 3);
        assert_eq!(
            state["requirements"][0]["versions"][0]["snapshot"]["versions"][0]["snapshot"],
            json!({"requirement": "v0"})
        );
        assert_eq!(state["baselines"][0]["requirements"][0], json!({"requirement": "copy"}));
    }

    #[test]
    fn unexpected_shapes_are_left_alone() {
        let mut state = json!({"requirements": [1, "two", null], "baselines": {"a": 1}});
        let before = state.clone();
        assert_eq!(migrate(&mut state), 0);
        assert_eq!(state, before);
        assert_eq!(migrate(&mut json!([1, 2])), 0);
    }
}
