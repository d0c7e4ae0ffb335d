use std::collections::BTreeMap;

use serde::{
    de::DeserializeOwned, ser::SerializeSeq, Deserialize, Deserializer, Serialize, Serializer,
};
use serde_json::{Map, Value};

use crate::domain::{lenient, Baseline, Project, ProjectId, Requirement};

/// Counter key used for requirements that have no project.
pub const UNSCOPED_COUNTER: &str = "global";

/// The whole in-memory model: every project, requirement, and baseline.
///
/// Users and memberships belong to the authentication collaborator; they are
/// carried through untouched. Entity entries that cannot be interpreted are
/// set aside in [`State::unrecognized`] and written back after the live ones.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    /// The next global identifier number to issue.
    pub next_id: u64,
    /// The next user number to issue.
    pub next_user_id: u64,
    /// The next project number to issue.
    pub next_project_id: u64,
    /// Highest draft number issued per project (see [`State::counter_key`]).
    pub project_counters: BTreeMap<String, u64>,
    /// Live requirements, in insertion order.
    pub requirements: Vec<Requirement>,
    /// Baselines, newest first.
    pub baselines: Vec<Baseline>,
    /// Projects.
    pub projects: Vec<Project>,
    /// Opaque user records.
    pub users: Vec<Value>,
    /// Opaque membership records.
    pub memberships: Vec<Value>,
    /// Entity entries kept verbatim because they could not be interpreted.
    pub unrecognized: Unrecognized,
    /// Top-level fields this version does not know about, kept verbatim.
    pub extra: Map<String, Value>,
}

/// Raw entries of the entity lists that did not decode, or that reference a
/// project by an identifier that is not numeric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Unrecognized {
    /// Raw requirement entries.
    pub requirements: Vec<Value>,
    /// Raw baseline entries.
    pub baselines: Vec<Value>,
    /// Raw project entries.
    pub projects: Vec<Value>,
}

impl Unrecognized {
    /// Whether nothing was set aside.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty() && self.baselines.is_empty() && self.projects.is_empty()
    }
}

impl Default for State {
    fn default() -> Self {
        Self {
            next_id: 1,
            next_user_id: 1,
            next_project_id: 1,
            project_counters: BTreeMap::new(),
            requirements: Vec::new(),
            baselines: Vec::new(),
            projects: Vec::new(),
            users: Vec::new(),
            memberships: Vec::new(),
            unrecognized: Unrecognized::default(),
            extra: Map::new(),
        }
    }
}

/// The persisted document, before the entity lists are interpreted.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    #[serde(default = "lenient::first", deserialize_with = "lenient::counter")]
    next_id: u64,
    #[serde(default = "lenient::first", deserialize_with = "lenient::counter")]
    next_user_id: u64,
    #[serde(default = "lenient::first", deserialize_with = "lenient::counter")]
    next_project_id: u64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    project_counters: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    requirements: Vec<Value>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    baselines: Vec<Value>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    projects: Vec<Value>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    users: Vec<Value>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    memberships: Vec<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<Document> for State {
    fn from(document: Document) -> Self {
        let (requirements, unrecognized_requirements) =
            interpret(document.requirements, "requirement", "projectId");
        let (baselines, unrecognized_baselines) =
            interpret(document.baselines, "baseline", "projectId");
        let (projects, unrecognized_projects) = interpret(document.projects, "project", "id");
        Self {
            next_id: document.next_id,
            next_user_id: document.next_user_id,
            next_project_id: document.next_project_id,
            project_counters: document.project_counters,
            requirements,
            baselines,
            projects,
            users: document.users,
            memberships: document.memberships,
            unrecognized: Unrecognized {
                requirements: unrecognized_requirements,
                baselines: unrecognized_baselines,
                projects: unrecognized_projects,
            },
            extra: document.extra,
        }
    }
}

/// Split raw entries into those that decode as `T` and those kept verbatim.
///
/// An entry whose `project_field` holds something other than a numeric
/// project identifier is kept verbatim even if it would otherwise decode.
fn interpret<T: DeserializeOwned>(
    entries: Vec<Value>,
    kind: &str,
    project_field: &str,
) -> (Vec<T>, Vec<Value>) {
    let mut recognized = Vec::with_capacity(entries.len());
    let mut unrecognized = Vec::new();
    for entry in entries {
        if has_foreign_project(&entry, project_field) {
            tracing::warn!("keeping {kind} with a non-numeric {project_field} as is");
            unrecognized.push(entry);
            continue;
        }
        match T::deserialize(&entry) {
            Ok(item) => recognized.push(item),
            Err(e) => {
                tracing::warn!("keeping malformed {kind} as is: {e}");
                unrecognized.push(entry);
            }
        }
    }
    (recognized, unrecognized)
}

fn has_foreign_project(entry: &Value, field: &str) -> bool {
    entry.get(field).is_some_and(|id| match id {
        Value::Null => false,
        Value::String(s) if s.trim().is_empty() => false,
        other => ProjectId::deserialize(other).is_err(),
    })
}

impl<'de> Deserialize<'de> for State {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Document::deserialize(deserializer).map(Self::from)
    }
}

/// Borrowed view of a [`State`] in its persisted shape.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRef<'a> {
    next_id: u64,
    next_user_id: u64,
    next_project_id: u64,
    project_counters: &'a BTreeMap<String, u64>,
    requirements: Entries<'a, Requirement>,
    baselines: Entries<'a, Baseline>,
    projects: Entries<'a, Project>,
    users: &'a [Value],
    memberships: &'a [Value],
    #[serde(flatten)]
    extra: &'a Map<String, Value>,
}

/// Live entries followed by the ones kept verbatim.
struct Entries<'a, T> {
    live: &'a [T],
    unrecognized: &'a [Value],
}

impl<T: Serialize> Serialize for Entries<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.live.len() + self.unrecognized.len()))?;
        for entry in self.live {
            seq.serialize_element(entry)?;
        }
        for entry in self.unrecognized {
            seq.serialize_element(entry)?;
        }
        seq.end()
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DocumentRef {
            next_id: self.next_id,
            next_user_id: self.next_user_id,
            next_project_id: self.next_project_id,
            project_counters: &self.project_counters,
            requirements: Entries {
                live: &self.requirements,
                unrecognized: &self.unrecognized.requirements,
            },
            baselines: Entries {
                live: &self.baselines,
                unrecognized: &self.unrecognized.baselines,
            },
            projects: Entries {
                live: &self.projects,
                unrecognized: &self.unrecognized.projects,
            },
            users: &self.users,
            memberships: &self.memberships,
            extra: &self.extra,
        }
        .serialize(serializer)
    }
}

impl State {
    /// Decode a state document leniently.
    ///
    /// Anything that is not a JSON object decodes to an empty state.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        if !value.is_object() {
            tracing::debug!("state document is not an object; starting empty");
            return Self::default();
        }
        serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::warn!("state document could not be decoded, starting empty: {e}");
            Self::default()
        })
    }

    /// Encode the state as a JSON document.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            tracing::error!("failed to encode state: {e}");
            Value::Null
        })
    }

    /// The key under which `project`'s draft counter is stored.
    #[must_use]
    pub fn counter_key(project: Option<ProjectId>) -> String {
        project.map_or_else(|| UNSCOPED_COUNTER.to_string(), |id| id.to_string())
    }

    /// Look up a project.
    #[must_use]
    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    /// Index of the requirement with display identifier `id` in `project`.
    #[must_use]
    pub fn position(&self, project: ProjectId, id: &str) -> Option<usize> {
        self.requirements
            .iter()
            .position(|req| req.is_in(project) && req.id == id)
    }

    /// Look up a requirement by display identifier within a project.
    #[must_use]
    pub fn requirement(&self, project: ProjectId, id: &str) -> Option<&Requirement> {
        self.position(project, id).map(|i| &self.requirements[i])
    }

    /// Whether any requirement in `project` uses the display identifier `id`.
    #[must_use]
    pub fn contains_id(&self, project: ProjectId, id: &str) -> bool {
        self.position(project, id).is_some()
    }

    /// Requirements belonging to `project`, in insertion order.
    pub fn requirements_in(&self, project: ProjectId) -> impl Iterator<Item = &Requirement> + '_ {
        self.requirements
            .iter()
            .filter(move |req| req.is_in(project))
    }

    /// Baselines captured from `project`, newest first.
    pub fn baselines_in(&self, project: ProjectId) -> impl Iterator<Item = &Baseline> + '_ {
        self.baselines
            .iter()
            .filter(move |baseline| baseline.is_in(project))
    }

    /// Add a project, returning its identifier.
    pub fn create_project(&mut self, name: impl Into<String>, system_code: &str) -> ProjectId {
        let id = ProjectId(self.next_project_id.max(1));
        self.next_project_id = id.0 + 1;
        self.projects.push(Project::new(id, name, system_code));
        tracing::info!("Created project {id}");
        id
    }

    /// Seed a demo project if the state has none, counting projects kept
    /// verbatim.
    ///
    /// Returns `true` if a project was added.
    pub fn seed_defaults(&mut self) -> bool {
        if !self.projects.is_empty() || !self.unrecognized.projects.is_empty() {
            return false;
        }
        let id = self.create_project("Demo Project", crate::domain::project::DEFAULT_SYSTEM_CODE);
        if let Some(project) = self.projects.iter_mut().find(|p| p.id == id) {
            "Seed project".clone_into(&mut project.description);
        }
        true
    }

    /// Remove a project together with its requirements, baselines, and
    /// memberships.
    ///
    /// Returns `true` if the project existed.
    pub fn delete_project(&mut self, project: ProjectId) -> bool {
        let before = self.projects.len();
        self.projects.retain(|p| p.id != project);
        if self.projects.len() == before {
            return false;
        }

        self.requirements.retain(|req| !req.is_in(project));
        self.baselines.retain(|baseline| !baseline.is_in(project));
        self.memberships.retain(|membership| {
            membership
                .get("projectId")
                .and_then(Value::as_u64)
                .is_none_or(|id| id != project.0)
        });
        self.project_counters.remove(&Self::counter_key(Some(project)));
        tracing::info!("Deleted project {project}");
        true
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn non_object_documents_decode_empty() {
        assert_eq!(State::from_value(json!([1, 2, 3])), State::default());
        assert_eq!(State::from_value(Value::Null), State::default());
    }

    #[test]
    fn malformed_entries_are_set_aside_not_fatal() {
        let state = State::from_value(json!({
            "nextId": "12",
            "projects": [{"id": 1, "name": "Good"}, {"name": "No id"}],
            "requirements": [{"id": "REQ-0001", "projectId": 1}, 42],
            "currentProjectId": 1,
        }));

        assert_eq!(state.next_id, 12);
        assert_eq!(state.projects.len(), 1);
        assert_eq!(state.requirements.len(), 1);
        assert_eq!(state.unrecognized.projects, vec![json!({"name": "No id"})]);
        assert_eq!(state.unrecognized.requirements, vec![json!(42)]);
        assert_eq!(state.extra["currentProjectId"], json!(1));

        let written = state.to_value();
        assert_eq!(written["projects"][1], json!({"name": "No id"}));
        assert_eq!(written["requirements"][1], json!(42));
    }

    #[test]
    fn entries_of_non_numeric_projects_survive_a_round_trip() {
        let raw = json!({
            "projects": [{"id": "P1", "systemCode": "ABC"}],
            "requirements": [{"id": "REQ-0001", "projectId": "P1", "requirement": "x"}],
            "baselines": [{"name": "B1", "projectId": "P1", "requirements": []}],
        });

        let mut state = State::from_value(raw.clone());

        assert!(state.projects.is_empty());
        assert!(state.requirements.is_empty());
        assert!(state.baselines.is_empty());
        assert!(!state.seed_defaults());

        let written = state.to_value();
        assert_eq!(written["projects"], raw["projects"]);
        assert_eq!(written["requirements"], raw["requirements"]);
        assert_eq!(written["baselines"], raw["baselines"]);
        assert_eq!(State::from_value(written), state);
    }

    #[test]
    fn numeric_string_project_ids_are_interpreted() {
        let state = State::from_value(json!({
            "projects": [{"id": "2"}],
            "requirements": [
                {"id": "REQ-0001", "projectId": "2"},
                {"id": "REQ-0002", "projectId": ""},
            ],
        }));

        assert!(state.unrecognized.is_empty());
        assert_eq!(state.requirements_in(ProjectId(2)).count(), 1);
        assert_eq!(state.requirements[1].project_id, None);
    }

    #[test]
    fn seeding_only_happens_once() {
        let mut state = State::default();
        assert!(state.seed_defaults());
        assert!(!state.seed_defaults());
        assert_eq!(state.projects.len(), 1);
        assert_eq!(state.projects[0].system_code, "SYS");
        assert_eq!(state.next_project_id, 2);
    }

    #[test]
    fn deleting_a_project_cascades() {
        let mut state = State::from_value(json!({
            "projects": [{"id": 1}, {"id": 2}],
            "requirements": [
                {"id": "REQ-0001", "projectId": 1},
                {"id": "REQ-0001", "projectId": 2},
            ],
            "baselines": [{"name": "B1", "projectId": 1, "requirements": []}],
            "memberships": [{"userId": 1, "projectId": 1}, {"userId": 1, "projectId": 2}],
            "projectCounters": {"1": 1, "2": 1},
        }));

        assert!(state.delete_project(ProjectId(1)));
        assert!(!state.delete_project(ProjectId(1)));

        assert_eq!(state.projects.len(), 1);
        assert_eq!(state.requirements.len(), 1);
        assert!(state.requirements[0].is_in(ProjectId(2)));
        assert!(state.baselines.is_empty());
        assert_eq!(state.memberships.len(), 1);
        assert!(!state.project_counters.contains_key("1"));
    }

    #[test]
    fn lookups_are_project_scoped() {
        let state = State::from_value(json!({
            "requirements": [
                {"id": "REQ-0001", "projectId": 1, "requirement": "one"},
                {"id": "REQ-0001", "projectId": 2, "requirement": "two"},
            ],
        }));

        let found = state.requirement(ProjectId(2), "REQ-0001").unwrap();
        assert_eq!(found.requirement, "two");
        assert!(state.requirement(ProjectId(3), "REQ-0001").is_none());
    }
}
