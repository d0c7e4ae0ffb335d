use std::collections::BTreeSet;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::{
    domain::{Baseline, Config, NewRequirement, ProjectId, Requirement, State},
    engine::{self, BaselineError, EditError, EditOutcome, Patch},
    migration::{self, Report},
    storage::{RemoteStore, Replicated, Store, StoreError},
};

/// The outcome of offering a remote copy of the state to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteUpdate {
    /// The remote copy was migrated and replaced the in-memory state.
    Applied(Report),
    /// The host reported unsaved local edits, so the remote copy was ignored.
    Suppressed,
}

/// An open requirements model together with its store and configuration.
///
/// Every successful mutation is written to the store straight away. A failed
/// write is logged and remembered; see [`Session::has_unsaved_changes`].
#[derive(Debug)]
pub struct Session<S> {
    state: State,
    store: S,
    config: Config,
    unsaved: bool,
}

impl<S: Store> Session<S> {
    /// Load, migrate, and seed the state held by `store`.
    ///
    /// A missing or malformed document opens as a freshly seeded state.
    #[instrument(level = "debug", skip_all)]
    pub fn open(store: S, config: Config) -> Self {
        let raw = store.load().unwrap_or_else(|| Value::Object(Map::new()));
        let (mut state, report) = migration::migrate_with_report(raw);
        let seeded = state.seed_defaults();
        Self {
            state,
            store,
            config,
            unsaved: seeded || !report.is_empty(),
        }
    }

    /// The current state.
    pub const fn state(&self) -> &State {
        &self.state
    }

    /// The configuration in force.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The backing store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Whether the in-memory state differs from what was last written.
    pub const fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Write the state to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store could not be written.
    pub fn save(&mut self) -> Result<(), StoreError> {
        self.store.save(&self.state)?;
        self.unsaved = false;
        Ok(())
    }

    fn persist(&mut self) {
        self.unsaved = true;
        if let Err(e) = self.save() {
            tracing::error!("Failed to save state: {e}");
        }
    }

    /// The project commands act on when none is named: the first one.
    pub fn default_project(&self) -> Option<ProjectId> {
        self.state.projects.first().map(|project| project.id)
    }

    /// Create a requirement.
    ///
    /// Returns `None`, creating nothing, if the text is empty or the payload
    /// names no existing project.
    pub fn create_requirement(&mut self, payload: NewRequirement) -> Option<&Requirement> {
        let index = engine::create(&mut self.state, payload, self.config.id_scheme, Utc::now())?;
        self.persist();
        self.state.requirements.get(index)
    }

    /// Edit a requirement, recording the previous version.
    ///
    /// # Errors
    ///
    /// See [`engine::edit`].
    pub fn edit_requirement(
        &mut self,
        project: ProjectId,
        id: &str,
        patch: Patch,
    ) -> Result<EditOutcome, EditError> {
        let outcome = engine::edit(
            &mut self.state,
            project,
            id,
            patch,
            &self.config.author,
            self.config.id_scheme,
            Utc::now(),
        )?;
        self.persist();
        Ok(outcome)
    }

    /// Replace a requirement's trace links.
    ///
    /// # Errors
    ///
    /// See [`engine::set_trace_links`].
    pub fn set_trace_links(
        &mut self,
        project: ProjectId,
        id: &str,
        design: BTreeSet<String>,
        tests: BTreeSet<String>,
    ) -> Result<(), EditError> {
        engine::set_trace_links(&mut self.state, project, id, design, tests)?;
        self.persist();
        Ok(())
    }

    /// Comment on a requirement as the configured author.
    ///
    /// # Errors
    ///
    /// See [`engine::add_comment`].
    pub fn add_comment(&mut self, project: ProjectId, id: &str, text: &str) -> Result<(), EditError> {
        engine::add_comment(
            &mut self.state,
            project,
            id,
            text,
            &self.config.author,
            Utc::now(),
        )?;
        self.persist();
        Ok(())
    }

    /// Clear a requirement's suspect flag. Returns whether it was set.
    ///
    /// # Errors
    ///
    /// See [`engine::acknowledge_suspect`].
    pub fn acknowledge_suspect(&mut self, project: ProjectId, id: &str) -> Result<bool, EditError> {
        let was_suspect = engine::acknowledge_suspect(&mut self.state, project, id)?;
        if was_suspect {
            self.persist();
        }
        Ok(was_suspect)
    }

    /// Re-evaluate promotion for a requirement. Returns the new identifier,
    /// if one was assigned.
    pub fn promote(&mut self, project: ProjectId, id: &str) -> Option<String> {
        let promoted = engine::promote(&mut self.state, project, id, self.config.id_scheme)?;
        self.persist();
        Some(promoted)
    }

    /// Capture a baseline of a project.
    ///
    /// # Errors
    ///
    /// See [`engine::capture`].
    pub fn capture_baseline(
        &mut self,
        project: ProjectId,
        name: Option<&str>,
    ) -> Result<&Baseline, BaselineError> {
        engine::capture(&mut self.state, project, name, Utc::now())?;
        self.persist();
        Ok(&self.state.baselines[0])
    }

    /// Create a project.
    pub fn create_project(&mut self, name: &str, system_code: &str) -> ProjectId {
        let id = self.state.create_project(name, system_code);
        self.persist();
        id
    }

    /// Delete a project with everything it owns. Returns whether it existed.
    pub fn delete_project(&mut self, project: ProjectId) -> bool {
        let deleted = self.state.delete_project(project);
        if deleted {
            self.persist();
        }
        deleted
    }

    /// Offer a remote copy of the state.
    ///
    /// `has_pending_edits` is asked first; if it reports unsaved local edits
    /// the remote copy is ignored. Otherwise it is migrated and replaces the
    /// in-memory state.
    #[instrument(level = "debug", skip_all)]
    pub fn apply_remote(
        &mut self,
        raw: Value,
        has_pending_edits: impl FnOnce() -> bool,
    ) -> RemoteUpdate {
        if has_pending_edits() {
            tracing::debug!("Local edits pending; ignoring remote state");
            return RemoteUpdate::Suppressed;
        }
        let (mut state, report) = migration::migrate_with_report(raw);
        state.seed_defaults();
        self.state = state;
        tracing::info!("Applied remote state");
        self.persist();
        RemoteUpdate::Applied(report)
    }
}

impl<L: Store, R: RemoteStore> Session<Replicated<L, R>> {
    /// Fetch the remote copy of the state and offer it to the session.
    ///
    /// Returns `None` if there is no remote or it has no state.
    pub fn pull(&mut self, has_pending_edits: impl FnOnce() -> bool) -> Option<RemoteUpdate> {
        let raw = self.store.fetch_remote()?;
        Some(self.apply_remote(raw, has_pending_edits))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        domain::Status,
        storage::{JsonFileStore, MemoryStore},
    };

    fn session() -> Session<MemoryStore> {
        Session::open(MemoryStore::new(), Config::default())
    }

    #[test]
    fn empty_store_opens_seeded() {
        let session = session();
        assert_eq!(session.state().projects.len(), 1);
        assert_eq!(session.state().projects[0].name, "Demo Project");
        assert!(session.has_unsaved_changes());
        assert_eq!(session.store().saves(), 0);
    }

    #[test]
    fn malformed_file_opens_seeded() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, "][").unwrap();

        let session = Session::open(JsonFileStore::new(&path), Config::default());
        assert_eq!(session.state().projects.len(), 1);
    }

    #[test]
    fn projects_with_foreign_ids_are_written_back() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        let raw = json!({
            "projects": [{"id": "P1", "systemCode": "ABC"}],
            "requirements": [{"id": "REQ-0001", "projectId": "P1", "requirement": "x"}],
        });
        std::fs::write(&path, raw.to_string()).unwrap();

        let mut session = Session::open(JsonFileStore::new(&path), Config::default());
        assert!(session.state().projects.is_empty());
        assert!(!session.has_unsaved_changes());
        session.save().unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["projects"], raw["projects"]);
        assert_eq!(written["requirements"], raw["requirements"]);
    }

    #[test]
    fn mutations_are_persisted() {
        let mut session = session();
        let project = session.default_project().unwrap();

        let id = session
            .create_requirement(NewRequirement::new(project, "The belt shall stop"))
            .unwrap()
            .id
            .clone();
        assert_eq!(id, "REQ-0001");
        assert!(!session.has_unsaved_changes());

        let reopened = Session::open(session.store(), Config::default());
        assert_eq!(reopened.state().requirements.len(), 1);
    }

    #[test]
    fn soft_failures_do_not_persist() {
        let mut session = session();
        let project = session.default_project().unwrap();

        assert!(session.create_requirement(NewRequirement::new(project, "")).is_none());
        assert!(session.promote(project, "REQ-0001").is_none());
        assert_eq!(session.store().saves(), 0);
    }

    #[test]
    fn failed_writes_are_remembered() {
        let mut session = session();
        let project = session.default_project().unwrap();
        session.store().set_unavailable(true);

        assert!(session
            .create_requirement(NewRequirement::new(project, "Offline"))
            .is_some());
        assert!(session.has_unsaved_changes());

        session.store().set_unavailable(false);
        session.save().unwrap();
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn example_approval_flow() {
        let mut session = Session::open(
            MemoryStore::with_value(json!({"projects": [{"id": 1, "systemCode": "ABC"}]})),
            Config::default(),
        );
        let project = ProjectId(1);
        session.create_requirement(NewRequirement::new(project, "Root"));

        let outcome = session
            .edit_requirement(
                project,
                "REQ-0001",
                Patch {
                    status: Some(Status::Approved),
                    ..Patch::default()
                },
            )
            .unwrap();
        assert_eq!(outcome.id, "ABC-SI-FN-0001.0001");

        let baseline = session.capture_baseline(project, None).unwrap();
        assert_eq!(baseline.name, "Baseline 1");
        assert_eq!(baseline.requirements[0].id, "ABC-SI-FN-0001.0001");
    }

    #[test]
    fn remote_state_respects_pending_edits() {
        let mut session = session();
        let remote = json!({"projects": [{"id": 7, "name": "Remote"}]});

        assert_eq!(
            session.apply_remote(remote.clone(), || true),
            RemoteUpdate::Suppressed
        );
        assert_eq!(session.state().projects[0].name, "Demo Project");

        assert!(matches!(
            session.apply_remote(remote, || false),
            RemoteUpdate::Applied(_)
        ));
        assert_eq!(session.state().projects[0].name, "Remote");
        assert_eq!(session.state().projects[0].system_code, "SYS");
    }

    #[test]
    fn pull_fetches_from_the_remote() {
        let store = Replicated::new(
            MemoryStore::new(),
            Some(MemoryStore::with_value(json!({"projects": [{"id": 3, "name": "Shared"}]}))),
        );
        let mut session = Session::open(store, Config::default());

        assert!(matches!(session.pull(|| false), Some(RemoteUpdate::Applied(_))));
        assert_eq!(session.state().projects[0].id, ProjectId(3));
        assert_eq!(session.store().local().saves(), 1);
    }

    #[test]
    fn deleting_a_project_persists() {
        let mut session = session();
        let other = session.create_project("Second", "snd");
        assert!(session.delete_project(other));
        assert!(!session.delete_project(other));
        assert_eq!(session.state().projects.len(), 1);
    }
}
