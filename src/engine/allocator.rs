//! Identifier allocation, promotion and rename cascades.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use non_empty_string::NonEmptyString;
use tracing::instrument;

use crate::{
    domain::{
        identifier::{normalize_code, ApprovedId, DraftId, GlobalId, Prefix, TypeCode},
        project::{DEFAULT_SYSTEM_CODE, SYSTEM_CODE_LEN},
        requirement::DEFAULT_SUBSYSTEM,
        IdScheme, NewRequirement, ProjectId, Requirement, State,
    },
    engine::hierarchy,
};

/// Static segment used by the hierarchical scheme.
pub const STATIC_SEGMENT: &str = "SI";

/// Issue a draft identifier for a new requirement in `project`.
///
/// A preferred identifier is kept if it is not already in use in the project.
/// If it is a draft identifier, the project counter is advanced past it so
/// that later allocations never collide with it; a draft number the counter
/// could not advance past is discarded like a taken one.
///
/// Returns `None` once the project's draft counter is exhausted.
pub fn allocate_draft(
    state: &mut State,
    project: ProjectId,
    preferred: Option<&str>,
) -> Option<String> {
    let key = State::counter_key(Some(project));
    let current = state.project_counters.get(&key).copied().unwrap_or(0);

    if let Some(preferred) = preferred.map(str::trim).filter(|p| !p.is_empty()) {
        if state.contains_id(project, preferred) {
            tracing::debug!("Preferred identifier {preferred} is taken; allocating a fresh one");
        } else {
            match preferred.parse::<DraftId>().map(draft_number) {
                Err(_) => return Some(preferred.to_string()),
                Ok(Some(number)) => {
                    state.project_counters.insert(key, current.max(number));
                    return Some(preferred.to_string());
                }
                Ok(None) => tracing::warn!(
                    "Preferred identifier {preferred} is out of range; allocating a fresh one"
                ),
            }
        }
    }

    let mut next = current;
    loop {
        let Some(number) = next.checked_add(1) else {
            tracing::warn!("Draft counter of project {project} is exhausted");
            return None;
        };
        next = number;
        let candidate = draft_id(number)?;
        if !state.contains_id(project, &candidate) {
            state.project_counters.insert(key, number);
            return Some(candidate);
        }
    }
}

/// The counter value of `draft`, if the counter can still advance past it.
fn draft_number(draft: DraftId) -> Option<u64> {
    u64::try_from(draft.number())
        .ok()
        .filter(|number| number.checked_add(1).is_some())
}

fn draft_id(number: u64) -> Option<String> {
    usize::try_from(number)
        .ok()
        .and_then(DraftId::from_counter)
        .map(|id| id.to_string())
}

/// Issue a global identifier.
///
/// A preferred identifier that parses as a global identifier and is not in
/// use anywhere is kept (normalized to full width).
pub fn allocate_global(state: &mut State, preferred: Option<&str>) -> String {
    let in_use = |state: &State, number: usize| {
        state
            .requirements
            .iter()
            .filter_map(|req| req.global_id.parse::<GlobalId>().ok())
            .any(|id| id.number() == number)
    };

    if let Some(id) = preferred.and_then(|p| p.trim().parse::<GlobalId>().ok()) {
        if !in_use(state, id.number()) {
            state.next_id = state.next_id.max((id.number() as u64).saturating_add(1));
            return id.to_string();
        }
    }

    loop {
        let number = usize::try_from(state.next_id.max(1)).unwrap_or(usize::MAX);
        state.next_id = (number as u64).saturating_add(1);
        if in_use(state, number) {
            continue;
        }
        if let Some(id) = GlobalId::from_counter(number) {
            return id.to_string();
        }
    }
}

/// Create a requirement from a payload.
///
/// Fails softly, returning `None`, when the requirement text is empty, the
/// payload does not name an existing project, or the project has run out of
/// draft numbers. On success returns the index of
/// the new requirement in [`State::requirements`].
#[instrument(level = "debug", skip(state, payload))]
pub fn create(
    state: &mut State,
    mut payload: NewRequirement,
    scheme: IdScheme,
    now: DateTime<Utc>,
) -> Option<usize> {
    if NonEmptyString::new(payload.requirement.trim().to_string()).is_err() {
        tracing::debug!("Refusing to create a requirement with no text");
        return None;
    }
    let Some(project) = payload.project_id.filter(|id| state.project(*id).is_some()) else {
        tracing::debug!("Refusing to create a requirement without a known project");
        return None;
    };

    let id = allocate_draft(state, project, payload.id.take().as_deref())?;
    let global_id = allocate_global(state, payload.global_id.take().as_deref());

    if let Some(parent) = payload.parent_id.as_deref() {
        if hierarchy::would_cycle(state, project, &id, parent) {
            tracing::warn!("Dropping parent {parent} of {id}: it would create a cycle");
            payload.parent_id = None;
        }
    }

    let requirement = payload.into_requirement(id.clone(), global_id, project, now);
    let promotable = requirement.status.is_promotable();
    state.requirements.push(requirement);
    let index = state.requirements.len() - 1;
    tracing::info!("Created requirement {id}");

    if promotable {
        promote(state, project, &id, scheme);
    }
    Some(index)
}

/// Work out the approved-identifier prefix for a requirement.
///
/// Returns `None` if the project has no system code or the requirement type
/// has no type code.
fn prefix_for(state: &State, requirement: &Requirement, scheme: IdScheme) -> Option<Prefix> {
    let project = requirement.project_id.and_then(|id| state.project(id))?;
    if project.system_code.trim().is_empty() {
        tracing::debug!("Project {} has no system code; not promoting", project.id);
        return None;
    }
    let Some(type_code) = TypeCode::from_requirement_type(&requirement.requirement_type) else {
        tracing::debug!(
            "No type code for '{}'; not promoting {}",
            requirement.requirement_type,
            requirement.id
        );
        return None;
    };

    let system = normalize_code(&project.system_code, SYSTEM_CODE_LEN)
        .filter(|code| code.len() == SYSTEM_CODE_LEN)
        .unwrap_or_else(|| DEFAULT_SYSTEM_CODE.to_string());
    let segment = match scheme {
        IdScheme::Hierarchical => STATIC_SEGMENT.to_string(),
        IdScheme::Flat => normalize_code(&requirement.subsystem_code, 3)
            .filter(|code| code.len() >= 2)
            .unwrap_or_else(|| DEFAULT_SUBSYSTEM.to_string()),
    };

    Some(Prefix {
        system,
        segment,
        type_code,
    })
}

/// Approved identifiers under `prefix` in `project`, excluding the
/// requirement at `skip`.
fn siblings<'a>(
    state: &'a State,
    project: ProjectId,
    prefix: &'a Prefix,
    skip: usize,
) -> impl Iterator<Item = ApprovedId> + 'a {
    state
        .requirements
        .iter()
        .enumerate()
        .filter(move |(i, req)| *i != skip && req.is_in(project))
        .filter_map(|(_, req)| req.approved_id())
        .filter(move |id| id.has_prefix(prefix))
}

fn next_approved(
    state: &State,
    project: ProjectId,
    index: usize,
    prefix: &Prefix,
    scheme: IdScheme,
) -> ApprovedId {
    let next_base = || {
        siblings(state, project, prefix, index)
            .map(|id| id.base())
            .max()
            .unwrap_or(0)
            + 1
    };

    match scheme {
        IdScheme::Flat => ApprovedId::new(prefix, next_base(), None),
        IdScheme::Hierarchical => {
            let inherited = state.requirements[index]
                .parent_id
                .as_deref()
                .and_then(|parent| state.requirement(project, parent))
                .and_then(Requirement::approved_id)
                .map(|parent| parent.base());
            let base = inherited.unwrap_or_else(next_base);
            let derived = siblings(state, project, prefix, index)
                .filter(|id| id.base() == base)
                .map(|id| id.derived().unwrap_or(0))
                .max()
                .unwrap_or(0)
                + 1;
            ApprovedId::new(prefix, base, Some(derived))
        }
    }
}

/// Re-evaluate whether a requirement should carry an approved identifier, and
/// assign one if so.
///
/// Returns the new identifier, or `None` if nothing changed: the requirement
/// does not exist or is not in review or approved, it already has an approved
/// identifier under the right prefix, its project has no system code, or its
/// type cannot be mapped to a type code.
#[instrument(level = "debug", skip(state))]
pub fn promote(state: &mut State, project: ProjectId, id: &str, scheme: IdScheme) -> Option<String> {
    let index = state.position(project, id)?;
    let requirement = &state.requirements[index];
    if !requirement.status.is_promotable() {
        return None;
    }

    let prefix = prefix_for(state, requirement, scheme)?;
    if requirement
        .approved_id()
        .is_some_and(|current| current.has_prefix(&prefix))
    {
        return None;
    }

    let approved = next_approved(state, project, index, &prefix, scheme).to_string();
    rename(state, project, id, &approved);
    Some(approved)
}

/// What a rename cascade rewrote.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenameReport {
    /// Live requirements whose own identifier changed.
    pub records: usize,
    /// Live requirements whose parent reference changed.
    pub parent_refs: usize,
    /// Baseline copies whose identifier or parent reference changed.
    pub baseline_copies: usize,
}

impl RenameReport {
    /// Total number of records touched.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.records + self.parent_refs + self.baseline_copies
    }
}

/// Rename one identifier throughout `project`.
///
/// See [`rename_all`].
pub fn rename(state: &mut State, project: ProjectId, from: &str, to: &str) -> RenameReport {
    let mapping = BTreeMap::from([(from.to_string(), to.to_string())]);
    let report = rename_all(state, project, &mapping);
    tracing::info!("Renamed {from} to {to}");
    report
}

/// Apply a set of renames simultaneously throughout `project`.
///
/// Rewrites the identifier of each live requirement, every parent reference,
/// and the identifier and parent reference of every copy held in the
/// project's baselines. Each value is mapped at most once, so chains such as
/// `A → B, B → C` do not compound.
pub fn rename_all(
    state: &mut State,
    project: ProjectId,
    mapping: &BTreeMap<String, String>,
) -> RenameReport {
    rename_in(state, Some(project), mapping)
}

/// [`rename_all`] over the requirements whose project is `scope`, including
/// those with no project at all.
pub(crate) fn rename_in(
    state: &mut State,
    scope: Option<ProjectId>,
    mapping: &BTreeMap<String, String>,
) -> RenameReport {
    fn rewrite(value: &mut String, mapping: &BTreeMap<String, String>) -> bool {
        match mapping.get(value.as_str()) {
            Some(new) if new != value => {
                new.clone_into(value);
                true
            }
            _ => false,
        }
    }

    fn rewrite_parent(value: &mut Option<String>, mapping: &BTreeMap<String, String>) -> bool {
        value.as_mut().is_some_and(|parent| rewrite(parent, mapping))
    }

    let mut report = RenameReport::default();
    if mapping.is_empty() {
        return report;
    }

    for requirement in state
        .requirements
        .iter_mut()
        .filter(|req| req.project_id == scope)
    {
        if rewrite(&mut requirement.id, mapping) {
            report.records += 1;
        }
        if rewrite_parent(&mut requirement.parent_id, mapping) {
            report.parent_refs += 1;
        }
    }

    for copy in state
        .baselines
        .iter_mut()
        .filter(|baseline| baseline.project_id == scope)
        .flat_map(|baseline| baseline.requirements.iter_mut())
    {
        let own = rewrite(&mut copy.id, mapping);
        let parent = rewrite_parent(&mut copy.parent_id, mapping);
        if own || parent {
            report.baseline_copies += 1;
        }
    }

    report
}
