//! Edits, version history, and suspect propagation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use non_empty_string::NonEmptyString;
use thiserror::Error;
use tracing::instrument;

use crate::{
    domain::{lenient, Comment, IdScheme, ProjectId, State, Status, Version},
    engine::{allocator, hierarchy},
};

/// Errors that can occur when editing a requirement.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    /// The requirement could not be found.
    #[error("requirement {0} not found")]
    NotFound(String),
    /// The edit would leave the requirement with no text.
    #[error("requirement text cannot be empty")]
    EmptyRequirement,
    /// The new parent could not be found in the same project.
    #[error("parent requirement {0} not found")]
    ParentNotFound(String),
    /// Assigning the parent would make the requirement its own ancestor.
    #[error("parent {parent} of {child} would create a cycle")]
    Cycle {
        /// The edited requirement.
        child: String,
        /// The proposed parent.
        parent: String,
    },
    /// The comment text was empty.
    #[error("comment text cannot be empty")]
    EmptyComment,
}

/// A partial update to a requirement. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct Patch {
    /// New requirement statement.
    pub requirement: Option<String>,
    /// New rationale.
    pub rationale: Option<String>,
    /// New discipline.
    pub discipline: Option<String>,
    /// New status.
    pub status: Option<Status>,
    /// New parent; `Some(None)` removes the parent.
    pub parent_id: Option<Option<String>>,
    /// New informational flag.
    pub is_info: Option<bool>,
    /// New requirement type.
    pub requirement_type: Option<String>,
    /// New verification methods.
    pub verification_method: Option<Vec<String>>,
    /// New primary subsystem code.
    pub subsystem_code: Option<String>,
    /// New additional subsystem codes.
    pub subsystem_codes: Option<Vec<String>>,
    /// New delivery phase.
    pub target_quarter: Option<String>,
    /// New effort estimate.
    pub effort: Option<f64>,
    /// New specification clause.
    pub spec_clause: Option<String>,
    /// New cited standards.
    pub standards: Option<Vec<String>>,
    /// New cited documents.
    pub documents: Option<Vec<String>>,
}

/// The result of a successful edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// The requirement's identifier after the edit.
    pub id: String,
    /// Number of versions now recorded.
    pub versions: usize,
    /// Direct children newly flagged as suspect.
    pub suspect_children: Vec<String>,
    /// The approved identifier assigned by this edit, if any.
    pub promoted: Option<String>,
}

/// Apply a patch to a requirement.
///
/// The pre-edit record is pushed onto the front of its history. If the
/// requirement already had history, its direct children are flagged suspect;
/// if it has linked tests, its test links are flagged suspect. Promotion is
/// re-evaluated afterwards.
///
/// # Errors
///
/// Fails without changing anything if the requirement does not exist, the
/// patch empties the requirement text, or the new parent is missing or would
/// create a cycle.
#[instrument(level = "debug", skip(state, patch))]
pub fn edit(
    state: &mut State,
    project: ProjectId,
    id: &str,
    patch: Patch,
    author: &str,
    scheme: IdScheme,
    now: DateTime<Utc>,
) -> Result<EditOutcome, EditError> {
    let index = state
        .position(project, id)
        .ok_or_else(|| EditError::NotFound(id.to_string()))?;

    if let Some(Some(parent)) = &patch.parent_id {
        if !state.contains_id(project, parent) {
            return Err(EditError::ParentNotFound(parent.clone()));
        }
        if hierarchy::would_cycle(state, project, id, parent) {
            return Err(EditError::Cycle {
                child: id.to_string(),
                parent: parent.clone(),
            });
        }
    }
    if patch
        .requirement
        .as_deref()
        .is_some_and(|text| text.trim().is_empty())
    {
        return Err(EditError::EmptyRequirement);
    }

    let requirement = &mut state.requirements[index];
    let had_history = !requirement.versions.is_empty();
    let before = requirement.clone();

    apply(requirement, patch);
    requirement.updated_at = Some(now);
    requirement.versions.insert(
        0,
        Version {
            timestamp: Some(now),
            author: author.to_string(),
            snapshot: Some(Box::new(before)),
        },
    );
    if !requirement.links.tests.is_empty() {
        requirement.links.tests_suspect = true;
    }
    let versions = requirement.versions.len();

    let suspect_children = if had_history {
        mark_children_suspect(state, project, id)
    } else {
        Vec::new()
    };

    let promoted = allocator::promote(state, project, id, scheme);
    tracing::info!("Edited {id} ({versions} versions)");

    Ok(EditOutcome {
        id: promoted.clone().unwrap_or_else(|| id.to_string()),
        versions,
        suspect_children,
        promoted,
    })
}

fn apply(requirement: &mut crate::domain::Requirement, patch: Patch) {
    let Patch {
        requirement: text,
        rationale,
        discipline,
        status,
        parent_id,
        is_info,
        requirement_type,
        verification_method,
        subsystem_code,
        subsystem_codes,
        target_quarter,
        effort,
        spec_clause,
        standards,
        documents,
    } = patch;

    if let Some(text) = text {
        requirement.requirement = text.trim().to_string();
    }
    if let Some(rationale) = rationale {
        requirement.rationale = rationale;
    }
    if let Some(discipline) = discipline {
        requirement.discipline = discipline;
    }
    if let Some(status) = status {
        requirement.status = status;
    }
    if let Some(parent_id) = parent_id {
        requirement.parent_id = parent_id.filter(|p| !p.trim().is_empty());
    }
    if let Some(is_info) = is_info {
        requirement.is_info = is_info;
    }
    if let Some(requirement_type) = requirement_type {
        requirement.requirement_type = requirement_type;
    }
    if let Some(methods) = verification_method {
        requirement.verification_method = lenient::verification_from(methods);
    }
    if let Some(code) = subsystem_code {
        requirement.subsystem_code = code;
    }
    if let Some(codes) = subsystem_codes {
        requirement.subsystem_codes = codes;
    }
    if let Some(quarter) = target_quarter {
        requirement.target_quarter = quarter;
    }
    if let Some(effort) = effort.filter(|e| e.is_finite()) {
        requirement.effort = effort;
    }
    if let Some(clause) = spec_clause {
        requirement.spec_clause = clause;
    }
    if let Some(standards) = standards {
        requirement.references.standards = standards.into_iter().collect();
    }
    if let Some(documents) = documents {
        requirement.references.documents = documents.into_iter().collect();
    }
    requirement.apply_info_rules();
}

/// Flag the direct children of `parent` in `project` as suspect.
///
/// Returns the identifiers of the children that were flagged.
fn mark_children_suspect(state: &mut State, project: ProjectId, parent: &str) -> Vec<String> {
    let flagged: Vec<String> = state
        .requirements
        .iter_mut()
        .filter(|req| req.is_in(project) && req.is_child_of(parent))
        .map(|req| {
            req.suspect = true;
            req.id.clone()
        })
        .collect();
    if !flagged.is_empty() {
        tracing::info!("Flagged {} children of {parent} as suspect", flagged.len());
    }
    flagged
}

/// Replace a requirement's trace links.
///
/// Saving links counts as re-verifying them, so the test-suspect flag is
/// cleared.
///
/// # Errors
///
/// Returns [`EditError::NotFound`] if the requirement does not exist.
pub fn set_trace_links(
    state: &mut State,
    project: ProjectId,
    id: &str,
    design: BTreeSet<String>,
    tests: BTreeSet<String>,
) -> Result<(), EditError> {
    let index = state
        .position(project, id)
        .ok_or_else(|| EditError::NotFound(id.to_string()))?;
    let links = &mut state.requirements[index].links;
    links.design = design;
    links.tests = tests;
    links.tests_suspect = false;
    tracing::info!("Updated trace links of {id}");
    Ok(())
}

/// Add a comment to a requirement. Comments do not create a version.
///
/// # Errors
///
/// Returns [`EditError::NotFound`] if the requirement does not exist, or
/// [`EditError::EmptyComment`] if the text is blank.
pub fn add_comment(
    state: &mut State,
    project: ProjectId,
    id: &str,
    text: &str,
    author: &str,
    now: DateTime<Utc>,
) -> Result<(), EditError> {
    let text =
        NonEmptyString::new(text.trim().to_string()).map_err(|_| EditError::EmptyComment)?;
    let index = state
        .position(project, id)
        .ok_or_else(|| EditError::NotFound(id.to_string()))?;
    state.requirements[index].comments.insert(
        0,
        Comment {
            text: text.as_str().to_string(),
            author: author.to_string(),
            timestamp: Some(now),
        },
    );
    Ok(())
}

/// Clear a requirement's suspect flag after its parent change was reviewed.
///
/// Returns whether the flag was set.
///
/// # Errors
///
/// Returns [`EditError::NotFound`] if the requirement does not exist.
pub fn acknowledge_suspect(
    state: &mut State,
    project: ProjectId,
    id: &str,
) -> Result<bool, EditError> {
    let index = state
        .position(project, id)
        .ok_or_else(|| EditError::NotFound(id.to_string()))?;
    let requirement = &mut state.requirements[index];
    let was_suspect = std::mem::replace(&mut requirement.suspect, false);
    if was_suspect {
        tracing::info!("Acknowledged suspect flag on {id}");
    }
    Ok(was_suspect)
}
