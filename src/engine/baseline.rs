use chrono::{DateTime, Utc};
use serde_json::Map;
use thiserror::Error;
use tracing::instrument;

use crate::domain::{Baseline, ProjectId, State};

/// Errors that can occur when capturing a baseline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BaselineError {
    /// The project does not exist.
    #[error("project {0} not found")]
    UnknownProject(ProjectId),
}

/// Capture a baseline of every requirement currently in `project`.
///
/// The baseline is named `name`, or `Baseline N` where N is one more than the
/// number of baselines the project already has, and is stored newest first.
///
/// # Errors
///
/// Returns [`BaselineError::UnknownProject`] if the project does not exist.
#[instrument(level = "debug", skip(state))]
pub fn capture<'a>(
    state: &'a mut State,
    project: ProjectId,
    name: Option<&str>,
    now: DateTime<Utc>,
) -> Result<&'a Baseline, BaselineError> {
    if state.project(project).is_none() {
        return Err(BaselineError::UnknownProject(project));
    }

    let name = name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map_or_else(
            || format!("Baseline {}", state.baselines_in(project).count() + 1),
            str::to_string,
        );
    let requirements: Vec<_> = state.requirements_in(project).cloned().collect();
    tracing::info!(
        "Captured baseline '{name}' with {} requirements",
        requirements.len()
    );

    state.baselines.insert(
        0,
        Baseline {
            name,
            timestamp: Some(now),
            project_id: Some(project),
            requirements,
            extra: Map::new(),
        },
    );
    Ok(&state.baselines[0])
}
