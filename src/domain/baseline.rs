use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{lenient, ProjectId, Requirement};

/// An immutable, timestamped copy of a project's requirement set.
///
/// The copies are denormalized; identifier renames are written into them by
/// the rename cascade so that parent references stay valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    /// Display name.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub name: String,
    /// Capture time.
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    /// Project the requirements were copied from.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub project_id: Option<ProjectId>,
    /// Archived requirement copies.
    #[serde(default, deserialize_with = "lenient::skip_malformed")]
    pub requirements: Vec<Requirement>,
    /// Fields this version does not know about, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Baseline {
    /// Whether this baseline was captured from `project`.
    #[must_use]
    pub fn is_in(&self, project: ProjectId) -> bool {
        self.project_id == Some(project)
    }
}
