use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use nonempty::NonEmpty;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::domain::{lenient, ApprovedId, ProjectId};

/// Requirement type forced onto informational nodes.
pub const INFO_TYPE: &str = "Informational";

/// Placeholder written into fields that do not apply to informational nodes.
pub const NOT_APPLICABLE: &str = "-";

/// Discipline assigned when none is given.
pub const DEFAULT_DISCIPLINE: &str = "System";

/// Requirement type assigned when none is given.
pub const DEFAULT_TYPE: &str = "Functional";

/// Subsystem code assigned when none is given.
pub const DEFAULT_SUBSYSTEM: &str = "GEN";

/// Target phase assigned when none is given.
pub const DEFAULT_QUARTER: &str = "Faz1";

/// Lifecycle status of a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Status {
    /// Newly written, not yet reviewed.
    #[default]
    Draft,
    /// Under review.
    #[serde(rename = "In Review")]
    InReview,
    /// Approved.
    Approved,
    /// Rejected during review.
    Rejected,
}

impl Status {
    /// Whether a requirement with this status should carry an approved
    /// identifier.
    #[must_use]
    pub const fn is_promotable(self) -> bool {
        matches!(self, Self::InReview | Self::Approved)
    }

    /// Every status, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Draft, Self::InReview, Self::Approved, Self::Rejected];
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Draft => "Draft",
            Self::InReview => "In Review",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        })
    }
}

/// Error returned when a string is not a known status.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "draft" => Ok(Self::Draft),
            "inreview" | "review" => Ok(Self::InReview),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => s.parse().unwrap_or_default(),
            _ => Self::default(),
        })
    }
}

/// Trace links from a requirement to design and test artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Links {
    /// Linked design artifacts.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub design: BTreeSet<String>,
    /// Linked test artifacts.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub tests: BTreeSet<String>,
    /// Set when the requirement changed after its tests were linked.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub tests_suspect: bool,
}

/// External references cited by a requirement.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct References {
    /// Cited standards.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub standards: BTreeSet<String>,
    /// Cited documents.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub documents: BTreeSet<String>,
}

/// An immutable record of a requirement's state before an edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// When the edit happened.
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Who made the edit.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub author: String,
    /// Full copy of the record immediately before the edit.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub snapshot: Option<Box<Requirement>>,
}

/// A discussion comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment body.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub text: String,
    /// Who wrote it.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub author: String,
    /// When it was written.
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A single engineering requirement.
///
/// `Clone` is a full deep copy (history and comments included); snapshots
/// and baselines rely on that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    /// Display identifier; draft, approved, or imported.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub id: String,
    /// System-wide identifier, stable for the requirement's lifetime.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub global_id: String,
    /// Owning project.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub project_id: Option<ProjectId>,
    /// The requirement statement.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub requirement: String,
    /// Why the requirement exists.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub rationale: String,
    /// Responsible engineering discipline.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub discipline: String,
    /// Lifecycle status.
    #[serde(default)]
    pub status: Status,
    /// Display identifier of the parent requirement.
    #[serde(
        default,
        deserialize_with = "lenient::reference",
        serialize_with = "lenient::serialize_reference"
    )]
    pub parent_id: Option<String>,
    /// Informational node flag.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub is_info: bool,
    /// Requirement type name (see [`TypeCode`](crate::domain::TypeCode)).
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub requirement_type: String,
    /// How the requirement will be verified.
    #[serde(
        default = "lenient::default_verification",
        deserialize_with = "lenient::verification",
        serialize_with = "lenient::serialize_verification"
    )]
    pub verification_method: NonEmpty<String>,
    /// Primary subsystem code.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub subsystem_code: String,
    /// Additional subsystem codes.
    #[serde(
        default,
        deserialize_with = "lenient::or_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub subsystem_codes: Vec<String>,
    /// Planned delivery phase.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub target_quarter: String,
    /// Estimated effort.
    #[serde(default = "default_effort", deserialize_with = "lenient::effort")]
    pub effort: f64,
    /// Clause of the source specification this requirement came from.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub spec_clause: String,
    /// Trace links.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub links: Links,
    /// External references.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub references: References,
    /// Priority model inputs, owned by the scoring collaborator.
    #[serde(default)]
    pub priority: Option<Value>,
    /// Priority score, owned by the scoring collaborator.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub score: f64,
    /// Set when the parent changed after this requirement was last reviewed.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub suspect: bool,
    /// Creation time.
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    /// Last edit time.
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    /// Edit history, newest first.
    #[serde(default, deserialize_with = "lenient::skip_malformed")]
    pub versions: Vec<Version>,
    /// Comments, newest first.
    #[serde(default, deserialize_with = "lenient::skip_malformed")]
    pub comments: Vec<Comment>,
    /// Fields this version does not know about, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const fn default_effort() -> f64 {
    lenient::DEFAULT_EFFORT
}

impl Requirement {
    /// Whether this requirement belongs to `project`.
    #[must_use]
    pub fn is_in(&self, project: ProjectId) -> bool {
        self.project_id == Some(project)
    }

    /// The display identifier as an approved identifier, if it is one.
    #[must_use]
    pub fn approved_id(&self) -> Option<ApprovedId> {
        self.id.parse().ok()
    }

    /// Whether this requirement's parent is `id`.
    #[must_use]
    pub fn is_child_of(&self, id: &str) -> bool {
        self.parent_id.as_deref() == Some(id)
    }

    /// Force the reduced field values carried by informational nodes.
    pub fn apply_info_rules(&mut self) {
        if self.is_info {
            NOT_APPLICABLE.clone_into(&mut self.discipline);
            INFO_TYPE.clone_into(&mut self.requirement_type);
            self.verification_method = NonEmpty::new(NOT_APPLICABLE.to_string());
        }
    }

    /// The state immediately before the most recent edit, if any.
    #[must_use]
    pub fn previous(&self) -> Option<&Self> {
        self.versions.first()?.snapshot.as_deref()
    }
}

/// A creation payload, as produced by the create form and import adapters.
///
/// Every field is optional; `id` is a preferred identifier that the allocator
/// may discard.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewRequirement {
    /// Preferred display identifier.
    pub id: Option<String>,
    /// Preferred global identifier.
    pub global_id: Option<String>,
    /// Owning project. Required.
    pub project_id: Option<ProjectId>,
    /// Requirement statement. Required.
    #[serde(alias = "title")]
    pub requirement: String,
    /// Rationale.
    #[serde(alias = "description")]
    pub rationale: String,
    /// Discipline.
    pub discipline: Option<String>,
    /// Initial status.
    pub status: Option<Status>,
    /// Parent display identifier.
    #[serde(deserialize_with = "lenient::reference")]
    pub parent_id: Option<String>,
    /// Informational node flag.
    pub is_info: bool,
    /// Requirement type name.
    pub requirement_type: Option<String>,
    /// Verification methods.
    pub verification_method: Vec<String>,
    /// Estimated effort.
    pub effort: Option<f64>,
    /// Planned delivery phase.
    pub target_quarter: Option<String>,
    /// Primary subsystem code.
    pub subsystem_code: Option<String>,
    /// Additional subsystem codes.
    pub subsystem_codes: Vec<String>,
    /// Source specification clause.
    pub spec_clause: String,
    /// Cited standards.
    pub standards: Vec<String>,
    /// Cited documents.
    pub documents: Vec<String>,
}

impl NewRequirement {
    /// A payload with just the statement and project filled in.
    #[must_use]
    pub fn new(project: ProjectId, requirement: impl Into<String>) -> Self {
        Self {
            project_id: Some(project),
            requirement: requirement.into(),
            ..Self::default()
        }
    }

    /// Build the record this payload describes.
    ///
    /// Identifiers are supplied by the caller; unset fields take their
    /// defaults and informational rules are applied.
    #[must_use]
    pub fn into_requirement(
        self,
        id: String,
        global_id: String,
        project: ProjectId,
        now: DateTime<Utc>,
    ) -> Requirement {
        let non_empty = |value: Option<String>, default: &str| {
            value
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let mut requirement = Requirement {
            id,
            global_id,
            project_id: Some(project),
            requirement: self.requirement.trim().to_string(),
            rationale: self.rationale,
            discipline: non_empty(self.discipline, DEFAULT_DISCIPLINE),
            status: self.status.unwrap_or_default(),
            parent_id: self.parent_id.filter(|p| !p.trim().is_empty()),
            is_info: self.is_info,
            requirement_type: non_empty(self.requirement_type, DEFAULT_TYPE),
            verification_method: lenient::verification_from(self.verification_method),
            subsystem_code: non_empty(self.subsystem_code, DEFAULT_SUBSYSTEM),
            subsystem_codes: self.subsystem_codes,
            target_quarter: non_empty(self.target_quarter, DEFAULT_QUARTER),
            effort: self
                .effort
                .filter(|e| e.is_finite() && *e != 0.0)
                .unwrap_or(lenient::DEFAULT_EFFORT),
            spec_clause: self.spec_clause,
            links: Links::default(),
            references: References {
                standards: self.standards.into_iter().collect(),
                documents: self.documents.into_iter().collect(),
            },
            priority: None,
            score: 0.0,
            suspect: false,
            created_at: Some(now),
            updated_at: Some(now),
            versions: Vec::new(),
            comments: Vec::new(),
            extra: Map::new(),
        };
        requirement.apply_info_rules();
        requirement
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    fn minimal() -> Requirement {
        NewRequirement::new(ProjectId(1), "The pump shall start").into_requirement(
            "REQ-0001".to_string(),
            "REQ-0000001".to_string(),
            ProjectId(1),
            Utc::now(),
        )
    }

    #[test_case("Draft", Status::Draft; "draft")]
    #[test_case("In Review", Status::InReview; "in review")]
    #[test_case("InReview", Status::InReview; "camel case review")]
    #[test_case("review", Status::InReview; "short review")]
    #[test_case("Approved", Status::Approved; "approved")]
    #[test_case("Rejected", Status::Rejected; "rejected")]
    #[test_case("Obsolete", Status::Draft; "unknown defaults to draft")]
    fn status_decoding(raw: &str, expected: Status) {
        let status: Status = serde_json::from_value(json!(raw)).unwrap();
        assert_eq!(status, expected);
    }

    #[test]
    fn status_serializes_with_display_names() {
        assert_eq!(
            serde_json::to_value(Status::InReview).unwrap(),
            json!("In Review")
        );
        assert_eq!(Status::InReview.to_string(), "In Review");
    }

    #[test]
    fn payload_defaults_are_applied() {
        let requirement = minimal();
        assert_eq!(requirement.discipline, DEFAULT_DISCIPLINE);
        assert_eq!(requirement.requirement_type, DEFAULT_TYPE);
        assert_eq!(requirement.subsystem_code, DEFAULT_SUBSYSTEM);
        assert_eq!(requirement.target_quarter, DEFAULT_QUARTER);
        assert_eq!(requirement.verification_method.head, "Analysis");
        assert_eq!(requirement.status, Status::Draft);
        assert!(requirement.parent_id.is_none());
        assert!(requirement.versions.is_empty());
    }

    #[test_case("ABC-SI-FN-0001.0002", Some("ABC-SI-FN-0001.0002"); "hierarchical")]
    #[test_case("SYS-GEN-PR-0014", Some("SYS-GEN-PR-0014"); "flat")]
    #[test_case("REQ-0001", None; "draft")]
    #[test_case("IMPORTED-7", None; "foreign")]
    fn approved_identifiers_are_recognized(id: &str, expected: Option<&str>) {
        let mut requirement = minimal();
        id.clone_into(&mut requirement.id);
        assert_eq!(
            requirement.approved_id().map(|id| id.to_string()).as_deref(),
            expected
        );
    }

    #[test]
    fn informational_nodes_carry_reduced_fields() {
        let mut payload = NewRequirement::new(ProjectId(1), "Context only");
        payload.is_info = true;
        payload.discipline = Some("Mechanical".to_string());
        payload.requirement_type = Some("Safety".to_string());
        payload.verification_method = vec!["Test".to_string()];

        let requirement = payload.into_requirement(
            "REQ-0001".to_string(),
            "REQ-0000001".to_string(),
            ProjectId(1),
            Utc::now(),
        );

        assert_eq!(requirement.discipline, NOT_APPLICABLE);
        assert_eq!(requirement.requirement_type, INFO_TYPE);
        assert_eq!(requirement.verification_method, NonEmpty::new("-".to_string()));
    }

    #[test]
    fn parent_reference_round_trips_as_empty_string() {
        let requirement = minimal();
        let value = serde_json::to_value(&requirement).unwrap();
        assert_eq!(value["parentId"], json!(""));
        assert_eq!(value["verificationMethod"], json!(["Analysis"]));

        let decoded: Requirement = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, requirement);
    }

    #[test]
    fn unknown_fields_are_preserved() {
        let decoded: Requirement = serde_json::from_value(json!({
            "id": "REQ-0001",
            "requirement": "Keep me",
            "customField": {"nested": true},
        }))
        .unwrap();
        assert_eq!(decoded.extra["customField"], json!({"nested": true}));

        let encoded = serde_json::to_value(&decoded).unwrap();
        assert_eq!(encoded["customField"], json!({"nested": true}));
    }

    #[test]
    fn payload_accepts_legacy_field_names() {
        let payload: NewRequirement = serde_json::from_value(json!({
            "title": "Legacy title",
            "description": "Legacy description",
            "projectId": 3,
            "parentId": "",
        }))
        .unwrap();
        assert_eq!(payload.requirement, "Legacy title");
        assert_eq!(payload.rationale, "Legacy description");
        assert_eq!(payload.project_id, Some(ProjectId(3)));
        assert_eq!(payload.parent_id, None);
    }
}
