use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::domain::{identifier, lenient};

/// System code given to projects that have none.
pub const DEFAULT_SYSTEM_CODE: &str = "SYS";

/// Maximum length of a system code.
pub const SYSTEM_CODE_LEN: usize = 3;

/// Numeric project identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ProjectId(pub u64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for ProjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .map(Self)
        .ok_or_else(|| D::Error::custom("expected a numeric project id"))
    }
}

/// A subsystem a project is broken down into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsystem {
    /// Short code, e.g. `RAD`.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub code: String,
    /// Human readable description.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub label: String,
}

impl Subsystem {
    fn new(code: &str, label: &str) -> Self {
        Self {
            code: code.to_string(),
            label: label.to_string(),
        }
    }
}

/// The built-in subsystem catalogue used when a project defines none.
#[must_use]
pub fn default_subsystems() -> Vec<Subsystem> {
    vec![
        Subsystem::new("GEN", "General system requirements (environment, mobility)"),
        Subsystem::new("RAD", "Radiation and X-ray generation (generator, collimator)"),
        Subsystem::new("DET", "Detector group and data acquisition (sensors)"),
        Subsystem::new("SFT", "Software and image analysis (AI, user interface)"),
        Subsystem::new("MKN", "Mechanics and construction (conveyor, chassis, hydraulics)"),
        Subsystem::new("SNG", "Health and safety (radiation safety, emergency stop)"),
        Subsystem::new("OPT", "Optics"),
    ]
}

/// Normalize a user supplied system code.
///
/// Returns `None` if the value has no alphanumeric characters.
#[must_use]
pub fn normalize_system_code(value: &str) -> Option<String> {
    identifier::normalize_code(value, SYSTEM_CODE_LEN)
}

/// A project owning a set of requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Project identifier.
    pub id: ProjectId,
    /// Display name.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub name: String,
    /// Up to three uppercase alphanumeric characters.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub system_code: String,
    /// Subsystems this project is divided into.
    #[serde(default, deserialize_with = "lenient::skip_malformed")]
    pub subsystems: Vec<Subsystem>,
    /// Customer name.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub customer: String,
    /// Free-form start date.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub start_date: String,
    /// Free-form due date.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub due_date: String,
    /// Description.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub description: String,
    /// Fields this version does not know about, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Project {
    /// Create a project with a normalized system code and the default
    /// subsystem catalogue.
    #[must_use]
    pub fn new(id: ProjectId, name: impl Into<String>, system_code: &str) -> Self {
        Self {
            id,
            name: name.into(),
            system_code: normalize_system_code(system_code)
                .unwrap_or_else(|| DEFAULT_SYSTEM_CODE.to_string()),
            subsystems: default_subsystems(),
            customer: String::new(),
            start_date: String::new(),
            due_date: String::new(),
            description: String::new(),
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn project_id_accepts_numeric_strings() {
        let id: ProjectId = serde_json::from_value(json!("7")).unwrap();
        assert_eq!(id, ProjectId(7));
        assert!(serde_json::from_value::<ProjectId>(json!("seven")).is_err());
    }

    #[test]
    fn new_project_normalizes_system_code() {
        let project = Project::new(ProjectId(1), "Scanner", "x-r4y");
        assert_eq!(project.system_code, "XR4");
        assert_eq!(project.subsystems, default_subsystems());

        let fallback = Project::new(ProjectId(2), "Blank", "--");
        assert_eq!(fallback.system_code, DEFAULT_SYSTEM_CODE);
    }

    #[test]
    fn administrative_metadata_survives_round_trip() {
        let project: Project = serde_json::from_value(json!({
            "id": 4,
            "name": "Line scanner",
            "customer": "ACME",
            "systemCode": "LSC",
            "subsystems": [{"code": "RAD", "label": "Radiation"}],
            "owner": "ops",
        }))
        .unwrap();

        assert_eq!(project.customer, "ACME");
        assert_eq!(project.extra["owner"], json!("ops"));
        let encoded = serde_json::to_value(&project).unwrap();
        assert_eq!(encoded["owner"], json!("ops"));
        assert_eq!(encoded["systemCode"], json!("LSC"));
    }
}
