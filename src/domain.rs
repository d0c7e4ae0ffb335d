//! Domain models for requirements tracking.
//!
//! This module contains the core entity types (requirements, projects,
//! baselines and the state that owns them), the identifier value types, and
//! configuration.

/// Requirement domain model.
pub mod requirement;
pub use requirement::{Comment, Links, NewRequirement, References, Requirement, Status, Version};

/// Project domain model.
pub mod project;
pub use project::{Project, ProjectId, Subsystem};

mod baseline;
pub use baseline::Baseline;

mod state;
pub use state::{State, Unrecognized};

mod config;
pub use config::{Config, ConfigError, IdScheme, CONFIG_FILE};

/// Draft, global and approved identifier types and parsing.
pub mod identifier;
pub use identifier::{ApprovedId, DraftId, GlobalId, IdentifierError, Prefix, TypeCode};

pub mod lenient;
