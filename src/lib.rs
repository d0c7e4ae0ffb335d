//! Engineering Requirements Tracking
//!
//! Requirements move through a lifecycle (draft, in review, approved), form a
//! parent/child hierarchy, carry trace links to design and test artifacts,
//! and keep an edit history. This crate is the engine behind that: it
//! allocates identifiers, promotes maturing requirements to structured
//! approved identifiers, flags dependents as suspect when something upstream
//! changes, captures project baselines, and migrates persisted state of any
//! vintage to the current schema.

pub mod domain;
pub use domain::{Baseline, Config, NewRequirement, Project, ProjectId, Requirement, State, Status};

pub mod engine;
pub use engine::{EditError, EditOutcome, Patch, Session};

/// Upgrading persisted state to the current schema.
pub mod migration;
pub use migration::{migrate, migrate_with_report};

/// Persistence collaborators.
pub mod storage;
pub use storage::{JsonFileStore, MemoryStore, Replicated, Store};
