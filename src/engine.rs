//! The requirement identity and revision engine.
//!
//! Every operation here works synchronously on an explicit [`State`]; there is
//! no ambient model. [`Session`] bundles a state with its store and
//! configuration for hosts that want persistence handled for them.
//!
//! [`State`]: crate::domain::State

mod allocator;
pub use allocator::{
    allocate_draft, allocate_global, create, promote, rename, rename_all, RenameReport,
    STATIC_SEGMENT,
};
pub(crate) use allocator::rename_in;

mod baseline;
pub use baseline::{capture, BaselineError};

/// Parent/child cycle checks and hierarchy reports.
pub mod hierarchy;
pub use hierarchy::HierarchyReport;

mod revision;
pub use revision::{
    acknowledge_suspect, add_comment, edit, set_trace_links, EditError, EditOutcome, Patch,
};

mod session;
pub use session::{RemoteUpdate, Session};
