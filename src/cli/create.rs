use clap::Parser;
use reqtrack::{NewRequirement, Status};
use tracing::instrument;

use super::{terminal::Colorize, Context};

#[derive(Debug, Parser)]
#[command(about = "Create a new requirement")]
pub struct Create {
    /// The requirement statement
    text: String,

    /// Why the requirement exists
    #[arg(long, default_value = "")]
    rationale: String,

    /// Requirement type (e.g. Functional, Performance, Interface)
    #[arg(long = "type", value_name = "TYPE")]
    requirement_type: Option<String>,

    /// Owning discipline
    #[arg(long)]
    discipline: Option<String>,

    /// Initial status (draft, review, approved, rejected)
    #[arg(long)]
    status: Option<Status>,

    /// Identifier of the parent requirement
    #[arg(long)]
    parent: Option<String>,

    /// Primary subsystem code
    #[arg(long)]
    subsystem: Option<String>,

    /// Additional subsystem codes (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "CODE")]
    subsystems: Vec<String>,

    /// Mark as an informational node
    #[arg(long)]
    info: bool,

    /// Verification methods (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "METHOD")]
    verification: Vec<String>,

    /// Estimated effort
    #[arg(long)]
    effort: Option<f64>,

    /// Planned delivery phase
    #[arg(long)]
    quarter: Option<String>,

    /// Source specification clause
    #[arg(long, default_value = "")]
    clause: String,

    /// Cited standards (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "STANDARD")]
    standards: Vec<String>,

    /// Cited documents (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "DOCUMENT")]
    documents: Vec<String>,

    /// Preferred identifier, kept if it is not already in use
    #[arg(long)]
    id: Option<String>,
}

impl Create {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let mut session = context.open();
        let project = context.project(&session)?;

        if let Some(parent) = self.parent.as_deref() {
            if !session.state().contains_id(project, parent) {
                anyhow::bail!("Parent requirement {parent} not found");
            }
        }

        let payload = NewRequirement {
            id: self.id,
            rationale: self.rationale,
            discipline: self.discipline,
            status: self.status,
            parent_id: self.parent,
            is_info: self.info,
            requirement_type: self.requirement_type,
            verification_method: self.verification,
            effort: self.effort,
            target_quarter: self.quarter,
            subsystem_code: self.subsystem,
            subsystem_codes: self.subsystems,
            spec_clause: self.clause,
            standards: self.standards,
            documents: self.documents,
            ..NewRequirement::new(project, self.text)
        };

        let Some(requirement) = session.create_requirement(payload) else {
            anyhow::bail!("Requirement text must not be empty");
        };
        println!(
            "Created {} {}",
            requirement.id.success(),
            format!("({})", requirement.global_id).dim()
        );
        if let Some(parent) = requirement.parent_id.as_deref() {
            println!("  Parent: {parent}");
        }

        super::save(&mut session)
    }
}
