use clap::Parser;
use reqtrack::{Patch, Status};
use tracing::instrument;

use super::{terminal::Colorize, Context};

#[derive(Debug, Parser)]
#[command(about = "Edit a requirement, recording its previous version")]
pub struct Edit {
    /// Identifier of the requirement to edit
    id: String,

    /// New requirement statement
    #[arg(long)]
    text: Option<String>,

    /// New rationale
    #[arg(long)]
    rationale: Option<String>,

    /// New discipline
    #[arg(long)]
    discipline: Option<String>,

    /// New status (draft, review, approved, rejected)
    #[arg(long)]
    status: Option<Status>,

    /// New parent identifier
    #[arg(long, conflicts_with = "no_parent")]
    parent: Option<String>,

    /// Detach the requirement from its parent
    #[arg(long)]
    no_parent: bool,

    /// Mark or unmark as an informational node
    #[arg(long)]
    info: Option<bool>,

    /// New requirement type
    #[arg(long = "type", value_name = "TYPE")]
    requirement_type: Option<String>,

    /// New verification methods (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "METHOD")]
    verification: Option<Vec<String>>,

    /// New primary subsystem code
    #[arg(long)]
    subsystem: Option<String>,

    /// New additional subsystem codes (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "CODE")]
    subsystems: Option<Vec<String>>,

    /// New delivery phase
    #[arg(long)]
    quarter: Option<String>,

    /// New effort estimate
    #[arg(long)]
    effort: Option<f64>,

    /// New specification clause
    #[arg(long)]
    clause: Option<String>,

    /// New cited standards (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "STANDARD")]
    standards: Option<Vec<String>>,

    /// New cited documents (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "DOCUMENT")]
    documents: Option<Vec<String>>,
}

impl Edit {
    fn patch(self) -> Patch {
        let parent_id = if self.no_parent {
            Some(None)
        } else {
            self.parent.map(Some)
        };
        Patch {
            requirement: self.text,
            rationale: self.rationale,
            discipline: self.discipline,
            status: self.status,
            parent_id,
            is_info: self.info,
            requirement_type: self.requirement_type,
            verification_method: self.verification,
            subsystem_code: self.subsystem,
            subsystem_codes: self.subsystems,
            target_quarter: self.quarter,
            effort: self.effort,
            spec_clause: self.clause,
            standards: self.standards,
            documents: self.documents,
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let mut session = context.open();
        let project = context.project(&session)?;
        let id = self.id.clone();

        let outcome = session.edit_requirement(project, &id, self.patch())?;

        println!(
            "Updated {} {}",
            outcome.id.success(),
            format!("({} versions)", outcome.versions).dim()
        );
        if let Some(promoted) = &outcome.promoted {
            println!("  Promoted: {id} → {}", promoted.info());
        }
        if !outcome.suspect_children.is_empty() {
            println!(
                "  Suspect children: {}",
                outcome.suspect_children.join(", ").warning()
            );
        }

        super::save(&mut session)
    }
}
