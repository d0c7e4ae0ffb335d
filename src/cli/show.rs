use clap::Parser;
use reqtrack::Requirement;
use tracing::instrument;

use super::{terminal::Colorize, Context};

#[derive(Debug, Parser)]
#[command(about = "Display detailed information about a requirement")]
pub struct Show {
    /// Identifier of the requirement to display
    id: String,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,

    /// Include every recorded version
    #[arg(long)]
    history: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

/// Fields of `current` that differ from `previous`, as `(name, before, after)`.
fn changes(previous: &Requirement, current: &Requirement) -> Vec<(&'static str, String, String)> {
    let mut changes = Vec::new();
    let mut compare = |name, before: String, after: String| {
        if before != after {
            changes.push((name, before, after));
        }
    };
    compare("Requirement", previous.requirement.clone(), current.requirement.clone());
    compare("Rationale", previous.rationale.clone(), current.rationale.clone());
    compare("Status", previous.status.to_string(), current.status.to_string());
    compare(
        "Parent",
        previous.parent_id.clone().unwrap_or_default(),
        current.parent_id.clone().unwrap_or_default(),
    );
    compare(
        "Type",
        previous.requirement_type.clone(),
        current.requirement_type.clone(),
    );
    compare("Identifier", previous.id.clone(), current.id.clone());
    changes
}

impl Show {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let session = context.open();
        let project = context.project(&session)?;

        let Some(requirement) = session.state().requirement(project, &self.id) else {
            eprintln!("Requirement {} not found", self.id);
            std::process::exit(1);
        };

        match self.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(requirement)?),
            OutputFormat::Pretty => {
                let children: Vec<&str> = session
                    .state()
                    .requirements_in(project)
                    .filter(|r| r.is_child_of(&requirement.id))
                    .map(|r| r.id.as_str())
                    .collect();
                self.output_pretty(requirement, &children);
            }
        }
        Ok(())
    }

    fn output_pretty(&self, req: &Requirement, children: &[&str]) {
        let suspect = if req.suspect { " ⚠️" } else { "" };
        println!("# {}{suspect}", req.id);
        println!("{}\n", req.requirement);

        println!("{}", "Metadata".dim());
        println!("  Global ID:    {}", req.global_id);
        println!("  Status:       {}", req.status);
        println!("  Type:         {}", req.requirement_type);
        println!("  Discipline:   {}", req.discipline);
        println!("  Subsystem:    {}", req.subsystem_code);
        println!("  Phase:        {}", req.target_quarter);
        println!("  Effort:       {}", req.effort);
        let methods: Vec<&str> = req.verification_method.iter().map(String::as_str).collect();
        println!("  Verification: {}", methods.join(", "));
        if !req.spec_clause.is_empty() {
            println!("  Clause:       {}", req.spec_clause);
        }
        if let Some(created) = req.created_at {
            println!("  Created:      {created}");
        }

        if !req.rationale.is_empty() {
            println!("\n{}", "Rationale".dim());
            println!("  {}", req.rationale);
        }

        if let Some(parent) = req.parent_id.as_deref() {
            println!("\n{}", "Parent".dim());
            println!("  • {parent}");
        }
        if !children.is_empty() {
            println!("\n{}", "Children".dim());
            for child in children {
                println!("  • {child}");
            }
        }

        if !req.links.design.is_empty() || !req.links.tests.is_empty() {
            println!("\n{}", "Trace links".dim());
            for design in &req.links.design {
                println!("  • design: {design}");
            }
            let flag = if req.links.tests_suspect { " ⚠️" } else { "" };
            for test in &req.links.tests {
                println!("  • test:   {test}{flag}");
            }
        }

        let references = req.references.standards.iter().chain(&req.references.documents);
        let references: Vec<&String> = references.collect();
        if !references.is_empty() {
            println!("\n{}", "References".dim());
            for reference in references {
                println!("  • {reference}");
            }
        }

        if !req.comments.is_empty() {
            println!("\n{}", "Comments".dim());
            for comment in &req.comments {
                let when = comment.timestamp.map(|t| t.to_string()).unwrap_or_default();
                println!("  {} {}", comment.author.info(), when.dim());
                println!("    {}", comment.text);
            }
        }

        self.output_history(req);
    }

    fn output_history(&self, req: &Requirement) {
        if req.versions.is_empty() {
            return;
        }
        println!("\n{}", format!("History ({} versions)", req.versions.len()).dim());

        let shown = if self.history { req.versions.len() } else { 1 };
        let mut newer = req;
        for version in req.versions.iter().take(shown) {
            let when = version.timestamp.map(|t| t.to_string()).unwrap_or_default();
            println!("  {} {}", version.author.info(), when.dim());
            let Some(snapshot) = version.snapshot.as_deref() else {
                continue;
            };
            for (field, before, after) in changes(snapshot, newer) {
                println!("    {field}: {} → {}", before.warning(), after.success());
            }
            newer = snapshot;
        }
    }
}
