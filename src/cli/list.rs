use clap::{Parser, ValueEnum};
use reqtrack::{Requirement, Status};
use serde::Serialize;
use tracing::instrument;

use super::{
    terminal::{is_narrow, terminal_width, truncate, Colorize},
    Context,
};

const DEFAULT_LIMIT: usize = 200;

/// Command arguments for `reqtrack list`.
#[derive(Debug, Parser)]
#[command(about = "List requirements with filters")]
pub struct List {
    /// Filter by status (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "STATUS")]
    status: Vec<Status>,

    /// Filter by requirement type (comma-separated, case-insensitive)
    #[arg(long = "type", value_delimiter = ',', value_name = "TYPE")]
    requirement_type: Vec<String>,

    /// Filter by subsystem code (comma-separated, case-insensitive)
    #[arg(long, value_delimiter = ',', value_name = "CODE")]
    subsystem: Vec<String>,

    /// Show only direct children of this requirement
    #[arg(long, value_name = "ID")]
    children_of: Option<String>,

    /// Show only suspect requirements
    #[arg(long)]
    suspect: bool,

    /// Show only requirements without a parent
    #[arg(long)]
    orphans: bool,

    /// Sort field
    #[arg(long, value_enum, default_value_t)]
    sort: SortField,

    /// Maximum number of rows (0 for no limit)
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    limit: usize,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,

    /// Suppress headers and format rows for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum SortField {
    /// Storage order
    #[default]
    Created,
    /// Display identifier
    Id,
    /// Status in lifecycle order
    Status,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Row<'a> {
    id: &'a str,
    global_id: &'a str,
    status: String,
    requirement_type: &'a str,
    subsystem_code: &'a str,
    parent_id: Option<&'a str>,
    suspect: bool,
    requirement: &'a str,
}

impl<'a> From<&'a Requirement> for Row<'a> {
    fn from(req: &'a Requirement) -> Self {
        Self {
            id: &req.id,
            global_id: &req.global_id,
            status: req.status.to_string(),
            requirement_type: &req.requirement_type,
            subsystem_code: &req.subsystem_code,
            parent_id: req.parent_id.as_deref(),
            suspect: req.suspect,
            requirement: &req.requirement,
        }
    }
}

impl List {
    fn matches(&self, req: &Requirement) -> bool {
        let any_of = |filters: &[String], value: &str| {
            filters.is_empty() || filters.iter().any(|f| f.eq_ignore_ascii_case(value))
        };
        (self.status.is_empty() || self.status.contains(&req.status))
            && any_of(&self.requirement_type, &req.requirement_type)
            && any_of(&self.subsystem, &req.subsystem_code)
            && self
                .children_of
                .as_deref()
                .is_none_or(|parent| req.is_child_of(parent))
            && (!self.suspect || req.suspect)
            && (!self.orphans || req.parent_id.is_none())
    }

    fn select<'a>(&self, requirements: impl Iterator<Item = &'a Requirement>) -> Vec<&'a Requirement> {
        let mut selected: Vec<_> = requirements.filter(|req| self.matches(req)).collect();
        match self.sort {
            SortField::Created => {}
            SortField::Id => selected.sort_by(|a, b| a.id.cmp(&b.id)),
            SortField::Status => selected.sort_by_key(|req| {
                Status::ALL.iter().position(|s| *s == req.status)
            }),
        }
        if self.limit > 0 {
            selected.truncate(self.limit);
        }
        selected
    }

    #[instrument(level = "debug", skip(self))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let session = context.open();
        let project = context.project(&session)?;
        let selected = self.select(session.state().requirements_in(project));

        match self.output {
            OutputFormat::Json => {
                let rows: Vec<Row<'_>> = selected.into_iter().map(Row::from).collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
            OutputFormat::Csv => {
                if !self.quiet {
                    println!("id,globalId,status,type,subsystem,parent,suspect,requirement");
                }
                for req in selected {
                    println!(
                        "{},{},{},{},{},{},{},{}",
                        req.id,
                        req.global_id,
                        req.status,
                        csv_field(&req.requirement_type),
                        req.subsystem_code,
                        req.parent_id.as_deref().unwrap_or_default(),
                        req.suspect,
                        csv_field(&req.requirement)
                    );
                }
            }
            OutputFormat::Table => self.output_table(&selected),
        }
        Ok(())
    }

    fn output_table(&self, selected: &[&Requirement]) {
        if selected.is_empty() {
            if !self.quiet {
                println!("No requirements match.");
            }
            return;
        }

        if is_narrow() {
            for req in selected {
                println!("{} [{}]", req.id, req.status);
                println!("  {}", truncate(&req.requirement, 50));
            }
            return;
        }

        let id_width = selected.iter().map(|r| r.id.len()).max().unwrap_or(0).max(2);
        let used = id_width + 12 + 4;
        let text_width = terminal_width()
            .map_or(80, usize::from)
            .saturating_sub(used)
            .max(20);

        if !self.quiet {
            println!("{:<id_width$}  {:<10}  Requirement", "ID", "Status");
        }
        for req in selected {
            let mut id = format!("{:<id_width$}", req.id);
            if req.suspect {
                id = id.warning();
            }
            println!(
                "{id}  {:<10}  {}",
                req.status.to_string(),
                truncate(&req.requirement, text_width)
            );
        }
        if !self.quiet {
            println!("{}", format!("{} requirements", selected.len()).dim());
        }
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
