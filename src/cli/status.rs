use clap::Parser;
use reqtrack::{Project, State, Status as Lifecycle};
use serde::Serialize;
use tracing::instrument;

use super::{
    terminal::{is_narrow, Colorize},
    Context,
};

#[derive(Debug, Parser, Default)]
#[command(about = "Show requirement counts, suspect totals and baselines per project")]
pub struct Status {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Counts for one project.
#[derive(Debug, Serialize)]
struct Summary {
    id: u64,
    name: String,
    system_code: String,
    by_status: Vec<(String, usize)>,
    total: usize,
    suspect: usize,
    tests_suspect: usize,
    baselines: usize,
}

impl Summary {
    fn of(state: &State, project: &Project) -> Self {
        let requirements: Vec<_> = state.requirements_in(project.id).collect();
        let by_status = Lifecycle::ALL
            .iter()
            .map(|status| {
                let count = requirements.iter().filter(|r| r.status == *status).count();
                (status.to_string(), count)
            })
            .collect();
        Self {
            id: project.id.0,
            name: project.name.clone(),
            system_code: project.system_code.clone(),
            by_status,
            total: requirements.len(),
            suspect: requirements.iter().filter(|r| r.suspect).count(),
            tests_suspect: requirements.iter().filter(|r| r.links.tests_suspect).count(),
            baselines: state.baselines_in(project.id).count(),
        }
    }
}

impl Status {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let session = context.open();
        let state = session.state();

        let summaries: Vec<Summary> = state
            .projects
            .iter()
            .filter(|project| context.project.is_none_or(|id| id == project.id))
            .map(|project| Summary::of(state, project))
            .collect();

        match self.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
            OutputFormat::Table if self.quiet => {
                for summary in &summaries {
                    println!(
                        "project={} total={} suspect={} tests_suspect={} baselines={}",
                        summary.id,
                        summary.total,
                        summary.suspect,
                        summary.tests_suspect,
                        summary.baselines
                    );
                }
            }
            OutputFormat::Table => Self::output_table(&summaries),
        }
        Ok(())
    }

    fn output_table(summaries: &[Summary]) {
        if summaries.is_empty() {
            println!("No projects found. Create one with 'reqtrack project add'.");
            return;
        }
        let narrow = is_narrow();

        for summary in summaries {
            println!(
                "{} {}",
                summary.name.info(),
                format!("(#{}, {})", summary.id, summary.system_code).dim()
            );
            println!("{}", "──────────────────".dim());

            if narrow {
                for (status, count) in &summary.by_status {
                    println!("{status}: {count}");
                }
            } else {
                for (status, count) in &summary.by_status {
                    println!("{status:<10} {count:>5}");
                }
            }
            println!("{:<10} {:>5}", "Total", summary.total);

            if summary.suspect == 0 {
                println!("Suspect requirements: {}", "0".success());
            } else {
                println!(
                    "Suspect requirements: {}",
                    summary.suspect.to_string().warning()
                );
            }
            if summary.tests_suspect == 0 {
                println!("Suspect test links:   {}", "0".success());
            } else {
                println!(
                    "Suspect test links:   {}",
                    summary.tests_suspect.to_string().warning()
                );
            }
            println!("Baselines:            {}", summary.baselines);
            println!();
        }

        if summaries.iter().any(|s| s.suspect > 0) {
            println!(
                "{}",
                "Review suspect requirements and clear them with 'reqtrack ack'.".dim()
            );
        }
    }
}
