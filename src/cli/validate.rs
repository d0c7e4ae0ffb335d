use std::process;

use clap::Parser;
use reqtrack::engine::{hierarchy, HierarchyReport};
use serde_json::json;
use tracing::instrument;

use super::{terminal::Colorize, Context};

#[derive(Debug, Parser)]
#[command(about = "Check project hierarchies for cycles, dangling parents and duplicate identifiers")]
pub struct Validate {
    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress all output except errors
    #[arg(long, short)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Validate {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let session = context.open();
        let state = session.state();

        let reports: Vec<(&str, HierarchyReport)> = state
            .projects
            .iter()
            .filter(|project| context.project.is_none_or(|id| id == project.id))
            .map(|project| (project.name.as_str(), hierarchy::report(state, project.id)))
            .collect();
        let clean = reports.iter().all(|(_, report)| report.is_clean());

        match self.output {
            OutputFormat::Json => {
                let output: Vec<_> = reports
                    .iter()
                    .map(|(name, report)| {
                        json!({
                            "project": name,
                            "cycles": report.cycles,
                            "dangling": report.dangling,
                            "duplicates": report.duplicates,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table if !self.quiet => {
                for (name, report) in &reports {
                    Self::output_table(name, report);
                }
            }
            OutputFormat::Table => {}
        }

        if !clean {
            process::exit(1);
        }
        Ok(())
    }

    fn output_table(name: &str, report: &HierarchyReport) {
        if report.is_clean() {
            println!("{}: {}", name.info(), "no issues ✅".success());
            return;
        }
        println!("{}", name.info());
        for cycle in &report.cycles {
            println!("  {} {}", "cycle:".error(), cycle.join(" -> "));
        }
        for (child, parent) in &report.dangling {
            println!("  {} {child} -> {parent}", "missing parent:".warning());
        }
        for id in &report.duplicates {
            println!("  {} {id}", "duplicate identifier:".error());
        }
    }
}
