use std::collections::BTreeSet;

use clap::Parser;
use tracing::instrument;

use super::{terminal::Colorize, Context};

#[derive(Debug, Parser)]
#[command(about = "Replace a requirement's design and test trace links")]
pub struct Trace {
    /// Identifier of the requirement
    id: String,

    /// Design artifacts (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "ARTIFACT")]
    design: Vec<String>,

    /// Test cases (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "TEST")]
    tests: Vec<String>,
}

fn artifacts(values: Vec<String>) -> BTreeSet<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

impl Trace {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let mut session = context.open();
        let project = context.project(&session)?;

        let design = artifacts(self.design);
        let tests = artifacts(self.tests);
        let (design_count, test_count) = (design.len(), tests.len());
        session.set_trace_links(project, &self.id, design, tests)?;

        println!(
            "Linked {} to {design_count} design and {test_count} test artifacts",
            self.id.success()
        );
        super::save(&mut session)
    }
}
