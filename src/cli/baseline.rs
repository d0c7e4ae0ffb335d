use clap::Parser;
use tracing::instrument;

use super::{terminal::Colorize, Context};

#[derive(Debug, Parser)]
#[command(about = "Capture a baseline of every requirement in the project")]
pub struct Baseline {
    /// Baseline name (defaults to "Baseline N")
    name: Option<String>,
}

impl Baseline {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let mut session = context.open();
        let project = context.project(&session)?;

        let baseline = session.capture_baseline(project, self.name.as_deref())?;
        println!(
            "Captured {} {}",
            baseline.name.success(),
            format!("({} requirements)", baseline.requirements.len()).dim()
        );
        super::save(&mut session)
    }
}
