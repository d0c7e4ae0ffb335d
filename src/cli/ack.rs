use clap::Parser;
use tracing::instrument;

use super::{terminal::Colorize, Context};

#[derive(Debug, Parser)]
#[command(about = "Acknowledge that a suspect requirement has been reviewed")]
pub struct Ack {
    /// Identifier of the suspect requirement
    id: String,
}

impl Ack {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let mut session = context.open();
        let project = context.project(&session)?;

        if session.acknowledge_suspect(project, &self.id)? {
            println!("Cleared suspect flag on {}", self.id.success());
        } else {
            println!("{}", format!("{} was not suspect", self.id).dim());
        }
        super::save(&mut session)
    }
}
