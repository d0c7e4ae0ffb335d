use clap::Parser;
use tracing::instrument;

use super::{terminal::Colorize, Context};

#[derive(Debug, Parser)]
#[command(about = "Comment on a requirement")]
pub struct Comment {
    /// Identifier of the requirement
    id: String,

    /// The comment text
    text: String,
}

impl Comment {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let mut session = context.open();
        let project = context.project(&session)?;

        session.add_comment(project, &self.id, &self.text)?;
        println!(
            "Commented on {} as {}",
            self.id.success(),
            session.config().author.info()
        );
        super::save(&mut session)
    }
}
