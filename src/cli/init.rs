use reqtrack::{domain::CONFIG_FILE, Config};
use tracing::instrument;

use super::Context;

#[derive(Debug, clap::Parser)]
pub struct Init {
    /// Identifier scheme for approved requirements
    #[arg(long, value_enum, default_value_t)]
    scheme: reqtrack::domain::IdScheme,

    /// Author recorded against edits and comments
    #[arg(long)]
    author: Option<String>,
}

impl Init {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let config_path = context.root().join(CONFIG_FILE);
        if config_path.exists() {
            anyhow::bail!(
                "Repository already initialized (found existing {})",
                config_path.display()
            );
        }

        std::fs::create_dir_all(context.root())
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", context.root().display()))?;

        let mut config = Config {
            id_scheme: self.scheme,
            ..Config::default()
        };
        if let Some(author) = self.author.filter(|a| !a.trim().is_empty()) {
            config.author = author;
        }
        config
            .save(&config_path)
            .map_err(|e| anyhow::anyhow!("Failed to create {CONFIG_FILE}: {e}"))?;

        let mut session = context.open();
        session.save()?;

        println!(
            "Initialized requirements tracker in {}",
            context.root().display()
        );
        println!("  Created: {CONFIG_FILE}");
        println!("  Created: {}", config.state_file.display());
        Ok(())
    }
}
