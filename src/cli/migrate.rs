use std::process;

use clap::Parser;
use reqtrack::{migration, storage::Store};
use tracing::instrument;

use super::{terminal::Colorize, Context};

#[derive(Debug, Parser)]
#[command(about = "Upgrade the state file to the current schema")]
pub struct Migrate {
    /// Report what would change without writing; exits with code 2 if
    /// anything would
    #[arg(long)]
    check: bool,
}

impl Migrate {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let config = context.config();
        let store = context.store(&config);
        let Some(raw) = store.load() else {
            anyhow::bail!("No readable state file at {}", store.path().display());
        };

        let (state, report) = migration::migrate_with_report(raw);

        for (step, changed) in report.iter() {
            let count = if changed == 0 {
                "0".dim()
            } else {
                changed.to_string().warning()
            };
            println!("{:<24} {count}", step.to_string());
        }

        if report.is_empty() {
            println!("{}", "State is up to date.".success());
            return Ok(());
        }

        if self.check {
            println!(
                "{}",
                format!("{} records would change.", report.total()).warning()
            );
            process::exit(2);
        }

        store.save(&state)?;
        println!(
            "{}",
            format!(
                "Migrated {} records in {}",
                report.total(),
                store.path().display()
            )
            .success()
        );
        Ok(())
    }
}
