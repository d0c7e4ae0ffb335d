use clap::Parser;
use reqtrack::ProjectId;
use tracing::instrument;

use super::{terminal::Colorize, Context};

#[derive(Debug, Parser)]
pub enum Project {
    /// List projects
    List,

    /// Create a project
    Add {
        /// Project name
        name: String,

        /// Three letter system code used in approved identifiers
        #[arg(long, default_value = "SYS")]
        code: String,
    },

    /// Delete a project with its requirements, baselines and memberships
    Remove {
        /// Project number
        id: u64,
    },
}

impl Project {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let mut session = context.open();
        match self {
            Self::List => {
                for project in &session.state().projects {
                    let count = session.state().requirements_in(project.id).count();
                    println!(
                        "{:>4}  {:<4} {} {}",
                        project.id,
                        project.system_code,
                        project.name,
                        format!("({count} requirements)").dim()
                    );
                }
                return Ok(());
            }
            Self::Add { name, code } => {
                if name.trim().is_empty() {
                    anyhow::bail!("Project name must not be empty");
                }
                let id = session.create_project(name.trim(), &code);
                println!("Created project {}", id.to_string().success());
            }
            Self::Remove { id } => {
                if !session.delete_project(ProjectId(id)) {
                    anyhow::bail!("project {id} not found");
                }
                println!("Deleted project {}", id.to_string().warning());
            }
        }
        super::save(&mut session)
    }
}
