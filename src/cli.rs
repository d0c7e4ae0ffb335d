use std::path::{Path, PathBuf};

mod ack;
mod baseline;
mod comment;
mod create;
mod edit;
mod init;
mod list;
mod migrate;
mod project;
mod show;
mod status;
mod terminal;
mod trace;
mod validate;

use ack::Ack;
use anyhow::Context as _;
use baseline::Baseline;
use clap::ArgAction;
use comment::Comment;
use create::Create;
use edit::Edit;
use init::Init;
use list::List;
use migrate::Migrate;
use project::Project;
use reqtrack::{Config, JsonFileStore, ProjectId, Session};
use show::Show;
use status::Status;
use trace::Trace;
use validate::Validate;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The directory holding `reqtrack.toml` and the state file
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// The project to act on (defaults to the first project)
    #[arg(short, long, global = true)]
    project: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let context = Context {
            root: self.root,
            project: self.project.map(ProjectId),
        };
        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(&context)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show per-project requirement counts (default)
    Status(Status),

    /// Write a default configuration and a seeded state file
    Init(Init),

    /// Create a new requirement
    Create(Create),

    /// Edit a requirement, recording its previous version
    Edit(Edit),

    /// Replace a requirement's design and test trace links
    Trace(Trace),

    /// Comment on a requirement
    Comment(Comment),

    /// Acknowledge a suspect requirement
    Ack(Ack),

    /// Capture a baseline of the project
    Baseline(Baseline),

    /// Show detailed information about a requirement
    Show(Show),

    /// List requirements
    List(List),

    /// Upgrade the state file to the current schema
    Migrate(Migrate),

    /// Check project hierarchies for cycles, dangling parents and duplicate
    /// identifiers
    Validate(Validate),

    /// Manage projects
    #[command(subcommand)]
    Project(Project),
}

impl Command {
    fn run(self, context: &Context) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(context),
            Self::Init(command) => command.run(context),
            Self::Create(command) => command.run(context),
            Self::Edit(command) => command.run(context),
            Self::Trace(command) => command.run(context),
            Self::Comment(command) => command.run(context),
            Self::Ack(command) => command.run(context),
            Self::Baseline(command) => command.run(context),
            Self::Show(command) => command.run(context),
            Self::List(command) => command.run(context),
            Self::Migrate(command) => command.run(context),
            Self::Validate(command) => command.run(context),
            Self::Project(command) => command.run(context),
        }
    }
}

/// Global options every command works from.
#[derive(Debug)]
pub struct Context {
    root: PathBuf,
    project: Option<ProjectId>,
}

impl Context {
    fn root(&self) -> &Path {
        &self.root
    }

    fn config(&self) -> Config {
        Config::load_or_default(&self.root)
    }

    fn store(&self, config: &Config) -> JsonFileStore {
        JsonFileStore::new(config.state_path(&self.root))
    }

    /// Open the state file, migrating it in memory.
    fn open(&self) -> Session<JsonFileStore> {
        let config = self.config();
        let store = self.store(&config);
        Session::open(store, config)
    }

    /// The project named with `--project`, or the first project.
    fn project(&self, session: &Session<JsonFileStore>) -> anyhow::Result<ProjectId> {
        let project = self
            .project
            .or_else(|| session.default_project())
            .context("no projects exist")?;
        if session.state().project(project).is_none() {
            anyhow::bail!("project {project} not found");
        }
        Ok(project)
    }
}

/// Write anything the session could not persist on its own.
fn save(session: &mut Session<JsonFileStore>) -> anyhow::Result<()> {
    if session.has_unsaved_changes() {
        let path = session.store().path().display().to_string();
        session
            .save()
            .with_context(|| format!("failed to write {path}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use reqtrack::{NewRequirement, Status};
    use tempfile::TempDir;

    use super::*;

    fn context(root: &TempDir) -> Context {
        Context {
            root: root.path().to_path_buf(),
            project: None,
        }
    }

    fn run(root: &TempDir, args: &[&str]) -> anyhow::Result<()> {
        let mut argv = vec!["reqtrack"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv)?;
        cli.command
            .unwrap_or_else(|| Command::Status(status::Status::default()))
            .run(&context(root))
    }

    #[test]
    fn init_writes_config_and_seeded_state() {
        let root = TempDir::new().unwrap();
        run(&root, &["init"]).unwrap();

        assert!(root.path().join("reqtrack.toml").exists());
        let session = context(&root).open();
        assert_eq!(session.state().projects.len(), 1);
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let root = TempDir::new().unwrap();
        run(&root, &["init"]).unwrap();
        assert!(run(&root, &["init"]).is_err());
    }

    #[test]
    fn create_and_edit_persist_through_the_state_file() {
        let root = TempDir::new().unwrap();
        run(&root, &["init"]).unwrap();
        run(&root, &["create", "The radar shall detect targets"]).unwrap();
        run(&root, &["create", "Range shall be 10 km", "--parent", "REQ-0001"]).unwrap();
        run(&root, &["edit", "REQ-0001", "--rationale", "Mission need"]).unwrap();
        run(&root, &["edit", "REQ-0001", "--quarter", "Faz2"]).unwrap();

        let session = context(&root).open();
        let project = session.default_project().unwrap();
        let parent = session.state().requirement(project, "REQ-0001").unwrap();
        assert_eq!(parent.rationale, "Mission need");
        assert_eq!(parent.versions.len(), 2);
        let child = session.state().requirement(project, "REQ-0002").unwrap();
        assert!(child.suspect);
    }

    #[test]
    fn approving_prints_a_structured_identifier() {
        let root = TempDir::new().unwrap();
        run(&root, &["init"]).unwrap();
        run(
            &root,
            &["create", "Detect targets", "--type", "Functional", "--status", "approved"],
        )
        .unwrap();

        let session = context(&root).open();
        let ids: Vec<_> = session
            .state()
            .requirements
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["SYS-SI-FN-0001.0001"]);
    }

    #[test]
    fn unknown_requirement_is_an_error() {
        let root = TempDir::new().unwrap();
        run(&root, &["init"]).unwrap();
        assert!(run(&root, &["comment", "REQ-0042", "Hello"]).is_err());
    }

    #[test]
    fn unknown_project_is_an_error() {
        let root = TempDir::new().unwrap();
        run(&root, &["init"]).unwrap();
        let context = Context {
            root: root.path().to_path_buf(),
            project: Some(ProjectId(9)),
        };
        let session = context.open();
        assert!(context.project(&session).is_err());
    }

    #[test]
    fn baseline_and_trace_round_trip() {
        let root = TempDir::new().unwrap();
        run(&root, &["init"]).unwrap();
        {
            let mut session = context(&root).open();
            let project = session.default_project().unwrap();
            let mut payload = NewRequirement::new(project, "Detect targets");
            payload.status = Some(Status::Draft);
            session.create_requirement(payload).unwrap();
            save(&mut session).unwrap();
        }
        run(&root, &["trace", "REQ-0001", "--design", "DD-1,DD-2", "--tests", "TC-9"]).unwrap();
        run(&root, &["baseline", "Release 1"]).unwrap();

        let session = context(&root).open();
        let requirement = &session.state().requirements[0];
        assert_eq!(requirement.links.design.len(), 2);
        assert_eq!(session.state().baselines[0].name, "Release 1");
        assert_eq!(session.state().baselines[0].requirements.len(), 1);
    }
}
