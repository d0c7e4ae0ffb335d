use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// File name of the configuration file in a repository root.
pub const CONFIG_FILE: &str = "reqtrack.toml";

/// Which approved-identifier shape promotion produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IdScheme {
    /// `{SYS}-SI-{TYPE}-{BASE}.{DERIVED}`; children share their parent's base.
    #[default]
    Hierarchical,
    /// `{SYS}-{SUBSYSTEM}-{TYPE}-{NNNN}`.
    Flat,
}

/// Errors reading or writing the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read or written.
    #[error("failed to access config file {path}: {source}")]
    Io {
        /// The config file path.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this configuration.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration could not be encoded.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Configuration for a requirements repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Approved-identifier scheme used by promotion.
    pub id_scheme: IdScheme,

    /// Author recorded on versions and comments.
    pub author: String,

    /// State file, relative to the repository root.
    pub state_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id_scheme: IdScheme::default(),
            author: default_author(),
            state_file: default_state_file(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads the configuration from `root`, falling back to the defaults if it
    /// is missing or unreadable.
    #[must_use]
    pub fn load_or_default(root: &Path) -> Self {
        Self::load(&root.join(CONFIG_FILE)).unwrap_or_else(|e| {
            tracing::debug!("Using default config: {e}");
            Self::default()
        })
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The absolute path of the state file under `root`.
    #[must_use]
    pub fn state_path(&self, root: &Path) -> PathBuf {
        root.join(&self.state_file)
    }
}

fn default_author() -> String {
    "local-user".to_string()
}

fn default_state_file() -> PathBuf {
    PathBuf::from("reqtrack.json")
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        id_scheme: IdScheme,

        #[serde(default = "default_author")]
        author: String,

        #[serde(default = "default_state_file")]
        state_file: PathBuf,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                id_scheme,
                author,
                state_file,
            } => Self {
                id_scheme,
                author,
                state_file,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            id_scheme: config.id_scheme,
            author: config.author,
            state_file: config.state_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\nid_scheme = \"flat\"\nauthor = \"alice\"\nstate_file = \"data/state.json\"\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.id_scheme, IdScheme::Flat);
        assert_eq!(config.author, "alice");
        assert_eq!(config.state_file, PathBuf::from("data/state.json"));
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");

        let error = Config::load(&missing).unwrap_err();
        assert!(matches!(error, ConfigError::Io { .. }));
        assert_eq!(Config::load_or_default(tmp.path()), Config::default());
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\nid_scheme = \"spiral\"\n")
            .unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn empty_file_returns_default() {
        let expected = Config::default();
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, expected);
        assert_eq!(actual.id_scheme, IdScheme::Hierarchical);
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        let config = Config {
            id_scheme: IdScheme::Flat,
            author: "bob".to_string(),
            ..Config::default()
        };

        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
        assert_eq!(Config::load_or_default(tmp.path()), config);
    }
}
