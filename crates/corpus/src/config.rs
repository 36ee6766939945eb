use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use hyperdata::{LanguageCatalog, WalkerOptions};
use serde::Deserialize;

use crate::error::CorpusResult;

/// The name of the config file looked up in the working directory.
pub(crate) const CONFIG: &str = "corpus.toml";

/// Corpus config.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct Config {
    /// The path of the config.
    #[serde(skip)]
    path: PathBuf,

    /// Runtime options.
    pub(crate) runtime: Option<Runtime>,

    /// Archive walker options.
    pub(crate) walker: Option<Walker>,

    /// The language catalog.
    pub(crate) languages: Option<Languages>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct Runtime {
    /// Number of threads to use. If this options isn't set or a value
    /// of "0" is chosen, the maximum number of available threads
    /// is used.
    pub(crate) num_jobs: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct Walker {
    /// Maximum number of entries processed per input.
    pub(crate) max_entries: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Languages {
    /// A CSV catalog (`iso2,iso3,iso3t,name,implemented`) replacing
    /// the built-in one. A relative path is resolved against the
    /// directory of the config file.
    pub(crate) path: Option<PathBuf>,
}

impl Config {
    /// Loads the config from the given path.
    pub(crate) fn from_path<P: AsRef<Path>>(path: P) -> CorpusResult<Self> {
        let content = read_to_string(&path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.path = path.as_ref().into();

        Ok(config)
    }

    /// Loads the given config or, if none is given, the config of the
    /// working directory. Without any config file, the defaults are
    /// used.
    pub(crate) fn discover(path: Option<&Path>) -> CorpusResult<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None if Path::new(CONFIG).is_file() => Self::from_path(CONFIG),
            None => Ok(Self::default()),
        }
    }

    pub(crate) fn num_jobs(&self) -> Option<usize> {
        self.runtime.as_ref().and_then(|runtime| runtime.num_jobs)
    }

    pub(crate) fn walker_options(&self) -> WalkerOptions {
        let mut options = WalkerOptions::default();
        if let Some(max_entries) =
            self.walker.as_ref().and_then(|walker| walker.max_entries)
        {
            options.max_entries = max_entries;
        }

        options
    }

    fn languages_path(&self) -> Option<PathBuf> {
        let path = self.languages.as_ref()?.path.as_ref()?;
        if path.is_relative() {
            if let Some(parent) = self.path.parent() {
                return Some(parent.join(path));
            }
        }

        Some(path.into())
    }

    /// Loads the configured language catalog, if any.
    pub(crate) fn catalog(&self) -> CorpusResult<Option<LanguageCatalog>> {
        match self.languages_path() {
            Some(path) => Ok(Some(LanguageCatalog::from_path(path)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = anyhow::Result<()>;

    #[test]
    fn parse_config() -> TestResult {
        let mut config: Config = toml::from_str(
            "[runtime]\n\
             num-jobs = 4\n\
             [walker]\n\
             max-entries = 10\n\
             [languages]\n\
             path = \"languages.csv\"\n",
        )?;
        config.path = PathBuf::from("/etc/corpus/corpus.toml");

        assert_eq!(config.num_jobs(), Some(4));
        assert_eq!(config.walker_options().max_entries, 10);
        assert_eq!(
            config.languages_path(),
            Some(PathBuf::from("/etc/corpus/languages.csv"))
        );

        Ok(())
    }

    #[test]
    fn default_config() -> TestResult {
        let config: Config = toml::from_str("")?;

        assert_eq!(config.num_jobs(), None);
        assert_eq!(
            config.walker_options(),
            WalkerOptions::default()
        );
        assert!(config.languages_path().is_none());
        assert!(config.catalog()?.is_none());

        Ok(())
    }

    #[test]
    fn reject_unknown_value_types() {
        let result: Result<Config, _> =
            toml::from_str("[runtime]\nnum-jobs = \"many\"\n");
        assert!(result.is_err());
    }
}
