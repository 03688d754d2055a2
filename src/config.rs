use std::{env, path::PathBuf};
use time::Date;

use crate::{
    errors::ConfigError,
    sync::{GitSync, NoopSync, Synchronizer},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum SyncBackend {
    #[default]
    None,
    Git,
}

/// Process configuration, environment-driven. `check()` validates after
/// construction so a partially configured process fails early with the
/// offending variable named.
#[derive(Clone, Debug)]
pub(crate) struct Config {
    /// Directory holding the ledger files, and the sync worktree root.
    pub(crate) root: PathBuf,
    /// Ledger root file, relative to `root`.
    pub(crate) main_file: String,
    pub(crate) currency: String,
    /// Entry file template, relative to `root`, `%Y`/`%M` expanded per date.
    pub(crate) file: String,
    /// Default source account when a transaction does not carry one.
    pub(crate) source_account: String,
    pub(crate) db_dir: PathBuf,
    pub(crate) sync: SyncBackend,
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        let db_dir = env::var("DB_DIR").map(PathBuf::from).unwrap_or_else(|_| {
            dirs::data_dir()
                .map(|dir| dir.join("beanbot"))
                .unwrap_or_else(|| PathBuf::from("/var/lib/beanbot"))
        });

        let sync = match env_or("BEAN_SYNC", "none").as_str() {
            "git" => SyncBackend::Git,
            "none" => SyncBackend::None,
            _ => {
                return Err(ConfigError {
                    name: "BEAN_SYNC",
                    reason: "must be none or git",
                });
            }
        };

        let config = Config {
            root: PathBuf::from(env_or("BEAN_PATH", ".")),
            main_file: env_or("BEAN_MAIN_FILE", "main.bean"),
            currency: env_or("BEAN_CURRENCY", "EUR"),
            file: env_or("BEAN_FILE", "main.bean"),
            source_account: env_or("BEAN_ACCOUNT", ""),
            db_dir,
            sync,
        };
        config.check()?;
        Ok(config)
    }

    pub(crate) fn check(&self) -> Result<(), ConfigError> {
        fn non_empty(name: &'static str, value: &str) -> Result<(), ConfigError> {
            if value.is_empty() {
                Err(ConfigError {
                    name,
                    reason: "value is empty",
                })
            } else {
                Ok(())
            }
        }

        non_empty("BEAN_PATH", self.root.to_str().unwrap_or_default())?;
        non_empty("BEAN_MAIN_FILE", &self.main_file)?;
        non_empty("BEAN_CURRENCY", &self.currency)?;
        non_empty("BEAN_FILE", &self.file)?;
        non_empty("BEAN_ACCOUNT", &self.source_account)?;
        Ok(())
    }

    pub(crate) fn main_path(&self) -> PathBuf {
        self.root.join(&self.main_file)
    }

    /// The entry file for the given date, with `%Y`/`%M` expanded.
    pub(crate) fn entry_file(&self, date: Date) -> String {
        expand_file_template(&self.file, date)
    }

    pub(crate) fn memory_path(&self) -> PathBuf {
        self.db_dir.join("narrations.json")
    }

    pub(crate) fn synchronizer(&self) -> Box<dyn Synchronizer> {
        match self.sync {
            SyncBackend::None => Box::new(NoopSync),
            SyncBackend::Git => Box::new(GitSync::new(&self.root)),
        }
    }
}

pub(crate) fn expand_file_template(template: &str, date: Date) -> String {
    template
        .replace("%Y", &format!("{:04}", date.year()))
        .replace("%M", &format!("{:02}", u8::from(date.month())))
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn config() -> Config {
        Config {
            root: PathBuf::from("/ledger"),
            main_file: "main.bean".to_string(),
            currency: "EUR".to_string(),
            file: "books/%Y/expenses-%M.bean".to_string(),
            source_account: "Assets:Cash".to_string(),
            db_dir: PathBuf::from("/tmp/db"),
            sync: SyncBackend::None,
        }
    }

    #[test]
    fn template_expands_year_and_month() {
        assert_eq!(
            expand_file_template("books/%Y/expenses-%M.bean", date!(2024 - 03 - 01)),
            "books/2024/expenses-03.bean"
        );
        assert_eq!(
            expand_file_template("main.bean", date!(2024 - 03 - 01)),
            "main.bean"
        );
    }

    #[test]
    fn entry_file_uses_the_template() {
        assert_eq!(
            config().entry_file(date!(2025 - 12 - 31)),
            "books/2025/expenses-12.bean"
        );
    }

    #[test]
    fn check_names_the_empty_variable() {
        let mut config = config();
        config.source_account = String::new();

        assert_eq!(
            config.check().unwrap_err(),
            ConfigError {
                name: "BEAN_ACCOUNT",
                reason: "value is empty",
            }
        );
    }

    #[test]
    fn paths_are_rooted() {
        let config = config();

        assert_eq!(config.main_path(), PathBuf::from("/ledger/main.bean"));
        assert_eq!(config.memory_path(), PathBuf::from("/tmp/db/narrations.json"));
    }
}
