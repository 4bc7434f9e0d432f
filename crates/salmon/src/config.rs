//! Options for a migration run.
//!
//! [`MigrateOptions`] is a plain value built by the caller. Defaults are
//! documented on each field; nothing is read from process-wide state. Hosts
//! that keep their settings in a file can load the serializable part from
//! YAML with [`MigrateOptions::load`].

use crate::error::{MigrateError, MigrateResult};
use crate::filesystem::{MigrationFs, OsFs};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Options for [`crate::migrate()`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrateOptions {
    /// History table name; also holds the lock row (default `salmon_schema_history`)
    #[serde(default = "default_table_name")]
    pub table_name: String,

    /// Directory searched for migration files (default `migrations`)
    #[serde(default = "default_directory")]
    pub directory: String,

    /// Migration file suffix, without the dot (default `sql`)
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Log each applied migration at info level instead of debug
    #[serde(default)]
    pub verbose: bool,

    /// Source of migration files; `None` reads the host filesystem
    #[serde(skip)]
    pub filesystem: Option<Arc<dyn MigrationFs>>,
}

fn default_table_name() -> String {
    "salmon_schema_history".to_string()
}

fn default_directory() -> String {
    "migrations".to_string()
}

fn default_extension() -> String {
    "sql".to_string()
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            table_name: default_table_name(),
            directory: default_directory(),
            extension: default_extension(),
            verbose: false,
            filesystem: None,
        }
    }
}

impl MigrateOptions {
    /// Load options from a YAML file
    pub fn load(path: &Path) -> MigrateResult<Self> {
        if !path.exists() {
            return Err(MigrateError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| MigrateError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse options from YAML text
    pub fn from_yaml_str(content: &str) -> MigrateResult<Self> {
        let options: MigrateOptions = serde_yaml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    /// Set the history table name
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Set the migration directory
    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Set the migration file suffix
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Toggle info-level logging of applied migrations
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Read migrations from `fs` instead of the host filesystem
    pub fn with_filesystem(mut self, fs: impl MigrationFs + 'static) -> Self {
        self.filesystem = Some(Arc::new(fs));
        self
    }

    /// The filesystem a run reads from.
    pub fn filesystem(&self) -> Arc<dyn MigrationFs> {
        match &self.filesystem {
            Some(fs) => Arc::clone(fs),
            None => Arc::new(OsFs),
        }
    }

    /// Check values that would otherwise surface as confusing SQL errors.
    ///
    /// The table name is spliced into DDL, so it must be a plain identifier,
    /// optionally schema-qualified.
    pub fn validate(&self) -> MigrateResult<()> {
        if !is_qualified_identifier(&self.table_name) {
            return Err(MigrateError::ConfigInvalid {
                message: format!(
                    "table_name '{}' must be a SQL identifier (letters, digits, underscores, optionally schema-qualified)",
                    self.table_name
                ),
            });
        }
        if self.directory.is_empty() {
            return Err(MigrateError::ConfigInvalid {
                message: "directory must not be empty".to_string(),
            });
        }
        if self.extension.is_empty() || self.extension.contains(['.', '/', '*', '?', '[']) {
            return Err(MigrateError::ConfigInvalid {
                message: format!(
                    "extension '{}' must be a bare file suffix such as 'sql'",
                    self.extension
                ),
            });
        }
        Ok(())
    }
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_qualified_identifier(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2 && parts.iter().all(|p| is_identifier(p))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
