//! Sources of migration files.
//!
//! The engine only needs three capabilities from wherever migrations live:
//! check that a directory exists, list the paths matching a glob pattern, and
//! read a file's bytes. [`OsFs`] serves them from disk, [`EmbeddedFs`] from a
//! `rust-embed` archive compiled into the host binary, and [`MemoryFs`] from
//! an in-memory map.
//!
//! Paths are `/`-separated strings. Patterns use `glob` syntax.

use glob::{MatchOptions, Pattern};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::path::Path;

/// Capability set the engine reads migrations through.
pub trait MigrationFs: fmt::Debug + Send + Sync {
    /// Whether `path` exists as a directory.
    fn exists(&self, path: &str) -> io::Result<bool>;

    /// Files matching `pattern`, sorted by path.
    fn list(&self, pattern: &str) -> io::Result<Vec<String>>;

    /// Full contents of the file at `path`.
    fn read_all(&self, path: &str) -> io::Result<Vec<u8>>;
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

fn compile_pattern(pattern: &str) -> io::Result<Pattern> {
    Pattern::new(pattern).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{path}: no such file"))
}

/// Strip `./` and trailing slashes so archive keys and user paths line up.
fn normalize_dir(path: &str) -> &str {
    let path = path.strip_prefix("./").unwrap_or(path);
    path.trim_end_matches('/')
}

fn dir_has_entries<'a>(mut keys: impl Iterator<Item = &'a str>, dir: &str) -> bool {
    let dir = normalize_dir(dir);
    if dir.is_empty() || dir == "." {
        return true;
    }
    keys.any(|key| {
        key.strip_prefix(dir)
            .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Host operating system filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl MigrationFs for OsFs {
    fn exists(&self, path: &str) -> io::Result<bool> {
        match std::fs::metadata(Path::new(path)) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn list(&self, pattern: &str) -> io::Result<Vec<String>> {
        let entries = glob::glob_with(pattern, match_options())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(glob::GlobError::into_error)?;
            if !path.is_file() {
                continue;
            }
            match path.to_str() {
                Some(p) => paths.push(p.to_string()),
                None => log::warn!("Skipping non UTF-8 path {}", path.display()),
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn read_all(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(Path::new(path))
    }
}

/// Migrations compiled into the binary with `rust-embed`.
///
/// ```rust,ignore
/// #[derive(rust_embed::RustEmbed)]
/// #[folder = "db/"]
/// struct Assets;
///
/// let options = MigrateOptions::default().with_filesystem(EmbeddedFs::<Assets>::new());
/// ```
///
/// Paths are relative to the embedded folder, so with `#[folder = "db/"]`
/// the default `migrations` directory maps to `db/migrations`.
pub struct EmbeddedFs<E> {
    _assets: PhantomData<fn() -> E>,
}

impl<E> EmbeddedFs<E> {
    pub fn new() -> Self {
        Self {
            _assets: PhantomData,
        }
    }
}

impl<E> Default for EmbeddedFs<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EmbeddedFs<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedFs")
            .field("assets", &std::any::type_name::<E>())
            .finish()
    }
}

impl<E: rust_embed::RustEmbed> MigrationFs for EmbeddedFs<E> {
    fn exists(&self, path: &str) -> io::Result<bool> {
        let names: Vec<Cow<'static, str>> = E::iter().collect();
        Ok(dir_has_entries(names.iter().map(|n| n.as_ref()), path))
    }

    fn list(&self, pattern: &str) -> io::Result<Vec<String>> {
        let pattern = compile_pattern(pattern.strip_prefix("./").unwrap_or(pattern))?;
        let mut paths: Vec<String> = E::iter()
            .filter(|name| pattern.matches_with(name, match_options()))
            .map(Cow::into_owned)
            .collect();
        paths.sort();
        Ok(paths)
    }

    fn read_all(&self, path: &str) -> io::Result<Vec<u8>> {
        let key = path.strip_prefix("./").unwrap_or(path);
        E::get(key)
            .map(|file| file.data.into_owned())
            .ok_or_else(|| not_found(path))
    }
}

/// In-memory migration files keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: BTreeMap<String, Vec<u8>>,
    dirs: Vec<String>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a file.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        let path = path.into();
        let key = path.strip_prefix("./").unwrap_or(&path).to_string();
        self.files.insert(key, content.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    /// Register a directory that exists even when it holds no files.
    pub fn with_dir(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.dirs.push(normalize_dir(&path).to_string());
        self
    }

    /// Remove a file, returning its previous contents.
    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(path.strip_prefix("./").unwrap_or(path))
    }
}

impl MigrationFs for MemoryFs {
    fn exists(&self, path: &str) -> io::Result<bool> {
        if self.dirs.iter().any(|d| d == normalize_dir(path)) {
            return Ok(true);
        }
        Ok(dir_has_entries(
            self.files.keys().map(String::as_str),
            path,
        ))
    }

    fn list(&self, pattern: &str) -> io::Result<Vec<String>> {
        let pattern = compile_pattern(pattern.strip_prefix("./").unwrap_or(pattern))?;
        Ok(self
            .files
            .keys()
            .filter(|name| pattern.matches_with(name, match_options()))
            .cloned()
            .collect())
    }

    fn read_all(&self, path: &str) -> io::Result<Vec<u8>> {
        self.files
            .get(path.strip_prefix("./").unwrap_or(path))
            .cloned()
            .ok_or_else(|| not_found(path))
    }
}

#[cfg(test)]
#[path = "filesystem_test.rs"]
mod tests;
