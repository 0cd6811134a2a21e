//! Command manifests: TOML files describing commands whose handlers come from a catalog.
//!
//! A manifest names its handler instead of carrying code. Hosts register handler
//! implementations in a [`HandlerCatalog`] and point the loader at a directory:
//!
//! ```toml
//! description = "Displays the supplied text."
//! usage = "<message> [-i <count>]"
//! handler = "echo"
//!
//! [[options]]
//! key = "message"
//! positional = true
//! required = true
//!
//! [[options]]
//! key = "iterations"
//! aliases = ["i"]
//! default = 1
//! validate = '^[1-9]\d*$'
//! ```

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_json::Value;
use shell_contract::ShellError;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    command::{Command, CommandHandler},
    schema::{CommandOption, Validator},
};

const MANIFEST_EXTENSION: &str = "toml";
const FILE_PREFIX: &str = "shellcmd-";

/// Failure to read or interpret command manifests.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The manifest directory is missing or unreadable.
    #[error("failed to read command directory {}: {source}", path.display())]
    ReadDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// A manifest file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    ReadFile {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// A manifest file is not valid TOML or does not match the manifest shape.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// Manifest path.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// An option's `validate` pattern does not compile.
    #[error("invalid pattern for option \"{key}\" in {}: {source}", path.display())]
    Pattern {
        /// Manifest path.
        path: PathBuf,
        /// Option key.
        key: String,
        /// Underlying regex error.
        source: regex::Error,
    },
    /// The manifest names a handler the catalog does not provide.
    #[error("unknown handler \"{handler}\" in {}", path.display())]
    UnknownHandler {
        /// Manifest path.
        path: PathBuf,
        /// Handler name.
        handler: String,
    },
}

impl From<LoadError> for ShellError {
    fn from(err: LoadError) -> Self {
        ShellError::load(err.to_string())
    }
}

/// Named handler implementations that manifests refer to.
#[derive(Clone, Default)]
pub struct HandlerCatalog {
    handlers: BTreeMap<String, CommandHandler>,
}

impl HandlerCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a handler under `name`.
    pub fn insert(&mut self, name: impl Into<String>, handler: CommandHandler) -> &mut Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    /// Looks up a handler.
    pub fn get(&self, name: &str) -> Option<&CommandHandler> {
        self.handlers.get(name)
    }

    /// Handler names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CommandManifest {
    name: Option<String>,
    description: Option<String>,
    usage: Option<String>,
    #[serde(default)]
    hidden: bool,
    access: Option<bool>,
    handler: String,
    #[serde(default)]
    options: Vec<OptionManifest>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OptionManifest {
    key: String,
    description: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    required: bool,
    default: Option<Value>,
    validate: Option<String>,
    prompt: Option<PromptSetting>,
    #[serde(default)]
    password: bool,
    #[serde(default)]
    positional: bool,
    #[serde(default)]
    hidden: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PromptSetting {
    Enabled(bool),
    Message(String),
}

/// Loads every `*.toml` manifest in `dir`, sorted by file name.
///
/// Files that fail to load are logged and skipped. Only a missing or unreadable directory is an
/// error.
pub fn load_command_manifests(
    dir: &Path,
    catalog: &HandlerCatalog,
) -> Result<Vec<Command>, LoadError> {
    let read_dir_error = |source| LoadError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = fs::read_dir(dir)
        .map_err(read_dir_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_dir_error)?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(MANIFEST_EXTENSION)
        })
        .collect::<Vec<_>>();
    paths.sort();

    let mut commands = Vec::with_capacity(paths.len());
    for path in paths {
        match load_command_manifest(&path, catalog) {
            Ok(command) => {
                debug!(command = %command.name(), path = %path.display(), "loaded command manifest");
                commands.push(command);
            }
            Err(err) => warn!(path = %path.display(), error = %err, "skipping command manifest"),
        }
    }
    Ok(commands)
}

/// Loads one manifest file.
pub fn load_command_manifest(path: &Path, catalog: &HandlerCatalog) -> Result<Command, LoadError> {
    let body = fs::read_to_string(path).map_err(|source| LoadError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let manifest: CommandManifest = toml::from_str(&body).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let handler = catalog
        .get(&manifest.handler)
        .cloned()
        .ok_or_else(|| LoadError::UnknownHandler {
            path: path.to_path_buf(),
            handler: manifest.handler.clone(),
        })?;
    let name = manifest.name.unwrap_or_else(|| name_from_path(path));

    let mut command = Command::new(name, handler);
    if let Some(description) = manifest.description {
        command = command.description(description);
    }
    if let Some(usage) = manifest.usage {
        command = command.usage(usage);
    }
    if let Some(access) = manifest.access {
        command = command.access(access);
    }
    if manifest.hidden {
        command = command.hidden();
    }
    for option in manifest.options {
        command = command.option(build_option(path, option)?);
    }
    Ok(command)
}

fn build_option(path: &Path, manifest: OptionManifest) -> Result<CommandOption, LoadError> {
    let mut option = CommandOption::new(manifest.key.clone());
    if let Some(description) = manifest.description {
        option = option.description(description);
    }
    for alias in manifest.aliases {
        option = option.alias(alias);
    }
    if manifest.required {
        option = option.required();
    }
    if let Some(default) = manifest.default {
        option = option.default_value(default);
    }
    if let Some(pattern) = manifest.validate {
        let validator = Validator::pattern(&pattern).map_err(|source| LoadError::Pattern {
            path: path.to_path_buf(),
            key: manifest.key.clone(),
            source,
        })?;
        option = option.validate(validator);
    }
    match manifest.prompt {
        Some(PromptSetting::Enabled(true)) => option = option.prompt(),
        Some(PromptSetting::Message(message)) => option = option.prompt_message(message),
        Some(PromptSetting::Enabled(false)) | None => {}
    }
    if manifest.password {
        option = option.password();
    }
    if manifest.positional {
        option = option.positional();
    }
    if manifest.hidden {
        option = option.hidden();
    }
    Ok(option)
}

fn name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match stem.strip_prefix(FILE_PREFIX) {
        Some(stripped) => stripped.to_string(),
        None => stem,
    }
}
