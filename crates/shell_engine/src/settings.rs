//! Shell settings, read from TOML.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use shell_contract::ShellError;

/// Toggles for the built-in commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultCommands {
    /// Registers `help`.
    pub help: bool,
    /// Registers `clear`.
    pub clear: bool,
    /// Registers `exit`.
    pub exit: bool,
}

impl Default for DefaultCommands {
    fn default() -> Self {
        Self {
            help: true,
            clear: true,
            exit: true,
        }
    }
}

/// Engine-wide settings. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellSettings {
    /// Built-in commands to register.
    pub default_commands: DefaultCommands,
    /// Access decision for commands that declare none.
    pub default_command_access: bool,
    /// Directory of command manifests loaded at startup.
    pub commands_dir: Option<PathBuf>,
    /// Raises host log verbosity.
    pub debug: bool,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            default_commands: DefaultCommands::default(),
            default_command_access: true,
            commands_dir: None,
            debug: false,
        }
    }
}

impl ShellSettings {
    /// Loads settings from a TOML file. Read and parse failures are config errors naming the
    /// file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ShellError> {
        let path = path.as_ref();
        let body = fs::read_to_string(path).map_err(|err| {
            ShellError::config(format!("cannot read {}: {err}", path.display()))
        })?;
        toml::from_str(&body).map_err(|err| {
            ShellError::config(format!("invalid settings in {}: {err}", path.display()))
        })
    }
}
