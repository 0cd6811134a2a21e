//! Shared shell contracts used by the command engine and its hosts.
//!
//! This crate is intentionally runtime-agnostic. It defines the serializable session context,
//! option bags, output lines, terminal signals, and error payloads exchanged between the
//! dispatcher and whatever transport loop embeds it.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

mod options;

pub use options::{display_value, CommandOptions};

/// Literal input that resolves or rejects a pending prompt instead of naming a command.
pub const CANCEL_KEYWORD: &str = "cancel";

/// Structured shell error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShellErrorCode {
    /// The input line carried no command or could not be tokenized.
    InvalidInput,
    /// The command was not found or is not accessible.
    NotFound,
    /// An option value failed its validator.
    Validation,
    /// A required option was not supplied.
    MissingParameter,
    /// A command handler failed.
    Handler,
    /// Invalid or unreadable configuration.
    Config,
    /// A command manifest or manifest directory could not be loaded.
    Load,
}

/// Error emitted by parsing, validation, lookup, or handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ShellError {
    /// Error category.
    pub code: ShellErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ShellError {
    /// Creates a new shell error.
    pub fn new(code: ShellErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Creates an input-shape error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ShellErrorCode::InvalidInput, message)
    }

    /// Creates an unknown-command error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ShellErrorCode::NotFound, message)
    }

    /// Creates an option validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ShellErrorCode::Validation, message)
    }

    /// Creates a missing-parameter error.
    pub fn missing_parameter(message: impl Into<String>) -> Self {
        Self::new(ShellErrorCode::MissingParameter, message)
    }

    /// Creates a handler failure.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::new(ShellErrorCode::Handler, message)
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ShellErrorCode::Config, message)
    }

    /// Creates a manifest loading error.
    pub fn load(message: impl Into<String>) -> Self {
        Self::new(ShellErrorCode::Load, message)
    }
}

/// Severity tag of one output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineKind {
    /// Regular output.
    Log,
    /// Warning output.
    Warn,
    /// Error output.
    Error,
    /// Diagnostic output.
    Debug,
}

/// Free-form rendering hints attached to a line, such as `dont_type` or `bold`.
pub type LineOptions = Map<String, Value>;

/// One line of command output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputLine {
    /// Severity tag.
    pub kind: LineKind,
    /// Text payload.
    pub text: String,
    /// Rendering hints.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: LineOptions,
}

impl OutputLine {
    /// Creates a line without rendering hints.
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            options: LineOptions::new(),
        }
    }

    /// Attaches rendering hints.
    pub fn with_options(mut self, options: LineOptions) -> Self {
        self.options = options;
        self
    }
}

/// Session-level signal that the host should act on after the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TerminalSignal {
    /// Clear the visible transcript.
    ClearDisplay,
    /// End the session.
    Exit,
    /// Hide the next line of input.
    Password,
    /// Pre-fill the input line.
    Edit {
        /// Text to place into the input line.
        text: String,
    },
}

/// Receiver for everything one `execute` call emits.
pub trait OutputSink {
    /// Appends one output line.
    fn line(&mut self, line: OutputLine);

    /// Records a terminal signal.
    fn signal(&mut self, signal: TerminalSignal);

    /// Whether error lines reach a display. When this is `false` the dispatcher also returns the
    /// first error to its caller.
    fn captures_errors(&self) -> bool {
        true
    }
}

/// Collected result of one `execute` call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShellResponse {
    /// Output lines in emission order.
    pub lines: Vec<OutputLine>,
    /// Whether the host should clear its display.
    pub clear_display: bool,
    /// Whether the host should end the session.
    pub exit: bool,
    /// Whether the next input should be hidden.
    pub password: bool,
    /// Text to pre-fill into the input line.
    pub edit: Option<String>,
    /// Lowercased name of the command this call resolved to, if any.
    pub command: Option<String>,
    /// Whether a command handler ran to successful completion.
    pub invoked: bool,
}

impl ShellResponse {
    /// Returns the lines of one kind.
    pub fn lines_of(&self, kind: LineKind) -> Vec<&OutputLine> {
        self.lines.iter().filter(|line| line.kind == kind).collect()
    }

    /// Returns all line texts in order.
    pub fn texts(&self) -> Vec<&str> {
        self.lines.iter().map(|line| line.text.as_str()).collect()
    }

    /// Returns whether any error line was emitted.
    pub fn has_errors(&self) -> bool {
        self.lines.iter().any(|line| line.kind == LineKind::Error)
    }
}

impl OutputSink for ShellResponse {
    fn line(&mut self, line: OutputLine) {
        self.lines.push(line);
    }

    fn signal(&mut self, signal: TerminalSignal) {
        match signal {
            TerminalSignal::ClearDisplay => self.clear_display = true,
            TerminalSignal::Exit => self.exit = true,
            TerminalSignal::Password => self.password = true,
            TerminalSignal::Edit { text } => self.edit = Some(text),
        }
    }
}

/// A suspended option collection waiting for the next input line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptState {
    /// Lowercased command name to resume.
    pub command: String,
    /// Option key the next input line is bound to.
    pub option: String,
    /// Options collected before the prompt suspended the command.
    pub options: CommandOptions,
    /// Message shown to the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// An implicit command prefix applied to otherwise-unrecognized input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassiveContext {
    /// Command line prepended to unrecognized input.
    pub command_prefix: String,
    /// Message a host may show as its prompt decoration.
    pub message: String,
}

/// Per-session mutable state owned by the host and threaded through every call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Pending prompt, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<PromptState>,
    /// Active passive context, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passive: Option<PassiveContext>,
    /// Command-defined session variables.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, Value>,
}

impl ExecutionContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a prompt is waiting for input.
    pub fn is_prompting(&self) -> bool {
        self.prompt.is_some()
    }

    /// Returns one session variable.
    pub fn var(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// Clears prompt, passive context, and every variable.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
