//! Per-option validation, defaulting, and prompting rules.

use std::{fmt, rc::Rc};

use regex::Regex;
use serde_json::Value;
use shell_contract::{CommandOptions, ShellError};

use crate::ShellHandle;

/// Computes a default value from the current shell and the options bound so far.
pub type DefaultFn = Rc<dyn Fn(&ShellHandle, &CommandOptions) -> Value>;

/// Validates one option value.
pub type PredicateFn =
    Rc<dyn Fn(&Value, &ShellHandle, &CommandOptions) -> Result<ValidationOutcome, ShellError>>;

/// Result of a predicate validator. Only [`ValidationOutcome::Pass`] lets the command run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The value is acceptable.
    Pass,
    /// The value is rejected with the generic message.
    Fail,
    /// The value is rejected with this message.
    FailWith(String),
}

impl From<bool> for ValidationOutcome {
    fn from(passed: bool) -> Self {
        if passed {
            Self::Pass
        } else {
            Self::Fail
        }
    }
}

/// Default value declared for an option.
#[derive(Clone)]
pub enum DefaultValue {
    /// A fixed value.
    Literal(Value),
    /// A value computed when the default is needed.
    Computed(DefaultFn),
}

impl DefaultValue {
    pub(crate) fn resolve(&self, shell: &ShellHandle, options: &CommandOptions) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Computed(compute) => compute(shell, options),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Validator declared for an option.
#[derive(Clone)]
pub enum Validator {
    /// Matches the value's text form against a regular expression.
    Pattern(Regex),
    /// Calls a function with the value, the shell, and the options bound so far.
    Predicate(PredicateFn),
}

impl Validator {
    /// Compiles a pattern validator.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Pattern)
    }

    /// Wraps a predicate validator.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&Value, &ShellHandle, &CommandOptions) -> Result<ValidationOutcome, ShellError>
            + 'static,
    {
        Self::Predicate(Rc::new(predicate))
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Whether a missing value is collected over a follow-up input line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PromptMode {
    /// Missing values are reported as errors.
    #[default]
    Off,
    /// Prompt with `Enter value for <key>.`.
    Generated,
    /// Prompt with this message.
    Message(String),
}

impl PromptMode {
    /// Returns whether prompting is enabled.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Off)
    }

    /// Returns the text shown when prompting for `key`.
    pub fn message_for(&self, key: &str) -> String {
        match self {
            Self::Message(message) => message.clone(),
            Self::Off | Self::Generated => format!("Enter value for {key}."),
        }
    }
}

/// Rules for one option key of a command.
#[derive(Debug, Clone)]
pub struct CommandOption {
    key: String,
    description: Option<String>,
    aliases: Vec<String>,
    required: bool,
    default: Option<DefaultValue>,
    validate: Option<Validator>,
    prompt: PromptMode,
    password: bool,
    positional: bool,
    hidden: bool,
}

impl CommandOption {
    /// Creates an optional named option without rules.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: None,
            aliases: Vec::new(),
            required: false,
            default: None,
            validate: None,
            prompt: PromptMode::Off,
            password: false,
            positional: false,
            hidden: false,
        }
    }

    /// Sets the help description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an alternate flag name.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Marks the option as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Declares a literal default.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    /// Declares a computed default.
    pub fn default_with<F>(mut self, compute: F) -> Self
    where
        F: Fn(&ShellHandle, &CommandOptions) -> Value + 'static,
    {
        self.default = Some(DefaultValue::Computed(Rc::new(compute)));
        self
    }

    /// Attaches a validator.
    pub fn validate(mut self, validator: Validator) -> Self {
        self.validate = Some(validator);
        self
    }

    /// Enables prompting with the generated message.
    pub fn prompt(mut self) -> Self {
        self.prompt = PromptMode::Generated;
        self
    }

    /// Enables prompting with a custom message.
    pub fn prompt_message(mut self, message: impl Into<String>) -> Self {
        self.prompt = PromptMode::Message(message.into());
        self
    }

    /// Marks the value as secret so prompts switch the host to hidden input.
    pub fn password(mut self) -> Self {
        self.password = true;
        self
    }

    /// Binds the option from bare tokens instead of a named flag.
    pub fn positional(mut self) -> Self {
        self.positional = true;
        self
    }

    /// Omits the option from generated help.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Canonical option key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Help description.
    pub fn help_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Alternate flag names in declaration order.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Whether a value must be present before the command runs.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Declared default.
    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    /// Declared validator.
    pub fn validator(&self) -> Option<&Validator> {
        self.validate.as_ref()
    }

    /// Prompting behavior.
    pub fn prompt_mode(&self) -> &PromptMode {
        &self.prompt
    }

    /// Whether the value is secret.
    pub fn is_password(&self) -> bool {
        self.password
    }

    /// Whether the option consumes bare tokens.
    pub fn is_positional(&self) -> bool {
        self.positional
    }

    /// Whether the option is omitted from help.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }
}
