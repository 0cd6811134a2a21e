//! Command descriptors and the handler/access types they carry.

use std::{fmt, future::Future, rc::Rc};

use futures::future::{FutureExt, LocalBoxFuture};
use shell_contract::{CommandOptions, ShellError};

use crate::{schema::CommandOption, ShellHandle};

/// Handler that finishes before returning.
pub type SyncHandler = Rc<dyn Fn(&ShellHandle, CommandOptions) -> Result<(), ShellError>>;

/// Handler whose completion is awaited by the dispatcher.
pub type AsyncHandler =
    Rc<dyn Fn(ShellHandle, CommandOptions) -> LocalBoxFuture<'static, Result<(), ShellError>>>;

/// Capability check gating whether a command is visible and invocable.
pub type AccessPredicate = Rc<dyn Fn(&ShellHandle, &str) -> bool>;

/// Invocation style of a command, fixed at registration time.
#[derive(Clone)]
pub enum CommandHandler {
    /// Runs to completion synchronously.
    Sync(SyncHandler),
    /// Returns a future the dispatcher awaits.
    Async(AsyncHandler),
}

impl CommandHandler {
    /// Wraps a synchronous handler.
    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(&ShellHandle, CommandOptions) -> Result<(), ShellError> + 'static,
    {
        Self::Sync(Rc::new(handler))
    }

    /// Wraps an asynchronous handler.
    pub fn asynchronous<F, Fut>(handler: F) -> Self
    where
        F: Fn(ShellHandle, CommandOptions) -> Fut + 'static,
        Fut: Future<Output = Result<(), ShellError>> + 'static,
    {
        Self::Async(Rc::new(move |shell, options| handler(shell, options).boxed_local()))
    }

    /// Returns whether the handler is asynchronous.
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }

    pub(crate) async fn invoke(
        &self,
        shell: &ShellHandle,
        options: CommandOptions,
    ) -> Result<(), ShellError> {
        match self {
            Self::Sync(handler) => handler(shell, options),
            Self::Async(handler) => handler(shell.clone(), options).await,
        }
    }
}

impl fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sync(_) => "Sync(..)",
            Self::Async(_) => "Async(..)",
        })
    }
}

/// Access policy declared by a command.
#[derive(Clone)]
pub enum Access {
    /// Always visible and invocable.
    Allow,
    /// Never visible or invocable.
    Deny,
    /// Decided per call from the shell and the lowercased command name.
    Predicate(AccessPredicate),
}

impl Access {
    /// Wraps an access predicate.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&ShellHandle, &str) -> bool + 'static,
    {
        Self::Predicate(Rc::new(predicate))
    }

    pub(crate) fn permits(&self, shell: &ShellHandle, name: &str) -> bool {
        match self {
            Self::Allow => true,
            Self::Deny => false,
            Self::Predicate(predicate) => predicate(shell, name),
        }
    }
}

impl From<bool> for Access {
    fn from(allowed: bool) -> Self {
        if allowed {
            Self::Allow
        } else {
            Self::Deny
        }
    }
}

impl fmt::Debug for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
            Self::Predicate(_) => "Predicate(..)",
        })
    }
}

/// Static registration record for one invocable command.
#[derive(Debug, Clone)]
pub struct Command {
    name: String,
    description: Option<String>,
    usage: Option<String>,
    options: Vec<CommandOption>,
    access: Option<Access>,
    hidden: bool,
    handler: CommandHandler,
}

impl Command {
    /// Creates a command. The name is stored lowercased.
    pub fn new(name: impl AsRef<str>, handler: CommandHandler) -> Self {
        Self {
            name: name.as_ref().to_lowercase(),
            description: None,
            usage: None,
            options: Vec::new(),
            access: None,
            hidden: false,
            handler,
        }
    }

    /// Creates a command with a synchronous handler.
    pub fn sync<F>(name: impl AsRef<str>, handler: F) -> Self
    where
        F: Fn(&ShellHandle, CommandOptions) -> Result<(), ShellError> + 'static,
    {
        Self::new(name, CommandHandler::sync(handler))
    }

    /// Creates a command with an asynchronous handler.
    pub fn asynchronous<F, Fut>(name: impl AsRef<str>, handler: F) -> Self
    where
        F: Fn(ShellHandle, CommandOptions) -> Fut + 'static,
        Fut: Future<Output = Result<(), ShellError>> + 'static,
    {
        Self::new(name, CommandHandler::asynchronous(handler))
    }

    /// Sets the help description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the usage string shown after the command name.
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Appends one option. Options are validated in the order they are added.
    pub fn option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    /// Declares an access policy.
    pub fn access(mut self, access: impl Into<Access>) -> Self {
        self.access = Some(access.into());
        self
    }

    /// Omits the command from help listings.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Lowercased command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Help description.
    pub fn help_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Usage string.
    pub fn usage_text(&self) -> Option<&str> {
        self.usage.as_deref()
    }

    /// Option rules in declaration order.
    pub fn options(&self) -> &[CommandOption] {
        &self.options
    }

    /// Looks up one option rule by key.
    pub fn find_option(&self, key: &str) -> Option<&CommandOption> {
        self.options.iter().find(|option| option.key() == key)
    }

    /// Declared access policy, if any.
    pub fn access_policy(&self) -> Option<&Access> {
        self.access.as_ref()
    }

    /// Whether the command is omitted from help listings.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Invocation handler.
    pub fn handler(&self) -> &CommandHandler {
        &self.handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_lowercased() {
        let command = Command::sync("Echo", |_, _| Ok(()));
        assert_eq!(command.name(), "echo");
    }

    #[test]
    fn handler_style_is_declared_not_inferred() {
        let sync = Command::sync("a", |_, _| Ok(()));
        let async_command = Command::asynchronous("b", |_, _| async { Ok(()) });
        assert!(!sync.handler().is_async());
        assert!(async_command.handler().is_async());
    }

    #[test]
    fn options_keep_declaration_order() {
        let command = Command::sync("echo", |_, _| Ok(()))
            .option(CommandOption::new("message").positional())
            .option(CommandOption::new("iterations").alias("i"));
        let keys = command
            .options()
            .iter()
            .map(CommandOption::key)
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["message", "iterations"]);
        assert!(command.find_option("iterations").is_some());
        assert!(command.find_option("i").is_none());
    }

    #[test]
    fn boolean_access_converts() {
        assert!(matches!(Access::from(true), Access::Allow));
        assert!(matches!(Access::from(false), Access::Deny));
    }
}
