//! Embeddable command-line shell engine.
//!
//! A [`Shell`] owns a registry of [`Command`]s. Hosts feed it one line of text at a time along
//! with the session's [`ExecutionContext`]; the engine tokenizes the line, binds arguments to the
//! command's declared options, validates them, and invokes the handler. Missing values can be
//! collected over follow-up lines (prompts) and unrecognized input can be routed through a
//! command prefix a handler set earlier (passive context).
//!
//! ```rust
//! use shell_engine::{Command, CommandOption, ExecutionContext, Shell};
//!
//! let shell = Shell::new();
//! shell.register(
//!     Command::sync("greet", |shell, options| {
//!         shell.log(format!("hello {}", options.get_text("name").unwrap_or_default()));
//!         Ok(())
//!     })
//!     .option(CommandOption::new("name").positional().required()),
//! );
//!
//! let mut context = ExecutionContext::new();
//! let response = shell.execute_blocking("greet ada", &mut context);
//! assert_eq!(response.texts(), vec!["hello ada"]);
//! ```

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

use std::{cell::RefCell, collections::BTreeMap, path::Path, rc::Rc};

use futures::executor::block_on;
use serde_json::Value;
use tracing::debug;

mod binder;
pub mod builtins;
mod command;
mod dispatch;
mod handle;
mod loader;
mod registry;
mod schema;
mod settings;
mod validate;

pub use binder::{bind_arguments, parse_value};
pub use command::{
    Access, AccessPredicate, AsyncHandler, Command, CommandHandler, SyncHandler,
};
pub use handle::ShellHandle;
pub use loader::{load_command_manifest, load_command_manifests, HandlerCatalog, LoadError};
pub use registry::CommandRegistry;
pub use schema::{
    CommandOption, DefaultFn, DefaultValue, PredicateFn, PromptMode, ValidationOutcome, Validator,
};
pub use settings::{DefaultCommands, ShellSettings};
pub use shell_contract::{
    display_value, CommandOptions, ExecutionContext, LineKind, LineOptions, OutputLine,
    OutputSink, PassiveContext, PromptState, ShellError, ShellErrorCode, ShellResponse,
    TerminalSignal, CANCEL_KEYWORD,
};
pub use validate::{validate_options, Readiness};

use handle::SessionSummary;

/// Host callback run for each declared option after alias resolution and before the prompt,
/// default, and validation steps. Receives the option key and may rewrite the option bag.
pub type OptionHook = Rc<dyn Fn(&str, &mut CommandOptions, &Command, &ShellHandle)>;

/// Command shell shared by every session of a host.
///
/// Clones share the registry and settings. Session state lives in the [`ExecutionContext`] each
/// call borrows.
#[derive(Clone)]
pub struct Shell {
    registry: CommandRegistry,
    settings: Rc<ShellSettings>,
    option_hook: Option<OptionHook>,
}

impl Default for Shell {
    fn default() -> Self {
        Self::with_settings(ShellSettings::default())
    }
}

impl Shell {
    /// Creates a shell with default settings and the built-in commands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a shell and registers the built-in commands `settings` enables.
    pub fn with_settings(settings: ShellSettings) -> Self {
        let registry = CommandRegistry::new();
        builtins::register_defaults(&registry, &settings.default_commands);
        Self {
            registry,
            settings: Rc::new(settings),
            option_hook: None,
        }
    }

    /// Installs a hook that sees every declared option before it is prompted for, defaulted, or
    /// validated.
    pub fn with_option_hook(
        mut self,
        hook: impl Fn(&str, &mut CommandOptions, &Command, &ShellHandle) + 'static,
    ) -> Self {
        self.option_hook = Some(Rc::new(hook));
        self
    }

    /// Shared command registry.
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Shell settings.
    pub fn settings(&self) -> &ShellSettings {
        &self.settings
    }

    /// Registers a command, replacing any command with the same name.
    pub fn register(&self, command: Command) -> Option<Rc<Command>> {
        self.registry.register(command)
    }

    /// Every registered command sorted by name.
    pub fn commands(&self) -> Vec<Rc<Command>> {
        self.registry.commands()
    }

    /// Loads and registers every manifest in `dir`. Returns how many commands were registered.
    pub fn load_command_dir(&self, dir: &Path, catalog: &HandlerCatalog) -> Result<usize, LoadError> {
        let commands = load_command_manifests(dir, catalog)?;
        let count = commands.len();
        for command in commands {
            self.register(command);
        }
        debug!(dir = %dir.display(), count, "registered command manifests");
        Ok(count)
    }

    /// Loads the manifest directory named in the settings, if any.
    pub fn load_configured_commands(&self, catalog: &HandlerCatalog) -> Result<usize, LoadError> {
        match self.settings.commands_dir.clone() {
            Some(dir) => self.load_command_dir(&dir, catalog),
            None => Ok(0),
        }
    }

    /// Executes one input line and collects everything it emits.
    pub async fn execute(
        &self,
        line: impl Into<String>,
        context: &mut ExecutionContext,
    ) -> ShellResponse {
        self.execute_with(line, context, BTreeMap::new()).await
    }

    /// Executes one input line with override options merged over the parsed arguments.
    pub async fn execute_with(
        &self,
        line: impl Into<String>,
        context: &mut ExecutionContext,
        overrides: BTreeMap<String, Value>,
    ) -> ShellResponse {
        let response = Rc::new(RefCell::new(ShellResponse::default()));
        let sink: Rc<RefCell<dyn OutputSink>> = response.clone();
        let summary = self.run(line.into(), context, overrides, sink).await;
        let mut response = response.take();
        response.command = summary.command;
        response.invoked = summary.invoked;
        response
    }

    /// Executes one input line, streaming output into `sink`.
    ///
    /// When the sink does not capture errors, the first error is also returned.
    pub async fn execute_into(
        &self,
        line: impl Into<String>,
        context: &mut ExecutionContext,
        overrides: BTreeMap<String, Value>,
        sink: Rc<RefCell<dyn OutputSink>>,
    ) -> Result<(), ShellError> {
        let summary = self.run(line.into(), context, overrides, sink).await;
        match summary.raised {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Runs [`Shell::execute`] to completion on the current thread.
    ///
    /// Handlers must not block on a nested executor themselves.
    pub fn execute_blocking(
        &self,
        line: impl Into<String>,
        context: &mut ExecutionContext,
    ) -> ShellResponse {
        block_on(self.execute(line, context))
    }

    async fn run(
        &self,
        line: String,
        context: &mut ExecutionContext,
        overrides: BTreeMap<String, Value>,
        sink: Rc<RefCell<dyn OutputSink>>,
    ) -> SessionSummary {
        let handle = ShellHandle::open(self.clone(), std::mem::take(context), sink);
        dispatch::dispatch(handle.clone(), line, overrides, dispatch::Origin::Typed).await;
        let mut summary = handle.close();
        *context = std::mem::take(&mut summary.context);
        summary
    }
}
