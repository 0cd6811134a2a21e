//! Handle given to command handlers for output, session state, and nested execution.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use futures::future::LocalBoxFuture;
use serde_json::Value;
use shell_contract::{
    CommandOptions, ExecutionContext, LineKind, LineOptions, OutputLine, OutputSink,
    PassiveContext, PromptState, ShellError, TerminalSignal,
};

use crate::{command::Command, dispatch, settings::ShellSettings, OptionHook, Shell};

/// Routing fields of the context, captured so a failed handler can be rolled back.
pub(crate) type RoutingSnapshot = (Option<PromptState>, Option<PassiveContext>);

struct Session {
    context: ExecutionContext,
    sink: Rc<RefCell<dyn OutputSink>>,
    raised: Option<ShellError>,
    command: Option<String>,
    invoked: bool,
}

/// What one call left behind once its session is closed.
pub(crate) struct SessionSummary {
    pub(crate) context: ExecutionContext,
    pub(crate) raised: Option<ShellError>,
    pub(crate) command: Option<String>,
    pub(crate) invoked: bool,
}

/// Shell handle for one `execute` call.
///
/// Clones share the call's context and output sink, so asynchronous handlers can keep a handle
/// across `.await` points. The context is handed back to the host when the call completes.
#[derive(Clone)]
pub struct ShellHandle {
    shell: Shell,
    session: Rc<RefCell<Session>>,
}

impl ShellHandle {
    pub(crate) fn open(
        shell: Shell,
        context: ExecutionContext,
        sink: Rc<RefCell<dyn OutputSink>>,
    ) -> Self {
        Self {
            shell,
            session: Rc::new(RefCell::new(Session {
                context,
                sink,
                raised: None,
                command: None,
                invoked: false,
            })),
        }
    }

    pub(crate) fn close(&self) -> SessionSummary {
        let mut session = self.session.borrow_mut();
        SessionSummary {
            context: std::mem::take(&mut session.context),
            raised: session.raised.take(),
            command: session.command.take(),
            invoked: session.invoked,
        }
    }

    /// Emits a log line.
    pub fn log(&self, text: impl Into<String>) {
        self.emit(OutputLine::new(LineKind::Log, text));
    }

    /// Emits a log line with rendering hints.
    pub fn log_with(&self, text: impl Into<String>, options: LineOptions) {
        self.emit(OutputLine::new(LineKind::Log, text).with_options(options));
    }

    /// Emits a warning line.
    pub fn warn(&self, text: impl Into<String>) {
        self.emit(OutputLine::new(LineKind::Warn, text));
    }

    /// Emits a warning line with rendering hints.
    pub fn warn_with(&self, text: impl Into<String>, options: LineOptions) {
        self.emit(OutputLine::new(LineKind::Warn, text).with_options(options));
    }

    /// Emits an error line.
    pub fn error(&self, text: impl Into<String>) {
        self.emit(OutputLine::new(LineKind::Error, text));
    }

    /// Emits an error line with rendering hints.
    pub fn error_with(&self, text: impl Into<String>, options: LineOptions) {
        self.emit(OutputLine::new(LineKind::Error, text).with_options(options));
    }

    /// Emits a debug line.
    pub fn debug(&self, text: impl Into<String>) {
        self.emit(OutputLine::new(LineKind::Debug, text));
    }

    /// Emits a debug line with rendering hints.
    pub fn debug_with(&self, text: impl Into<String>, options: LineOptions) {
        self.emit(OutputLine::new(LineKind::Debug, text).with_options(options));
    }

    /// Emits a prepared line.
    pub fn emit(&self, line: OutputLine) {
        let raised = (line.kind == LineKind::Error).then(|| ShellError::handler(line.text.clone()));
        self.deliver(line, raised);
    }

    /// Emits an error line carrying the error's classification.
    pub(crate) fn report(&self, error: ShellError) {
        tracing::debug!(code = ?error.code, message = %error.message, "reporting shell error");
        let line = OutputLine::new(LineKind::Error, error.message.clone());
        self.deliver(line, Some(error));
    }

    fn deliver(&self, line: OutputLine, error: Option<ShellError>) {
        let sink = {
            let mut session = self.session.borrow_mut();
            let sink = Rc::clone(&session.sink);
            if let Some(error) = error {
                if session.raised.is_none() && !sink.borrow().captures_errors() {
                    session.raised = Some(error);
                }
            }
            sink
        };
        sink.borrow_mut().line(line);
    }

    fn signal(&self, signal: TerminalSignal) {
        let sink = Rc::clone(&self.session.borrow().sink);
        sink.borrow_mut().signal(signal);
    }

    /// Asks the host to end the session.
    pub fn exit(&self) {
        self.signal(TerminalSignal::Exit);
    }

    /// Asks the host to clear its display.
    pub fn clear_display(&self) {
        self.signal(TerminalSignal::ClearDisplay);
    }

    /// Asks the host to hide the next line of input.
    pub fn password(&self) {
        self.signal(TerminalSignal::Password);
    }

    /// Asks the host to pre-fill its input line.
    pub fn edit(&self, text: impl Into<String>) {
        self.signal(TerminalSignal::Edit { text: text.into() });
    }

    /// Stores a session variable.
    pub fn set_var(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.session
            .borrow_mut()
            .context
            .vars
            .insert(key.into(), value.into());
    }

    /// Reads a session variable.
    pub fn get_var(&self, key: &str) -> Option<Value> {
        self.session.borrow().context.vars.get(key).cloned()
    }

    /// Removes a session variable.
    pub fn del_var(&self, key: &str) -> Option<Value> {
        self.session.borrow_mut().context.vars.remove(key)
    }

    /// Clears prompt, passive context, and every variable.
    pub fn reset_context(&self) {
        self.session.borrow_mut().context.reset();
    }

    /// Returns a snapshot of the session context.
    pub fn context(&self) -> ExecutionContext {
        self.session.borrow().context.clone()
    }

    /// Returns the pending prompt, if any.
    pub fn prompt(&self) -> Option<PromptState> {
        self.session.borrow().context.prompt.clone()
    }

    /// Returns the active passive context, if any.
    pub fn passive(&self) -> Option<PassiveContext> {
        self.session.borrow().context.passive.clone()
    }

    /// Suspends `command` until the next input line supplies `option`.
    pub fn set_prompt(
        &self,
        option: impl Into<String>,
        command: impl AsRef<str>,
        options: CommandOptions,
        message: Option<String>,
    ) {
        self.session.borrow_mut().context.prompt = Some(PromptState {
            command: command.as_ref().to_lowercase(),
            option: option.into(),
            options,
            message,
        });
    }

    /// Drops the pending prompt.
    pub fn clear_prompt(&self) {
        self.session.borrow_mut().context.prompt = None;
    }

    /// Prefixes later unrecognized input with `command_prefix`.
    ///
    /// The display message defaults to the prefix itself.
    pub fn set_passive(&self, command_prefix: impl Into<String>, message: Option<String>) {
        let command_prefix = command_prefix.into();
        let message = message.unwrap_or_else(|| command_prefix.clone());
        self.session.borrow_mut().context.passive = Some(PassiveContext {
            command_prefix,
            message,
        });
    }

    /// Drops the passive context.
    pub fn clear_passive(&self) {
        self.session.borrow_mut().context.passive = None;
    }

    pub(crate) fn routing(&self) -> RoutingSnapshot {
        let session = self.session.borrow();
        (
            session.context.prompt.clone(),
            session.context.passive.clone(),
        )
    }

    pub(crate) fn restore_routing(&self, (prompt, passive): RoutingSnapshot) {
        let mut session = self.session.borrow_mut();
        session.context.prompt = prompt;
        session.context.passive = passive;
    }

    /// Returns every registered command sorted by name, including hidden and denied ones.
    pub fn commands(&self) -> Vec<Rc<Command>> {
        self.shell.registry().commands()
    }

    /// Looks up a registered command by name without checking access.
    pub fn command(&self, name: &str) -> Option<Rc<Command>> {
        self.shell.registry().get(name)
    }

    /// Returns whether this session may see and invoke `command`.
    pub fn can_access(&self, command: &Command) -> bool {
        match command.access_policy() {
            Some(access) => access.permits(self, command.name()),
            None => self.shell.settings().default_command_access,
        }
    }

    /// Looks up a command the session may invoke. Denied commands look unregistered.
    pub(crate) fn resolve(&self, name: &str) -> Option<Rc<Command>> {
        self.command(name)
            .filter(|command| self.can_access(command))
    }

    /// Shell settings.
    pub fn settings(&self) -> &ShellSettings {
        self.shell.settings()
    }

    pub(crate) fn option_hook(&self) -> Option<OptionHook> {
        self.shell.option_hook.clone()
    }

    /// Runs another command line within this call, sharing its context and output.
    pub fn execute(&self, line: impl Into<String>) -> LocalBoxFuture<'static, ()> {
        self.execute_with(line, BTreeMap::new())
    }

    /// Runs another command line with override options within this call.
    pub fn execute_with(
        &self,
        line: impl Into<String>,
        overrides: BTreeMap<String, Value>,
    ) -> LocalBoxFuture<'static, ()> {
        dispatch::dispatch(self.clone(), line.into(), overrides, dispatch::Origin::Typed)
    }

    pub(crate) fn note_command(&self, name: &str) {
        let mut session = self.session.borrow_mut();
        if session.command.is_none() {
            session.command = Some(name.to_string());
        }
    }

    pub(crate) fn mark_invoked(&self) {
        self.session.borrow_mut().invoked = true;
    }
}
