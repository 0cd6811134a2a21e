//! Per-line dispatch: input checks, cancel, prompt resume, lookup, passive redirection, and
//! handler invocation.

use std::{any::Any, collections::BTreeMap, panic::AssertUnwindSafe, rc::Rc};

use futures::future::{FutureExt, LocalBoxFuture};
use serde_json::Value;
use shell_contract::{CommandOptions, PromptState, ShellError, CANCEL_KEYWORD};
use shell_tokenizer::{is_metacharacter_only, split_line};
use tracing::debug;

use crate::{
    binder::bind_arguments,
    builtins::HELP_COMMAND,
    command::Command,
    validate::{validate_options, Readiness},
    ShellHandle,
};

/// How the line being dispatched was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Typed by the user or passed to a nested `execute`.
    Typed,
    /// Rebuilt from the passive prefix after `typed` failed to resolve.
    Passive { typed: String },
}

pub(crate) fn dispatch(
    shell: ShellHandle,
    line: String,
    overrides: BTreeMap<String, Value>,
    origin: Origin,
) -> LocalBoxFuture<'static, ()> {
    async move { run(shell, line, overrides, origin).await }.boxed_local()
}

async fn run(shell: ShellHandle, line: String, overrides: BTreeMap<String, Value>, origin: Origin) {
    let pending = shell.prompt();

    if pending.is_none() && is_metacharacter_only(&line) {
        shell.report(ShellError::invalid_input("Invalid input."));
        return;
    }

    if line.trim().eq_ignore_ascii_case(CANCEL_KEYWORD) {
        cancel(&shell, pending.is_some());
        return;
    }

    if let Some(prompt) = pending {
        resume(&shell, prompt, line).await;
        return;
    }

    let Some((name, tokens)) = split_line(&line).ok().and_then(|line| line.split_command()) else {
        shell.report(ShellError::invalid_input("Invalid input."));
        return;
    };

    let Some(command) = shell.resolve(&name) else {
        redirect(&shell, name, line, overrides, origin).await;
        return;
    };

    debug!(command = %command.name(), "resolved command");
    shell.note_command(command.name());
    let options = bind_arguments(&tokens, &overrides);

    if wants_help(&shell, &command, &options) {
        debug!(command = %command.name(), "redirecting to help");
        let overrides = BTreeMap::from([("command".to_string(), Value::from(command.name()))]);
        shell.execute_with(HELP_COMMAND, overrides).await;
        return;
    }

    validate_and_invoke(&shell, command, options).await;
}

fn cancel(shell: &ShellHandle, prompting: bool) {
    if prompting {
        debug!("prompt canceled");
        shell.clear_prompt();
        shell.warn("prompt canceled");
    } else {
        shell.report(ShellError::invalid_input("there are no active prompts"));
    }
}

async fn resume(shell: &ShellHandle, prompt: PromptState, line: String) {
    let PromptState {
        command,
        option,
        mut options,
        ..
    } = prompt;
    shell.clear_prompt();
    debug!(command = %command, option = %option, "resuming prompt");

    let Some(resolved) = shell.resolve(&command) else {
        shell.report(not_found(&command));
        return;
    };
    shell.note_command(resolved.name());
    options.insert(option, Value::String(line));
    validate_and_invoke(shell, resolved, options).await;
}

async fn redirect(
    shell: &ShellHandle,
    name: String,
    line: String,
    overrides: BTreeMap<String, Value>,
    origin: Origin,
) {
    match (origin, shell.passive()) {
        (Origin::Typed, Some(passive)) => {
            let redirected = format!("{} {}", passive.command_prefix, line);
            debug!(typed = %name, line = %redirected, "redirecting through passive context");
            dispatch(
                shell.clone(),
                redirected,
                overrides,
                Origin::Passive { typed: name },
            )
            .await;
        }
        (Origin::Typed, None) => shell.report(not_found(&name)),
        (Origin::Passive { typed }, _) => shell.report(not_found(&typed)),
    }
}

fn wants_help(shell: &ShellHandle, command: &Command, options: &CommandOptions) -> bool {
    command.name() != HELP_COMMAND
        && (options.contains("help") || options.contains("?"))
        && shell.resolve(HELP_COMMAND).is_some()
}

async fn validate_and_invoke(shell: &ShellHandle, command: Rc<Command>, options: CommandOptions) {
    let options = match validate_options(&command, options, shell) {
        Readiness::Ready(options) => options,
        Readiness::Suspended | Readiness::Rejected => return,
    };

    let routing = shell.routing();
    let outcome = AssertUnwindSafe(command.handler().invoke(shell, options))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| {
            let message = panic_message(&*payload)
                .unwrap_or_else(|| format!("command \"{}\" failed", command.name()));
            Err(ShellError::handler(message))
        });
    match outcome {
        Ok(()) => shell.mark_invoked(),
        Err(error) => {
            debug!(command = %command.name(), error = %error, "handler failed");
            shell.restore_routing(routing);
            shell.report(error);
        }
    }
}

/// Text carried by a panic payload, when it is a string.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
}

fn not_found(name: &str) -> ShellError {
    ShellError::not_found(format!("\"{name}\" is not a valid command."))
}
