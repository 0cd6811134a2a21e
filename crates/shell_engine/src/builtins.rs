//! Built-in `help`, `clear`, and `exit` commands.

use serde_json::{Map, Value};
use shell_contract::{CommandOptions, LineOptions, ShellError};

use crate::{
    command::Command, registry::CommandRegistry, schema::CommandOption,
    settings::DefaultCommands, ShellHandle,
};

/// Name of the built-in help command. Flags `--help` and `-?` redirect here.
pub const HELP_COMMAND: &str = "help";

/// Rendering hint asking hosts to print a line at once instead of animating it.
pub const DONT_TYPE: &str = "dont_type";

// Listings longer than this are not typed out.
const TYPED_LISTING_LIMIT: usize = 5;
const NAME_GAP: usize = 6;
const OPTION_GAP: usize = 4;

/// Registers the built-in commands enabled in `enabled`.
pub fn register_defaults(registry: &CommandRegistry, enabled: &DefaultCommands) {
    if enabled.help {
        registry.register(help_command());
    }
    if enabled.clear {
        registry.register(clear_command());
    }
    if enabled.exit {
        registry.register(exit_command());
    }
}

/// `help [command]`.
pub fn help_command() -> Command {
    Command::sync(HELP_COMMAND, run_help)
        .description("Displays general help info or info about a specific command.")
        .usage("[command]")
        .option(
            CommandOption::new("command")
                .positional()
                .description("Get more information about a specific command."),
        )
}

/// `clear`: clears the display, the pending prompt, and the passive context.
pub fn clear_command() -> Command {
    Command::sync("clear", |shell, _| {
        shell.clear_display();
        shell.clear_prompt();
        shell.clear_passive();
        Ok(())
    })
    .description("Clears the display.")
}

/// `exit`: asks the host to end the session.
pub fn exit_command() -> Command {
    Command::sync("exit", |shell, _| {
        shell.exit();
        Ok(())
    })
    .description("Exits the shell.")
}

fn dont_type(enabled: bool) -> LineOptions {
    let mut options = Map::new();
    options.insert(DONT_TYPE.to_string(), Value::Bool(enabled));
    options
}

fn run_help(shell: &ShellHandle, options: CommandOptions) -> Result<(), ShellError> {
    match options.get_text("command") {
        None => list_commands(shell),
        Some(name) => describe_command(shell, &name),
    }
    Ok(())
}

fn list_commands(shell: &ShellHandle) {
    let visible = shell
        .commands()
        .into_iter()
        .filter(|command| !command.is_hidden() && shell.can_access(command))
        .collect::<Vec<_>>();
    let width = visible
        .iter()
        .map(|command| command.name().len())
        .max()
        .unwrap_or(0);
    let hint = dont_type(visible.len() > TYPED_LISTING_LIMIT);

    shell.log("");
    for command in &visible {
        let row = match command.help_text() {
            Some(description) => format!(
                "{:<pad$}{description}",
                command.name(),
                pad = width + NAME_GAP
            ),
            None => command.name().to_string(),
        };
        shell.log_with(row, hint.clone());
    }
    shell.log("");
}

fn describe_command(shell: &ShellHandle, name: &str) {
    let Some(command) = shell
        .command(name)
        .filter(|command| shell.can_access(command))
    else {
        shell.error(format!("{name} is not a valid command name."));
        return;
    };

    shell.log("");
    if let Some(description) = command.help_text() {
        shell.log(description);
        shell.log("");
    }
    if let Some(usage) = command.usage_text() {
        shell.log(format!("Usage: \"{} {usage}\"", command.name()));
        shell.log("");
    }

    let rows = command
        .options()
        .iter()
        .filter(|option| !option.is_hidden())
        .map(|option| {
            let flags = std::iter::once(option.key())
                .chain(option.aliases().iter().map(String::as_str))
                .map(flag_name)
                .collect::<Vec<_>>()
                .join(",");
            (flags, option.help_text())
        })
        .collect::<Vec<_>>();
    if rows.is_empty() {
        return;
    }

    let width = rows.iter().map(|(flags, _)| flags.len()).max().unwrap_or(0);
    shell.log("Options:");
    shell.log("");
    for (flags, description) in rows {
        let row = match description {
            Some(description) => format!("{flags:<pad$}{description}", pad = width + OPTION_GAP),
            None => flags,
        };
        shell.log_with(row, dont_type(true));
    }
    shell.log("");
}

fn flag_name(key: &str) -> String {
    if key.chars().count() > 1 {
        format!("--{key}")
    } else {
        format!("-{key}")
    }
}
