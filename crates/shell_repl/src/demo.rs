//! Demo commands: a pretend forum with sign-in, topics, replies, and a scratch message store.

use serde_json::Value;
use shell_engine::{
    display_value, Command, CommandHandler, CommandOption, CommandOptions, HandlerCatalog, Shell,
    ShellError, ShellHandle, ValidationOutcome, Validator,
};

const RECENT_TOPIC: &str = "recent_topic";
const STORED_MESSAGE: &str = "message";
const DEMO_USER: &str = "charlie";
const DEMO_PASSWORD: &str = "password123";

/// Registers every demo command.
pub fn register(shell: &Shell) -> Result<(), ShellError> {
    shell.register(echo()?);
    shell.register(login());
    shell.register(topic());
    shell.register(reply());
    shell.register(memstore());
    Ok(())
}

/// Handlers that command manifests may name.
pub fn catalog() -> HandlerCatalog {
    let mut catalog = HandlerCatalog::new();
    catalog
        .insert("echo", CommandHandler::sync(run_echo))
        .insert("memstore", CommandHandler::sync(run_memstore));
    catalog
}

fn echo() -> Result<Command, ShellError> {
    let positive = Validator::pattern(r"^[1-9]\d*$")
        .map_err(|err| ShellError::config(format!("invalid echo pattern: {err}")))?;
    Ok(Command::sync("echo", run_echo)
        .description("Displays the supplied text for a specified number of times.")
        .usage("<message> [-i <count>]")
        .option(
            CommandOption::new("message")
                .positional()
                .required()
                .description("The message to be displayed."),
        )
        .option(
            CommandOption::new("iterations")
                .alias("i")
                .default_value(1)
                .validate(positive)
                .description("The number of times to display the message."),
        ))
}

fn run_echo(shell: &ShellHandle, options: CommandOptions) -> Result<(), ShellError> {
    let message = options.get_text("message").unwrap_or_default();
    for _ in 0..options.get_u64("iterations").unwrap_or(1) {
        shell.log(message.clone());
    }
    Ok(())
}

fn login() -> Command {
    Command::sync("login", |shell, options| {
        shell.log(format!(
            "Welcome back {}!",
            options.get_text("username").unwrap_or_default()
        ));
        Ok(())
    })
    .description("Allows the user to sign in with their username and password.")
    .usage("[username] [password]")
    .option(
        CommandOption::new("username")
            .positional()
            .required()
            .prompt_message("Please enter your username.")
            .hidden(),
    )
    .option(
        CommandOption::new("password")
            .positional()
            .required()
            .prompt_message("Please enter your password.")
            .validate(Validator::predicate(check_password))
            .password()
            .hidden(),
    )
}

fn check_password(
    value: &Value,
    _shell: &ShellHandle,
    options: &CommandOptions,
) -> Result<ValidationOutcome, ShellError> {
    let known_user = options
        .get_text("username")
        .is_some_and(|username| username.eq_ignore_ascii_case(DEMO_USER));
    Ok(if known_user && value.as_str() == Some(DEMO_PASSWORD) {
        ValidationOutcome::Pass
    } else {
        ValidationOutcome::FailWith("Invalid password.".to_string())
    })
}

fn topic() -> Command {
    Command::sync("topic", |shell, options| {
        let id = options.get_text("id").unwrap_or_default();
        if let Some(reply) = options.get_text("reply") {
            shell.set_var(RECENT_TOPIC, id);
            return post_reply(shell, &reply);
        }
        shell.set_var(RECENT_TOPIC, id.clone());
        shell.set_passive(format!("topic {id}"), Some(format!("topic {id}")));
        shell.log(format!("[topic {id} content]"));
        Ok(())
    })
    .description("Allows you to view a topic on our pretend forum.")
    .usage("<id> [-r <reply>]")
    .option(
        CommandOption::new("id")
            .positional()
            .required()
            .description("The ID of the desired topic."),
    )
    .option(
        CommandOption::new("reply")
            .alias("r")
            .prompt_message("Enter your reply.")
            .description("Reply to the topic."),
    )
}

fn reply() -> Command {
    Command::sync("reply", |shell, options| {
        post_reply(shell, &options.get_text("content").unwrap_or_default())
    })
    .description("Allows you to reply to the most recently viewed topic.")
    .usage("[content]")
    .option(
        CommandOption::new("content")
            .positional()
            .required()
            .prompt_message("Enter your reply.")
            .hidden(),
    )
}

fn post_reply(shell: &ShellHandle, content: &str) -> Result<(), ShellError> {
    let Some(topic) = shell.get_var(RECENT_TOPIC) else {
        return Err(ShellError::handler("View a topic before replying."));
    };
    shell.log(format!("Your reply was posted to topic {}.", display_value(&topic)));
    shell.log(format!("Your reply was: {}", content.replace('\n', "")));
    Ok(())
}

fn memstore() -> Command {
    Command::sync("memstore", run_memstore)
        .description("Stores a message that can be displayed later.")
        .usage("[-m <message>] [-r]")
        .option(
            CommandOption::new("message")
                .alias("m")
                .description("The message to store."),
        )
        .option(
            CommandOption::new("retrieve")
                .alias("r")
                .description("Display the stored message."),
        )
}

fn run_memstore(shell: &ShellHandle, options: CommandOptions) -> Result<(), ShellError> {
    if let Some(message) = options.get("message").filter(|value| !value.is_boolean()) {
        shell.set_var(STORED_MESSAGE, message.clone());
        shell.log("Message saved.");
    } else if options.is_set("retrieve") {
        let stored = shell
            .get_var(STORED_MESSAGE)
            .map(|value| display_value(&value))
            .unwrap_or_else(|| "nothing".to_string());
        shell.log(format!("Your message was: {stored}"));
    } else {
        shell.warn("Nothing to do. Pass -m <message> or -r.");
    }
    Ok(())
}
