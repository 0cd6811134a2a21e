use std::{cell::Cell, rc::Rc};

use pretty_assertions::assert_eq;
use serde_json::json;
use shell_engine::{
    Access, Command, CommandOption, ExecutionContext, LineKind, ShellError, ShellHandle,
    ShellResponse, Shell, ValidationOutcome, Validator,
};

fn run(shell: &Shell, context: &mut ExecutionContext, line: &str) -> ShellResponse {
    shell.execute_blocking(line, context)
}

fn counter() -> Rc<Cell<usize>> {
    Rc::new(Cell::new(0))
}

fn echo(calls: Rc<Cell<usize>>) -> Command {
    Command::sync("echo", move |shell, options| {
        calls.set(calls.get() + 1);
        let message = options.get_text("message").unwrap_or_default();
        for _ in 0..options.get_u64("iterations").unwrap_or(1) {
            shell.log(message.clone());
        }
        Ok(())
    })
    .description("Displays the supplied text for a specified number of times.")
    .option(CommandOption::new("message").positional().required())
    .option(
        CommandOption::new("iterations")
            .alias("i")
            .default_value(1)
            .validate(Validator::pattern(r"^[1-9]\d*$").expect("pattern")),
    )
}

fn login(calls: Rc<Cell<usize>>) -> Command {
    Command::sync("login", move |shell, options| {
        calls.set(calls.get() + 1);
        shell.log(format!(
            "{}:{}",
            options.get_text("username").unwrap_or_default(),
            options.get_text("password").unwrap_or_default()
        ));
        Ok(())
    })
    .option(
        CommandOption::new("username")
            .positional()
            .required()
            .prompt_message("enter username"),
    )
    .option(
        CommandOption::new("password")
            .positional()
            .required()
            .prompt_message("enter password")
            .password(),
    )
}

fn topic() -> Command {
    Command::sync("topic", |shell, options| {
        let id = options.get_text("id").unwrap_or_default();
        if let Some(reply) = options.get_text("reply") {
            shell.log(format!("reply to {id}: {reply}"));
            return Ok(());
        }
        shell.set_var("recent_topic", id.clone());
        shell.set_passive(format!("topic {id}"), Some(format!("topic {id}")));
        shell.log(format!("[topic {id} content]"));
        Ok(())
    })
    .option(CommandOption::new("id").positional().required())
    .option(CommandOption::new("reply").alias("r").prompt())
}

fn error_lines(response: &ShellResponse) -> Vec<&str> {
    response
        .lines_of(LineKind::Error)
        .into_iter()
        .map(|line| line.text.as_str())
        .collect()
}

#[test]
fn unknown_command_reports_one_error_naming_it() {
    let shell = Shell::new();
    let mut context = ExecutionContext::new();
    let response = run(&shell, &mut context, "frobnicate now");
    assert_eq!(response.lines.len(), 1);
    assert_eq!(error_lines(&response), vec!["\"frobnicate\" is not a valid command."]);
    assert!(!response.invoked);
}

#[test]
fn echo_repeats_quoted_message() {
    let shell = Shell::new();
    let calls = counter();
    shell.register(echo(calls.clone()));
    let mut context = ExecutionContext::new();

    let response = run(&shell, &mut context, "echo \"hello world\" -i 3");
    assert_eq!(response.texts(), vec!["hello world"; 3]);
    assert!(response.lines.iter().all(|line| line.kind == LineKind::Log));
    assert_eq!(calls.get(), 1);
}

#[test]
fn echo_failures_emit_one_error_and_skip_the_handler() {
    let shell = Shell::new();
    let calls = counter();
    shell.register(echo(calls.clone()));
    let mut context = ExecutionContext::new();

    let response = run(&shell, &mut context, "echo -i abc");
    assert_eq!(response.lines.len(), 1);
    assert_eq!(response.lines[0].kind, LineKind::Error);

    let response = run(&shell, &mut context, "echo");
    assert_eq!(error_lines(&response), vec!["missing parameter \"message\""]);

    let response = run(&shell, &mut context, "echo hi -i 0");
    assert_eq!(error_lines(&response), vec!["invalid value for \"iterations\""]);
    assert_eq!(calls.get(), 0);
}

#[test]
fn validation_failures_are_idempotent_and_leave_context_alone() {
    let shell = Shell::new();
    shell.register(echo(counter()));
    let mut context = ExecutionContext::new();
    context.vars.insert("kept".to_string(), json!(true));
    let before = context.clone();

    let first = run(&shell, &mut context, "echo hi -i abc");
    let second = run(&shell, &mut context, "echo hi -i abc");
    assert_eq!(first, second);
    assert_eq!(context, before);
}

#[test]
fn alias_binds_canonical_key() {
    let shell = Shell::new();
    shell.register(Command::sync("count", |shell, options| {
        shell.log(format!(
            "iterations={} alias={}",
            options.get_text("iterations").unwrap_or_default(),
            options.contains("i")
        ));
        Ok(())
    })
    .option(CommandOption::new("iterations").alias("i")));
    let response = run(&shell, &mut ExecutionContext::new(), "count -i 5");
    assert_eq!(response.texts(), vec!["iterations=5 alias=false"]);
}

#[test]
fn login_collects_credentials_over_three_turns() {
    let shell = Shell::new();
    let calls = counter();
    shell.register(login(calls.clone()));
    let mut context = ExecutionContext::new();

    let first = run(&shell, &mut context, "login");
    assert_eq!(first.texts(), vec!["enter username"]);
    assert!(!first.password);
    let prompt = context.prompt.clone().expect("awaiting username");
    assert_eq!(prompt.option, "username");

    let second = run(&shell, &mut context, "charlie");
    assert_eq!(second.texts(), vec!["enter password"]);
    assert!(second.password);
    assert_eq!(context.prompt.as_ref().map(|prompt| prompt.option.as_str()), Some("password"));
    assert_eq!(calls.get(), 0);

    let third = run(&shell, &mut context, "password123");
    assert_eq!(third.texts(), vec!["charlie:password123"]);
    assert!(third.invoked);
    assert!(context.prompt.is_none());
    assert_eq!(calls.get(), 1);
}

#[test]
fn prompt_answers_are_taken_literally() {
    let shell = Shell::new();
    shell.register(
        Command::sync("reply", |shell, options| {
            shell.log(options.get_text("content").unwrap_or_default());
            Ok(())
        })
        .option(
            CommandOption::new("content")
                .positional()
                .required()
                .prompt_message("Enter your reply."),
        ),
    );
    let mut context = ExecutionContext::new();

    assert_eq!(run(&shell, &mut context, "reply").texts(), vec!["Enter your reply."]);
    let response = run(&shell, &mut context, "  this | is --not a \"command\" ");
    assert_eq!(response.texts(), vec!["  this | is --not a \"command\" "]);
    assert!(context.prompt.is_none());

    assert_eq!(run(&shell, &mut context, "reply").texts(), vec!["Enter your reply."]);
    let response = run(&shell, &mut context, "|||");
    assert_eq!(response.texts(), vec!["|||"]);
}

#[test]
fn cancel_clears_a_pending_prompt_without_invoking() {
    let shell = Shell::new();
    let calls = counter();
    shell.register(login(calls.clone()));
    let mut context = ExecutionContext::new();
    context.passive = Some(shell_engine::PassiveContext {
        command_prefix: "topic 9".to_string(),
        message: "topic 9".to_string(),
    });

    run(&shell, &mut context, "login");
    let response = run(&shell, &mut context, " Cancel ");
    assert_eq!(response.lines.len(), 1);
    assert_eq!(response.lines[0].kind, LineKind::Warn);
    assert_eq!(response.lines[0].text, "prompt canceled");
    assert!(context.prompt.is_none());
    assert_eq!(
        context.passive.as_ref().map(|passive| passive.command_prefix.as_str()),
        Some("topic 9")
    );
    assert_eq!(calls.get(), 0);
}

#[test]
fn cancel_without_a_prompt_is_an_error() {
    let shell = Shell::new();
    let mut context = ExecutionContext::new();
    let response = run(&shell, &mut context, "CANCEL");
    assert_eq!(error_lines(&response), vec!["there are no active prompts"]);
    assert_eq!(context, ExecutionContext::new());
}

#[test]
fn passive_context_prefixes_unrecognized_input() {
    let shell = Shell::new();
    shell.register(topic());
    let mut context = ExecutionContext::new();

    let viewed = run(&shell, &mut context, "topic 123");
    assert_eq!(viewed.texts(), vec!["[topic 123 content]"]);
    assert_eq!(context.var("recent_topic"), Some(&json!("123")));
    assert_eq!(
        context.passive.as_ref().map(|passive| passive.command_prefix.as_str()),
        Some("topic 123")
    );

    let redirected = run(&shell, &mut context, "-r hello");
    let direct = run(&shell, &mut context, "topic 123 -r hello");
    assert_eq!(redirected.texts(), vec!["reply to 123: hello"]);
    assert_eq!(redirected, direct);
}

#[test]
fn passive_redirection_can_chain_into_a_prompt() {
    let shell = Shell::new();
    shell.register(topic());
    let mut context = ExecutionContext::new();

    run(&shell, &mut context, "topic 7");
    let prompted = run(&shell, &mut context, "-r");
    assert_eq!(prompted.texts(), vec!["Enter value for reply."]);
    let answered = run(&shell, &mut context, "topic is great");
    assert_eq!(answered.texts(), vec!["reply to 7: topic is great"]);
}

#[test]
fn failed_passive_redirection_names_the_typed_command() {
    let shell = Shell::new();
    let mut context = ExecutionContext::new();
    context.passive = Some(shell_engine::PassiveContext {
        command_prefix: "missing 1".to_string(),
        message: "missing".to_string(),
    });
    let response = run(&shell, &mut context, "hello");
    assert_eq!(error_lines(&response), vec!["\"hello\" is not a valid command."]);
}

#[test]
fn denied_commands_look_unregistered() {
    let shell = Shell::new();
    shell.register(Command::sync("vault", |shell, _| {
        shell.log("opened");
        Ok(())
    })
    .access(Access::predicate(|shell, _| {
        shell.get_var("role") == Some(json!("admin"))
    })));
    let mut context = ExecutionContext::new();

    let denied = run(&shell, &mut context, "vault");
    let unknown = run(&shell, &mut context, "nothing");
    assert_eq!(error_lines(&denied), vec!["\"vault\" is not a valid command."]);
    assert_eq!(unknown.lines.len(), denied.lines.len());

    context.vars.insert("role".to_string(), json!("admin"));
    assert_eq!(run(&shell, &mut context, "vault").texts(), vec!["opened"]);
}

#[test]
fn handler_errors_become_lines_and_roll_back_routing() {
    let shell = Shell::new();
    shell.register(Command::sync("broken", |shell, _| {
        shell.clear_passive();
        shell.set_prompt("x", "broken", Default::default(), None);
        Err(ShellError::handler("something broke"))
    }));
    let mut context = ExecutionContext::new();
    context.passive = Some(shell_engine::PassiveContext {
        command_prefix: "topic 1".to_string(),
        message: "topic 1".to_string(),
    });
    let before = context.clone();

    let response = run(&shell, &mut context, "broken");
    assert_eq!(error_lines(&response), vec!["something broke"]);
    assert!(!response.invoked);
    assert_eq!(context, before);
}

#[test]
fn handler_panics_become_lines_and_roll_back_routing() {
    let shell = Shell::new();
    shell.register(Command::sync("boom", |shell, _| {
        shell.clear_passive();
        let picked: Vec<String> = Vec::new();
        shell.log(picked[1].clone());
        Ok(())
    }));
    let mut context = ExecutionContext::new();
    context.passive = Some(shell_engine::PassiveContext {
        command_prefix: "topic 1".to_string(),
        message: "topic 1".to_string(),
    });
    let before = context.clone();

    let response = run(&shell, &mut context, "boom");
    let errors = error_lines(&response);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("index out of bounds"));
    assert!(!response.invoked);
    assert_eq!(context, before);
}

#[test]
fn async_handler_panics_without_text_name_the_command() {
    let shell = Shell::new();
    shell.register(Command::asynchronous("crash", |_: ShellHandle, options| async move {
        if options.positional().is_empty() {
            std::panic::panic_any(7_u8);
        }
        Ok(())
    }));
    let response = run(&shell, &mut ExecutionContext::new(), "crash");
    assert_eq!(error_lines(&response), vec!["command \"crash\" failed"]);
}

#[test]
fn predicate_validators_see_earlier_options() {
    let shell = Shell::new();
    shell.register(
        Command::sync("range", |shell, _| {
            shell.log("ok");
            Ok(())
        })
        .option(CommandOption::new("low").positional().required())
        .option(
            CommandOption::new("high")
                .positional()
                .required()
                .validate(Validator::predicate(|value, _: &ShellHandle, options| {
                    let low = options.get("low").and_then(|low| low.as_i64());
                    Ok(match (low, value.as_i64()) {
                        (Some(low), Some(high)) if high > low => ValidationOutcome::Pass,
                        _ => ValidationOutcome::FailWith("high must exceed low".to_string()),
                    })
                })),
        ),
    );
    let mut context = ExecutionContext::new();
    assert_eq!(run(&shell, &mut context, "range 1 5").texts(), vec!["ok"]);
    assert_eq!(
        error_lines(&run(&shell, &mut context, "range 5 1")),
        vec!["high must exceed low"]
    );
}

#[test]
fn async_handlers_are_awaited_and_can_nest_commands() {
    let shell = Shell::new();
    shell.register(echo(counter()));
    shell.register(Command::asynchronous("fetch", |shell: ShellHandle, options| async move {
        let id = futures::future::ready(options.get_text("id").unwrap_or_default()).await;
        shell.log(format!("fetched {id}"));
        shell.execute(format!("echo \"after {id}\"")).await;
        shell.set_var("last_fetch", id);
        Ok(())
    })
    .option(CommandOption::new("id").positional().required()));
    let mut context = ExecutionContext::new();

    let response = run(&shell, &mut context, "fetch 42");
    assert_eq!(response.texts(), vec!["fetched 42", "after 42"]);
    assert_eq!(response.command.as_deref(), Some("fetch"));
    assert!(response.invoked);
    assert_eq!(context.var("last_fetch"), Some(&json!("42")));
}

#[test]
fn metacharacter_only_input_is_rejected() {
    let shell = Shell::new();
    let mut context = ExecutionContext::new();
    for line in ["", "   ", "|&;", "\"\"", "<>"] {
        let response = run(&shell, &mut context, line);
        assert_eq!(error_lines(&response), vec!["Invalid input."], "line {line:?}");
    }
}
