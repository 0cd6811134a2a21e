//! Option normalization and validation against a command's option rules.

use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;
use shell_contract::{display_value, CommandOptions, ShellError};
use tracing::debug;

use crate::{
    command::Command,
    dispatch::panic_message,
    schema::{CommandOption, ValidationOutcome, Validator},
    ShellHandle,
};

/// Outcome of running a command's option rules.
#[derive(Debug, Clone, PartialEq)]
pub enum Readiness {
    /// Every rule passed. Carries the resolved options.
    Ready(CommandOptions),
    /// A prompt was recorded and the command waits for the next input line.
    Suspended,
    /// A rule failed and an error line was emitted.
    Rejected,
}

/// Runs `command`'s option rules over `options` in declaration order.
///
/// Processing stops at the first rule that suspends for a prompt or fails. Later options are not
/// examined in that call.
pub fn validate_options(
    command: &Command,
    mut options: CommandOptions,
    shell: &ShellHandle,
) -> Readiness {
    for rule in command.options() {
        let key = rule.key();

        if rule.is_positional() && !options.contains(key) {
            if let Some(value) = options.take_positional() {
                options.insert(key, value);
            }
        }

        if !rule.is_positional() && !options.contains(key) {
            if let Some(alias) = rule.aliases().iter().find(|alias| options.contains(alias)) {
                if let Some(value) = options.remove(alias) {
                    options.insert(key, value);
                }
            }
        }

        if let Some(hook) = shell.option_hook() {
            hook(key, &mut options, command, shell);
        }

        if needs_prompt(rule, &options) {
            let message = rule.prompt_mode().message_for(key);
            debug!(command = %command.name(), option = %key, "suspending for prompt");
            shell.set_prompt(key, command.name(), options, Some(message.clone()));
            if rule.is_password() {
                shell.password();
            }
            shell.log(message);
            return Readiness::Suspended;
        }

        if !options.contains(key) {
            if let Some(default) = rule.default() {
                let value = default.resolve(shell, &options);
                options.insert(key, value);
            }
        }

        if let (Some(validator), Some(value)) = (rule.validator(), options.get(key)) {
            if let Err(error) = check_value(key, validator, value, shell, &options) {
                shell.report(error);
                return Readiness::Rejected;
            }
        }

        if rule.is_required() && !options.contains(key) {
            shell.report(ShellError::missing_parameter(format!(
                "missing parameter \"{key}\""
            )));
            return Readiness::Rejected;
        }
    }

    Readiness::Ready(options)
}

fn needs_prompt(rule: &CommandOption, options: &CommandOptions) -> bool {
    if !rule.prompt_mode().is_enabled() {
        return false;
    }
    match options.get(rule.key()) {
        None => rule.is_required(),
        Some(value) => *value == Value::Bool(true),
    }
}

fn check_value(
    key: &str,
    validator: &Validator,
    value: &Value,
    shell: &ShellHandle,
    options: &CommandOptions,
) -> Result<(), ShellError> {
    let generic = || ShellError::validation(format!("invalid value for \"{key}\""));
    match validator {
        Validator::Pattern(pattern) if pattern.is_match(&display_value(value)) => Ok(()),
        Validator::Pattern(_) => Err(generic()),
        Validator::Predicate(predicate) => {
            let guarded = AssertUnwindSafe(|| predicate(value, shell, options));
            let outcome = panic::catch_unwind(guarded).unwrap_or_else(|payload| {
                let message =
                    panic_message(&*payload).unwrap_or_else(|| "validator panicked".to_string());
                Err(ShellError::validation(message))
            });
            match outcome {
                Ok(ValidationOutcome::Pass) => Ok(()),
                Ok(ValidationOutcome::FailWith(message)) => Err(ShellError::validation(message)),
                Ok(ValidationOutcome::Fail) => Err(generic()),
                Err(error) => {
                    debug!(option = %key, error = %error, "validator failed");
                    Err(generic())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

    use super::*;
    use crate::{binder::bind_arguments, Shell};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use shell_contract::{ExecutionContext, LineKind, OutputSink, ShellResponse};

    fn run(command: &Command, tokens: &[&str]) -> (Readiness, ShellResponse, ExecutionContext) {
        run_on(Shell::new(), command, tokens)
    }

    fn run_on(
        shell: Shell,
        command: &Command,
        tokens: &[&str],
    ) -> (Readiness, ShellResponse, ExecutionContext) {
        let response = Rc::new(RefCell::new(ShellResponse::default()));
        let sink: Rc<RefCell<dyn OutputSink>> = response.clone();
        let shell = ShellHandle::open(shell, ExecutionContext::new(), sink);
        let tokens = tokens.iter().map(|token| token.to_string()).collect::<Vec<_>>();
        let options = bind_arguments(&tokens, &BTreeMap::new());
        let readiness = validate_options(command, options, &shell);
        let context = shell.close().context;
        let response = response.take();
        (readiness, response, context)
    }

    fn echo() -> Command {
        Command::sync("echo", |_, _| Ok(()))
            .option(CommandOption::new("message").positional().required())
            .option(
                CommandOption::new("iterations")
                    .alias("i")
                    .default_value(1)
                    .validate(Validator::pattern(r"^[1-9]\d*$").expect("pattern")),
            )
    }

    fn ready(readiness: Readiness) -> CommandOptions {
        match readiness {
            Readiness::Ready(options) => options,
            other => panic!("expected ready, got {other:?}"),
        }
    }

    #[test]
    fn alias_is_renamed_to_canonical_key() {
        let (readiness, _, _) = run(&echo(), &["hi", "-i", "5"]);
        let options = ready(readiness);
        assert_eq!(options.get("iterations"), Some(&json!(5)));
        assert!(!options.contains("i"));
        assert_eq!(options.get("message"), Some(&json!("hi")));
    }

    #[test]
    fn first_declared_alias_wins() {
        let command = Command::sync("x", |_, _| Ok(()))
            .option(CommandOption::new("name").alias("n").alias("nm"));
        let (readiness, _, _) = run(&command, &["--nm", "second", "-n", "first"]);
        let options = ready(readiness);
        assert_eq!(options.get("name"), Some(&json!("first")));
        assert_eq!(options.get("nm"), Some(&json!("second")));
    }

    #[test]
    fn defaults_fill_missing_values() {
        let (readiness, response, _) = run(&echo(), &["hi"]);
        assert_eq!(ready(readiness).get("iterations"), Some(&json!(1)));
        assert!(response.lines.is_empty());
    }

    #[test]
    fn computed_defaults_see_earlier_options() {
        let command = Command::sync("greet", |_, _| Ok(()))
            .option(CommandOption::new("name").positional())
            .option(CommandOption::new("greeting").default_with(|_, options| {
                json!(format!("hello {}", options.get_text("name").unwrap_or_default()))
            }));
        let (readiness, _, _) = run(&command, &["ada"]);
        assert_eq!(ready(readiness).get("greeting"), Some(&json!("hello ada")));
    }

    #[test]
    fn positional_tokens_bind_leftmost_first_and_leftovers_remain() {
        let command = Command::sync("pair", |_, _| Ok(()))
            .option(CommandOption::new("first").positional())
            .option(CommandOption::new("second").positional());
        let (readiness, _, _) = run(&command, &["a", "b", "c"]);
        let options = ready(readiness);
        assert_eq!(options.get("first"), Some(&json!("a")));
        assert_eq!(options.get("second"), Some(&json!("b")));
        assert_eq!(options.positional(), &[json!("c")]);
    }

    #[test]
    fn pattern_failure_reports_generic_message() {
        let (readiness, response, _) = run(&echo(), &["hi", "-i", "abc"]);
        assert_eq!(readiness, Readiness::Rejected);
        assert_eq!(response.texts(), vec!["invalid value for \"iterations\""]);
    }

    #[test]
    fn missing_required_value_reports_parameter_name() {
        let (readiness, response, _) = run(&echo(), &[]);
        assert_eq!(readiness, Readiness::Rejected);
        assert_eq!(response.lines_of(LineKind::Error).len(), 1);
        assert_eq!(response.texts(), vec!["missing parameter \"message\""]);
    }

    #[test]
    fn predicate_messages_are_used_verbatim() {
        let command = Command::sync("x", |_, _| Ok(())).option(
            CommandOption::new("code").validate(Validator::predicate(|value, _, _| {
                Ok(if value == &json!("ok") {
                    ValidationOutcome::Pass
                } else {
                    ValidationOutcome::FailWith("code must be ok".to_string())
                })
            })),
        );
        let (readiness, response, _) = run(&command, &["--code", "nope"]);
        assert_eq!(readiness, Readiness::Rejected);
        assert_eq!(response.texts(), vec!["code must be ok"]);
    }

    #[test]
    fn predicate_errors_collapse_to_generic_message() {
        let command = Command::sync("x", |_, _| Ok(())).option(
            CommandOption::new("code")
                .validate(Validator::predicate(|_, _, _| Err(ShellError::handler("boom")))),
        );
        let (readiness, response, _) = run(&command, &["--code", "1"]);
        assert_eq!(readiness, Readiness::Rejected);
        assert_eq!(response.texts(), vec!["invalid value for \"code\""]);
    }

    #[test]
    fn predicate_plain_failure_reports_generic_message() {
        let command = Command::sync("x", |_, _| Ok(())).option(
            CommandOption::new("code")
                .validate(Validator::predicate(|_, _, _| Ok(ValidationOutcome::Fail))),
        );
        let (readiness, response, _) = run(&command, &["--code", "nope"]);
        assert_eq!(readiness, Readiness::Rejected);
        assert_eq!(response.lines_of(LineKind::Error).len(), 1);
        assert_eq!(response.texts(), vec!["invalid value for \"code\""]);
    }

    #[test]
    fn panicking_predicate_fails_validation() {
        let command = Command::sync("x", |_, _| Ok(())).option(
            CommandOption::new("code").validate(Validator::predicate(|value, _, _| {
                let digits = value.as_str().unwrap_or_default().as_bytes();
                Ok(if digits[5] == b'0' {
                    ValidationOutcome::Pass
                } else {
                    ValidationOutcome::Fail
                })
            })),
        );
        let (readiness, response, _) = run(&command, &["--code", "ab"]);
        assert_eq!(readiness, Readiness::Rejected);
        assert_eq!(response.texts(), vec!["invalid value for \"code\""]);
    }

    #[test]
    fn option_hook_rewrites_values_before_validation() {
        let shell = Shell::new().with_option_hook(|key, options, _, _| {
            if key == "iterations" {
                if let Some(text) = options.get_text("iterations") {
                    options.insert("iterations", json!(text.trim_start_matches('x')));
                }
            }
        });
        let (readiness, response, _) = run_on(shell, &echo(), &["hi", "-i", "x3"]);
        assert!(response.lines.is_empty());
        assert_eq!(ready(readiness).get("iterations"), Some(&json!("3")));
    }

    #[test]
    fn option_hook_runs_after_aliases_for_every_declared_option() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let record = seen.clone();
        let shell = Shell::new().with_option_hook(move |key, options, command, _| {
            record.borrow_mut().push(format!(
                "{}:{key}:{}",
                command.name(),
                options.contains(key)
            ));
        });
        let (readiness, _, _) = run_on(shell, &echo(), &["hi", "-i", "2"]);
        assert!(matches!(readiness, Readiness::Ready(_)));
        assert_eq!(
            *seen.borrow(),
            vec!["echo:message:true", "echo:iterations:true"]
        );
    }

    #[test]
    fn prompt_suspends_before_later_options_are_checked() {
        let command = Command::sync("login", |_, _| Ok(()))
            .option(
                CommandOption::new("username")
                    .positional()
                    .required()
                    .prompt_message("enter username"),
            )
            .option(CommandOption::new("password").positional().required());
        let (readiness, response, context) = run(&command, &[]);
        assert_eq!(readiness, Readiness::Suspended);
        assert_eq!(response.texts(), vec!["enter username"]);
        assert!(!response.password);
        let prompt = context.prompt.expect("prompt recorded");
        assert_eq!(prompt.command, "login");
        assert_eq!(prompt.option, "username");
    }

    #[test]
    fn flag_without_value_prompts_even_when_optional() {
        let command = Command::sync("topic", |_, _| Ok(()))
            .option(CommandOption::new("id").positional().required())
            .option(CommandOption::new("reply").alias("r").prompt());
        let (readiness, response, context) = run(&command, &["7", "-r"]);
        assert_eq!(readiness, Readiness::Suspended);
        assert_eq!(response.texts(), vec!["Enter value for reply."]);
        let prompt = context.prompt.expect("prompt recorded");
        assert_eq!(prompt.options.get("id"), Some(&json!(7)));
        assert_eq!(prompt.options.get("reply"), Some(&json!(true)));
    }

    #[test]
    fn password_prompts_raise_secret_signal() {
        let command = Command::sync("su", |_, _| Ok(())).option(
            CommandOption::new("secret")
                .required()
                .prompt()
                .password(),
        );
        let (readiness, response, _) = run(&command, &[]);
        assert_eq!(readiness, Readiness::Suspended);
        assert!(response.password);
    }

    #[test]
    fn optional_prompt_without_value_does_not_suspend() {
        let command =
            Command::sync("x", |_, _| Ok(())).option(CommandOption::new("note").prompt());
        let (readiness, _, context) = run(&command, &[]);
        assert!(matches!(readiness, Readiness::Ready(_)));
        assert!(context.prompt.is_none());
    }
}
