//! Maps argument tokens onto a flat option bag.

use std::collections::BTreeMap;

use serde_json::{Number, Value};
use shell_contract::CommandOptions;

/// Binds tokens that follow the command name, then applies `overrides` on top.
///
/// Flags (`--name`, `-n`, short clusters like `-abc`) become named values. A flag followed by
/// another flag or by the end of input is bound to `true`. Bare tokens accumulate in order as
/// positional values. Everything after `--` is positional.
pub fn bind_arguments(tokens: &[String], overrides: &BTreeMap<String, Value>) -> CommandOptions {
    let mut options = CommandOptions::new();
    let mut index = 0usize;

    while index < tokens.len() {
        let token = &tokens[index];

        if token == "--" {
            for rest in &tokens[index + 1..] {
                options.push_positional(parse_value(rest));
            }
            break;
        }

        if let Some(rest) = token.strip_prefix("--") {
            if let Some((name, raw_value)) = rest.split_once('=') {
                bind(&mut options, name, parse_value(raw_value));
            } else if let Some(name) = rest.strip_prefix("no-").filter(|name| !name.is_empty()) {
                bind(&mut options, name, Value::Bool(false));
            } else if takes_value(tokens, index) {
                index += 1;
                bind(&mut options, rest, parse_value(&tokens[index]));
            } else {
                bind(&mut options, rest, Value::Bool(true));
            }
            index += 1;
            continue;
        }

        if is_flag(token) {
            let letters = token[1..].chars().map(String::from).collect::<Vec<_>>();
            if let Some((last, leading)) = letters.split_last() {
                for letter in leading {
                    bind(&mut options, letter, Value::Bool(true));
                }
                if takes_value(tokens, index) {
                    index += 1;
                    bind(&mut options, last, parse_value(&tokens[index]));
                } else {
                    bind(&mut options, last, Value::Bool(true));
                }
            }
            index += 1;
            continue;
        }

        options.push_positional(parse_value(token));
        index += 1;
    }

    options.merge(overrides.clone());
    options
}

/// Converts numeric text to a number when the number prints back as the same text.
///
/// Anything else stays a string, so `0123`, `1e3`, `1.50`, and integers past `i64` keep the
/// exact text that was typed.
pub fn parse_value(raw: &str) -> Value {
    let text = || Value::String(raw.to_string());
    if !looks_numeric(raw) {
        return text();
    }
    let number = match raw.parse::<i64>() {
        Ok(value) => Some(Number::from(value)),
        Err(_) => raw.parse::<f64>().ok().and_then(Number::from_f64),
    };
    match number {
        Some(number) if number.to_string() == raw => Value::Number(number),
        _ => text(),
    }
}

fn looks_numeric(raw: &str) -> bool {
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    digits.chars().next().is_some_and(|ch| ch.is_ascii_digit() || ch == '.')
        && digits
            .chars()
            .all(|ch| ch.is_ascii_digit() || matches!(ch, '.' | 'e' | 'E' | '-' | '+'))
}

fn is_flag(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && !looks_numeric(token)
}

fn takes_value(tokens: &[String], index: usize) -> bool {
    tokens
        .get(index + 1)
        .is_some_and(|next| next != "--" && !is_flag(next))
}

fn bind(options: &mut CommandOptions, key: &str, value: Value) {
    let merged = match options.remove(key) {
        None => value,
        Some(Value::Array(mut items)) => {
            items.push(value);
            Value::Array(items)
        }
        Some(previous) => Value::Array(vec![previous, value]),
    };
    options.insert(key, merged);
}
