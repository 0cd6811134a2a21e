//! Writes shell responses to a plain text terminal.

use std::io::{self, Write};

use shell_engine::{ExecutionContext, LineKind, ShellResponse};

const CLEAR_LINES: usize = 40;

/// Writes a response's lines, sending error lines to `err`.
pub fn render(
    response: &ShellResponse,
    out: &mut impl Write,
    err: &mut impl Write,
) -> io::Result<()> {
    if response.clear_display {
        write!(out, "{}", "\n".repeat(CLEAR_LINES))?;
    }
    for line in &response.lines {
        match line.kind {
            LineKind::Log => writeln!(out, "{}", line.text)?,
            LineKind::Warn => writeln!(out, "warning: {}", line.text)?,
            LineKind::Debug => writeln!(out, "debug: {}", line.text)?,
            LineKind::Error => writeln!(err, "{}", line.text)?,
        }
    }
    out.flush()?;
    err.flush()
}

/// Prompt text for the next line, decorated with the passive context's message.
///
/// After a password signal the prompt only names the expected answer. Input is still echoed.
pub fn prompt(context: &ExecutionContext, secret: bool) -> String {
    if secret {
        return "password > ".to_string();
    }
    match &context.passive {
        Some(passive) => format!("{} > ", passive.message),
        None => "> ".to_string(),
    }
}
