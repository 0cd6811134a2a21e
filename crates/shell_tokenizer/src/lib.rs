//! Quote-aware line tokenizer used by the command shell.
//!
//! This crate intentionally implements only what the dispatcher needs: splitting one input line
//! into argument tokens (honoring single/double quotes and backslash escapes) and recognizing
//! input that carries no command at all.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Characters that never start a command on their own.
const METACHARACTERS: &[char] = &['\'', ';', '"', '[', ']', '|', '&', '<', '>'];

/// Tokenized input line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenizedLine {
    /// Tokens in input order with surrounding quotes removed.
    pub argv: Vec<String>,
}

impl TokenizedLine {
    /// Returns whether the line produced no tokens.
    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }

    /// Splits the line into its leading command token and the remaining arguments.
    pub fn split_command(self) -> Option<(String, Vec<String>)> {
        let mut argv = self.argv.into_iter();
        let command = argv.next()?;
        Some((command, argv.collect()))
    }
}

/// Tokenizer failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TokenizeError {
    /// A quote was opened and never closed.
    #[error("unterminated quoted string")]
    UnterminatedQuote,
    /// The line ended right after a backslash.
    #[error("dangling escape sequence")]
    DanglingEscape,
}

/// Stateless tokenizer entrypoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineTokenizer;

impl LineTokenizer {
    /// Splits `line` into tokens.
    pub fn split(&self, line: &str) -> Result<TokenizedLine, TokenizeError> {
        tokenize(line).map(|argv| TokenizedLine { argv })
    }
}

/// Convenience wrapper around [`LineTokenizer::split`].
pub fn split_line(line: &str) -> Result<TokenizedLine, TokenizeError> {
    LineTokenizer.split(line)
}

/// Returns whether `line` is empty or consists solely of whitespace and shell metacharacters.
pub fn is_metacharacter_only(line: &str) -> bool {
    line.chars()
        .all(|ch| ch.is_whitespace() || METACHARACTERS.contains(&ch))
}

fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // Tracks `""` so an explicitly empty argument survives.
    let mut quoted = false;
    let mut chars = line.chars();
    let mut quote = None::<char>;

    while let Some(ch) = chars.next() {
        match quote {
            Some(active) if ch == active => quote = None,
            Some('"') if ch == '\\' => {
                current.push(chars.next().ok_or(TokenizeError::DanglingEscape)?);
            }
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                quoted = true;
            }
            None if ch.is_whitespace() => {
                if !current.is_empty() || quoted {
                    tokens.push(std::mem::take(&mut current));
                    quoted = false;
                }
            }
            None if ch == '\\' => {
                current.push(chars.next().ok_or(TokenizeError::DanglingEscape)?);
            }
            None => current.push(ch),
        }
    }

    if quote.is_some() {
        return Err(TokenizeError::UnterminatedQuote);
    }

    if !current.is_empty() || quoted {
        tokens.push(current);
    }

    Ok(tokens)
}
