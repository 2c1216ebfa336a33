//! Command-line tokenizer.
//!
//! Terms are whitespace-separated; double quotes delimit terms that may
//! contain whitespace, and inside quotes `\"` and `\\` escape to literal
//! quote and backslash. A quote adjacent to other characters concatenates
//! into the same term (`ab"c d"e` is one term `abc de`).

use thiserror::Error;

/// A malformed input line.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TokenizeError {
    /// A double quote was never closed.
    #[error("unterminated quote")]
    UnterminatedQuote,
    /// The line ended in the middle of an escape sequence.
    #[error("trailing escape")]
    TrailingEscape,
}

/// Splits a line into terms.
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' => in_quotes = false,
                '\\' => {
                    let next = chars.next().ok_or(TokenizeError::TrailingEscape)?;
                    match next {
                        '"' | '\\' => current.push(next),
                        other => {
                            // Unrecognized escapes keep the backslash.
                            current.push('\\');
                            current.push(other);
                        }
                    }
                }
                other => current.push(other),
            }
        } else {
            match ch {
                '"' => {
                    in_quotes = true;
                    in_token = true;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                other => {
                    current.push(other);
                    in_token = true;
                }
            }
        }
    }

    if in_quotes {
        return Err(TokenizeError::UnterminatedQuote);
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
