//! Pass 1: isolate comments, string literals and regex literals
//!
//! Brackets and keywords inside these spans must never be matched by the
//! later passes, so this runs first over the raw source.

use crate::blocks::{Block, BlockTable};
use crate::error::{Error, Result};

/// Keywords after which a `/` starts a regex literal rather than a division
const REGEX_PRECEDING_KEYWORDS: [&str; 10] = [
    "return",
    "typeof",
    "instanceof",
    "case",
    "in",
    "of",
    "delete",
    "void",
    "throw",
    "new",
];

pub(crate) fn isolate_literals(source: &str, table: &mut BlockTable) -> Result<String> {
    let bytes = source.as_bytes();
    let mut out = String::with_capacity(source.len());
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'/' if bytes.get(index + 1) == Some(&b'/') => {
                let end = source[index..]
                    .find('\n')
                    .map_or(source.len(), |pos| index + pos + 1);
                let id = table.insert(Block::LineComment(source[index..end].to_string()));
                out.push_str(&id.to_string());
                index = end;
            }
            b'/' if bytes.get(index + 1) == Some(&b'*') => {
                let close = source[index + 2..]
                    .find("*/")
                    .ok_or(Error::UnterminatedLiteral {
                        literal: "block comment",
                        offset: index,
                    })?;
                let end = index + 2 + close + 2;
                let id = table.insert(Block::BlockComment(source[index..end].to_string()));
                out.push_str(&id.to_string());
                index = end;
            }
            b'/' => {
                if starts_regex(&out, index)? {
                    let close = find_unescaped(bytes, index, b'/').ok_or(
                        Error::UnterminatedLiteral {
                            literal: "regex literal",
                            offset: index,
                        },
                    )?;
                    let id = table.insert(Block::Regex(source[index..=close].to_string()));
                    out.push_str(&id.to_string());
                    index = close + 1;
                } else {
                    out.push('/');
                    index += 1;
                }
            }
            quote @ (b'\'' | b'"') => {
                let close = find_unescaped(bytes, index, quote).ok_or(
                    Error::UnterminatedLiteral {
                        literal: "string literal",
                        offset: index,
                    },
                )?;
                let id = table.insert(Block::String(source[index..=close].to_string()));
                out.push_str(&id.to_string());
                index = close + 1;
            }
            _ => {
                // Only ASCII delimiters are inspected, so advance whole chars
                let ch = source[index..].chars().next().unwrap_or_default();
                out.push(ch);
                index += ch.len_utf8().max(1);
            }
        }
    }

    Ok(out)
}

/// Decide whether a bare `/` at `offset` opens a regex literal, looking at
/// what has already been emitted
fn starts_regex(emitted: &str, offset: usize) -> Result<bool> {
    let trimmed = emitted.trim_end();
    match trimmed.chars().last() {
        Some(')') => Err(Error::AmbiguousLexeme {
            offset,
            message: "'/' after ')' may start a regex literal or be a division".to_string(),
        }),
        Some(']') => Ok(false),
        Some(c) if is_identifier_char(c) => {
            let word_start = trimmed
                .rfind(|c: char| !is_identifier_char(c))
                .map_or(0, |pos| pos + 1);
            Ok(REGEX_PRECEDING_KEYWORDS.contains(&&trimmed[word_start..]))
        }
        _ => Ok(true),
    }
}

pub(crate) fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Position of the next `delimiter` after `start` that is preceded by an
/// even number of backslashes
fn find_unescaped(bytes: &[u8], start: usize, delimiter: u8) -> Option<usize> {
    let mut pos = start + 1;
    while pos < bytes.len() {
        if bytes[pos] == delimiter {
            let backslashes = bytes[start + 1..pos]
                .iter()
                .rev()
                .take_while(|b| **b == b'\\')
                .count();
            if backslashes % 2 == 0 {
                return Some(pos);
            }
        }
        pos += 1;
    }
    None
}
