//! Instruction cursor over a partitioned token stream
//!
//! A leading placeholder is an instruction on its own (a function
//! declaration, an `if` chain link, a comment...). Anything else runs up to
//! the next `;`. The cursor only borrows the stream, so independent cursors
//! can scan the same text, e.g. a hoisting pre-scan before the main walk.

use crate::blocks::BlockId;
use crate::error::{Error, Result};

const SNIPPET_LEN: usize = 60;

#[derive(Debug, Clone, Copy)]
pub struct InstructionCursor<'a> {
    rest: &'a str,
}

impl<'a> InstructionCursor<'a> {
    pub fn new(code: &'a str) -> Self {
        Self { rest: code }
    }

    /// Text not yet consumed
    pub fn remaining(&self) -> &'a str {
        self.rest
    }

    pub fn next_instruction(&mut self) -> Result<Option<&'a str>> {
        let code = self.rest.trim_start();
        if code.is_empty() {
            self.rest = code;
            return Ok(None);
        }

        if let Some((_, len)) = BlockId::parse_leading(code) {
            let after = &code[len..];
            self.rest = after.trim_start().strip_prefix(';').unwrap_or(after);
            return Ok(Some(&code[..len]));
        }

        match code.find(';') {
            Some(end) => {
                self.rest = &code[end + 1..];
                Ok(Some(code[..end].trim()))
            }
            None => {
                self.rest = "";
                let snippet: String = code.chars().take(SNIPPET_LEN).collect();
                Err(Error::UnterminatedInstruction { snippet })
            }
        }
    }
}

impl<'a> Iterator for InstructionCursor<'a> {
    type Item = Result<&'a str>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_instruction().transpose()
    }
}
