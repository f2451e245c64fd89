//! Pass 2: bracket matching
//!
//! Each bracket family is matched independently with a stack over the
//! literal-free text. Matched spans are minified innermost-out, so only the
//! outermost brackets of a text remain, each as one group placeholder.

use crate::blocks::{Block, BlockKind, BlockTable};
use crate::error::{Error, Result};
use std::collections::HashMap;

const FAMILIES: [(u8, u8, BlockKind); 3] = [
    (b'(', b')', BlockKind::RoundGroup),
    (b'{', b'}', BlockKind::CurlyGroup),
    (b'[', b']', BlockKind::SquareGroup),
];

/// Open position -> (close position, group kind)
fn match_brackets(code: &str, base: usize) -> Result<HashMap<usize, (usize, BlockKind)>> {
    let bytes = code.as_bytes();
    let mut matches = HashMap::new();
    for (open, close, kind) in FAMILIES {
        let mut opens = Vec::new();
        for (pos, byte) in bytes.iter().enumerate() {
            if *byte == open {
                opens.push(pos);
            } else if *byte == close {
                let start = opens.pop().ok_or(Error::UnbalancedBracket {
                    bracket: close as char,
                    offset: base + pos,
                })?;
                matches.insert(start, (pos, kind));
            }
        }
        if let Some(pos) = opens.pop() {
            return Err(Error::UnbalancedBracket {
                bracket: open as char,
                offset: base + pos,
            });
        }
    }
    Ok(matches)
}

/// Replace every outermost bracket span with a group placeholder
///
/// Recursion depth equals the bracket nesting depth of `code`.
pub(crate) fn minify_brackets(code: &str, table: &mut BlockTable) -> Result<String> {
    minify_at(code, 0, table)
}

fn minify_at(code: &str, base: usize, table: &mut BlockTable) -> Result<String> {
    let matching = match_brackets(code, base)?;
    let mut out = String::with_capacity(code.len());
    let mut index = 0;

    while index < code.len() {
        if let Some(&(close, kind)) = matching.get(&index) {
            let interior = minify_at(&code[index + 1..close], base + index + 1, table)?;
            let block = Block::group(kind, interior)
                .ok_or_else(|| Error::internal("bracket family without a group kind"))?;
            let id = table.insert(block);
            out.push_str(&id.to_string());
            index = close + 1;
        } else {
            let ch = code[index..].chars().next().unwrap_or_default();
            out.push(ch);
            index += ch.len_utf8().max(1);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outermost_groups_remain() {
        let mut table = BlockTable::new();
        let code = minify_brackets("f(a, [b, {c: (d)}]) + g[0]", &mut table).unwrap();
        assert_eq!(code, "f@BLOCK_ROUNDBLOCK_2@ + g@BLOCK_SQUAREBLOCK_2@");
        assert_eq!(table.len(), 5);
        // innermost groups are registered first
        assert_eq!(table.group_code(crate::blocks::BlockId::parse("@BLOCK_ROUNDBLOCK_1@").unwrap()).unwrap(), "d");
        assert_eq!(
            table.group_code(crate::blocks::BlockId::parse("@BLOCK_ROUNDBLOCK_2@").unwrap()).unwrap(),
            "a, @BLOCK_SQUAREBLOCK_1@"
        );
    }

    #[test]
    fn test_unbalanced_close() {
        let mut table = BlockTable::new();
        let err = minify_brackets("a)", &mut table).unwrap_err();
        assert_eq!(err, Error::UnbalancedBracket { bracket: ')', offset: 1 });
    }

    #[test]
    fn test_unclosed_open() {
        let mut table = BlockTable::new();
        let err = minify_brackets("{ a", &mut table).unwrap_err();
        assert_eq!(err, Error::UnbalancedBracket { bracket: '{', offset: 0 });
    }

    #[test]
    fn test_interleaved_families_are_rejected() {
        let mut table = BlockTable::new();
        assert!(matches!(
            minify_brackets("( [ ) ]", &mut table),
            Err(Error::UnbalancedBracket { .. })
        ));
    }
}
