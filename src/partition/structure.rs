//! Pass 3: combine keyword-headed constructs and object literals
//!
//! Works on bracket-minified text, where every header and body is already a
//! single group placeholder.

use super::literals::is_identifier_char;
use crate::blocks::{Block, BlockId, BlockKind, BlockTable, FunctionBlock, Headed, VAR_NAME_PATTERN};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(if|else\s+if|else|for|while|switch|function)\b").expect("keyword pattern")
});

static FUNCTION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^({VAR_NAME_PATTERN})\s*")).expect("name pattern"));

#[derive(Debug, Clone, Copy, PartialEq)]
enum Keyword {
    If,
    ElseIf,
    Else,
    For,
    While,
    Switch,
    Function,
}

impl Keyword {
    fn parse(text: &str) -> Self {
        match text {
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "for" => Keyword::For,
            "while" => Keyword::While,
            "switch" => Keyword::Switch,
            "function" => Keyword::Function,
            _ => Keyword::ElseIf,
        }
    }

    fn has_header(self) -> bool {
        self != Keyword::Else
    }
}

/// Take a placeholder of `kind` (after optional whitespace) off the front of
/// `text`
fn take_leading(text: &str, kind: BlockKind) -> Option<(BlockId, &str)> {
    let trimmed = text.trim_start();
    let (id, len) = BlockId::parse_leading(trimmed)?;
    id.is(kind).then(|| (id, &trimmed[len..]))
}

pub(crate) fn combine_structures(code: &str, table: &mut BlockTable) -> Result<String> {
    let mut out = String::with_capacity(code.len());
    let mut index = 0;

    while index < code.len() {
        let rest = &code[index..];
        let ch = rest.chars().next().unwrap_or_default();

        if ch.is_whitespace() {
            out.push(ch);
            index += ch.len_utf8();
            continue;
        }

        if let Some((id, len)) = BlockId::parse_leading(rest) {
            if id.is(BlockKind::CurlyGroup) {
                let object = table.insert(Block::Object { body: id });
                out.push_str(&object.to_string());
            } else {
                out.push_str(&rest[..len]);
            }
            index += len;
            continue;
        }

        if let Some(caps) = KEYWORD.captures(rest) {
            let matched = caps.get(0).map_or("", |m| m.as_str());
            let keyword = Keyword::parse(caps.get(1).map_or("", |m| m.as_str()));
            if let Some((id, remaining)) = combine_keyword(keyword, &rest[matched.len()..], table)? {
                out.push_str(&id.to_string());
                index = code.len() - remaining.len();
            } else {
                // brace-less body or the tail of a do-while: leave as text
                out.push_str(matched);
                index += matched.len();
            }
            continue;
        }

        if is_identifier_char(ch) {
            let len = rest
                .find(|c: char| !is_identifier_char(c))
                .unwrap_or(rest.len());
            out.push_str(&rest[..len]);
            index += len;
            continue;
        }

        out.push(ch);
        index += ch.len_utf8();
    }

    Ok(out)
}

/// Build the composite block for one keyword, returning it with the text
/// left after its body. `None` means the construct has no curly body.
fn combine_keyword<'a>(
    keyword: Keyword,
    after: &'a str,
    table: &mut BlockTable,
) -> Result<Option<(BlockId, &'a str)>> {
    let mut rest = after.trim_start();
    let mut name = None;

    if keyword == Keyword::Function {
        if let Some(caps) = FUNCTION_NAME.captures(rest) {
            name = caps.get(1).map(|m| m.as_str().to_string());
            rest = &rest[caps.get(0).map_or(0, |m| m.end())..];
        }
    }

    let mut header = None;
    if keyword.has_header() {
        match take_leading(rest, BlockKind::RoundGroup) {
            Some((id, remaining)) => {
                header = Some(id);
                rest = remaining;
            }
            None if keyword == Keyword::Function => {
                return Err(Error::unsupported("expected a parameter list after 'function'"));
            }
            None => return Ok(None),
        }
    }

    let (body, rest) = match take_leading(rest, BlockKind::CurlyGroup) {
        Some(found) => found,
        None if keyword == Keyword::Function => {
            return Err(Error::unsupported(format!(
                "expected a body after 'function {}'",
                name.as_deref().unwrap_or_default()
            )));
        }
        None => return Ok(None),
    };

    let block = match (keyword, header) {
        (Keyword::Else, _) => Block::Else { body },
        (Keyword::Function, Some(header)) => Block::Function(FunctionBlock {
            header,
            body,
            name,
            docs: Vec::new(),
        }),
        (Keyword::If, Some(header)) => Block::If(Headed { header, body }),
        (Keyword::ElseIf, Some(header)) => Block::ElseIf(Headed { header, body }),
        (Keyword::For, Some(header)) => Block::For(Headed { header, body }),
        (Keyword::While, Some(header)) => Block::While(Headed { header, body }),
        (Keyword::Switch, Some(header)) => Block::Switch(Headed { header, body }),
        (_, None) => return Err(Error::internal("headed construct without a header")),
    };
    Ok(Some((table.insert(block), rest)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::brackets::minify_brackets;

    fn combine(source: &str) -> (String, BlockTable) {
        let mut table = BlockTable::new();
        let code = minify_brackets(source, &mut table).unwrap();
        let code = combine_structures(&code, &mut table).unwrap();
        (code, table)
    }

    #[test]
    fn test_if_else_chain() {
        let (code, table) = combine("if (a) {x;} else if (b) {y;} else {z;}");
        assert_eq!(code, "@BLOCK_IF_1@ @BLOCK_ELIF_1@ @BLOCK_ELSE_1@");
        assert_eq!(table.count_of(BlockKind::Object), 0);
    }

    #[test]
    fn test_named_and_anonymous_functions() {
        let (code, table) = combine("function foo(a) {} var b = function () {};");
        assert_eq!(code, "@BLOCK_FUNCTION_1@ var b = @BLOCK_FUNCTION_2@;");
        let first = table.function(BlockId::parse("@BLOCK_FUNCTION_1@").unwrap()).unwrap();
        assert_eq!(first.name.as_deref(), Some("foo"));
        let second = table.function(BlockId::parse("@BLOCK_FUNCTION_2@").unwrap()).unwrap();
        assert_eq!(second.name, None);
    }

    #[test]
    fn test_bare_curly_is_object() {
        let (code, table) = combine("var o = {a: 1};");
        assert_eq!(code, "var o = @BLOCK_OBJECT_1@;");
        assert_eq!(table.count_of(BlockKind::Object), 1);
    }

    #[test]
    fn test_keyword_prefixed_identifiers_are_words() {
        let (code, table) = combine("format(x); iffy = 1; elsewhere;");
        assert_eq!(code, "format@BLOCK_ROUNDBLOCK_1@; iffy = 1; elsewhere;");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_braceless_bodies_stay_text() {
        let (code, _) = combine("if (a) return; do {x;} while (y);");
        assert_eq!(
            code,
            "if @BLOCK_ROUNDBLOCK_1@ return; do @BLOCK_OBJECT_1@ while @BLOCK_ROUNDBLOCK_2@;"
        );
    }

    #[test]
    fn test_function_requires_body() {
        let mut table = BlockTable::new();
        let code = minify_brackets("function foo(a);", &mut table).unwrap();
        assert!(matches!(
            combine_structures(&code, &mut table),
            Err(Error::UnsupportedSyntax { .. })
        ));
    }
}
