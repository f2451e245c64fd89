//! Block expander: the inverse of the partitioner
//!
//! Placeholders are replaced recursively by their kind-specific rendering.
//! Comment, string and regex blocks render verbatim and are never searched
//! for further placeholders. Recursion depth follows the nesting depth of
//! the blocks being expanded.

use crate::blocks::{Block, BlockId, BlockKind, BlockTable, PLACEHOLDER};
use crate::error::Result;

/// Expand every placeholder in `code`
pub fn expand(code: &str, table: &BlockTable) -> Result<String> {
    Expander::new(table).expand(code)
}

/// Expand only placeholders of the given kinds; others are left in place
/// along with everything they contain
pub fn expand_only(code: &str, table: &BlockTable, kinds: &[BlockKind]) -> Result<String> {
    Expander::restricted(table, kinds).expand(code)
}

pub struct Expander<'t> {
    table: &'t BlockTable,
    only: Option<&'t [BlockKind]>,
}

impl<'t> Expander<'t> {
    pub fn new(table: &'t BlockTable) -> Self {
        Self { table, only: None }
    }

    pub fn restricted(table: &'t BlockTable, kinds: &'t [BlockKind]) -> Self {
        Self {
            table,
            only: Some(kinds),
        }
    }

    fn includes(&self, kind: BlockKind) -> bool {
        self.only.map_or(true, |kinds| kinds.contains(&kind))
    }

    pub fn expand(&self, code: &str) -> Result<String> {
        let mut out = String::with_capacity(code.len());
        self.expand_into(code, &mut out)?;
        Ok(out)
    }

    fn expand_into(&self, code: &str, out: &mut String) -> Result<()> {
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(code) {
            let (Some(whole), Some(id)) = (caps.get(0), BlockId::from_captures(&caps)) else {
                continue;
            };
            if !self.includes(id.kind()) {
                continue;
            }
            out.push_str(&code[last..whole.start()]);
            self.expand_block(id, out)?;
            last = whole.end();
        }
        out.push_str(&code[last..]);
        Ok(())
    }

    fn expand_block(&self, id: BlockId, out: &mut String) -> Result<()> {
        let block = self.table.get(id)?;
        match block.literal_text() {
            Some(text) => out.push_str(text),
            None => self.expand_into(&render(block), out)?,
        }
        Ok(())
    }
}

/// One level of rendering: the block's text with its children still as
/// placeholders
pub fn render(block: &Block) -> String {
    match block {
        Block::LineComment(text)
        | Block::BlockComment(text)
        | Block::Regex(text)
        | Block::String(text) => text.clone(),
        Block::RoundGroup(code) => format!("({})", code),
        Block::CurlyGroup(code) => format!("{{ {} }}", code),
        Block::SquareGroup(code) => format!("[{}]", code),
        Block::If(h) => format!("if {} {}", h.header, h.body),
        Block::ElseIf(h) => format!("else if {} {}", h.header, h.body),
        Block::Switch(h) => format!("switch {} {}", h.header, h.body),
        Block::For(h) => format!("for {} {}", h.header, h.body),
        Block::While(h) => format!("while {} {}", h.header, h.body),
        Block::Else { body } => format!("else {}", body),
        Block::Object { body } => body.to_string(),
        Block::Function(function) => {
            let prefix = if function.name.is_some() { "\n" } else { "" };
            format!(
                "{}{}function {} {} {}",
                prefix,
                render_docs(&function.docs),
                function.name.as_deref().unwrap_or_default(),
                function.header,
                function.body
            )
        }
        Block::Constructor(ctor) => format!(
            "{}constructor {} {}",
            render_docs(&ctor.docs),
            ctor.header,
            ctor.body
        ),
        Block::ClassMethod(method) => format!(
            "{}{}{} {}{} {}",
            render_docs(&method.docs),
            method.visibility.keyword(),
            if method.is_static { " static" } else { "" },
            method.name,
            method.header,
            method.body
        ),
        Block::ClassProperty(property) => {
            let mut text = format!(
                "{}{} {}",
                property.visibility.keyword(),
                if property.is_static { " static" } else { "" },
                property.name
            );
            if let Some(init) = property.initializer.as_deref().filter(|i| !i.trim().is_empty()) {
                text.push_str(" = ");
                text.push_str(init);
            }
            text.push(';');
            text
        }
        Block::Class(class) => {
            let mut head = format!("class {}", class.name);
            if let Some(parent) = &class.parent {
                head.push_str(" extends ");
                head.push_str(parent);
            }
            let properties = join_ids(&class.properties, "\n");
            let mut methods = join_ids(&class.methods, "\n");
            if !methods.is_empty() {
                methods.push('\n');
            }
            format!("{} {{\n{}\n{}\n {}}}", head, properties, class.constructor, methods)
        }
    }
}

fn render_docs(docs: &[BlockId]) -> String {
    let mut text = join_ids(docs, "");
    if docs.last().map_or(false, |id| id.is(BlockKind::BlockComment)) {
        text.push('\n');
    }
    text
}

fn join_ids(ids: &[BlockId], separator: &str) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}
