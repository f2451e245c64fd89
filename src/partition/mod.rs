//! Lexical partitioner
//!
//! Turns source text into a flat stream in which every comment, literal,
//! bracket group and keyword-headed construct is a single opaque placeholder
//! backed by a record in the [`BlockTable`]. Three ordered passes:
//!
//! 1. [`literals`]: comments, strings and regex literals
//! 2. [`brackets`]: matched `()`, `{}` and `[]` spans, innermost-out
//! 3. [`structure`]: `if`/`else`/`for`/`while`/`switch`/`function`
//!    constructs and object literals, applied to the top-level stream and
//!    to the interior of every bracket group
//!
//! Bracket matching recurses once per nesting level, so the usable nesting
//! depth is bounded by the thread's stack size.

use crate::blocks::{BlockKind, BlockTable};
use crate::error::Result;
use serde::Serialize;

pub mod brackets;
pub mod literals;
pub mod structure;

/// Flat top-level token stream plus the table backing its placeholders
#[derive(Debug, Clone, Serialize)]
pub struct Partition {
    pub code: String,
    pub table: BlockTable,
}

pub fn partition(source: &str) -> Result<Partition> {
    let mut table = BlockTable::new();

    let code = literals::isolate_literals(source, &mut table)?;
    let code = brackets::minify_brackets(&code, &mut table)?;
    let code = structure::combine_structures(&code, &mut table)?;

    // Bracket matching only recursed into groups; combine inside them too
    for id in table.ids_of_kinds(&BlockKind::GROUPS) {
        let interior = table.group_code(id)?.to_string();
        let combined = structure::combine_structures(&interior, &mut table)?;
        table.set_group_code(id, combined)?;
    }

    log::debug!(
        "Partitioned {} bytes into {} blocks ({} functions)",
        source.len(),
        table.len(),
        table.count_of(BlockKind::Function)
    );

    Ok(Partition { code, table })
}
