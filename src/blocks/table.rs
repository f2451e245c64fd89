//! Single-owner block arena for one conversion run

use super::{Block, BlockId, BlockKind, FunctionBlock};
use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Maps placeholder ids to their block records
///
/// Ids come from a per-kind monotonic counter, so they are unique by
/// construction. A block may only reference ids that existed before it.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BlockTable {
    blocks: BTreeMap<BlockId, Block>,
    #[serde(skip)]
    counters: HashMap<BlockKind, u32>,
}

impl BlockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a block under a fresh id of its own kind
    pub fn insert(&mut self, block: Block) -> BlockId {
        let kind = block.kind();
        let counter = self.counters.entry(kind).or_insert(0);
        *counter += 1;
        let id = BlockId::new(kind, *counter);
        self.blocks.insert(id, block);
        id
    }

    pub fn get(&self, id: BlockId) -> Result<&Block> {
        self.blocks
            .get(&id)
            .ok_or_else(|| Error::internal(format!("dangling placeholder {}", id)))
    }

    /// Resolve a text that is exactly one registered placeholder
    pub fn lookup(&self, text: &str) -> Option<(BlockId, &Block)> {
        let id = BlockId::parse(text)?;
        self.blocks.get(&id).map(|block| (id, block))
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter().map(|(id, block)| (*id, block))
    }

    /// Ids of the given kinds, in creation order within each kind
    pub fn ids_of_kinds(&self, kinds: &[BlockKind]) -> Vec<BlockId> {
        self.blocks
            .keys()
            .filter(|id| kinds.contains(&id.kind()))
            .copied()
            .collect()
    }

    pub fn count_of(&self, kind: BlockKind) -> usize {
        self.blocks.keys().filter(|id| id.is(kind)).count()
    }

    pub fn group_code(&self, id: BlockId) -> Result<&str> {
        self.get(id)?
            .group_code()
            .ok_or_else(|| Error::internal(format!("{} is not a bracket group", id)))
    }

    pub fn literal_text(&self, id: BlockId) -> Result<&str> {
        self.get(id)?
            .literal_text()
            .ok_or_else(|| Error::internal(format!("{} is not a literal", id)))
    }

    pub fn function(&self, id: BlockId) -> Result<&FunctionBlock> {
        match self.get(id)? {
            Block::Function(function) => Ok(function),
            _ => Err(Error::internal(format!("{} is not a function", id))),
        }
    }

    fn function_mut(&mut self, id: BlockId) -> Result<&mut FunctionBlock> {
        match self.blocks.get_mut(&id) {
            Some(Block::Function(function)) => Ok(function),
            Some(_) => Err(Error::internal(format!("{} is not a function", id))),
            None => Err(Error::internal(format!("dangling placeholder {}", id))),
        }
    }

    /// Set the inferred name of a function block
    pub fn name_function(&mut self, id: BlockId, name: &str) -> Result<()> {
        self.function_mut(id)?.name = Some(name.to_string());
        Ok(())
    }

    /// Attach the comments preceding a declaration to its function block
    pub fn attach_docs(&mut self, id: BlockId, docs: Vec<BlockId>) -> Result<()> {
        self.function_mut(id)?.docs = docs;
        Ok(())
    }

    /// Replace the interior text of a bracket group. Used while the
    /// partitioner combines structures inside groups and when a constructor
    /// body gets its superclass call rewritten.
    pub fn set_group_code(&mut self, id: BlockId, code: String) -> Result<()> {
        match self.blocks.get_mut(&id) {
            Some(Block::RoundGroup(old) | Block::CurlyGroup(old) | Block::SquareGroup(old)) => {
                *old = code;
                Ok(())
            }
            Some(_) => Err(Error::internal(format!("{} is not a bracket group", id))),
            None => Err(Error::internal(format!("dangling placeholder {}", id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential_per_kind() {
        let mut table = BlockTable::new();
        let a = table.insert(Block::String("'a'".to_string()));
        let b = table.insert(Block::RoundGroup("x".to_string()));
        let c = table.insert(Block::String("'c'".to_string()));
        assert_eq!(a.to_string(), "@BLOCK_STRING_1@");
        assert_eq!(b.to_string(), "@BLOCK_ROUNDBLOCK_1@");
        assert_eq!(c.to_string(), "@BLOCK_STRING_2@");
        assert_eq!(table.len(), 3);
        assert_eq!(table.count_of(BlockKind::String), 2);
    }

    #[test]
    fn test_lookup_requires_registered_id() {
        let mut table = BlockTable::new();
        let id = table.insert(Block::Regex("/a/".to_string()));
        assert!(table.lookup(&id.to_string()).is_some());
        assert!(table.lookup("@BLOCK_REGEX_2@").is_none());
        assert!(matches!(
            table.get(BlockId::new(BlockKind::If, 1)),
            Err(Error::Internal { .. })
        ));
    }

    #[test]
    fn test_function_mutators_reject_other_kinds() {
        let mut table = BlockTable::new();
        let id = table.insert(Block::CurlyGroup(String::new()));
        assert!(table.name_function(id, "foo").is_err());
        assert!(table.set_group_code(id, "x;".to_string()).is_ok());
        assert_eq!(table.group_code(id).unwrap(), "x;");
    }
}
