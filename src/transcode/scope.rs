//! Top-level symbol scope of one conversion run

use crate::blocks::{is_var_name, Block, BlockId, BlockKind, BlockTable};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Members of an object literal or of a function's static surface,
/// in insertion order
pub type ObjectScope = IndexMap<String, ScopeValue>;

pub const PROTOTYPE: &str = "prototype";

#[derive(Debug, Clone, PartialEq)]
pub enum ScopeValue {
    /// A placeholder: function, class, string, regex, group...
    Block(BlockId),
    /// A recursively expanded object literal
    Object(ObjectScope),
    /// Any other expression, kept as (partitioned) text
    Literal(String),
    /// Declared without an initializer
    Undefined,
    /// Bound outside the unit (an injected dependency)
    Injected,
}

impl ScopeValue {
    pub fn block(&self, kind: BlockKind) -> Option<BlockId> {
        match self {
            ScopeValue::Block(id) if id.is(kind) => Some(*id),
            _ => None,
        }
    }

    pub fn function(&self) -> Option<BlockId> {
        self.block(BlockKind::Function)
    }

    /// Functions and classes are emitted after all data declarations
    pub fn is_declaration(&self) -> bool {
        matches!(self, ScopeValue::Block(id) if id.is(BlockKind::Function) || id.is(BlockKind::Class))
    }

    /// Parse an initializer, expanding object literals into nested scopes
    pub fn parse(text: &str, table: &BlockTable) -> Result<Self> {
        let text = text.trim();
        let Some((id, block)) = table.lookup(text) else {
            return Ok(ScopeValue::Literal(text.to_string()));
        };
        let Block::Object { body } = block else {
            return Ok(ScopeValue::Block(id));
        };

        let mut object = ObjectScope::new();
        // Nested commas are hidden inside placeholders
        for pair in table.group_code(*body)?.split(',').map(str::trim) {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once(':').ok_or_else(|| {
                Error::unsupported(format!("object member without a value: {}", pair))
            })?;
            object.insert(key.trim().to_string(), ScopeValue::parse(value, table)?);
        }
        Ok(ScopeValue::Object(object))
    }

    /// Text form for emission; placeholders are expanded later
    pub fn serialize(&self) -> String {
        match self {
            ScopeValue::Block(id) => id.to_string(),
            ScopeValue::Literal(text) => text.clone(),
            ScopeValue::Undefined | ScopeValue::Injected => "undefined".to_string(),
            ScopeValue::Object(object) if object.is_empty() => "{}".to_string(),
            ScopeValue::Object(object) => {
                let members: Vec<String> = object
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, value.serialize()))
                    .collect();
                format!("{{\n{}\n}}", members.join(",\n"))
            }
        }
    }
}

pub fn new_container() -> ObjectScope {
    let mut container = ObjectScope::new();
    container.insert(PROTOTYPE.to_string(), ScopeValue::Object(ObjectScope::new()));
    container
}

/// Where a member-assignment walk currently points
#[derive(Debug, Clone)]
enum Anchor {
    Binding(String),
    Members(BlockId),
}

/// Declared names, their values and their emission order
#[derive(Debug, Default)]
pub struct Scope {
    bindings: IndexMap<String, ScopeValue>,
    order: IndexMap<String, u64>,
    next_seq: u64,
    /// Static and prototype members assigned onto function values
    members: HashMap<BlockId, ObjectScope>,
}

/// Emission position: every data declaration sorts before every
/// function or class declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OrderKey {
    Data(u64),
    Declaration(u64),
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind without an emission slot (hoisting pre-scan)
    pub fn hoist(&mut self, name: &str, value: ScopeValue) {
        self.bindings.insert(name.to_string(), value);
    }

    pub fn inject(&mut self, name: &str) {
        self.bindings.insert(name.to_string(), ScopeValue::Injected);
    }

    /// Bind and give the name an emission slot at first declaration
    pub fn declare(&mut self, name: &str, value: ScopeValue) {
        self.bindings.insert(name.to_string(), value);
        if !self.order.contains_key(name) {
            self.order.insert(name.to_string(), self.next_seq);
            self.next_seq += 1;
        }
    }

    /// Replace the value of an existing binding, keeping its slot
    pub fn replace(&mut self, name: &str, value: ScopeValue) {
        self.bindings.insert(name.to_string(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<ScopeValue> {
        self.order.shift_remove(name);
        self.bindings.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&ScopeValue> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    pub fn members_of(&self, function: BlockId) -> Option<&ObjectScope> {
        self.members.get(&function)
    }

    pub fn order_key(&self, name: &str) -> Option<OrderKey> {
        let seq = *self.order.get(name)?;
        let value = self.bindings.get(name)?;
        Some(if value.is_declaration() {
            OrderKey::Declaration(seq)
        } else {
            OrderKey::Data(seq)
        })
    }

    /// Names with an emission slot, data first then declarations, each in
    /// first-assignment order
    pub fn emission_order(&self) -> Vec<(&str, &ScopeValue)> {
        let mut names: Vec<(OrderKey, &str)> = self
            .order
            .keys()
            .filter_map(|name| Some((self.order_key(name)?, name.as_str())))
            .collect();
        names.sort();
        names
            .into_iter()
            .filter_map(|(_, name)| Some((name, self.bindings.get(name)?)))
            .collect()
    }

    /// `a.b.c = value`: resolve every segment but the last, creating a
    /// `{prototype: {}}` member container the first time a function value
    /// is addressed through a dotted path
    pub fn assign_path(&mut self, path: &[&str], value: ScopeValue) -> Result<()> {
        let full = path.join(".");
        let (last, parents) = path
            .split_last()
            .ok_or_else(|| Error::internal("empty assignment path"))?;

        let Some((root, intermediate)) = parents.split_first() else {
            if !self.contains(last) {
                return Err(Error::UnresolvedReference {
                    name: last.to_string(),
                    path: full,
                });
            }
            if matches!(self.bindings.get(*last), Some(ScopeValue::Injected)) {
                return Err(Error::unsupported(format!(
                    "reassignment of injected dependency '{}'",
                    last
                )));
            }
            self.replace(last, value);
            return Ok(());
        };

        let mut anchor = match classify_segment(root, self.bindings.get(*root), &full)? {
            Segment::Object => Anchor::Binding(root.to_string()),
            Segment::Function(id) => self.function_anchor(id),
        };
        let mut keys: Vec<String> = Vec::new();
        for segment in intermediate {
            let step = {
                let current = self.container(&anchor, &keys).ok_or_else(|| {
                    Error::internal(format!("lost container while resolving {}", full))
                })?;
                classify_segment(segment, current.get(*segment), &full)?
            };
            match step {
                Segment::Object => keys.push(segment.to_string()),
                Segment::Function(id) => {
                    anchor = self.function_anchor(id);
                    keys.clear();
                }
            }
        }

        let target = self
            .container_mut(&anchor, &keys)
            .ok_or_else(|| Error::internal(format!("lost container while resolving {}", full)))?;
        target.insert(last.to_string(), value);
        Ok(())
    }

    fn function_anchor(&mut self, id: BlockId) -> Anchor {
        self.members.entry(id).or_insert_with(new_container);
        Anchor::Members(id)
    }

    fn container(&self, anchor: &Anchor, keys: &[String]) -> Option<&ObjectScope> {
        let mut current = match anchor {
            Anchor::Binding(name) => match self.bindings.get(name)? {
                ScopeValue::Object(object) => object,
                _ => return None,
            },
            Anchor::Members(id) => self.members.get(id)?,
        };
        for key in keys {
            current = match current.get(key)? {
                ScopeValue::Object(object) => object,
                _ => return None,
            };
        }
        Some(current)
    }

    fn container_mut(&mut self, anchor: &Anchor, keys: &[String]) -> Option<&mut ObjectScope> {
        let mut current = match anchor {
            Anchor::Binding(name) => match self.bindings.get_mut(name)? {
                ScopeValue::Object(object) => object,
                _ => return None,
            },
            Anchor::Members(id) => self.members.get_mut(id)?,
        };
        for key in keys {
            current = match current.get_mut(key)? {
                ScopeValue::Object(object) => object,
                _ => return None,
            };
        }
        Some(current)
    }
}

/// What a dotted path can step through
enum Segment {
    Object,
    Function(BlockId),
}

fn classify_segment(segment: &str, value: Option<&ScopeValue>, full: &str) -> Result<Segment> {
    match value {
        None => Err(Error::UnresolvedReference {
            name: segment.to_string(),
            path: full.to_string(),
        }),
        Some(ScopeValue::Object(_)) => Ok(Segment::Object),
        Some(ScopeValue::Block(id)) if id.is(BlockKind::Function) => Ok(Segment::Function(*id)),
        Some(_) => Err(Error::InvalidMemberTarget {
            segment: segment.to_string(),
            path: full.to_string(),
        }),
    }
}

/// Identifier-shaped literal that actually names a value rather than being
/// a keyword constant
pub fn is_reference(text: &str) -> bool {
    is_var_name(text) && !matches!(text, "true" | "false" | "null" | "undefined" | "this" | "NaN")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;

    #[test]
    fn test_parse_object_literal() {
        let result = partition("x = {a: 1, b: {c: 'd'}, e: function () {}};").unwrap();
        let literal = result.code.trim_start_matches("x = ").trim_end_matches(';');
        let ScopeValue::Object(object) = ScopeValue::parse(literal, &result.table).unwrap() else {
            panic!("expected an object");
        };
        assert_eq!(object.keys().collect::<Vec<_>>(), vec!["a", "b", "e"]);
        assert_eq!(object["a"], ScopeValue::Literal("1".to_string()));
        assert!(matches!(&object["b"], ScopeValue::Object(inner) if inner.len() == 1));
        assert!(object["e"].function().is_some());
    }

    #[test]
    fn test_object_member_without_value() {
        let result = partition("x = {a};").unwrap();
        let literal = result.code.trim_start_matches("x = ").trim_end_matches(';');
        assert!(matches!(
            ScopeValue::parse(literal, &result.table),
            Err(Error::UnsupportedSyntax { .. })
        ));
    }

    #[test]
    fn test_emission_order_puts_data_first() {
        let mut table = BlockTable::new();
        let header = table.insert(Block::RoundGroup(String::new()));
        let body = table.insert(Block::CurlyGroup(String::new()));
        let function = table.insert(Block::Function(crate::blocks::FunctionBlock {
            header,
            body,
            name: Some("f".to_string()),
            docs: Vec::new(),
        }));

        let mut scope = Scope::new();
        scope.declare("f", ScopeValue::Block(function));
        scope.declare("a", ScopeValue::Literal("1".to_string()));
        scope.declare("b", ScopeValue::Undefined);
        let names: Vec<_> = scope.emission_order().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b", "f"]);
        assert!(scope.order_key("a").unwrap() < scope.order_key("f").unwrap());
    }

    #[test]
    fn test_assign_path_creates_function_container() {
        let result = partition("function Foo() {}").unwrap();
        let id = BlockId::parse(&result.code).unwrap();
        let mut scope = Scope::new();
        scope.declare("Foo", ScopeValue::Block(id));
        scope
            .assign_path(&["Foo", "prototype", "bar"], ScopeValue::Literal("1".to_string()))
            .unwrap();
        scope
            .assign_path(&["Foo", "VERSION"], ScopeValue::Literal("2".to_string()))
            .unwrap();

        let members = scope.members_of(id).unwrap();
        assert_eq!(members.keys().collect::<Vec<_>>(), vec!["prototype", "VERSION"]);
        assert!(matches!(&members["prototype"], ScopeValue::Object(p) if p.contains_key("bar")));
    }

    #[test]
    fn test_assign_path_errors() {
        let mut scope = Scope::new();
        scope.declare("n", ScopeValue::Literal("1".to_string()));
        scope.declare("o", ScopeValue::Object(ObjectScope::new()));

        assert!(matches!(
            scope.assign_path(&["missing", "x"], ScopeValue::Undefined),
            Err(Error::UnresolvedReference { ref name, .. }) if name == "missing"
        ));
        assert!(matches!(
            scope.assign_path(&["o", "inner", "x"], ScopeValue::Undefined),
            Err(Error::UnresolvedReference { ref name, .. }) if name == "inner"
        ));
        assert!(matches!(
            scope.assign_path(&["n", "x"], ScopeValue::Undefined),
            Err(Error::InvalidMemberTarget { .. })
        ));
        assert!(matches!(
            scope.assign_path(&["undeclared"], ScopeValue::Undefined),
            Err(Error::UnresolvedReference { .. })
        ));
        scope.assign_path(&["o", "x"], ScopeValue::Undefined).unwrap();
    }
}
