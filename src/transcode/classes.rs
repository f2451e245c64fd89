//! Prototype-to-class conversion
//!
//! A constructor function plus its prototype and static members becomes one
//! class block. Static members come first, then instance members, then
//! instance properties inferred from `this.<name> =` assignments.

use super::name_pattern;
use super::scope::{new_container, ObjectScope, ScopeValue, PROTOTYPE};
use crate::blocks::{
    Block, BlockId, BlockKind, BlockTable, ClassBlock, ClassMethodBlock, ClassPropertyBlock,
    ConstructorBlock, Visibility, VAR_NAME_PATTERN,
};
use crate::error::{Error, Result};
use crate::expand::expand_only;
use once_cell::sync::Lazy;
use regex::Regex;

static THIS_MEMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"this\.({VAR_NAME_PATTERN})\s*=")).expect("member assignment pattern")
});

static LEGACY_SUPER_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"[_$\w]+\.__super\.call\s*({})\s*;",
        BlockId::pattern(BlockKind::RoundGroup)
    ))
    .expect("super call pattern")
});

static THIS_ARGUMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*this\s*(?:,|$)").expect("this argument pattern"));

/// Names assigned through `this.<name> =` in a body, looking through
/// blocks and control flow but not into nested functions. First-occurrence
/// order, no duplicates.
pub fn instance_assignments(body: BlockId, table: &BlockTable) -> Result<Vec<String>> {
    let code = expand_only(&body.to_string(), table, &BlockKind::SAME_SCOPE)?;
    let mut names: Vec<String> = Vec::new();
    for caps in THIS_MEMBER.captures_iter(&code) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // `this.x == y` and `this.x === y` are comparisons
        if code[whole.end()..].starts_with('=') {
            continue;
        }
        if !names.iter().any(|known| known == name.as_str()) {
            names.push(name.as_str().to_string());
        }
    }
    Ok(names)
}

/// A function is used as a class when it assigns members on `this` or its
/// member container holds anything beyond an empty prototype
pub fn is_class_like(
    function: BlockId,
    table: &BlockTable,
    members: Option<&ObjectScope>,
) -> Result<bool> {
    if !function.is(BlockKind::Function) {
        return Ok(false);
    }
    if !instance_assignments(table.function(function)?.body, table)?.is_empty() {
        return Ok(true);
    }
    Ok(members.map_or(false, |members| {
        members.iter().any(|(name, value)| {
            name != PROTOTYPE || !matches!(value, ScopeValue::Object(prototype) if prototype.is_empty())
        })
    }))
}

enum Member {
    Method { id: BlockId, body: BlockId },
    Property(BlockId),
}

fn member_block(
    table: &mut BlockTable,
    name: &str,
    value: &ScopeValue,
    is_static: bool,
) -> Result<Member> {
    if let Some(function) = value.function() {
        let function = table.function(function)?.clone();
        let id = table.insert(Block::ClassMethod(ClassMethodBlock {
            header: function.header,
            body: function.body,
            name: name.to_string(),
            visibility: Visibility::Public,
            is_static,
            docs: function.docs,
        }));
        return Ok(Member::Method {
            id,
            body: function.body,
        });
    }

    let initializer = match value {
        ScopeValue::Undefined => None,
        other => Some(other.serialize()),
    };
    Ok(Member::Property(table.insert(Block::ClassProperty(
        ClassPropertyBlock {
            name: name.to_string(),
            visibility: Visibility::Public,
            is_static,
            initializer,
        },
    ))))
}

/// Rewrite the first explicit superclass invocation in a constructor body
/// into `super(...)`, dropping its leading `this` argument
fn rewrite_super_call(table: &mut BlockTable, body: BlockId, parent: Option<&str>) -> Result<()> {
    let mut patterns = vec![LEGACY_SUPER_CALL.clone()];
    if let Some(parent) = parent {
        let parent_call = format!(
            r"{}\.call\s*({})\s*;",
            name_pattern(parent),
            BlockId::pattern(BlockKind::RoundGroup)
        );
        patterns.push(
            Regex::new(&parent_call)
                .map_err(|e| Error::internal(format!("invalid parent pattern: {}", e)))?,
        );
    }

    let code = table.group_code(body)?.to_string();
    for pattern in &patterns {
        let Some(caps) = pattern.captures(&code) else {
            continue;
        };
        let (Some(whole), Some(arguments)) = (
            caps.get(0),
            caps.get(1).and_then(|m| BlockId::parse(m.as_str())),
        ) else {
            continue;
        };
        let argument_code = table.group_code(arguments)?.to_string();
        let Some(this_argument) = THIS_ARGUMENT.find(&argument_code) else {
            continue;
        };

        let forwarded = argument_code[this_argument.end()..].trim_start().to_string();
        let super_arguments = table.insert(Block::RoundGroup(forwarded));
        let rewritten = format!(
            "{}super{};{}",
            &code[..whole.start()],
            super_arguments,
            &code[whole.end()..]
        );
        table.set_group_code(body, rewritten)?;
        log::debug!("Rewrote superclass call in constructor body {}", body);
        return Ok(());
    }
    Ok(())
}

/// Synthesize a class block from a constructor function and its members
pub fn convert_to_class(
    table: &mut BlockTable,
    function_id: BlockId,
    class_name: &str,
    parent: Option<&str>,
    members: Option<&ObjectScope>,
) -> Result<BlockId> {
    let function = table.function(function_id)?.clone();
    let container = members.cloned().unwrap_or_else(new_container);
    let prototype = match container.get(PROTOTYPE) {
        None => ObjectScope::new(),
        Some(ScopeValue::Object(prototype)) => prototype.clone(),
        Some(_) => {
            return Err(Error::unsupported(format!(
                "prototype of '{}' is replaced by something other than an object literal",
                class_name
            )))
        }
    };

    let mut instance_methods = Vec::new();
    let mut instance_properties = Vec::new();
    let mut method_names = Vec::new();
    let mut explicit_names = Vec::new();
    let mut bodies = vec![function.body];
    for (name, value) in &prototype {
        match member_block(table, name, value, false)? {
            Member::Method { id, body } => {
                instance_methods.push(id);
                method_names.push(name.clone());
                bodies.push(body);
            }
            Member::Property(id) => {
                instance_properties.push(id);
                explicit_names.push(name.clone());
            }
        }
    }

    let mut static_methods = Vec::new();
    let mut static_properties = Vec::new();
    for (name, value) in container.iter().filter(|(name, _)| name.as_str() != PROTOTYPE) {
        match member_block(table, name, value, true)? {
            Member::Method { id, .. } => static_methods.push(id),
            Member::Property(id) => static_properties.push(id),
        }
    }

    let constructor = table.insert(Block::Constructor(ConstructorBlock {
        header: function.header,
        body: function.body,
        docs: function.docs.clone(),
    }));
    rewrite_super_call(table, function.body, parent)?;

    let mut inferred: Vec<String> = Vec::new();
    for body in bodies {
        for name in instance_assignments(body, table)? {
            if !explicit_names.contains(&name)
                && !method_names.contains(&name)
                && !inferred.contains(&name)
            {
                inferred.push(name);
            }
        }
    }
    for name in &inferred {
        instance_properties.push(table.insert(Block::ClassProperty(ClassPropertyBlock {
            name: name.clone(),
            visibility: Visibility::Public,
            is_static: false,
            initializer: None,
        })));
    }

    let methods: Vec<BlockId> = static_methods.into_iter().chain(instance_methods).collect();
    let properties: Vec<BlockId> = static_properties
        .into_iter()
        .chain(instance_properties)
        .collect();

    log::debug!(
        "Converted '{}' into a class: {} methods, {} properties ({} inferred)",
        class_name,
        methods.len(),
        properties.len(),
        inferred.len()
    );

    Ok(table.insert(Block::Class(ClassBlock {
        name: class_name.to_string(),
        parent: parent.map(str::to_string),
        constructor,
        methods,
        properties,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::expand;
    use crate::partition::partition;

    fn function_of(source: &str) -> (BlockId, BlockTable) {
        let result = partition(source).unwrap();
        (BlockId::parse(result.code.trim()).unwrap(), result.table)
    }

    #[test]
    fn test_this_assignment_makes_class_like() {
        let (id, table) = function_of("function Foo() { this.x = 1; }");
        assert!(is_class_like(id, &table, None).unwrap());

        let (id, table) = function_of("function foo() { var x = 1; }");
        assert!(!is_class_like(id, &table, None).unwrap());
    }

    #[test]
    fn test_nested_function_assignments_do_not_count() {
        let (id, table) = function_of("function foo() { run(function () { this.x = 1; }); }");
        assert!(!is_class_like(id, &table, None).unwrap());
    }

    #[test]
    fn test_comparisons_do_not_count() {
        let (id, table) = function_of("function foo() { if (this.x == 1) { go(); } }");
        assert!(!is_class_like(id, &table, None).unwrap());
    }

    #[test]
    fn test_prototype_member_makes_class_like() {
        let (id, table) = function_of("function Foo() {}");
        let mut members = new_container();
        assert!(!is_class_like(id, &table, Some(&members)).unwrap());
        if let Some(ScopeValue::Object(prototype)) = members.get_mut(PROTOTYPE) {
            prototype.insert("size".to_string(), ScopeValue::Literal("1".to_string()));
        }
        assert!(is_class_like(id, &table, Some(&members)).unwrap());

        let mut statics = new_container();
        statics.insert("VERSION".to_string(), ScopeValue::Literal("2".to_string()));
        assert!(is_class_like(id, &table, Some(&statics)).unwrap());
    }

    #[test]
    fn test_convert_with_legacy_super_call() {
        let (id, mut table) =
            function_of("function Foo(a) { Foo.__super.call(this, a); this.a = a; this.b = 2; }");
        let class = convert_to_class(&mut table, id, "Foo", Some("Bar"), None).unwrap();
        let text = expand(&class.to_string(), &table).unwrap();
        assert!(text.starts_with("class Foo extends Bar {"));
        assert!(text.contains("super(a);"));
        assert!(!text.contains("__super"));
        assert!(text.contains("public a;"));
        assert!(text.contains("public b;"));
    }

    #[test]
    fn test_convert_with_parent_call() {
        let (id, mut table) = function_of("function Foo() { Base.call(this); this.x = 1; }");
        let class = convert_to_class(&mut table, id, "Foo", Some("Base"), None).unwrap();
        let text = expand(&class.to_string(), &table).unwrap();
        assert!(text.contains("super();"));
    }
}
