//! Scope-aware rewriter
//!
//! One [`Transcoder::run`] partitions a unit, walks its top-level
//! instructions into a [`Scope`], converts class-like functions, resolves
//! the export surface and reassembles the output text.

pub mod classes;
pub mod exports;
pub mod scope;
pub mod statements;

use crate::blocks::{BlockId, BlockKind, BlockTable};
use crate::cursor::InstructionCursor;
use crate::error::{Error, Result};
use crate::expand::{expand, expand_only};
use crate::partition::{partition, Partition};
use classes::{convert_to_class, is_class_like};
use exports::ExportSurface;
use once_cell::sync::Lazy;
use regex::Regex;
use scope::{Scope, ScopeValue};
use statements::{classify, Statement, StatementContext};
use std::collections::HashMap;

pub use scope::ObjectScope;

/// Export convention of factory bodies
pub static RETURN_EXPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^return\s+(.*)$").expect("return export pattern"));

pub const DEFAULT_REGISTER_FN: &str = "Provide";

/// Regex source matching `name` at identifier boundaries
pub(crate) fn name_pattern(name: &str) -> String {
    let word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let escaped = regex::escape(name);
    format!(
        "{}{}{}",
        if name.starts_with(word) { r"\b" } else { "" },
        escaped,
        if name.ends_with(word) { r"\b" } else { "" }
    )
}

/// Conversion settings for one unit
#[derive(Debug, Clone)]
pub struct Transcoder {
    module_name: String,
    export_pattern: Regex,
    export_group: usize,
    register_fn: String,
    injected: Vec<String>,
}

impl Transcoder {
    pub fn new(module_name: impl Into<String>, export_pattern: Regex, export_group: usize) -> Self {
        Self {
            module_name: module_name.into(),
            export_pattern,
            export_group,
            register_fn: DEFAULT_REGISTER_FN.to_string(),
            injected: Vec::new(),
        }
    }

    /// A transcoder for factory bodies, which export with `return <expr>;`
    pub fn for_factory(module_name: impl Into<String>) -> Self {
        Self::new(module_name, RETURN_EXPORT.clone(), 1)
    }

    pub fn with_register_fn(mut self, register_fn: impl Into<String>) -> Self {
        self.register_fn = register_fn.into();
        self
    }

    /// Names bound outside the unit. They resolve like declarations but are
    /// never emitted.
    pub fn with_injected<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.injected.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn run(&self, input: &str) -> Result<String> {
        let Partition { code, table } = partition(input)?;
        let mut run = Run::new(self, table);
        run.hoist(&code)?;
        run.walk(&code)?;
        run.convert_classes()?;
        run.resolve_exports()?;
        run.emit()
    }

    fn registration_call(&self, argument: &str) -> String {
        format!("{}('{}')({});", self.register_fn, self.module_name, argument)
    }

    fn registration_annotation(&self) -> String {
        format!("@{}('{}')", self.register_fn, self.module_name)
    }
}

/// State of one conversion run; dropped when the run ends
pub(crate) struct Run<'t> {
    transcoder: &'t Transcoder,
    table: BlockTable,
    scope: Scope,
    /// Derived name to parent name
    inheritance: HashMap<String, String>,
    export: Option<String>,
    surface: ExportSurface,
}

impl<'t> Run<'t> {
    fn new(transcoder: &'t Transcoder, table: BlockTable) -> Self {
        let mut scope = Scope::new();
        for name in &transcoder.injected {
            scope.inject(name);
        }
        Self {
            transcoder,
            table,
            scope,
            inheritance: HashMap::new(),
            export: None,
            surface: ExportSurface::default(),
        }
    }

    /// Make every named top-level function visible before the walk
    fn hoist(&mut self, code: &str) -> Result<()> {
        for instruction in InstructionCursor::new(code) {
            let Some(id) = BlockId::parse(instruction?).filter(|id| id.is(BlockKind::Function))
            else {
                continue;
            };
            if let Some(name) = self.table.function(id)?.name.clone() {
                self.scope.hoist(&name, ScopeValue::Block(id));
            }
        }
        Ok(())
    }

    fn walk(&mut self, code: &str) -> Result<()> {
        let mut docs: Vec<BlockId> = Vec::new();
        let mut count = 0usize;
        for instruction in InstructionCursor::new(code) {
            let instruction = instruction?;
            count += 1;
            let statement = {
                let context = StatementContext {
                    table: &self.table,
                    export_pattern: &self.transcoder.export_pattern,
                    export_group: self.transcoder.export_group,
                };
                classify(instruction, &context)?
            };

            match statement {
                Statement::Comment(id) => {
                    docs.push(id);
                    continue;
                }
                Statement::Directive => {}
                Statement::Declaration(declarators) => {
                    for declarator in declarators {
                        let value = match declarator.init {
                            Some(init) => ScopeValue::parse(init, &self.table)?,
                            None => ScopeValue::Undefined,
                        };
                        if let Some(id) = value.function() {
                            self.table.name_function(id, declarator.name)?;
                            self.table.attach_docs(id, std::mem::take(&mut docs))?;
                        }
                        self.scope.declare(declarator.name, value);
                    }
                }
                Statement::FunctionDeclaration(id) => {
                    let name = self.table.function(id)?.name.clone().ok_or_else(|| {
                        Error::unsupported("anonymous function used as a statement")
                    })?;
                    self.table.attach_docs(id, std::mem::take(&mut docs))?;
                    self.scope.declare(&name, ScopeValue::Block(id));
                }
                Statement::Export(token) => {
                    if self.export.is_some() {
                        return Err(Error::UnsupportedExportShape {
                            token: expand(token, &self.table)?,
                            reason: "a unit can only export once".to_string(),
                        });
                    }
                    if let Some(id) = BlockId::parse(token).filter(|id| id.is(BlockKind::Function)) {
                        self.table.attach_docs(id, std::mem::take(&mut docs))?;
                    }
                    self.export = Some(token.to_string());
                }
                Statement::Inherits { derived, parent } => {
                    if !self.scope.contains(&derived) {
                        return Err(Error::UnresolvedReference {
                            path: format!("{} extends {}", derived, parent),
                            name: derived,
                        });
                    }
                    self.inheritance.insert(derived, parent);
                }
                Statement::Assignment { path, value } => {
                    let value = ScopeValue::parse(value, &self.table)?;
                    if let Some(id) = value.function() {
                        self.table.attach_docs(id, std::mem::take(&mut docs))?;
                    }
                    self.scope.assign_path(&path, value)?;
                }
            }
            docs.clear();
        }
        log::debug!("Walked {} top-level instructions", count);
        Ok(())
    }

    /// Replace every class-like function in scope with a synthesized class
    fn convert_classes(&mut self) -> Result<()> {
        for name in self.scope.names() {
            let Some(id) = self.scope.get(&name).and_then(ScopeValue::function) else {
                continue;
            };
            let parent = self.inheritance.get(&name).cloned();
            if parent.is_none() && !is_class_like(id, &self.table, self.scope.members_of(id))? {
                continue;
            }
            let class = convert_to_class(
                &mut self.table,
                id,
                &name,
                parent.as_deref(),
                self.scope.members_of(id),
            )?;
            self.scope.replace(&name, ScopeValue::Block(class));
        }
        Ok(())
    }

    fn emit(&self) -> Result<String> {
        let mut output = String::new();
        for (name, value) in self.scope.emission_order() {
            match value {
                ScopeValue::Block(id) if id.is(BlockKind::Class) => {
                    output.push('\n');
                    if let Some(annotation) = self.surface.annotations.get(name) {
                        output.push_str(annotation);
                        output.push('\n');
                    }
                    output.push_str(&format!("{}\n", id));
                }
                ScopeValue::Block(id) if id.is(BlockKind::Function) => {
                    output.push_str(&format!("{}\n", id));
                }
                ScopeValue::Injected => {}
                ScopeValue::Undefined => output.push_str(&format!("let {};\n", name)),
                value => output.push_str(&format!("let {} = {};\n", name, value.serialize())),
            }
        }

        if !self.surface.exported.is_empty() {
            let names: Vec<&str> = self.surface.exported.iter().map(String::as_str).collect();
            output.push_str(&format!("\nexport {{\n{}\n}}\n", names.join(",\n")));
        }
        if let Some(registration) = &self.surface.registration {
            output.push('\n');
            output.push_str(registration);
        }

        let mut text = expand_only(&output, &self.table, &BlockKind::structural())?;
        for rename in &self.surface.renames {
            text = rename.apply(&text)?;
        }
        let mut text = expand(&text, &self.table)?;
        text.push('\n');
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(source: &str) -> Result<String> {
        Transcoder::for_factory("my-module").run(source)
    }

    #[test]
    fn test_name_pattern_boundaries() {
        assert_eq!(name_pattern("api"), r"\bapi\b");
        assert_eq!(name_pattern("$q"), r"\$q\b");
    }

    #[test]
    fn test_exported_function() {
        let output = convert("function helper(a) { return a; } return helper;").unwrap();
        assert!(output.contains("function helper (a) {"));
        assert!(output.contains("export {\nhelper\n}"));
        assert!(output.trim_end().ends_with("Provide('my-module')(helper);"));
    }

    #[test]
    fn test_data_before_declarations() {
        let output = convert("function f() {} var a = 1; var b; return f;").unwrap();
        let a = output.find("let a = 1;").unwrap();
        let b = output.find("let b;").unwrap();
        let f = output.find("function f").unwrap();
        assert!(a < b && b < f);
    }

    #[test]
    fn test_hoisted_function_is_visible_before_declaration() {
        let output = convert("Later.VERSION = 2; function Later() {} return Later;").unwrap();
        assert!(output.contains("public static VERSION = 2;"));
    }

    #[test]
    fn test_docs_attach_to_following_function() {
        let output = convert("/** Adds. */\nfunction add(a, b) { return a + b; } return add;").unwrap();
        assert!(output.contains("/** Adds. */\nfunction add"));
    }

    #[test]
    fn test_second_export_is_rejected() {
        assert!(matches!(
            convert("var a = 1; return a; return a;"),
            Err(Error::UnsupportedExportShape { .. })
        ));
    }

    #[test]
    fn test_member_named_like_return_is_an_assignment() {
        let output = convert(
            "function Dialog() { this.open = false; } \
             Dialog.prototype.onreturn = function () {}; \
             return Dialog;",
        )
        .unwrap();
        assert!(output.contains("class Dialog {"));
        assert!(output.contains("public onreturn() {"));
        assert!(output.contains("export {\nDialog\n}"));
    }

    #[test]
    fn test_missing_export() {
        assert_eq!(convert("var a = 1;"), Err(Error::MissingExport));
    }

    #[test]
    fn test_undeclared_inheritance_target() {
        assert!(matches!(
            convert("util.inherits(Derived, Base); return Base;"),
            Err(Error::UnresolvedReference { ref name, .. }) if name == "Derived"
        ));
    }

    #[test]
    fn test_injected_binding_is_not_declared() {
        let output = Transcoder::for_factory("mod")
            .with_injected(["dep"])
            .run("return dep;")
            .unwrap();
        assert_eq!(output.trim(), "Provide('mod')(dep);");
    }

    #[test]
    fn test_injected_binding_cannot_be_reassigned() {
        let result = Transcoder::for_factory("mod")
            .with_injected(["dep"])
            .run("function f() { return dep; } dep = wrap(dep); return f;");
        assert!(matches!(result, Err(Error::UnsupportedSyntax { .. })));
    }

    #[test]
    fn test_custom_export_convention() {
        let pattern = Regex::new(r"^module\.exports\s*=\s*(.*)$").unwrap();
        let output = Transcoder::new("util", pattern, 1)
            .with_register_fn("Register")
            .run("function util() {} module.exports = util;")
            .unwrap();
        assert!(output.contains("Register('util')(util);"));
    }
}
