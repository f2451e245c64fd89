//! Factory-registration drivers
//!
//! A unit is a file holding exactly one `<path>.factory(name, ...)` call.
//! The driver validates the top level, turns the factory's dependencies into
//! injected locals and hands the factory body to a fresh [`Transcoder`].

use crate::blocks::{Block, BlockId, BlockKind, BlockTable};
use crate::cursor::InstructionCursor;
use crate::error::{Error, Result};
use crate::expand::expand;
use crate::options::{ConvertOptions, DriverFlavor};
use crate::partition::{partition, Partition};
use crate::transcode::Transcoder;
use once_cell::sync::Lazy;
use regex::Regex;

static FACTORY_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?:[$_\w]+\s*\.\s*)*factory\s*({})$",
        BlockId::pattern(BlockKind::RoundGroup)
    ))
    .expect("factory call pattern")
});

static FEATURE_FLAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^add(?:Boolean|Number|String)Flag\s*{}$",
        BlockId::pattern(BlockKind::RoundGroup)
    ))
    .expect("feature flag pattern")
});

static USE_STRICT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^["']use\s+strict["']$"#).expect("directive pattern"));

/// A recognized factory registration
#[derive(Debug, Clone, PartialEq)]
pub struct Factory {
    pub module_name: String,
    /// Dependency strings, in declaration order
    pub dependencies: Vec<String>,
    /// Local binding of each dependency inside the body
    pub locals: Vec<String>,
    /// Body of the factory function, fully expanded
    pub body: String,
}

enum TopLevel {
    Comment(BlockId),
    Directive,
    Flag,
    Factory(BlockId),
}

pub struct FactoryDriver {
    options: ConvertOptions,
}

impl FactoryDriver {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert a whole unit
    pub fn convert(&self, source: &str) -> Result<String> {
        let Partition { code, table } = partition(source)?;
        let mut output = String::new();
        let mut converted = false;

        for instruction in InstructionCursor::new(&code) {
            let instruction = instruction?;
            match self.classify(instruction, &table)? {
                TopLevel::Comment(id) => {
                    output.push_str(&expand(&id.to_string(), &table)?);
                    if id.is(BlockKind::BlockComment) {
                        output.push('\n');
                    }
                }
                TopLevel::Directive => {}
                TopLevel::Flag => {
                    output.push_str(&expand(instruction, &table)?);
                    output.push_str(";\n");
                }
                TopLevel::Factory(arguments) => {
                    if converted {
                        return Err(Error::malformed_factory(
                            "only one factory registration is supported per file",
                        ));
                    }
                    let factory = self.read_factory(arguments, &table)?;
                    output.push_str(&self.convert_factory(&factory)?);
                    converted = true;
                }
            }
        }

        if !converted {
            return Err(Error::malformed_factory("no factory registration found"));
        }
        Ok(output)
    }

    fn classify(&self, instruction: &str, table: &BlockTable) -> Result<TopLevel> {
        if let Some(id) = BlockId::parse(instruction) {
            match table.get(id)? {
                Block::LineComment(_) | Block::BlockComment(_) => return Ok(TopLevel::Comment(id)),
                Block::String(text) if USE_STRICT.is_match(text) => return Ok(TopLevel::Directive),
                _ => {}
            }
        }
        if let Some(arguments) = FACTORY_CALL
            .captures(instruction)
            .and_then(|caps| caps.get(1))
            .and_then(|m| BlockId::parse(m.as_str()))
        {
            return Ok(TopLevel::Factory(arguments));
        }
        if self.options.flavor == DriverFlavor::Angular && FEATURE_FLAG.is_match(instruction) {
            return Ok(TopLevel::Flag);
        }
        Err(Error::unsupported(format!(
            "top-level code outside the factory: {}",
            expand(instruction, table)?.trim()
        )))
    }

    /// Read `(name, [deps..., function])` or `(name, function)`
    pub fn read_factory(&self, arguments: BlockId, table: &BlockTable) -> Result<Factory> {
        let code = table.group_code(arguments)?;
        let parts: Vec<&str> = code.split(',').map(str::trim).collect();
        let [name, definition] = parts.as_slice() else {
            return Err(Error::malformed_factory(format!(
                "expected a name and a definition, found {} arguments",
                parts.len()
            )));
        };
        let module_name = string_value(name, table)
            .ok_or_else(|| Error::malformed_factory("factory name is not a string literal"))?;
        let definition = BlockId::parse(definition).ok_or_else(|| {
            Error::malformed_factory("factory definition is not an array or a function")
        })?;

        let (dependencies, function) = match definition.kind() {
            BlockKind::SquareGroup => {
                let items: Vec<&str> = table.group_code(definition)?.split(',').map(str::trim).collect();
                let (last, deps) = items
                    .split_last()
                    .ok_or_else(|| Error::malformed_factory("empty dependency array"))?;
                let function = BlockId::parse(last)
                    .filter(|id| id.is(BlockKind::Function))
                    .ok_or_else(|| {
                        Error::malformed_factory("dependency array does not end with a function")
                    })?;
                let deps = deps
                    .iter()
                    .map(|dep| {
                        string_value(dep, table).ok_or_else(|| {
                            Error::malformed_factory(format!(
                                "dependency {} is not a string literal",
                                expand(dep, table).unwrap_or_else(|_| dep.to_string())
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                (Some(deps), function)
            }
            BlockKind::Function if self.options.flavor == DriverFlavor::Angular => (None, definition),
            _ => {
                return Err(Error::malformed_factory(
                    "factory definition is not a dependency array",
                ))
            }
        };

        let function = table.function(function)?;
        let params: Vec<String> = table
            .group_code(function.header)?
            .split(',')
            .map(str::trim)
            .filter(|param| !param.is_empty())
            .map(str::to_string)
            .collect();
        let (dependencies, locals) = match dependencies {
            Some(deps) if deps.len() == params.len() => (deps, params),
            Some(deps) => (deps.clone(), deps),
            // Implicit injection by parameter name
            None => (params.clone(), params),
        };
        let body = expand(table.group_code(function.body)?, table)?;

        log::debug!(
            "Factory '{}' with {} dependencies",
            module_name,
            dependencies.len()
        );
        Ok(Factory {
            module_name,
            dependencies,
            locals,
            body,
        })
    }

    fn convert_factory(&self, factory: &Factory) -> Result<String> {
        let converted = Transcoder::for_factory(factory.module_name.as_str())
            .with_register_fn(self.options.register_fn.as_str())
            .with_injected(factory.locals.iter().cloned())
            .run(&factory.body)?;

        let mut output = String::from("\n");
        if self.options.flavor == DriverFlavor::Angular {
            let imports = if factory.dependencies.is_empty() {
                self.options.register_fn.clone()
            } else {
                format!("{}, {}", self.options.require_fn, self.options.register_fn)
            };
            output.push_str(&format!(
                "import {{{}}} from '{}';\n\n",
                imports, self.options.decorators_module
            ));
        }
        for (local, dependency) in factory.locals.iter().zip(&factory.dependencies) {
            output.push_str(&format!(
                "let {} = {}('{}');\n",
                local, self.options.require_fn, dependency
            ));
        }
        output.push('\n');
        output.push_str(&converted);
        Ok(output)
    }
}

/// Unquoted text of a string placeholder
fn string_value(text: &str, table: &BlockTable) -> Option<String> {
    match table.lookup(text)? {
        (_, Block::String(literal)) if literal.len() >= 2 => {
            Some(literal[1..literal.len() - 1].to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angular() -> FactoryDriver {
        FactoryDriver::new(ConvertOptions::default())
    }

    fn blink() -> FactoryDriver {
        FactoryDriver::new(ConvertOptions {
            flavor: DriverFlavor::Blink,
            ..ConvertOptions::default()
        })
    }

    #[test]
    fn test_dependency_array_form() {
        let output = angular()
            .convert("factory('mod', ['dep', function(dep){ return dep; }]);")
            .unwrap();
        assert!(output.contains("import {ngRequire, Provide} from 'src/base/decorators';"));
        assert!(output.contains("let dep = ngRequire('dep');"));
        assert!(output.contains("Provide('mod')(dep);"));
    }

    #[test]
    fn test_parameter_names_become_locals() {
        let output = angular()
            .convert("app.factory('mod', ['$http', function(http){ return http; }]);")
            .unwrap();
        assert!(output.contains("let http = ngRequire('$http');"));
        assert!(output.contains("Provide('mod')(http);"));
    }

    #[test]
    fn test_inline_function_form() {
        let output = angular()
            .convert("'use strict';\nblink.app.factory('mod', function($q) { return $q; });")
            .unwrap();
        assert!(output.contains("let $q = ngRequire('$q');"));
        assert!(!output.contains("use strict"));
    }

    #[test]
    fn test_no_dependencies_omits_require_import() {
        let output = angular()
            .convert("factory('mod', [function () { function F() {} return F; }]);")
            .unwrap();
        assert!(output.contains("import {Provide} from 'src/base/decorators';"));
        assert!(!output.contains("ngRequire"));
    }

    #[test]
    fn test_comments_and_flags_pass_through() {
        let output = angular()
            .convert(
                "// header\naddBooleanFlag('x', 'y', true);\n\
                 factory('mod', ['dep', function(dep){ return dep; }]);",
            )
            .unwrap();
        assert!(output.starts_with("// header\naddBooleanFlag('x', 'y', true);\n"));
    }

    #[test]
    fn test_blink_rejects_flags_and_inline_form() {
        assert!(matches!(
            blink().convert("addBooleanFlag('x');\nfactory('mod', ['d', function(d){ return d; }]);"),
            Err(Error::UnsupportedSyntax { .. })
        ));
        assert!(matches!(
            blink().convert("factory('mod', function(d){ return d; });"),
            Err(Error::MalformedFactory { .. })
        ));
        let output = blink()
            .convert("factory('mod', ['d', function(d){ return d; }]);")
            .unwrap();
        assert!(!output.contains("import"));
        assert!(output.contains("let d = ngRequire('d');"));
    }

    #[test]
    fn test_malformed_registrations() {
        for source in [
            "var x = 1;",
            "factory('a', ['d', function(d){ return d; }]); factory('b', ['d', function(d){ return d; }]);",
            "factory('a', [dep, function(dep){ return dep; }]);",
            "factory('a', ['dep']);",
            "factory(name, function(){ return 1; });",
        ] {
            assert!(angular().convert(source).is_err(), "{}", source);
        }
        assert!(matches!(
            angular().convert("// nothing here\n"),
            Err(Error::MalformedFactory { .. })
        ));
    }
}
