//! Export surface resolution

use super::classes::{convert_to_class, is_class_like};
use super::name_pattern;
use super::scope::{is_reference, ObjectScope, ScopeValue};
use super::Run;
use crate::blocks::{is_var_name, BlockId, BlockKind};
use crate::error::{Error, Result};
use crate::expand::expand;
use indexmap::IndexSet;
use regex::{NoExpand, Regex};
use std::collections::HashMap;

/// What the unit makes visible, and how it registers itself
#[derive(Debug, Default)]
pub(crate) struct ExportSurface {
    pub exported: IndexSet<String>,
    /// Class name to registration annotation
    pub annotations: HashMap<String, String>,
    pub registration: Option<String>,
    pub renames: Vec<Rename>,
}

/// `container.member` becomes `target` once the container is flattened
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Rename {
    pub container: String,
    pub member: String,
    pub target: String,
}

impl Rename {
    pub fn apply(&self, text: &str) -> Result<String> {
        let pattern = format!(
            r"{}\s*\.\s*{}",
            name_pattern(&self.container),
            name_pattern(&self.member)
        );
        let regex = Regex::new(&pattern)
            .map_err(|e| Error::internal(format!("invalid rename pattern: {}", e)))?;
        Ok(regex.replace_all(text, NoExpand(&self.target)).into_owned())
    }
}

/// Identifier form of a module name: `my-service` becomes `myService`
pub fn module_identifier(module_name: &str) -> Result<String> {
    let mut identifier = String::new();
    let mut upper = false;
    for c in module_name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
            if upper {
                identifier.push(c.to_ascii_uppercase());
            } else {
                identifier.push(c);
            }
            upper = false;
        } else {
            upper = !identifier.is_empty();
        }
    }
    if identifier.starts_with(|c: char| c.is_ascii_digit()) {
        identifier.insert(0, '_');
    }
    if identifier.is_empty() {
        return Err(Error::UnsupportedExportShape {
            token: module_name.to_string(),
            reason: "module name has no identifier characters".to_string(),
        });
    }
    Ok(identifier)
}

impl Run<'_> {
    pub(crate) fn resolve_exports(&mut self) -> Result<()> {
        let token = self.export.clone().ok_or(Error::MissingExport)?;
        if is_var_name(&token) {
            self.export_identifier(&token)?;
        } else {
            match BlockId::parse(&token).map(|id| (id, id.kind())) {
                Some((id, BlockKind::Function)) => self.export_inline_function(id)?,
                Some((_, BlockKind::Object)) => {
                    let ScopeValue::Object(object) = ScopeValue::parse(&token, &self.table)? else {
                        return Err(Error::internal("object block did not parse as an object"));
                    };
                    self.flatten(None, object)?;
                }
                _ => {
                    return Err(Error::UnsupportedExportShape {
                        token: expand(&token, &self.table)?,
                        reason: "only identifiers, functions and object literals can be exported"
                            .to_string(),
                    })
                }
            }
        }
        log::debug!(
            "Resolved exports of '{}': {} names, {} renames",
            self.transcoder.module_name,
            self.surface.exported.len(),
            self.surface.renames.len()
        );
        Ok(())
    }

    fn export_identifier(&mut self, token: &str) -> Result<()> {
        let value = self
            .scope
            .get(token)
            .cloned()
            .ok_or_else(|| Error::UnresolvedReference {
                name: token.to_string(),
                path: token.to_string(),
            })?;
        match value {
            ScopeValue::Block(id) if id.is(BlockKind::Function) => {
                self.surface.exported.insert(token.to_string());
                self.surface.registration = Some(self.transcoder.registration_call(token));
            }
            ScopeValue::Block(id) if id.is(BlockKind::Class) => {
                self.surface.exported.insert(token.to_string());
                self.surface
                    .annotations
                    .insert(token.to_string(), self.transcoder.registration_annotation());
            }
            ScopeValue::Injected => {
                self.surface.registration = Some(self.transcoder.registration_call(token));
            }
            ScopeValue::Object(object) => self.flatten(Some(token), object)?,
            _ => {
                return Err(Error::UnsupportedExportShape {
                    token: token.to_string(),
                    reason: "exported value is neither a function, a class nor an object"
                        .to_string(),
                })
            }
        }
        Ok(())
    }

    /// `return function () {...}` takes its name from the module
    fn export_inline_function(&mut self, id: BlockId) -> Result<()> {
        let name = module_identifier(&self.transcoder.module_name)?;
        if self.scope.contains(&name) {
            return Err(Error::UnsupportedExportShape {
                token: name,
                reason: "module name collides with a local declaration".to_string(),
            });
        }

        if is_class_like(id, &self.table, self.scope.members_of(id))? {
            let class = convert_to_class(&mut self.table, id, &name, None, None)?;
            self.surface
                .annotations
                .insert(name.clone(), self.transcoder.registration_annotation());
            self.scope.declare(&name, ScopeValue::Block(class));
        } else {
            self.table.name_function(id, &name)?;
            self.surface.registration = Some(self.transcoder.registration_call(&name));
            self.scope.declare(&name, ScopeValue::Block(id));
        }
        self.surface.exported.insert(name);
        Ok(())
    }

    /// Turn every member of an exported object into a top-level entry
    fn flatten(&mut self, container: Option<&str>, object: ObjectScope) -> Result<()> {
        if let Some(container) = container {
            self.scope.remove(container);
        }

        let mut entries = Vec::with_capacity(object.len());
        for (key, value) in object {
            if !is_var_name(&key) {
                return Err(Error::UnsupportedExportShape {
                    token: expand(&key, &self.table)?,
                    reason: "exported member name is not an identifier".to_string(),
                });
            }

            if let ScopeValue::Literal(reference) = &value {
                if is_reference(reference) {
                    if !self.scope.contains(reference) {
                        return Err(Error::UnresolvedReference {
                            name: reference.clone(),
                            path: format!("{}: {}", key, reference),
                        });
                    }
                    self.surface.exported.insert(reference.clone());
                    entries.push(if *reference == key {
                        key.clone()
                    } else {
                        format!("{}: {}", key, reference)
                    });
                    if let Some(container) = container {
                        self.surface.renames.push(Rename {
                            container: container.to_string(),
                            member: key,
                            target: reference.clone(),
                        });
                    }
                    continue;
                }
            }

            if self.scope.contains(&key) {
                return Err(Error::UnsupportedExportShape {
                    token: key,
                    reason: "exported member collides with a local declaration".to_string(),
                });
            }

            let value = match value.function() {
                Some(id) if is_class_like(id, &self.table, self.scope.members_of(id))? => {
                    let class = convert_to_class(
                        &mut self.table,
                        id,
                        &key,
                        self.inheritance.get(&key).map(String::as_str),
                        self.scope.members_of(id),
                    )?;
                    ScopeValue::Block(class)
                }
                Some(id) => {
                    self.table.name_function(id, &key)?;
                    value
                }
                None => value,
            };
            self.scope.declare(&key, value);
            self.surface.exported.insert(key.clone());
            entries.push(key.clone());
            if let Some(container) = container {
                self.surface.renames.push(Rename {
                    container: container.to_string(),
                    member: key.clone(),
                    target: key,
                });
            }
        }

        self.surface.registration = Some(
            self.transcoder
                .registration_call(&format!("{{\n{}\n}}", entries.join(",\n"))),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcode::Transcoder;

    #[test]
    fn test_module_identifier() {
        assert_eq!(module_identifier("my-service").unwrap(), "myService");
        assert_eq!(module_identifier("blink.app.store").unwrap(), "blinkAppStore");
        assert_eq!(module_identifier("2d-canvas").unwrap(), "_2dCanvas");
        assert!(module_identifier("--").is_err());
    }

    #[test]
    fn test_rename_respects_boundaries() {
        let rename = Rename {
            container: "api".to_string(),
            member: "get".to_string(),
            target: "get".to_string(),
        };
        assert_eq!(
            rename.apply("api.get(); myapi.get(); api.getAll();").unwrap(),
            "get(); myapi.get(); api.getAll();"
        );
    }

    #[test]
    fn test_flatten_named_object() {
        let output = Transcoder::for_factory("svc")
            .run("function load() {} var api = { fetch: load, VERSION: 3 }; return api;")
            .unwrap();
        assert!(output.contains("let VERSION = 3;"));
        assert!(output.contains("export {\nload,\nVERSION\n}"));
        assert!(output.contains("Provide('svc')({\nfetch: load,\nVERSION\n});"));
        assert!(!output.contains("let api"));
    }

    #[test]
    fn test_flatten_rewrites_container_references() {
        let output = Transcoder::for_factory("svc")
            .run(
                "var api = { count: 0, bump: function () { api.count = api.count + 1; } }; \
                 return api;",
            )
            .unwrap();
        assert!(output.contains("function bump"));
        assert!(output.contains("count = count + 1;"));
        assert!(!output.contains("api.count"));
    }

    #[test]
    fn test_flatten_literal_object() {
        let output = Transcoder::for_factory("svc")
            .run("return { answer: 42 };")
            .unwrap();
        assert!(output.contains("let answer = 42;"));
        assert!(output.contains("Provide('svc')({\nanswer\n});"));
    }

    #[test]
    fn test_flattened_class_is_registered_once() {
        let output = Transcoder::for_factory("svc")
            .run("var api = { Model: function () { this.x = 1; } }; return api;")
            .unwrap();
        assert!(output.contains("class Model {"));
        assert!(!output.contains("@Provide"));
        assert_eq!(output.matches("Provide('svc')").count(), 1);
        assert!(output.contains("Provide('svc')({\nModel\n});"));
    }

    #[test]
    fn test_inline_function_named_after_module() {
        let output = Transcoder::for_factory("my-service")
            .run("return function (a) { return a; };")
            .unwrap();
        assert!(output.contains("function myService (a)"));
        assert!(output.contains("Provide('my-service')(myService);"));
    }

    #[test]
    fn test_primitive_export_is_rejected() {
        assert!(matches!(
            Transcoder::for_factory("svc").run("var n = 1; return n;"),
            Err(Error::UnsupportedExportShape { .. })
        ));
    }
}
