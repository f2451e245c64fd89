//! Grammar table for the statements a factory body may contain
//!
//! Each matcher recognizes exactly one statement shape. They are tried in
//! table order; an instruction no matcher accepts is unsupported.

use crate::blocks::{is_var_name, Block, BlockId, BlockKind, BlockTable};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^(?:var|let|const)\s+(.+)$").expect("declaration pattern"));

static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^([$_\w]+(?:\.[$_\w]+)*)\s*=\s*([^;]+)$").expect("assignment pattern")
});

static INHERITANCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(util\.inherits|angular\.extend)\s*({})$",
        BlockId::pattern(BlockKind::RoundGroup)
    ))
    .expect("inheritance pattern")
});

static USE_STRICT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^["']use strict["']$"#).expect("directive pattern"));

static PROTOTYPE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.prototype$").expect("prototype pattern"));

/// One classified top-level instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Statement<'a> {
    Comment(BlockId),
    Directive,
    Declaration(Vec<Declarator<'a>>),
    FunctionDeclaration(BlockId),
    Export(&'a str),
    Inherits { derived: String, parent: String },
    Assignment { path: Vec<&'a str>, value: &'a str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator<'a> {
    pub name: &'a str,
    pub init: Option<&'a str>,
}

/// What the matchers may consult besides the instruction text
pub struct StatementContext<'c> {
    pub table: &'c BlockTable,
    pub export_pattern: &'c Regex,
    pub export_group: usize,
}

type Matcher = for<'a, 'c> fn(&'a str, &StatementContext<'c>) -> Result<Option<Statement<'a>>>;

pub const GRAMMAR: [(&str, Matcher); 7] = [
    ("comment", match_comment),
    ("directive", match_directive),
    ("declaration", match_declaration),
    ("function declaration", match_function),
    ("export", match_export),
    ("inheritance", match_inheritance),
    ("member assignment", match_assignment),
];

pub fn classify<'a>(instruction: &'a str, context: &StatementContext<'_>) -> Result<Statement<'a>> {
    for (name, matcher) in GRAMMAR {
        if let Some(statement) = matcher(instruction, context)? {
            log::trace!("{} -> {}", instruction, name);
            return Ok(statement);
        }
    }
    Err(Error::unsupported(format!(
        "unrecognized statement: {}",
        crate::expand::expand(instruction, context.table)?.trim()
    )))
}

fn match_comment<'a>(instruction: &'a str, _: &StatementContext<'_>) -> Result<Option<Statement<'a>>> {
    Ok(BlockId::parse(instruction)
        .filter(|id| id.kind().is_comment())
        .map(Statement::Comment))
}

fn match_directive<'a>(instruction: &'a str, context: &StatementContext<'_>) -> Result<Option<Statement<'a>>> {
    Ok(match context.table.lookup(instruction) {
        Some((_, Block::String(text))) if USE_STRICT.is_match(text) => Some(Statement::Directive),
        _ => None,
    })
}

fn match_declaration<'a>(instruction: &'a str, _: &StatementContext<'_>) -> Result<Option<Statement<'a>>> {
    let Some(list) = DECLARATION.captures(instruction).and_then(|caps| caps.get(1)) else {
        return Ok(None);
    };
    // Commas inside initializers are hidden in placeholders
    let declarators = list
        .as_str()
        .split(',')
        .map(|declarator| {
            let (name, init) = match declarator.split_once('=') {
                Some((name, init)) => (name.trim(), Some(init.trim())),
                None => (declarator.trim(), None),
            };
            if !is_var_name(name) {
                return Err(Error::unsupported(format!("cannot declare '{}'", name)));
            }
            Ok(Declarator { name, init })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(Statement::Declaration(declarators)))
}

fn match_function<'a>(instruction: &'a str, _: &StatementContext<'_>) -> Result<Option<Statement<'a>>> {
    Ok(BlockId::parse(instruction)
        .filter(|id| id.is(BlockKind::Function))
        .map(Statement::FunctionDeclaration))
}

fn match_export<'a>(instruction: &'a str, context: &StatementContext<'_>) -> Result<Option<Statement<'a>>> {
    Ok(context
        .export_pattern
        .captures(instruction)
        .and_then(|caps| caps.get(context.export_group))
        .map(|token| Statement::Export(token.as_str().trim())))
}

fn match_inheritance<'a>(instruction: &'a str, context: &StatementContext<'_>) -> Result<Option<Statement<'a>>> {
    let Some(caps) = INHERITANCE.captures(instruction) else {
        return Ok(None);
    };
    let prototype_form = caps.get(1).map_or(false, |m| m.as_str() == "angular.extend");
    let arguments = caps
        .get(2)
        .and_then(|m| BlockId::parse(m.as_str()))
        .ok_or_else(|| Error::internal("inheritance call without arguments"))?;

    let mut params: Vec<String> = context
        .table
        .group_code(arguments)?
        .split(',')
        .map(|param| param.trim().to_string())
        .collect();
    if params.len() != 2 {
        return Err(Error::unsupported(format!(
            "inheritance call with {} arguments",
            params.len()
        )));
    }
    if prototype_form {
        for param in params.iter_mut() {
            let stripped = PROTOTYPE_SUFFIX.replace(param.as_str(), "").into_owned();
            *param = stripped;
        }
    }
    let parent = params.pop().unwrap_or_default();
    let derived = params.pop().unwrap_or_default();
    Ok(Some(Statement::Inherits { derived, parent }))
}

fn match_assignment<'a>(instruction: &'a str, _: &StatementContext<'_>) -> Result<Option<Statement<'a>>> {
    let Some(caps) = ASSIGNMENT.captures(instruction) else {
        return Ok(None);
    };
    let (Some(path), Some(value)) = (caps.get(1), caps.get(2)) else {
        return Ok(None);
    };
    // `a == b` is a comparison, not an assignment
    if value.as_str().starts_with('=') {
        return Ok(None);
    }
    Ok(Some(Statement::Assignment {
        path: path.as_str().split('.').collect(),
        value: value.as_str().trim(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;

    static RETURN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^return\s+(.*)$").unwrap());

    fn shape(statement: Result<Statement<'_>>) -> &'static str {
        match statement {
            Ok(Statement::Comment(_)) => "comment",
            Ok(Statement::Directive) => "directive",
            Ok(Statement::Declaration(_)) => "declaration",
            Ok(Statement::FunctionDeclaration(_)) => "function",
            Ok(Statement::Export(_)) => "export",
            Ok(Statement::Inherits { .. }) => "inherits",
            Ok(Statement::Assignment { .. }) => "assignment",
            Err(_) => "error",
        }
    }

    fn classify_all(source: &str) -> Vec<&'static str> {
        let result = partition(source).unwrap();
        let context = StatementContext {
            table: &result.table,
            export_pattern: &RETURN,
            export_group: 1,
        };
        crate::cursor::InstructionCursor::new(&result.code)
            .map(|instruction| shape(classify(instruction.unwrap(), &context)))
            .collect()
    }

    #[test]
    fn test_statement_shapes() {
        let kinds = classify_all(
            "'use strict'; // doc\nvar a = 1, b; function F() {} F.prototype.x = 2; \
             util.inherits(F, Base); return F; foo();",
        );
        assert_eq!(
            kinds,
            vec![
                "directive",
                "comment",
                "declaration",
                "function",
                "assignment",
                "inherits",
                "export",
                "error"
            ]
        );
    }

    #[test]
    fn test_declarators() {
        let result = partition("var a = f(1, 2), b, c = x == y;").unwrap();
        let context = StatementContext {
            table: &result.table,
            export_pattern: &RETURN,
            export_group: 1,
        };
        let instruction = crate::cursor::InstructionCursor::new(&result.code)
            .next()
            .unwrap()
            .unwrap();
        let Statement::Declaration(declarators) = classify(instruction, &context).unwrap() else {
            panic!("expected a declaration");
        };
        assert_eq!(declarators.len(), 3);
        assert_eq!(declarators[0].name, "a");
        assert_eq!(declarators[1].init, None);
        assert_eq!(declarators[2].init, Some("x == y"));
    }

    #[test]
    fn test_prototype_form_inheritance() {
        let result = partition("angular.extend(Derived.prototype, Base.prototype);").unwrap();
        let context = StatementContext {
            table: &result.table,
            export_pattern: &RETURN,
            export_group: 1,
        };
        let instruction = result.code.trim_end_matches(';');
        assert_eq!(
            classify(instruction, &context).unwrap(),
            Statement::Inherits {
                derived: "Derived".to_string(),
                parent: "Base".to_string()
            }
        );
    }

    #[test]
    fn test_comparison_is_not_assignment() {
        let result = partition("a.b == c;").unwrap();
        let context = StatementContext {
            table: &result.table,
            export_pattern: &RETURN,
            export_group: 1,
        };
        assert!(matches!(
            classify(result.code.trim_end_matches(';'), &context),
            Err(Error::UnsupportedSyntax { .. })
        ));
    }
}
