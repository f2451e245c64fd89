//! Block records and placeholder ids
//!
//! Every syntactic span the partitioner isolates is replaced in the text by
//! a placeholder of the form `@BLOCK_<KIND>_<n>@` and recorded here. `@` never
//! appears in identifiers or operators, so placeholders cannot collide with
//! ordinary code outside of literals, and literals are isolated first.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;

pub mod table;

pub use table::BlockTable;

/// Reserved delimiter that opens and closes every placeholder
pub const DELIMITER: char = '@';

/// Matches any placeholder anywhere in a text
pub static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@BLOCK_([A-Z]+)_(\d+)@").expect("placeholder pattern"));

static LEADING_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@BLOCK_([A-Z]+)_(\d+)@").expect("placeholder pattern"));

static VAR_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[_$A-Za-z][_$\w]*$").expect("identifier pattern"));

/// Source pattern for a single identifier, for embedding into larger patterns
pub const VAR_NAME_PATTERN: &str = r"[_$A-Za-z][_$\w]*";

/// Kind tag embedded in every placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum BlockKind {
    LineComment,
    BlockComment,
    Regex,
    String,
    RoundGroup,
    CurlyGroup,
    SquareGroup,
    If,
    ElseIf,
    Else,
    Switch,
    For,
    While,
    Object,
    Function,
    Class,
    Constructor,
    ClassMethod,
    ClassProperty,
}

impl BlockKind {
    pub const ALL: [BlockKind; 19] = [
        BlockKind::LineComment,
        BlockKind::BlockComment,
        BlockKind::Regex,
        BlockKind::String,
        BlockKind::RoundGroup,
        BlockKind::CurlyGroup,
        BlockKind::SquareGroup,
        BlockKind::If,
        BlockKind::ElseIf,
        BlockKind::Else,
        BlockKind::Switch,
        BlockKind::For,
        BlockKind::While,
        BlockKind::Object,
        BlockKind::Function,
        BlockKind::Class,
        BlockKind::Constructor,
        BlockKind::ClassMethod,
        BlockKind::ClassProperty,
    ];

    /// Constructs that share the scope of the code around them. Function
    /// bodies are deliberately absent: expanding only these kinds leaves
    /// nested closures opaque.
    pub const SAME_SCOPE: [BlockKind; 9] = [
        BlockKind::RoundGroup,
        BlockKind::CurlyGroup,
        BlockKind::SquareGroup,
        BlockKind::If,
        BlockKind::ElseIf,
        BlockKind::Else,
        BlockKind::Switch,
        BlockKind::For,
        BlockKind::While,
    ];

    pub const GROUPS: [BlockKind; 3] = [
        BlockKind::RoundGroup,
        BlockKind::CurlyGroup,
        BlockKind::SquareGroup,
    ];

    pub fn tag(self) -> &'static str {
        use BlockKind::*;
        match self {
            LineComment => "INCOMMENT",
            BlockComment => "BLCOMMENT",
            Regex => "REGEX",
            String => "STRING",
            RoundGroup => "ROUNDBLOCK",
            CurlyGroup => "CURLYBLOCK",
            SquareGroup => "SQUAREBLOCK",
            If => "IF",
            ElseIf => "ELIF",
            Else => "ELSE",
            Switch => "SWITCH",
            For => "FOR",
            While => "WHILE",
            Object => "OBJECT",
            Function => "FUNCTION",
            Class => "CLASS",
            Constructor => "CTOR",
            ClassMethod => "CLASSMETHOD",
            ClassProperty => "CLASSPROP",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.tag() == tag)
    }

    pub fn is_comment(self) -> bool {
        matches!(self, BlockKind::LineComment | BlockKind::BlockComment)
    }

    /// Comments, strings and regex literals: verbatim source text
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            BlockKind::LineComment | BlockKind::BlockComment | BlockKind::Regex | BlockKind::String
        )
    }

    pub fn is_group(self) -> bool {
        Self::GROUPS.contains(&self)
    }

    /// Every kind except the verbatim literals
    pub fn structural() -> Vec<BlockKind> {
        Self::ALL.iter().copied().filter(|k| !k.is_literal()).collect()
    }
}

/// Placeholder id: a kind tag plus a per-kind sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    kind: BlockKind,
    seq: u32,
}

impl BlockId {
    pub(crate) fn new(kind: BlockKind, seq: u32) -> Self {
        Self { kind, seq }
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub fn is(&self, kind: BlockKind) -> bool {
        self.kind == kind
    }

    /// Parse a text that is exactly one placeholder
    pub fn parse(text: &str) -> Option<Self> {
        let (id, len) = Self::parse_leading(text)?;
        (len == text.len()).then_some(id)
    }

    /// Parse a placeholder at the very start of `text`, returning it with
    /// its length in bytes
    pub fn parse_leading(text: &str) -> Option<(Self, usize)> {
        let caps = LEADING_PLACEHOLDER.captures(text)?;
        let id = Self::from_captures(&caps)?;
        Some((id, caps.get(0)?.end()))
    }

    pub(crate) fn from_captures(caps: &regex::Captures<'_>) -> Option<Self> {
        let kind = BlockKind::from_tag(caps.get(1)?.as_str())?;
        let seq = caps.get(2)?.as_str().parse().ok()?;
        Some(Self { kind, seq })
    }

    /// Regex source matching any placeholder of `kind`
    pub fn pattern(kind: BlockKind) -> String {
        format!("{DELIMITER}BLOCK_{}_\\d+{DELIMITER}", kind.tag())
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{DELIMITER}BLOCK_{}_{}{DELIMITER}", self.kind.tag(), self.seq)
    }
}

impl Serialize for BlockId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Whether `text` is exactly one placeholder, optionally of a given kind
pub fn is_block_id(text: &str, kind: Option<BlockKind>) -> bool {
    match BlockId::parse(text) {
        Some(id) => kind.map_or(true, |k| id.is(k)),
        None => false,
    }
}

pub fn is_comment_id(text: &str) -> bool {
    BlockId::parse(text).map_or(false, |id| id.kind().is_comment())
}

pub fn is_var_name(text: &str) -> bool {
    VAR_NAME.is_match(text)
}

/// Member visibility in a synthesized class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn keyword(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        }
    }
}

/// Header + body pair of a keyword-headed construct
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Headed {
    pub header: BlockId,
    pub body: BlockId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionBlock {
    pub header: BlockId,
    pub body: BlockId,
    pub name: Option<String>,
    /// Comment blocks immediately preceding the declaration
    pub docs: Vec<BlockId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassBlock {
    pub name: String,
    pub parent: Option<String>,
    pub constructor: BlockId,
    pub methods: Vec<BlockId>,
    pub properties: Vec<BlockId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstructorBlock {
    pub header: BlockId,
    pub body: BlockId,
    pub docs: Vec<BlockId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMethodBlock {
    pub header: BlockId,
    pub body: BlockId,
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub docs: Vec<BlockId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassPropertyBlock {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub initializer: Option<String>,
}

/// A structured record standing in for one placeholder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data")]
pub enum Block {
    LineComment(String),
    BlockComment(String),
    Regex(String),
    String(String),
    /// Interior text, itself containing placeholders
    RoundGroup(String),
    CurlyGroup(String),
    SquareGroup(String),
    If(Headed),
    ElseIf(Headed),
    Else { body: BlockId },
    Switch(Headed),
    For(Headed),
    While(Headed),
    Object { body: BlockId },
    Function(FunctionBlock),
    Class(ClassBlock),
    Constructor(ConstructorBlock),
    ClassMethod(ClassMethodBlock),
    ClassProperty(ClassPropertyBlock),
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::LineComment(_) => BlockKind::LineComment,
            Block::BlockComment(_) => BlockKind::BlockComment,
            Block::Regex(_) => BlockKind::Regex,
            Block::String(_) => BlockKind::String,
            Block::RoundGroup(_) => BlockKind::RoundGroup,
            Block::CurlyGroup(_) => BlockKind::CurlyGroup,
            Block::SquareGroup(_) => BlockKind::SquareGroup,
            Block::If(_) => BlockKind::If,
            Block::ElseIf(_) => BlockKind::ElseIf,
            Block::Else { .. } => BlockKind::Else,
            Block::Switch(_) => BlockKind::Switch,
            Block::For(_) => BlockKind::For,
            Block::While(_) => BlockKind::While,
            Block::Object { .. } => BlockKind::Object,
            Block::Function(_) => BlockKind::Function,
            Block::Class(_) => BlockKind::Class,
            Block::Constructor(_) => BlockKind::Constructor,
            Block::ClassMethod(_) => BlockKind::ClassMethod,
            Block::ClassProperty(_) => BlockKind::ClassProperty,
        }
    }

    /// Verbatim text of comment, string and regex blocks
    pub fn literal_text(&self) -> Option<&str> {
        match self {
            Block::LineComment(text)
            | Block::BlockComment(text)
            | Block::Regex(text)
            | Block::String(text) => Some(text),
            _ => None,
        }
    }

    /// Interior text of bracket groups
    pub fn group_code(&self) -> Option<&str> {
        match self {
            Block::RoundGroup(code) | Block::CurlyGroup(code) | Block::SquareGroup(code) => {
                Some(code)
            }
            _ => None,
        }
    }

    pub(crate) fn group(kind: BlockKind, code: String) -> Option<Self> {
        match kind {
            BlockKind::RoundGroup => Some(Block::RoundGroup(code)),
            BlockKind::CurlyGroup => Some(Block::CurlyGroup(code)),
            BlockKind::SquareGroup => Some(Block::SquareGroup(code)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_id_display_and_parse() {
        let id = BlockId::new(BlockKind::Function, 12);
        assert_eq!(id.to_string(), "@BLOCK_FUNCTION_12@");
        assert_eq!(BlockId::parse("@BLOCK_FUNCTION_12@"), Some(id));
        assert_eq!(BlockId::parse("@BLOCK_ELIF_3@").map(|i| i.kind()), Some(BlockKind::ElseIf));
    }

    #[test]
    fn test_is_block_id() {
        assert!(is_block_id("@BLOCK_IF_123456789@", None));
        assert!(is_block_id("@BLOCK_IF_1@", Some(BlockKind::If)));
        assert!(!is_block_id("@ BLOCK_IF_1@", None));
        assert!(!is_block_id("@BLOCK_IFF_1@", None));
        assert!(!is_block_id("@BLOCK_IF_1@ ", None));
        assert!(!is_block_id("@BLOCK_IF_1@", Some(BlockKind::SquareGroup)));
    }

    #[test]
    fn test_is_comment_id() {
        assert!(is_comment_id("@BLOCK_INCOMMENT_4@"));
        assert!(is_comment_id("@BLOCK_BLCOMMENT_4@"));
        assert!(!is_comment_id("@BLOCK_STRING_4@"));
    }

    #[test]
    fn test_is_var_name() {
        for name in ["hello", "$hello", "_hel$lo", "$$$", "h12ello$"] {
            assert!(is_var_name(name), "{name}");
        }
        for name in ["123", "1abc", " hello", "hello ", "a.b"] {
            assert!(!is_var_name(name), "{name}");
        }
    }

    #[test]
    fn test_pattern_matches_only_its_kind() {
        let re = Regex::new(&BlockId::pattern(BlockKind::RoundGroup)).unwrap();
        assert!(re.is_match("x@BLOCK_ROUNDBLOCK_7@"));
        assert!(!re.is_match("@BLOCK_CURLYBLOCK_7@"));
    }
}
