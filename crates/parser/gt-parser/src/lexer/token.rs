//! Tokens handed from the lexer to the parser

use gt_span::Span;
use gt_syntax::RegexpOptions;
use std::fmt;

/// Reserved words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    /// `alias`
    Alias,
    /// `and`
    And,
    /// `begin`
    Begin,
    /// `BEGIN`
    UpperBegin,
    /// `break`
    Break,
    /// `case`
    Case,
    /// `class`
    Class,
    /// `def`
    Def,
    /// `defined?`
    Defined,
    /// `do`
    Do,
    /// `else`
    Else,
    /// `elsif`
    Elsif,
    /// `end`
    End,
    /// `END`
    UpperEnd,
    /// `ensure`
    Ensure,
    /// `false`
    False,
    /// `for`
    For,
    /// `if`
    If,
    /// `if` after an expression
    IfMod,
    /// `in`
    In,
    /// `module`
    Module,
    /// `next`
    Next,
    /// `nil`
    Nil,
    /// `not`
    Not,
    /// `or`
    Or,
    /// `redo`
    Redo,
    /// `rescue`
    Rescue,
    /// `rescue` after an expression
    RescueMod,
    /// `retry`
    Retry,
    /// `return`
    Return,
    /// `self`
    SelfKw,
    /// `super`
    Super,
    /// `then`
    Then,
    /// `true`
    True,
    /// `undef`
    Undef,
    /// `unless`
    Unless,
    /// `unless` after an expression
    UnlessMod,
    /// `until`
    Until,
    /// `until` after an expression
    UntilMod,
    /// `when`
    When,
    /// `while`
    While,
    /// `while` after an expression
    WhileMod,
    /// `yield`
    Yield,
    /// `__FILE__`
    File,
    /// `__LINE__`
    Line,
    /// `__ENCODING__`
    Encoding,
}

impl Keyword {
    /// Look up a reserved word
    pub fn from_word(word: &str) -> Option<Self> {
        let keyword = match word {
            "alias" => Self::Alias,
            "and" => Self::And,
            "begin" => Self::Begin,
            "BEGIN" => Self::UpperBegin,
            "break" => Self::Break,
            "case" => Self::Case,
            "class" => Self::Class,
            "def" => Self::Def,
            "defined?" => Self::Defined,
            "do" => Self::Do,
            "else" => Self::Else,
            "elsif" => Self::Elsif,
            "end" => Self::End,
            "END" => Self::UpperEnd,
            "ensure" => Self::Ensure,
            "false" => Self::False,
            "for" => Self::For,
            "if" => Self::If,
            "in" => Self::In,
            "module" => Self::Module,
            "next" => Self::Next,
            "nil" => Self::Nil,
            "not" => Self::Not,
            "or" => Self::Or,
            "redo" => Self::Redo,
            "rescue" => Self::Rescue,
            "retry" => Self::Retry,
            "return" => Self::Return,
            "self" => Self::SelfKw,
            "super" => Self::Super,
            "then" => Self::Then,
            "true" => Self::True,
            "undef" => Self::Undef,
            "unless" => Self::Unless,
            "until" => Self::Until,
            "when" => Self::When,
            "while" => Self::While,
            "yield" => Self::Yield,
            "__FILE__" => Self::File,
            "__LINE__" => Self::Line,
            "__ENCODING__" => Self::Encoding,
            _ => return None,
        };
        Some(keyword)
    }

    /// Modifier form of a keyword when it follows an expression
    pub fn as_modifier(self) -> Self {
        match self {
            Self::If => Self::IfMod,
            Self::Unless => Self::UnlessMod,
            Self::While => Self::WhileMod,
            Self::Until => Self::UntilMod,
            Self::Rescue => Self::RescueMod,
            other => other,
        }
    }

    /// Source spelling
    pub fn text(self) -> &'static str {
        match self {
            Self::Alias => "alias",
            Self::And => "and",
            Self::Begin => "begin",
            Self::UpperBegin => "BEGIN",
            Self::Break => "break",
            Self::Case => "case",
            Self::Class => "class",
            Self::Def => "def",
            Self::Defined => "defined?",
            Self::Do => "do",
            Self::Else => "else",
            Self::Elsif => "elsif",
            Self::End => "end",
            Self::UpperEnd => "END",
            Self::Ensure => "ensure",
            Self::False => "false",
            Self::For => "for",
            Self::If | Self::IfMod => "if",
            Self::In => "in",
            Self::Module => "module",
            Self::Next => "next",
            Self::Nil => "nil",
            Self::Not => "not",
            Self::Or => "or",
            Self::Redo => "redo",
            Self::Rescue | Self::RescueMod => "rescue",
            Self::Retry => "retry",
            Self::Return => "return",
            Self::SelfKw => "self",
            Self::Super => "super",
            Self::Then => "then",
            Self::True => "true",
            Self::Undef => "undef",
            Self::Unless | Self::UnlessMod => "unless",
            Self::Until | Self::UntilMod => "until",
            Self::When => "when",
            Self::While | Self::WhileMod => "while",
            Self::Yield => "yield",
            Self::File => "__FILE__",
            Self::Line => "__LINE__",
            Self::Encoding => "__ENCODING__",
        }
    }
}

/// Kind of the delimiter that opened a string-like literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    /// `"..."`, `'...'`, `%q`, `%Q`, heredocs
    Plain,
    /// `` `...` ``, `%x`
    XString,
    /// `:"..."`, `%s`
    Symbol,
    /// `/.../`, `%r`
    Regexp,
    /// `%w`, `%W`
    Words,
    /// `%i`, `%I`
    Symbols,
}

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Local-variable-like identifier
    Ident(String),
    /// Identifier ending in `?` or `!`
    FId(String),
    /// Capitalised identifier
    Const(String),
    /// `@x`
    IVar(String),
    /// `@@x`
    CVar(String),
    /// `$x`
    GVar(String),
    /// `$1`
    NthRef(u32),
    /// `$&` and friends
    BackRef(char),
    /// `name:` in a hash or argument list
    Label(String),
    /// Integer literal that fits 64 bits
    Integer(i64),
    /// Integer literal that does not
    BigInteger(String),
    /// Float literal
    Float(f64),
    /// `?a`
    Char(Vec<u8>),
    /// `:name`
    Symbol(String),
    /// Start of a string-like literal
    StringBeg(StringKind),
    /// Literal text inside a string
    StringContent(Vec<u8>),
    /// `#{`
    StringDBeg,
    /// `}` closing `#{`
    StringDEnd,
    /// `#` of `#@ivar` style interpolation
    StringDVar,
    /// End of a non-regexp string-like literal
    StringEnd,
    /// End of a regexp with its options
    RegexpEnd(RegexpOptions),
    /// Separator between `%w` words
    WordSep,
    /// Reserved word
    Keyword(Keyword),

    /// `+`
    Plus,
    /// `-`
    Minus,
    /// unary `+`
    UPlus,
    /// unary `-`
    UMinus,
    /// unary `-` directly before a number
    UMinusNum,
    /// `*`
    Star,
    /// `*` in splat position
    Splat,
    /// `**`
    Pow,
    /// `**` in double-splat position
    DSplat,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `&` binary
    Amper,
    /// `&` block-pass
    BlockAmper,
    /// `&&`
    AndAnd,
    /// `|`
    Pipe,
    /// `||`
    OrOr,
    /// `^`
    Caret,
    /// `~`
    Tilde,
    /// `!`
    Bang,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<=>`
    Cmp,
    /// `==`
    EqEq,
    /// `===`
    EqEqEq,
    /// `!=`
    NotEq,
    /// `=~`
    Match,
    /// `!~`
    NotMatch,
    /// `<<`
    LShift,
    /// `>>`
    RShift,
    /// `=`
    Assign,
    /// `op=`; payload is the operator
    OpAssign(String),
    /// `.`
    Dot,
    /// `&.`
    AndDot,
    /// `..`
    Dot2,
    /// `...`
    Dot3,
    /// `::` after an expression
    Colon2,
    /// `::` at expression start
    Colon3,
    /// `:`
    Colon,
    /// `?`
    Question,
    /// `,`
    Comma,
    /// `;`
    Semi,
    /// Significant newline
    NewLine,
    /// `=>`
    Arrow,
    /// `->`
    Lambda,
    /// `(` at expression start
    LParen,
    /// `(` after a command name and a space
    LParenArg,
    /// `(` directly after a method name
    LParenCall,
    /// `)`
    RParen,
    /// `[` starting an array literal
    LBrack,
    /// `[` indexing the preceding expression
    LBrackIndex,
    /// `]`
    RBrack,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `|`-delimited block parameters use `Pipe`; `[]` as a method name
    Aref,
    /// `[]=` as a method name
    Aset,
    /// `+@`/`-@` as method names
    UnaryOpName(String),
    /// `` ` `` as a method name
    BacktickName,
    /// End of input
    Eof,
}

impl TokenKind {
    /// Method name for an operator token, when the token names one
    pub fn operator_name(&self) -> Option<&'static str> {
        let name = match self {
            Self::Plus | Self::UPlus => "+",
            Self::Minus | Self::UMinus | Self::UMinusNum => "-",
            Self::Star | Self::Splat => "*",
            Self::Pow | Self::DSplat => "**",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Amper | Self::BlockAmper => "&",
            Self::Pipe => "|",
            Self::Caret => "^",
            Self::Tilde => "~",
            Self::Bang => "!",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Cmp => "<=>",
            Self::EqEq => "==",
            Self::EqEqEq => "===",
            Self::NotEq => "!=",
            Self::Match => "=~",
            Self::NotMatch => "!~",
            Self::LShift => "<<",
            Self::RShift => ">>",
            Self::Aref => "[]",
            Self::Aset => "[]=",
            Self::BacktickName => "`",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) | Self::FId(name) | Self::Const(name) => write!(formatter, "`{name}'"),
            Self::IVar(name) | Self::CVar(name) | Self::GVar(name) => write!(formatter, "`{name}'"),
            Self::NthRef(index) => write!(formatter, "`${index}'"),
            Self::BackRef(ch) => write!(formatter, "`${ch}'"),
            Self::Label(name) => write!(formatter, "label `{name}:'"),
            Self::Integer(_) | Self::BigInteger(_) => formatter.write_str("integer literal"),
            Self::Float(_) => formatter.write_str("float literal"),
            Self::Char(_) => formatter.write_str("character literal"),
            Self::Symbol(name) => write!(formatter, "symbol :{name}"),
            Self::StringBeg(_) => formatter.write_str("string beginning"),
            Self::StringContent(_) => formatter.write_str("string content"),
            Self::StringDBeg => formatter.write_str("`#{'"),
            Self::StringDEnd => formatter.write_str("`}'"),
            Self::StringDVar => formatter.write_str("string interpolation"),
            Self::StringEnd => formatter.write_str("string end"),
            Self::RegexpEnd(_) => formatter.write_str("regexp end"),
            Self::WordSep => formatter.write_str("word separator"),
            Self::Keyword(keyword) => write!(formatter, "keyword `{}'", keyword.text()),
            Self::OpAssign(op) => write!(formatter, "`{op}='"),
            Self::UnaryOpName(name) => write!(formatter, "`{name}'"),
            Self::Dot => formatter.write_str("`.'"),
            Self::AndDot => formatter.write_str("`&.'"),
            Self::Dot2 => formatter.write_str("`..'"),
            Self::Dot3 => formatter.write_str("`...'"),
            Self::Colon2 | Self::Colon3 => formatter.write_str("`::'"),
            Self::Colon => formatter.write_str("`:'"),
            Self::Question => formatter.write_str("`?'"),
            Self::Comma => formatter.write_str("`,'"),
            Self::Semi => formatter.write_str("`;'"),
            Self::NewLine => formatter.write_str("end-of-line"),
            Self::Arrow => formatter.write_str("`=>'"),
            Self::Lambda => formatter.write_str("`->'"),
            Self::Assign => formatter.write_str("`='"),
            Self::LParen | Self::LParenArg | Self::LParenCall => formatter.write_str("`('"),
            Self::RParen => formatter.write_str("`)'"),
            Self::LBrack | Self::LBrackIndex => formatter.write_str("`['"),
            Self::RBrack => formatter.write_str("`]'"),
            Self::LBrace => formatter.write_str("`{'"),
            Self::RBrace => formatter.write_str("`}'"),
            Self::AndAnd => formatter.write_str("`&&'"),
            Self::OrOr => formatter.write_str("`||'"),
            Self::Eof => formatter.write_str("end-of-input"),
            other => match other.operator_name() {
                Some(name) => write!(formatter, "`{name}'"),
                None => write!(formatter, "{other:?}"),
            },
        }
    }
}

/// One token
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Kind and payload
    pub kind: TokenKind,
    /// Byte span
    pub span: Span,
    /// Line of the first byte
    pub line: u32,
    /// Whether whitespace preceded the token
    pub space_before: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_round_trip_and_modifiers() {
        for word in ["alias", "defined?", "__ENCODING__", "BEGIN", "until"] {
            let keyword = Keyword::from_word(word).expect("reserved word");
            assert_eq!(keyword.text(), word);
        }
        assert_eq!(Keyword::If.as_modifier(), Keyword::IfMod);
        assert_eq!(Keyword::Do.as_modifier(), Keyword::Do);
        assert!(Keyword::from_word("each").is_none());
    }

    #[test]
    fn test_operator_names() {
        assert_eq!(TokenKind::UMinusNum.operator_name(), Some("-"));
        assert_eq!(TokenKind::Aset.operator_name(), Some("[]="));
        assert_eq!(TokenKind::Comma.operator_name(), None);
        assert_eq!(TokenKind::EqEqEq.to_string(), "`==='");
    }
}
