//! Declaration markup: typed token sequences for pretty-printed signatures.
//!
//! This is the owned, construction-side form. Stored markup is read back
//! through [`crate::catalog::MarkupView`] without allocation.

use std::fmt;

use ahash::AHashSet;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::Guid;

/// Kind of a markup token.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkupTokenKind {
    Whitespace = 0,
    LineBreak = 1,
    Keyword = 2,
    Punctuation = 3,
    LiteralNumber = 4,
    LiteralString = 5,
    /// Names another API, possibly one that was never indexed
    Reference = 6,
}

impl MarkupTokenKind {
    /// Convert from a u8 value.
    ///
    /// Returns `None` for invalid values.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Whitespace),
            1 => Some(Self::LineBreak),
            2 => Some(Self::Keyword),
            3 => Some(Self::Punctuation),
            4 => Some(Self::LiteralNumber),
            5 => Some(Self::LiteralString),
            6 => Some(Self::Reference),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// One token of owned markup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkupToken {
    pub kind: MarkupTokenKind,
    pub text: String,
    /// Target API for reference tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Guid>,
}

impl MarkupToken {
    pub fn new(kind: MarkupTokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            reference: None,
        }
    }

    pub fn reference(text: impl Into<String>, target: Option<Guid>) -> Self {
        Self {
            kind: MarkupTokenKind::Reference,
            text: text.into(),
            reference: target,
        }
    }
}

/// An owned token sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Markup {
    tokens: Vec<MarkupToken>,
}

impl Markup {
    pub fn new(tokens: Vec<MarkupToken>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[MarkupToken] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn push(&mut self, token: MarkupToken) {
        self.tokens.push(token);
    }

    /// Split plain declaration text into tokens.
    ///
    /// Identifiers that are not keywords become reference tokens without a
    /// target.
    pub fn tokenize(text: &str) -> Self {
        let mut builder = MarkupBuilder::new();
        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let start = i;

            if c == '\r' || c == '\n' {
                i += 1;
                if c == '\r' && chars.get(i) == Some(&'\n') {
                    i += 1;
                }
                builder = builder.line_break();
            } else if c.is_whitespace() {
                while i < chars.len() && chars[i].is_whitespace() && !matches!(chars[i], '\r' | '\n') {
                    i += 1;
                }
                builder = builder.whitespace(collect(&chars[start..i]));
            } else if c.is_ascii_digit() {
                while i < chars.len() && (chars[i].is_alphanumeric() || matches!(chars[i], '.' | '_')) {
                    i += 1;
                }
                builder = builder.number(collect(&chars[start..i]));
            } else if c == '"' || c == '\'' {
                i += 1;
                while i < chars.len() && chars[i] != c {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i = (i + 1).min(chars.len());
                builder = builder.string(collect(&chars[start..i]));
            } else if is_identifier_char(c) {
                while i < chars.len() && is_identifier_char(chars[i]) {
                    i += 1;
                }
                let word = collect(&chars[start..i]);
                builder = if KEYWORDS.contains(word.as_str()) {
                    builder.keyword(word)
                } else {
                    builder.reference(word, None)
                };
            } else {
                i += 1;
                builder = builder.punctuation(c.to_string());
            }
        }

        builder.build()
    }

    /// Guids of every reference token with a target.
    pub fn references(&self) -> impl Iterator<Item = Guid> + '_ {
        self.tokens.iter().filter_map(|t| t.reference)
    }
}

fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '@'
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            match token.kind {
                MarkupTokenKind::LineBreak => f.write_str("\n")?,
                _ => f.write_str(&token.text)?,
            }
        }
        Ok(())
    }
}

static KEYWORDS: Lazy<AHashSet<&'static str>> = Lazy::new(|| {
    [
        "abstract", "as", "base", "bool", "byte", "char", "checked", "class", "const",
        "decimal", "default", "delegate", "double", "dynamic", "enum", "event", "explicit",
        "extern", "false", "fixed", "float", "get", "implicit", "in", "init", "int",
        "interface", "internal", "long", "namespace", "new", "null", "object", "operator",
        "out", "override", "params", "private", "protected", "public", "readonly", "record",
        "ref", "remove", "add", "required", "sbyte", "scoped", "sealed", "set", "short",
        "static", "string", "struct", "this", "true", "typeof", "uint", "ulong", "unmanaged",
        "unsafe", "ushort", "virtual", "void", "volatile", "where", "notnull",
    ]
    .into_iter()
    .collect()
});

/// Fluent construction of owned markup.
#[derive(Debug, Default)]
pub struct MarkupBuilder {
    tokens: Vec<MarkupToken>,
}

impl MarkupBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn token(mut self, kind: MarkupTokenKind, text: impl Into<String>) -> Self {
        self.tokens.push(MarkupToken::new(kind, text));
        self
    }

    pub fn keyword(self, text: impl Into<String>) -> Self {
        self.token(MarkupTokenKind::Keyword, text)
    }

    pub fn punctuation(self, text: impl Into<String>) -> Self {
        self.token(MarkupTokenKind::Punctuation, text)
    }

    pub fn whitespace(self, text: impl Into<String>) -> Self {
        self.token(MarkupTokenKind::Whitespace, text)
    }

    pub fn space(self) -> Self {
        self.whitespace(" ")
    }

    pub fn line_break(self) -> Self {
        self.token(MarkupTokenKind::LineBreak, "\n")
    }

    pub fn number(self, text: impl Into<String>) -> Self {
        self.token(MarkupTokenKind::LiteralNumber, text)
    }

    pub fn string(self, text: impl Into<String>) -> Self {
        self.token(MarkupTokenKind::LiteralString, text)
    }

    pub fn reference(mut self, text: impl Into<String>, target: Option<Guid>) -> Self {
        self.tokens.push(MarkupToken::reference(text, target));
        self
    }

    pub fn build(self) -> Markup {
        Markup::new(self.tokens)
    }
}

/// A named constant of an enum type.
#[derive(Debug, Clone, Copy)]
pub struct EnumMember<'a> {
    pub name: &'a str,
    pub value: u64,
    pub api: Option<Guid>,
}

/// Render an enum constant as markup.
///
/// Exact member matches render as the member name. For flags enums a value
/// made entirely of non-zero members renders as `A | B`; anything else
/// renders as a cast of the literal, e.g. `(FileAccess)8`.
pub fn format_enum_value(
    enum_name: &str,
    enum_api: Option<Guid>,
    members: &[EnumMember<'_>],
    value: u64,
    is_flags: bool,
) -> Markup {
    if let Some(member) = members.iter().find(|m| m.value == value) {
        return MarkupBuilder::new()
            .reference(member.name, member.api)
            .build();
    }

    if is_flags && value != 0 {
        let mut candidates: Vec<&EnumMember<'_>> =
            members.iter().filter(|m| m.value != 0).collect();
        candidates.sort_by(|a, b| b.value.cmp(&a.value));

        let mut remaining = value;
        let mut picked = Vec::new();
        for member in candidates {
            if member.value & remaining == member.value {
                remaining &= !member.value;
                picked.push(member);
            }
        }

        if remaining == 0 {
            picked.sort_by_key(|m| m.value);
            let mut builder = MarkupBuilder::new();
            for (i, member) in picked.iter().enumerate() {
                if i > 0 {
                    builder = builder.space().punctuation("|").space();
                }
                builder = builder.reference(member.name, member.api);
            }
            return builder.build();
        }
    }

    MarkupBuilder::new()
        .punctuation("(")
        .reference(enum_name, enum_api)
        .punctuation(")")
        .number(value.to_string())
        .build()
}
