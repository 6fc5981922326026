use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Access rule attached to a location.
///
/// Rules are built as a tree and only turned into the manual's textual
/// grammar when the world is serialized:
///
/// - `|@Category|` holds any item tagged with `Category`
/// - `|Item|` holds `Item` at least once
/// - `|Item:N|` holds at least `N` copies of `Item`
/// - `{ItemValue(key:N)}` summed `value[key]` of held items is at least `N`
///
/// `and` / `or` join terms; a nested combinator is wrapped in parentheses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    HasItem(String),
    HasCategory(String),
    HasTier { item: String, count: u32 },
    ValueAtLeast { key: String, threshold: u32 },
    And(Vec<Requirement>),
    Or(Vec<Requirement>),
}

impl Requirement {
    pub fn item(name: impl Into<String>) -> Self {
        Requirement::HasItem(name.into())
    }

    pub fn category(name: impl Into<String>) -> Self {
        Requirement::HasCategory(name.into())
    }

    pub fn tier(item: impl Into<String>, count: u32) -> Self {
        Requirement::HasTier {
            item: item.into(),
            count,
        }
    }

    pub fn value_at_least(key: impl Into<String>, threshold: u32) -> Self {
        Requirement::ValueAtLeast {
            key: key.into(),
            threshold,
        }
    }

    /// Conjunction of `parts`. A single part is returned as-is and nested
    /// conjunctions are flattened.
    pub fn all(parts: impl IntoIterator<Item = Requirement>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Requirement::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Requirement::And(flat)
        }
    }

    /// Disjunction of `parts`, with the same collapsing rules as [`Requirement::all`].
    pub fn any(parts: impl IntoIterator<Item = Requirement>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Requirement::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Requirement::Or(flat)
        }
    }

    pub fn parse(src: &str) -> Result<Self, RequirementParseError> {
        let mut parser = Parser { src, pos: 0 };
        let req = parser.parse_expr()?;
        parser.skip_ws();
        if !parser.rest().is_empty() {
            return Err(parser.unexpected());
        }
        Ok(req)
    }

    /// Every non-combinator term in the tree, left to right.
    pub fn leaves(&self) -> Vec<&Requirement> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Requirement>) {
        match self {
            Requirement::And(parts) | Requirement::Or(parts) => {
                for part in parts {
                    part.collect_leaves(out);
                }
            }
            leaf => out.push(leaf),
        }
    }

    /// False when the tree contains an empty combinator or an empty name,
    /// either of which would render to something the solver cannot read.
    pub fn is_well_formed(&self) -> bool {
        match self {
            Requirement::HasItem(name) | Requirement::HasCategory(name) => !name.is_empty(),
            Requirement::HasTier { item, count } => !item.is_empty() && *count > 0,
            Requirement::ValueAtLeast { key, .. } => !key.is_empty(),
            Requirement::And(parts) | Requirement::Or(parts) => {
                !parts.is_empty() && parts.iter().all(Requirement::is_well_formed)
            }
        }
    }

    fn is_combinator(&self) -> bool {
        matches!(self, Requirement::And(_) | Requirement::Or(_))
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Requirement], sep: &str) -> fmt::Result {
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        if part.is_combinator() {
            write!(f, "({part})")?;
        } else {
            write!(f, "{part}")?;
        }
    }
    Ok(())
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::HasItem(name) => write!(f, "|{name}|"),
            Requirement::HasCategory(name) => write!(f, "|@{name}|"),
            Requirement::HasTier { item, count } => write!(f, "|{item}:{count}|"),
            Requirement::ValueAtLeast { key, threshold } => {
                write!(f, "{{ItemValue({key}:{threshold})}}")
            }
            Requirement::And(parts) => write_joined(f, parts, " and "),
            Requirement::Or(parts) => write_joined(f, parts, " or "),
        }
    }
}

impl FromStr for Requirement {
    type Err = RequirementParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Requirement::parse(s)
    }
}

impl Serialize for Requirement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Requirement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Requirement::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Errors produced while reading a requirement string back into a tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequirementParseError {
    #[error("unexpected end of requirement")]
    UnexpectedEnd,

    #[error("unexpected '{found}' at offset {offset}")]
    Unexpected { offset: usize, found: String },

    #[error("unterminated '{open}' starting at offset {offset}")]
    Unterminated { offset: usize, open: char },

    #[error("empty reference at offset {offset}")]
    EmptyReference { offset: usize },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("invalid threshold '{token}'")]
    InvalidNumber { token: String },

    #[error("'and' and 'or' mixed without parentheses at offset {offset}")]
    MixedOperators { offset: usize },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Op {
    And,
    Or,
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn unexpected(&self) -> RequirementParseError {
        match self.rest().chars().next() {
            Some(c) => RequirementParseError::Unexpected {
                offset: self.pos,
                found: c.to_string(),
            },
            None => RequirementParseError::UnexpectedEnd,
        }
    }

    fn parse_expr(&mut self) -> Result<Requirement, RequirementParseError> {
        let mut parts = vec![self.parse_term()?];
        let mut op: Option<Op> = None;

        loop {
            self.skip_ws();
            let offset = self.pos;
            let next = match self.keyword() {
                Some(next) => next,
                None => break,
            };
            if op.is_some_and(|current| current != next) {
                return Err(RequirementParseError::MixedOperators { offset });
            }
            op = Some(next);
            parts.push(self.parse_term()?);
        }

        Ok(match op {
            None => parts.remove(0),
            Some(Op::And) => Requirement::And(parts),
            Some(Op::Or) => Requirement::Or(parts),
        })
    }

    fn keyword(&mut self) -> Option<Op> {
        let rest = self.rest();
        for (word, op) in [("and", Op::And), ("or", Op::Or)] {
            let matches_word = rest
                .get(..word.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(word));
            if !matches_word {
                continue;
            }
            let boundary = rest[word.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_whitespace() || matches!(c, '(' | '|' | '{'));
            if boundary {
                self.pos += word.len();
                return Some(op);
            }
        }
        None
    }

    fn parse_term(&mut self) -> Result<Requirement, RequirementParseError> {
        self.skip_ws();
        let offset = self.pos;

        match self.rest().chars().next() {
            None => Err(RequirementParseError::UnexpectedEnd),
            Some('(') => {
                self.pos += 1;
                let inner = self.parse_expr()?;
                self.skip_ws();
                if self.rest().starts_with(')') {
                    self.pos += 1;
                    Ok(inner)
                } else if self.rest().is_empty() {
                    Err(RequirementParseError::Unterminated { offset, open: '(' })
                } else {
                    Err(self.unexpected())
                }
            }
            Some('|') => {
                let body = self.delimited(offset, '|', '|')?;
                parse_reference(offset, body)
            }
            Some('{') => {
                let body = self.delimited(offset, '{', '}')?;
                parse_function(body)
            }
            Some(_) => Err(self.unexpected()),
        }
    }

    fn delimited(
        &mut self,
        offset: usize,
        open: char,
        close: char,
    ) -> Result<&'a str, RequirementParseError> {
        let body_start = self.pos + open.len_utf8();
        match self.src[body_start..].find(close) {
            Some(len) => {
                self.pos = body_start + len + close.len_utf8();
                Ok(&self.src[body_start..body_start + len])
            }
            None => Err(RequirementParseError::Unterminated { offset, open }),
        }
    }
}

fn parse_reference(offset: usize, body: &str) -> Result<Requirement, RequirementParseError> {
    if let Some(category) = body.strip_prefix('@') {
        if category.is_empty() {
            return Err(RequirementParseError::EmptyReference { offset });
        }
        return Ok(Requirement::category(category));
    }

    if body.is_empty() {
        return Err(RequirementParseError::EmptyReference { offset });
    }

    // Item names may contain ':' themselves; only a numeric suffix is a tier.
    if let Some((item, count)) = body.rsplit_once(':') {
        if let Ok(count) = count.parse::<u32>() {
            return Ok(Requirement::tier(item, count));
        }
    }

    Ok(Requirement::item(body))
}

fn parse_function(body: &str) -> Result<Requirement, RequirementParseError> {
    let args = body
        .strip_prefix("ItemValue(")
        .and_then(|rest| rest.strip_suffix(')'));

    let Some(args) = args else {
        let name = body.split('(').next().unwrap_or(body).to_string();
        return Err(RequirementParseError::UnknownFunction { name });
    };

    let Some((key, threshold)) = args.split_once(':') else {
        return Err(RequirementParseError::InvalidNumber {
            token: args.to_string(),
        });
    };

    let threshold = threshold
        .trim()
        .parse::<u32>()
        .map_err(|_| RequirementParseError::InvalidNumber {
            token: threshold.to_string(),
        })?;

    Ok(Requirement::value_at_least(key.trim(), threshold))
}
