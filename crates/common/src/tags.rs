use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Whitespace-separated labels attached to an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags(BTreeSet<String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tags(&mut self, tags: &str) {
        for tag in tags.split_whitespace() {
            if is_valid_tag(tag) {
                self.0.insert(tag.to_string());
            }
        }
    }

    pub fn remove_tags(&mut self, tags: &str) {
        for tag in tags.split_whitespace() {
            self.0.remove(tag);
        }
    }

    pub fn has_tags(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Evaluate a query such as `"enemy && !(boss || hidden)"`.
    ///
    /// An empty query matches any tagged entity. A malformed query matches
    /// nothing.
    pub fn matches_query(&self, query: &str) -> bool {
        if query.trim().is_empty() {
            return self.has_tags();
        }
        match TagQuery::parse(query) {
            Ok(q) => q.matches(self),
            Err(err) => {
                tracing::warn!(query, %err, "ignoring malformed tag query");
                false
            }
        }
    }
}

fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TagQueryError {
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
    #[error("unexpected end of query")]
    UnexpectedEnd,
    #[error("unbalanced parenthesis")]
    Unbalanced,
    #[error("trailing input after expression")]
    Trailing,
}

/// Parsed boolean tag expression. `!` binds tighter than `&&`, which binds
/// tighter than `||`.
#[derive(Debug, Clone, PartialEq)]
pub enum TagQuery {
    Tag(String),
    Not(Box<TagQuery>),
    And(Box<TagQuery>, Box<TagQuery>),
    Or(Box<TagQuery>, Box<TagQuery>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    And,
    Or,
    Not,
    Open,
    Close,
}

impl TagQuery {
    pub fn parse(query: &str) -> Result<Self, TagQueryError> {
        let tokens = tokenize(query)?;
        let mut pos = 0;
        let expr = parse_or(&tokens, &mut pos)?;
        if pos != tokens.len() {
            return Err(match tokens[pos] {
                Token::Close => TagQueryError::Unbalanced,
                _ => TagQueryError::Trailing,
            });
        }
        Ok(expr)
    }

    pub fn matches(&self, tags: &Tags) -> bool {
        match self {
            TagQuery::Tag(t) => tags.contains(t),
            TagQuery::Not(q) => !q.matches(tags),
            TagQuery::And(a, b) => a.matches(tags) && b.matches(tags),
            TagQuery::Or(a, b) => a.matches(tags) || b.matches(tags),
        }
    }
}

fn tokenize(query: &str) -> Result<Vec<Token>, TagQueryError> {
    let mut tokens = Vec::new();
    let mut chars = query.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '!' => {
                chars.next();
                tokens.push(Token::Not);
            }
            '&' | '|' => {
                chars.next();
                if chars.next() != Some(c) {
                    return Err(TagQueryError::UnexpectedChar(c));
                }
                tokens.push(if c == '&' { Token::And } else { Token::Or });
            }
            c if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(TagQueryError::UnexpectedChar(other)),
        }
    }
    Ok(tokens)
}

fn parse_or(tokens: &[Token], pos: &mut usize) -> Result<TagQuery, TagQueryError> {
    let mut lhs = parse_and(tokens, pos)?;
    while tokens.get(*pos) == Some(&Token::Or) {
        *pos += 1;
        let rhs = parse_and(tokens, pos)?;
        lhs = TagQuery::Or(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_and(tokens: &[Token], pos: &mut usize) -> Result<TagQuery, TagQueryError> {
    let mut lhs = parse_unary(tokens, pos)?;
    while tokens.get(*pos) == Some(&Token::And) {
        *pos += 1;
        let rhs = parse_unary(tokens, pos)?;
        lhs = TagQuery::And(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_unary(tokens: &[Token], pos: &mut usize) -> Result<TagQuery, TagQueryError> {
    match tokens.get(*pos) {
        Some(Token::Not) => {
            *pos += 1;
            Ok(TagQuery::Not(Box::new(parse_unary(tokens, pos)?)))
        }
        Some(Token::Open) => {
            *pos += 1;
            let inner = parse_or(tokens, pos)?;
            if tokens.get(*pos) != Some(&Token::Close) {
                return Err(TagQueryError::Unbalanced);
            }
            *pos += 1;
            Ok(inner)
        }
        Some(Token::Ident(name)) => {
            *pos += 1;
            Ok(TagQuery::Tag(name.clone()))
        }
        Some(Token::Close) => Err(TagQueryError::Unbalanced),
        Some(Token::And) => Err(TagQueryError::UnexpectedChar('&')),
        Some(Token::Or) => Err(TagQueryError::UnexpectedChar('|')),
        None => Err(TagQueryError::UnexpectedEnd),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(s: &str) -> Tags {
        let mut t = Tags::new();
        t.add_tags(s);
        t
    }

    #[test]
    fn add_and_remove() {
        let mut t = tags("enemy flying");
        assert!(t.contains("enemy"));
        t.remove_tags("enemy");
        assert!(!t.contains("enemy"));
        assert!(t.has_tags());
    }

    #[test]
    fn precedence_not_and_or() {
        let t = tags("a c");
        assert!(t.matches_query("a && !b"));
        assert!(t.matches_query("b || a && c"));
        assert!(!t.matches_query("(b || a) && !c"));
        assert!(t.matches_query("!(b && c)"));
    }

    #[test]
    fn empty_query_means_has_tags() {
        assert!(tags("x").matches_query(""));
        assert!(!Tags::new().matches_query("   "));
    }

    #[test]
    fn malformed_queries_match_nothing() {
        let t = tags("a");
        assert!(!t.matches_query("a &"));
        assert!(!t.matches_query("(a"));
        assert!(!t.matches_query("a)"));
        assert_eq!(TagQuery::parse("a b"), Err(TagQueryError::Trailing));
        assert_eq!(TagQuery::parse("(a"), Err(TagQueryError::Unbalanced));
    }
}
