//! A JCR-SQL2 subset for the in-memory repository.
//!
//! Supported: `SELECT * FROM [type] [AS s] [WHERE c AND c ...]` where each
//! constraint is `operand op literal` (`= <> != < > <= >= LIKE`) or
//! `operand IS [NOT] NULL`. Operands are `[name]`, `name`, or
//! selector-qualified (`[s].[name]`, `s.name`). The `jcr:path`
//! pseudo-property matches the node path. Multi-valued properties match
//! when any of their values does.

use safetypin_core::{JCR_PATH, MIXIN_TYPES, NT_BASE, PRIMARY_TYPE};

use super::tree::{StoredNode, Tree};
use crate::error::{RepositoryError, Result};
use crate::value::JcrValue;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Star,
    Dot,
    Bracketed(String),
    Word(String),
    Literal(String),
    Number(String),
    Op(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Like,
}

#[derive(Debug, Clone, PartialEq)]
struct Literal {
    text: String,
    numeric: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
enum Constraint {
    Compare {
        property: String,
        op: Operator,
        literal: Literal,
    },
    Null {
        property: String,
        negated: bool,
    },
}

/// A parsed query.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Sql2Query {
    node_type: String,
    constraints: Vec<Constraint>,
}

pub(crate) fn parse(statement: &str) -> Result<Sql2Query> {
    let tokens = tokenize(statement)?;
    Parser { tokens, pos: 0 }.query()
}

/// Paths of nodes in `tree` matching `query`, in document order.
pub(crate) fn evaluate(query: &Sql2Query, tree: &Tree) -> Vec<String> {
    tree.walk()
        .into_iter()
        .filter(|p| match tree.get(p) {
            Some(node) => {
                matches_type(node, &query.node_type)
                    && query.constraints.iter().all(|c| satisfies(c, p, node))
            }
            None => false,
        })
        .collect()
}

fn invalid(msg: impl Into<String>) -> RepositoryError {
    RepositoryError::InvalidQuery(msg.into())
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '[' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == ']')
                    .ok_or_else(|| invalid("unterminated '['"))?;
                tokens.push(Token::Bracketed(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            '\'' => {
                let mut text = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(invalid("unterminated string literal")),
                        Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                            text.push('\'');
                            i += 2;
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            text.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Literal(text));
            }
            '=' => {
                tokens.push(Token::Op("=".to_string()));
                i += 1;
            }
            '<' | '>' | '!' => {
                let mut op = c.to_string();
                if let Some(&next) = chars.get(i + 1) {
                    if next == '=' || (c == '<' && next == '>') {
                        op.push(next);
                    }
                }
                if op == "!" {
                    return Err(invalid("unexpected '!'"));
                }
                i += op.len();
                tokens.push(Token::Op(op));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                tokens.push(Token::Number(chars[start..i].iter().collect()));
            }
            c if c.is_alphanumeric() || c == '_' || c == ':' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | ':' | '-'))
                {
                    i += 1;
                }
                tokens.push(Token::Word(chars[start..i].iter().collect()));
            }
            other => return Err(invalid(format!("unexpected character {other:?}"))),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn keyword(&mut self, keyword: &str) -> Result<()> {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            Ok(())
        } else {
            Err(invalid(format!("expected {keyword}")))
        }
    }

    fn name(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::Bracketed(name)) | Some(Token::Word(name)) => Ok(name),
            other => Err(invalid(format!("expected a name, found {other:?}"))),
        }
    }

    fn query(mut self) -> Result<Sql2Query> {
        self.keyword("SELECT")?;
        if self.next() != Some(Token::Star) {
            return Err(invalid("only SELECT * is supported"));
        }
        self.keyword("FROM")?;
        let node_type = self.name()?;
        if self.peek_keyword("AS") {
            self.pos += 1;
            self.name()?;
        }

        let mut constraints = Vec::new();
        if self.peek_keyword("WHERE") {
            self.pos += 1;
            constraints.push(self.constraint()?);
            while self.peek_keyword("AND") {
                self.pos += 1;
                constraints.push(self.constraint()?);
            }
        }

        if let Some(token) = self.peek() {
            return Err(invalid(format!("unexpected trailing input at {token:?}")));
        }
        Ok(Sql2Query {
            node_type,
            constraints,
        })
    }

    fn constraint(&mut self) -> Result<Constraint> {
        let mut property = self.name()?;
        if self.peek() == Some(&Token::Dot) {
            self.pos += 1;
            property = self.name()?;
        }

        if self.peek_keyword("IS") {
            self.pos += 1;
            let negated = if self.peek_keyword("NOT") {
                self.pos += 1;
                true
            } else {
                false
            };
            self.keyword("NULL")?;
            return Ok(Constraint::Null { property, negated });
        }

        let op = if self.peek_keyword("LIKE") {
            self.pos += 1;
            Operator::Like
        } else {
            match self.next() {
                Some(Token::Op(op)) => match op.as_str() {
                    "=" => Operator::Eq,
                    "<>" | "!=" => Operator::Ne,
                    "<" => Operator::Lt,
                    ">" => Operator::Gt,
                    "<=" => Operator::Le,
                    ">=" => Operator::Ge,
                    _ => return Err(invalid(format!("unknown operator {op}"))),
                },
                other => return Err(invalid(format!("expected an operator, found {other:?}"))),
            }
        };

        let literal = match self.next() {
            Some(Token::Literal(text)) => Literal {
                numeric: None,
                text,
            },
            Some(Token::Number(text)) => Literal {
                numeric: text.parse().ok(),
                text,
            },
            Some(Token::Word(w))
                if w.eq_ignore_ascii_case("true") || w.eq_ignore_ascii_case("false") =>
            {
                Literal {
                    text: w.to_ascii_lowercase(),
                    numeric: None,
                }
            }
            other => return Err(invalid(format!("expected a literal, found {other:?}"))),
        };

        Ok(Constraint::Compare {
            property,
            op,
            literal,
        })
    }
}

fn matches_type(node: &StoredNode, node_type: &str) -> bool {
    node_type == NT_BASE || node.primary_type == node_type || node.mixins.iter().any(|m| m == node_type)
}

fn operand_values(property: &str, path: &str, node: &StoredNode) -> Vec<JcrValue> {
    match property {
        JCR_PATH => vec![JcrValue::Path(path.to_string())],
        PRIMARY_TYPE => vec![JcrValue::Name(node.primary_type.clone())],
        MIXIN_TYPES => node.mixins.iter().cloned().map(JcrValue::Name).collect(),
        _ => node
            .properties
            .get(property)
            .map(|data| data.iter().cloned().collect())
            .unwrap_or_default(),
    }
}

fn satisfies(constraint: &Constraint, path: &str, node: &StoredNode) -> bool {
    match constraint {
        Constraint::Null { property, negated } => {
            operand_values(property, path, node).is_empty() == !negated
        }
        Constraint::Compare {
            property,
            op,
            literal,
        } => operand_values(property, path, node)
            .iter()
            .any(|v| compare(v, *op, literal)),
    }
}

fn compare(value: &JcrValue, op: Operator, literal: &Literal) -> bool {
    use std::cmp::Ordering;

    if op == Operator::Like {
        return like(&value.lexical(), &literal.text);
    }

    let ordering = match (value.as_f64(), literal.numeric) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(value.lexical().as_str().cmp(literal.text.as_str())),
    };
    let Some(ordering) = ordering else {
        return false;
    };

    match op {
        Operator::Eq => ordering == Ordering::Equal,
        Operator::Ne => ordering != Ordering::Equal,
        Operator::Lt => ordering == Ordering::Less,
        Operator::Gt => ordering == Ordering::Greater,
        Operator::Le => ordering != Ordering::Greater,
        Operator::Ge => ordering != Ordering::Less,
        Operator::Like => unreachable!(),
    }
}

/// `LIKE` matching: `%` is any run of characters, `_` exactly one.
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((bp, bt)) = backtrack {
            p = bp + 1;
            t = bt + 1;
            backtrack = Some((bp, bt + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '%')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PropertyData;

    fn tree() -> Tree {
        let mut tree = Tree::new();
        tree.add("/content", "nt:folder").unwrap();
        tree.add("/content/page", "cq:Page").unwrap();
        tree.add("/content/page/text", "nt:unstructured").unwrap();
        tree.node_mut("/content/page/text")
            .unwrap()
            .properties
            .insert(
                "sling:resourceType".to_string(),
                PropertyData::Single(JcrValue::String("foundation/components/text".into())),
            );
        tree.node_mut("/content/page/text")
            .unwrap()
            .properties
            .insert("count".to_string(), PropertyData::Single(JcrValue::Long(3)));
        tree
    }

    fn run(statement: &str) -> Vec<String> {
        evaluate(&parse(statement).unwrap(), &tree())
    }

    #[test]
    fn test_select_by_type() {
        assert_eq!(run("SELECT * FROM [cq:Page]"), vec!["/content/page"]);
        assert_eq!(run("SELECT * FROM [nt:base]").len(), 4);
    }

    #[test]
    fn test_where_equality_and_path_like() {
        assert_eq!(
            run("SELECT * FROM [nt:base] WHERE [sling:resourceType] = 'foundation/components/text' AND [jcr:path] LIKE '/content/%'"),
            vec!["/content/page/text"]
        );
        assert!(run("SELECT * FROM [nt:base] WHERE [jcr:path] LIKE '/apps/%'").is_empty());
    }

    #[test]
    fn test_selector_qualified_null_checks() {
        assert_eq!(
            run("SELECT * FROM [nt:base] WHERE [nt:base].count IS NOT NULL"),
            vec!["/content/page/text"]
        );
        assert_eq!(run("select * from [nt:base] as s where s.[count] is null").len(), 3);
    }

    #[test]
    fn test_numeric_comparison() {
        assert_eq!(run("SELECT * FROM [nt:base] WHERE [count] > 2").len(), 1);
        assert!(run("SELECT * FROM [nt:base] WHERE [count] >= 4").is_empty());
    }

    #[test]
    fn test_invalid_statements() {
        assert!(parse("SELECT name FROM [nt:base]").is_err());
        assert!(parse("SELECT * FROM [nt:base] WHERE [a] = 'x").is_err());
        assert!(parse("SELECT * FROM [nt:base] ORDER BY [a]").is_err());
    }

    #[test]
    fn test_like() {
        assert!(like("/content/site", "/content/%"));
        assert!(like("abc", "a_c"));
        assert!(like("abc", "%"));
        assert!(!like("abc", "a_"));
        assert!(like("a%b", "a%b"));
    }
}
