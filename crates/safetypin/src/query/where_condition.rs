use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Comparator {
    #[default]
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Like,
}

impl Comparator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::Like => "LIKE",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "=" => Ok(Self::Equal),
            "<>" | "!=" => Ok(Self::NotEqual),
            "<" => Ok(Self::LessThan),
            "<=" => Ok(Self::LessThanOrEqual),
            ">" => Ok(Self::GreaterThan),
            ">=" => Ok(Self::GreaterThanOrEqual),
            "LIKE" => Ok(Self::Like),
            other => Err(Error::InvalidArgument(format!("unknown comparator {other:?}"))),
        }
    }
}

/// One `[name] OP 'value'` predicate. Equal when all three parts are.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WhereCondition {
    pub name: String,
    pub value: String,
    pub comparator: Comparator,
}

impl WhereCondition {
    pub fn new(name: impl Into<String>, value: impl Into<String>, comparator: Comparator) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            comparator,
        }
    }

    pub fn equal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, Comparator::Equal)
    }

    /// The value is interpolated as-is; quotes in it are not escaped.
    pub fn sql_fragment(&self) -> String {
        format!("[{}] {} '{}'", self.name, self.comparator, self.value)
    }
}
