use std::{
    collections::BTreeSet,
    fmt,
};
use thiserror::Error as ThisError;
use crate::{
    lex::Lexeme,
    util::SrcRegion,
};

/// Something the reader can expect, find, or be in the middle of.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum Thing {
    Lexeme(Lexeme),
    Ident,
    Expr,
    Lambda,
    Application,
    Definition,
}

impl fmt::Display for Thing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Thing::Lexeme(lexeme) => write!(f, "'{}'", lexeme),
            Thing::Ident => write!(f, "identifier"),
            Thing::Expr => write!(f, "expression"),
            Thing::Lambda => write!(f, "lambda"),
            Thing::Application => write!(f, "application"),
            Thing::Definition => write!(f, "definition"),
        }
    }
}

impl From<Lexeme> for Thing {
    fn from(lexeme: Lexeme) -> Self {
        Thing::Lexeme(lexeme)
    }
}

#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum ErrorKind {
    #[error("unexpected character '{}'", .0.escape_default())]
    UnexpectedChar(char),
    #[error("unclosed delimiter '{0}'")]
    UnclosedDelimiter(char),
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unexpected {0}")]
    Unexpected(Thing),
}

/// A failure to turn source text into an expression tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    region: Option<SrcRegion>,
    while_parsing: Vec<Thing>,
    expected: BTreeSet<Thing>,
}

impl Error {
    pub fn unexpected_char(c: char) -> Self {
        Self::from(ErrorKind::UnexpectedChar(c))
    }

    pub fn unexpected(thing: impl Into<Thing>) -> Self {
        Self::from(ErrorKind::Unexpected(thing.into()))
    }

    pub fn unclosed_delimiter(c: char) -> Self {
        Self::from(ErrorKind::UnclosedDelimiter(c))
    }

    pub fn unexpected_eof() -> Self {
        Self::from(ErrorKind::UnexpectedEof)
    }

    pub fn at(mut self, region: impl Into<Option<SrcRegion>>) -> Self {
        self.region = region.into();
        self
    }

    pub fn while_parsing(mut self, thing: impl Into<Thing>) -> Self {
        self.while_parsing.push(thing.into());
        self
    }

    pub fn expected(mut self, thing: impl Into<Thing>) -> Self {
        self.expected.insert(thing.into());
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn region(&self) -> Option<SrcRegion> {
        self.region
    }

    /// Render this error against the code it came from, with a 1-based line and column.
    pub fn in_context(&self, code: &str) -> String {
        match self.region.and_then(|region| region.in_context(code)) {
            Some(((line, col), _)) => format!("{}:{}: {}", line + 1, col + 1, self),
            None => format!("{}", self),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.expected.is_empty() {
            let expected = self.expected
                .iter()
                .map(|thing| thing.to_string())
                .collect::<Vec<_>>();
            write!(f, ", expected {}", expected.join(" or "))?;
        }
        if let Some(thing) = self.while_parsing.last() {
            write!(f, " while parsing {}", thing)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            region: None,
            while_parsing: Vec::new(),
            expected: BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn messages_name_expectations_and_context() {
        let err = Error::unexpected(Lexeme::RBrace)
            .expected(Thing::Expr)
            .while_parsing(Thing::Application)
            .at(SrcRegion::from((4, 5)));
        assert_eq!(
            err.to_string(),
            "unexpected '}', expected expression while parsing application",
        );
        assert_eq!(
            err.in_context("{f\n x}"),
            "2:2: unexpected '}', expected expression while parsing application",
        );
    }
}
