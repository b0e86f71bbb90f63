use std::mem;
use crate::{
    Error,
    error::Thing,
    lex::{Lexeme, Token},
    util::{ensure_sufficient_stack, SrcRegion},
};

/// The syntactic class of a [`Node`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tag {
    Number,
    Strings,
    Identifier,
    // Children: parameter, body.
    Lambda,
    // Children: left operand, right operand.
    Application,
    // Children: name, expression. Only valid at the top level.
    Definition,
}

/// A node of the abstract syntax tree.
///
/// Leaves carry their token text, composite nodes carry their children in fixed positions.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub tag: Tag,
    pub text: String,
    pub children: Vec<Node>,
    pub region: SrcRegion,
}

impl Node {
    pub fn leaf(tag: Tag, text: impl Into<String>, region: SrcRegion) -> Self {
        Self {
            tag,
            text: text.into(),
            children: Vec::new(),
            region,
        }
    }

    pub fn branch(tag: Tag, children: Vec<Node>, region: SrcRegion) -> Self {
        Self {
            tag,
            text: String::new(),
            children,
            region,
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        let children = mem::take(&mut self.children);
        if !children.is_empty() {
            ensure_sufficient_stack(move || drop(children));
        }
    }
}

/// Parse a whole program: a sequence of definitions and expressions.
pub fn parse(tokens: &[Token]) -> Result<Vec<Node>, Vec<Error>> {
    let mut parser = Parser { tokens, pos: 0 };
    let mut forms = Vec::new();
    while parser.peek().is_some() {
        forms.push(parser.parse_form().map_err(|e| vec![e])?);
    }
    Ok(forms)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_lexeme(&self) -> Option<&'a Lexeme> {
        self.peek().map(|tok| &tok.lexeme)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eof_region(&self) -> SrcRegion {
        match self.tokens.last().map(|tok| tok.region) {
            Some(SrcRegion::Range(_, until)) => SrcRegion::single(until),
            _ => SrcRegion::none(),
        }
    }

    fn unexpected(&self, tok: Option<&Token>) -> Error {
        match tok {
            Some(tok) => Error::unexpected(tok.lexeme.clone()).at(tok.region),
            None => Error::unexpected_eof().at(self.eof_region()),
        }
    }

    fn expect(&mut self, lexeme: Lexeme) -> Result<SrcRegion, Error> {
        match self.next() {
            Some(tok) if tok.lexeme == lexeme => Ok(tok.region),
            tok => Err(self.unexpected(tok).expected(lexeme)),
        }
    }

    fn parse_ident(&mut self) -> Result<Node, Error> {
        match self.next() {
            Some(Token { lexeme: Lexeme::Ident(name), region }) =>
                Ok(Node::leaf(Tag::Identifier, name.as_str(), *region)),
            tok => Err(self.unexpected(tok).expected(Thing::Ident)),
        }
    }

    fn parse_form(&mut self) -> Result<Node, Error> {
        match self.peek_lexeme() {
            Some(Lexeme::Def) => self
                .parse_definition()
                .map_err(|e| e.while_parsing(Thing::Definition)),
            _ => self.parse_expr(),
        }
    }

    fn parse_definition(&mut self) -> Result<Node, Error> {
        let start = self.expect(Lexeme::Def)?;
        let name = self.parse_ident()?;
        self.expect(Lexeme::Eq)?;
        let expr = self.parse_expr()?;
        let region = start.union(expr.region);
        Ok(Node::branch(Tag::Definition, vec![name, expr], region))
    }

    fn parse_expr(&mut self) -> Result<Node, Error> {
        ensure_sufficient_stack(|| {
            let tok = self.next();
            match tok {
                Some(Token { lexeme: Lexeme::Ident(name), region }) =>
                    Ok(Node::leaf(Tag::Identifier, name.as_str(), *region)),
                Some(Token { lexeme: Lexeme::Number(num), region }) =>
                    Ok(Node::leaf(Tag::Number, num.as_str(), *region)),
                Some(Token { lexeme: Lexeme::String(s), region }) =>
                    Ok(Node::leaf(Tag::Strings, s.as_str(), *region)),
                Some(Token { lexeme: Lexeme::LBrace, region }) =>
                    self.parse_application(*region, Lexeme::RBrace),
                Some(Token { lexeme: Lexeme::LParen, region }) => match self.peek_lexeme() {
                    Some(Lexeme::Backslash) => self.parse_lambda(*region),
                    _ => self.parse_application(*region, Lexeme::RParen),
                },
                tok => Err(self.unexpected(tok).expected(Thing::Expr)),
            }
        })
    }

    // `(` has already been consumed.
    fn parse_lambda(&mut self, start: SrcRegion) -> Result<Node, Error> {
        self.parse_lambda_parts(start)
            .map_err(|e| e.while_parsing(Thing::Lambda))
    }

    fn parse_lambda_parts(&mut self, start: SrcRegion) -> Result<Node, Error> {
        self.expect(Lexeme::Backslash)?;
        let param = self.parse_ident()?;
        self.expect(Lexeme::Dot)?;
        let body = self.parse_expr()?;
        let end = self.expect(Lexeme::RParen)?;
        Ok(Node::branch(Tag::Lambda, vec![param, body], start.union(end)))
    }

    // The opening delimiter has already been consumed.
    fn parse_application(&mut self, start: SrcRegion, close: Lexeme) -> Result<Node, Error> {
        self.parse_application_parts(start, close)
            .map_err(|e| e.while_parsing(Thing::Application))
    }

    fn parse_application_parts(&mut self, start: SrcRegion, close: Lexeme) -> Result<Node, Error> {
        let left = self.parse_expr()?;
        let right = self.parse_expr()?;
        let end = self.expect(close)?;
        Ok(Node::branch(Tag::Application, vec![left, right], start.union(end)))
    }
}
