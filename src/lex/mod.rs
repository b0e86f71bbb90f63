use std::fmt;
use crate::{
    Error,
    util::{SrcLoc, SrcRegion},
};

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lexeme {
    Ident(String),
    String(String),
    Number(String),

    LBrace,
    RBrace,
    LParen,
    RParen,

    Backslash,
    Dot,
    Eq,

    Def,
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Lexeme::Ident(x) => write!(f, "{}", x),
            Lexeme::String(x) => write!(f, "{:?}", x),
            Lexeme::Number(x) => write!(f, "{}", x),

            Lexeme::LBrace => write!(f, "{{"),
            Lexeme::RBrace => write!(f, "}}"),
            Lexeme::LParen => write!(f, "("),
            Lexeme::RParen => write!(f, ")"),

            Lexeme::Backslash => write!(f, "\\"),
            Lexeme::Dot => write!(f, "."),
            Lexeme::Eq => write!(f, "="),

            Lexeme::Def => write!(f, "def"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub lexeme: Lexeme,
    pub region: SrcRegion,
}

impl Token {
    pub fn new(lexeme: Lexeme, region: SrcRegion) -> Self {
        Self {
            lexeme,
            region,
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_-!@#$^&*<>=|~'".contains(c)
}

pub fn lex(s: &str) -> Result<Vec<Token>, Vec<Error>> {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    enum State {
        Default,
        Comment,
        Ident(SrcLoc, String),
        // The flag records a pending backslash escape.
        String(SrcLoc, String, bool),
        Number(SrcLoc, String),
    }

    let mut chars = s.chars().peekable();
    let mut state = State::Default;
    let mut loc = SrcLoc::start();

    loop {
        let c = chars.peek().copied();
        let mut to_next = true;
        match &mut state {
            State::Default => match c {
                Some(c) if c.is_whitespace() => {},
                Some(';') => state = State::Comment,
                Some('{') => tokens.push(Token::new(Lexeme::LBrace, SrcRegion::single(loc))),
                Some('}') => tokens.push(Token::new(Lexeme::RBrace, SrcRegion::single(loc))),
                Some('(') => tokens.push(Token::new(Lexeme::LParen, SrcRegion::single(loc))),
                Some(')') => tokens.push(Token::new(Lexeme::RParen, SrcRegion::single(loc))),
                Some('\\') => tokens.push(Token::new(Lexeme::Backslash, SrcRegion::single(loc))),
                Some('.') => tokens.push(Token::new(Lexeme::Dot, SrcRegion::single(loc))),
                Some('=') => tokens.push(Token::new(Lexeme::Eq, SrcRegion::single(loc))),
                Some('"') => state = State::String(loc, String::new(), false),
                Some(c) if is_ident_start(c) => state = State::Ident(loc, c.to_string()),
                Some(c) if c.is_ascii_digit() || c == '-' => state = State::Number(loc, c.to_string()),
                Some(c) => errors.push(Error::unexpected_char(c).at(SrcRegion::single(loc))),
                None => break,
            },
            State::Comment => match c {
                Some('\n') | None => {
                    to_next = false;
                    state = State::Default;
                },
                Some(_) => {},
            },
            State::String(start, string, escaped) => match c {
                Some(c) if *escaped => {
                    string.push(match c {
                        'n' => '\n',
                        't' => '\t',
                        c => c,
                    });
                    *escaped = false;
                },
                Some('\\') => *escaped = true,
                Some('"') => {
                    let region = SrcRegion::range(*start, loc.next());
                    tokens.push(Token::new(Lexeme::String(std::mem::take(string)), region));
                    state = State::Default;
                },
                Some(c) => string.push(c),
                None => {
                    errors.push(Error::unclosed_delimiter('"').at(SrcRegion::single(*start)));
                    to_next = false;
                    state = State::Default;
                },
            },
            State::Ident(start, ident) => match c {
                Some(c) if is_ident_part(c) => ident.push(c),
                _ => {
                    let lexeme = match ident.as_str() {
                        "def" => Lexeme::Def,
                        _ => Lexeme::Ident(std::mem::take(ident)),
                    };
                    tokens.push(Token::new(lexeme, SrcRegion::range(*start, loc)));
                    to_next = false;
                    state = State::Default;
                },
            },
            State::Number(start, number) => match c {
                Some(c) if c.is_ascii_digit() => number.push(c),
                _ => {
                    let region = SrcRegion::range(*start, loc);
                    if number == "-" {
                        errors.push(Error::unexpected_char('-').at(region));
                    } else {
                        tokens.push(Token::new(Lexeme::Number(std::mem::take(number)), region));
                    }
                    to_next = false;
                    state = State::Default;
                },
            },
        }

        if to_next {
            chars.next();
            loc = loc.next();
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn lexemes(s: &str) -> Vec<Lexeme> {
        lex(s).unwrap().into_iter().map(|tok| tok.lexeme).collect()
    }

    #[test]
    fn lambda_and_application() {
        assert_eq!(
            lexemes("{(\\x.x) -42}"),
            vec![
                Lexeme::LBrace,
                Lexeme::LParen,
                Lexeme::Backslash,
                Lexeme::Ident("x".into()),
                Lexeme::Dot,
                Lexeme::Ident("x".into()),
                Lexeme::RParen,
                Lexeme::Number("-42".into()),
                Lexeme::RBrace,
            ],
        );
    }

    #[test]
    fn definitions_and_comments() {
        assert_eq!(
            lexemes("def is-zero = \"a\\\"b\" ; trailing\nk'"),
            vec![
                Lexeme::Def,
                Lexeme::Ident("is-zero".into()),
                Lexeme::Eq,
                Lexeme::String("a\"b".into()),
                Lexeme::Ident("k'".into()),
            ],
        );
    }

    #[test]
    fn regions_cover_tokens() {
        let tokens = lex("def x = 12").unwrap();
        assert_eq!(tokens[0].region, SrcRegion::from((0, 3)));
        assert_eq!(tokens[1].region, SrcRegion::from((4, 5)));
        assert_eq!(tokens[3].region, SrcRegion::from((8, 10)));
    }

    #[test]
    fn reports_every_bad_character() {
        let errors = lex("% x ? \"open").unwrap_err();
        let kinds = errors.iter().map(|e| e.kind().clone()).collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                ErrorKind::UnexpectedChar('%'),
                ErrorKind::UnexpectedChar('?'),
                ErrorKind::UnclosedDelimiter('"'),
            ],
        );
    }
}
