use std::{fmt, mem, rc::Rc};
use internment::Intern;
use thiserror::Error as ThisError;
use crate::util::ensure_sufficient_stack;
use super::env::EnvRef;

pub type Ident = Intern<String>;

pub fn ident(name: &str) -> Ident {
    Intern::new(name.to_owned())
}

/// Why a computation failed. Carried around as an ordinary [`Value::Error`].
#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum EvalError {
    #[error("Symbol '{0}' is not bound!")]
    UnboundSymbol(String),
    #[error("Not a lambda!")]
    NotApplicable,
    #[error("Symbol '{0}' is already bound!")]
    AlreadyBound(String),
    #[error("Invalid AST!")]
    MalformedExpression,
    #[error("Invalid Number!")]
    InvalidNumber(String),
    #[error("Parameter '{0}' has not been supplied!")]
    Unsupplied(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(i64),
    String(String),
    Symbol(Ident),
    Error(EvalError),
    /// A single-parameter abstraction.
    ///
    /// `env` is the lambda's own environment, holding the slot for `param`. Clones of a lambda
    /// share that environment and the body: applying any of them writes the argument into the
    /// same slot.
    Lambda {
        param: Ident,
        body: Rc<Value>,
        env: EnvRef,
    },
    /// An unevaluated call of the left operand with the right one.
    Application(Box<Value>, Box<Value>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn symbol(name: &str) -> Self {
        Value::Symbol(ident(name))
    }

    pub fn application(left: Value, right: Value) -> Self {
        Value::Application(Box::new(left), Box::new(right))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        // Children are moved out and dropped under the stack guard instead of by the
        // recursive drop glue.
        ensure_sufficient_stack(|| match self {
            Value::Application(left, right) => {
                drop(mem::replace(&mut **left, Value::Number(0)));
                drop(mem::replace(&mut **right, Value::Number(0)));
            },
            Value::Lambda { body, .. } => {
                if let Some(body) = Rc::get_mut(body) {
                    drop(mem::replace(body, Value::Number(0)));
                }
            },
            Value::Number(_) | Value::String(_) | Value::Symbol(_) | Value::Error(_) => {},
        })
    }
}

fn write_escaped(f: &mut fmt::Formatter, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in s.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "\"")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        ensure_sufficient_stack(|| match self {
            Value::Number(x) => write!(f, "{}", x),
            Value::String(x) => write_escaped(f, x),
            Value::Symbol(name) => write!(f, "{}", name.as_str()),
            Value::Error(err) => write!(f, "<ERR \"{}\">", err),
            Value::Lambda { param, body, .. } => write!(f, "(\\{}.{})", param.as_str(), body),
            Value::Application(left, right) => write!(f, "{{{} {}}}", left, right),
        })
    }
}
