//! Lizp: a small untyped lambda calculus.
//!
//! ```text
//! def id = (\x.x)
//! def const = (\x.(\y.x))
//! {{const "kept"} {id 5}}
//! ```

pub mod error;
pub mod lex;
pub mod parse;
pub mod util;
pub mod walker;

use std::fmt;
use tracing::debug;
pub use self::{
    error::Error,
    parse::{Node, Tag},
    walker::{EnvRef, Envs, EvalError, Machine, Slot, Stats, Value},
};

/// What running a single top-level form produced.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// A `def` that bound its name. The value may itself be an error.
    Defined(String, Value),
    /// The value of an expression, or the error a rejected `def` reported.
    Value(Value),
}

impl Outcome {
    pub fn value(&self) -> &Value {
        match self {
            Outcome::Defined(_, value) | Outcome::Value(value) => value,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Outcome::Defined(_, value) | Outcome::Value(value) => value,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Outcome::Defined(name, value) => write!(f, "{} = {}", name, value),
            Outcome::Value(value) => write!(f, "{}", value),
        }
    }
}

/// A session: source text in, rendered values out.
#[derive(Default)]
pub struct Engine {
    machine: Machine,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    /// Lex and parse `code` into its top-level forms.
    pub fn parse_str(code: &str) -> Result<Vec<Node>, Vec<Error>> {
        let tokens = lex::lex(code)?;
        parse::parse(&tokens)
    }

    /// Run one top-level form: either bind a definition or evaluate an expression.
    pub fn run_form(&mut self, node: &Node) -> Outcome {
        match (node.tag, node.children.as_slice()) {
            (Tag::Definition, [name, expr]) if name.tag == Tag::Identifier => {
                debug!(name = name.text.as_str(), "running definition");
                let expr = self.machine.read(expr);
                match self.machine.define(&name.text, &expr) {
                    Ok(value) => Outcome::Defined(name.text.clone(), value),
                    Err(err) => Outcome::Value(Value::Error(err)),
                }
            },
            (Tag::Definition, _) => Outcome::Value(Value::Error(EvalError::MalformedExpression)),
            _ => {
                let value = self.machine.read(node);
                Outcome::Value(self.machine.evaluate(&value))
            },
        }
    }

    /// Run every form in `code`, in order.
    ///
    /// Evaluation failures are ordinary outcomes. Only text that can't be read at all is
    /// reported as `Err`, in which case nothing is run.
    pub fn execute(&mut self, code: &str) -> Result<Vec<Outcome>, Vec<Error>> {
        let forms = Self::parse_str(code)?;
        Ok(forms
            .iter()
            .map(|form| self.run_form(form))
            .collect())
    }

    /// Run `code` and return the value of its last form.
    pub fn eval_str(&mut self, code: &str) -> Result<Option<Value>, Vec<Error>> {
        Ok(self.execute(code)?
            .pop()
            .map(Outcome::into_value))
    }

    /// Remove a global definition, returning its value.
    pub fn undefine(&mut self, name: &str) -> Value {
        self.machine.undefine(name)
    }

    /// The global definitions, in the order they were made.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        self.machine
            .globals()
            .into_iter()
            .map(|(name, value)| (name.as_str().to_owned(), value))
            .collect()
    }

    pub fn stats(&self) -> Stats {
        self.machine.envs().stats()
    }
}
