//! The evaluator: values, environments and the eval/apply recursion that reduces one to the
//! other.
//!
//! Evaluation is call-by-value. Both operands of an application are evaluated, left first,
//! before the function is applied.
//!
//! There is no substitution. A lambda owns exactly one environment, holding the slot for its
//! parameter, and applying the lambda writes the argument into that slot before evaluating the
//! body under it. Because clones of a lambda share the slot, applying the same lambda again
//! first resets the slot to unbound.

pub mod env;
pub mod link;
pub mod read;
pub mod value;

use tracing::debug;
use crate::{
    parse::Node,
    util::ensure_sufficient_stack,
};
pub use self::{
    env::{EnvRef, Envs, Slot, Stats},
    value::{ident, EvalError, Ident, Value},
};

/// All evaluation state: the global environment and the bookkeeping for every environment
/// created under it.
pub struct Machine {
    envs: Envs,
    global: EnvRef,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Machine {
    fn drop(&mut self) {
        // Defined lambdas link back to the global environment.
        self.global.clear();
    }
}

impl Machine {
    pub fn new() -> Self {
        let mut envs = Envs::default();
        let global = envs.new_env();
        Self { envs, global }
    }

    pub fn global(&self) -> EnvRef {
        self.global.clone()
    }

    pub fn envs(&self) -> &Envs {
        &self.envs
    }

    /// Build an unlinked value tree from a parsed expression.
    pub fn read(&mut self, node: &Node) -> Value {
        read::read(node, &mut self.envs)
    }

    /// Attach the lambdas of `value` to the scope chain starting at `env`.
    pub fn link(&self, value: &Value, env: &EnvRef) {
        link::link(value, env)
    }

    /// Link a freshly read value to the global scope and evaluate it there.
    pub fn evaluate(&mut self, value: &Value) -> Value {
        let global = self.global.clone();
        self.link(value, &global);
        self.eval(value, &global)
    }

    pub fn eval(&mut self, value: &Value, env: &EnvRef) -> Value {
        ensure_sufficient_stack(|| match value {
            Value::Number(_)
            | Value::String(_)
            | Value::Error(_)
            | Value::Lambda { .. } => value.clone(),
            Value::Symbol(name) => match env.lookup(*name) {
                Some(Slot::Bound(value)) => value,
                Some(Slot::Unbound) => Value::Error(EvalError::Unsupplied(name.as_str().to_owned())),
                None => Value::Error(EvalError::UnboundSymbol(name.as_str().to_owned())),
            },
            Value::Application(left, right) => {
                let func = self.eval(left, env);
                let arg = self.eval(right, env);
                self.apply(func, arg, env)
            },
        })
    }

    pub fn apply(&mut self, func: Value, arg: Value, env: &EnvRef) -> Value {
        match &func {
            Value::Error(_) => func.clone(),
            _ if arg.is_error() => arg,
            Value::Lambda { param, body, env: inner } => {
                debug!(param = param.as_str(), arg = %arg, "applying lambda");
                inner.rebind_unbound(*param);
                let bound = inner.bind(*param, arg);
                debug_assert!(bound, "lambda environment lost its parameter slot");
                self.eval(body, inner)
            },
            // Not reduced yet: reduce it once and try again.
            Value::Symbol(_) | Value::Application(_, _) => match self.eval(&func, env) {
                Value::Symbol(_) | Value::Application(_, _) => Value::Error(EvalError::NotApplicable),
                func => self.apply(func, arg, env),
            },
            Value::Number(_) | Value::String(_) => Value::Error(EvalError::NotApplicable),
        }
    }

    /// Bind `name` in the global scope to the value of `expr`, returning that value.
    ///
    /// Redefinition is rejected with [`EvalError::AlreadyBound`] before `expr` is evaluated.
    /// Any other result is bound, errors included.
    pub fn define(&mut self, name: &str, expr: &Value) -> Result<Value, EvalError> {
        let name = ident(name);
        if self.global.contains_local(name) {
            return Err(EvalError::AlreadyBound(name.as_str().to_owned()));
        }

        let value = self.evaluate(expr);
        debug!(name = name.as_str(), value = %value, "defining global");
        self.global.insert(name, value.clone());
        Ok(value)
    }

    /// Remove the global binding for `name`, returning the value it held.
    pub fn undefine(&mut self, name: &str) -> Value {
        let name = ident(name);
        match self.global.remove(name) {
            Some(Slot::Bound(value)) => {
                debug!(name = name.as_str(), "removed global");
                value
            },
            Some(Slot::Unbound) | None => Value::Error(EvalError::UnboundSymbol(name.as_str().to_owned())),
        }
    }

    /// The global bindings, in the order they were defined.
    pub fn globals(&self) -> Vec<(Ident, Value)> {
        self.global
            .bindings()
            .into_iter()
            .filter_map(|(name, slot)| match slot {
                Slot::Bound(value) => Some((name, value)),
                Slot::Unbound => None,
            })
            .collect()
    }
}
