use tracing::trace;
use crate::util::ensure_sufficient_stack;
use super::{
    env::EnvRef,
    value::Value,
};

/// Attach every lambda in `value` to its lexically enclosing environment, starting from `env`.
///
/// Must run before a freshly read tree is evaluated: until then a lambda's environment has no
/// parent, and lookups from its body would stop at its own parameter.
pub fn link(value: &Value, env: &EnvRef) {
    ensure_sufficient_stack(|| match value {
        Value::Lambda { param, body, env: inner } => {
            trace!(param = param.as_str(), env = ?inner, parent = ?env, "linking lambda");
            inner.set_parent(env);
            link(body, inner);
        },
        Value::Application(left, right) => {
            link(left, env);
            link(right, env);
        },
        Value::Symbol(name) => {
            // A symbol that resolves to a lambda nobody has linked yet adopts this scope.
            // Unresolved symbols are left for evaluation to report.
            if let Some(Value::Lambda { env: target, .. }) = &env.find(*name) {
                if target.parent().is_none() && !target.is_ancestor_of(env) {
                    trace!(name = name.as_str(), "linking through symbol");
                    target.set_parent(env);
                }
            }
        },
        Value::Number(_) | Value::String(_) | Value::Error(_) => {},
    })
}
