use std::{
    cell::RefCell,
    fmt,
    mem,
    rc::{Rc, Weak},
};
use tracing::{debug, trace};
use crate::util::ensure_sufficient_stack;
use super::value::{Ident, Value};

/// The contents of a binding.
#[derive(Clone, Debug, PartialEq)]
pub enum Slot {
    /// A lambda parameter that hasn't been supplied with an argument yet.
    Unbound,
    Bound(Value),
}

struct Env {
    parent: Option<EnvRef>,
    // Names are unique within one environment.
    pairs: Vec<(Ident, Slot)>,
}

impl Env {
    fn position(&self, name: Ident) -> Option<usize> {
        self.pairs.iter().position(|(n, _)| *n == name)
    }
}

impl Drop for Env {
    fn drop(&mut self) {
        // Parent chains are as long as the source is deeply nested.
        if let Some(parent) = self.parent.take() {
            ensure_sufficient_stack(move || drop(parent));
        }
    }
}

/// A shared handle to an environment.
///
/// The lambda that an environment was created for holds it, and so does every environment
/// linked beneath it. Once the last holder is gone the environment is freed, along with
/// whatever its slots hold.
#[derive(Clone)]
pub struct EnvRef(Rc<RefCell<Env>>);

impl EnvRef {
    fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn parent(&self) -> Option<EnvRef> {
        self.0.borrow().parent.clone()
    }

    pub fn set_parent(&self, parent: &EnvRef) {
        self.0.borrow_mut().parent = Some(parent.clone());
    }

    /// Whether `self` is `env` itself or appears somewhere along its parent chain.
    pub fn is_ancestor_of(&self, env: &EnvRef) -> bool {
        let mut env = env.clone();
        loop {
            if env == *self {
                return true;
            }
            match env.parent() {
                Some(parent) => env = parent,
                None => return false,
            }
        }
    }

    /// Append a binding. Fails, leaving the environment untouched, if `name` already has a
    /// binding here. Parents are not consulted.
    pub fn insert(&self, name: Ident, value: Value) -> bool {
        self.insert_slot(name, Slot::Bound(value))
    }

    /// Append a parameter slot that is waiting for an argument.
    pub fn insert_unbound(&self, name: Ident) -> bool {
        self.insert_slot(name, Slot::Unbound)
    }

    fn insert_slot(&self, name: Ident, slot: Slot) -> bool {
        let mut env = self.0.borrow_mut();
        if env.position(name).is_some() {
            false
        } else {
            env.pairs.push((name, slot));
            true
        }
    }

    /// Whether this environment itself binds `name`.
    pub fn contains_local(&self, name: Ident) -> bool {
        self.0.borrow().position(name).is_some()
    }

    /// Search this environment, then each of its ancestors in turn, for the slot bound to `name`.
    pub fn lookup(&self, name: Ident) -> Option<Slot> {
        let mut env = self.clone();
        loop {
            let parent = {
                let frame = env.0.borrow();
                if let Some(idx) = frame.position(name) {
                    trace!(name = name.as_str(), env = ?env, "symbol found");
                    return Some(frame.pairs[idx].1.clone());
                }
                frame.parent.clone()
            };
            match parent {
                Some(parent) => env = parent,
                None => {
                    trace!(name = name.as_str(), env = ?env, "symbol not found");
                    return None;
                },
            }
        }
    }

    /// Like [`EnvRef::lookup`], but only yields slots that have a value.
    pub fn find(&self, name: Ident) -> Option<Value> {
        match self.lookup(name)? {
            Slot::Bound(value) => Some(value),
            Slot::Unbound => None,
        }
    }

    /// Supply a value for the parameter `name`.
    ///
    /// Only succeeds if this environment itself has a slot for `name` and that slot is still
    /// unbound.
    pub fn bind(&self, name: Ident, value: Value) -> bool {
        let mut frame = self.0.borrow_mut();
        match frame.position(name) {
            Some(idx) if frame.pairs[idx].1 == Slot::Unbound => {
                debug!(name = name.as_str(), value = %value, env = ?self, "binding parameter");
                frame.pairs[idx].1 = Slot::Bound(value);
                true
            },
            _ => false,
        }
    }

    /// Reset the slot for `name` to unbound, dropping whatever it held.
    pub fn rebind_unbound(&self, name: Ident) -> bool {
        let old = {
            let mut frame = self.0.borrow_mut();
            match frame.position(name) {
                Some(idx) => mem::replace(&mut frame.pairs[idx].1, Slot::Unbound),
                None => return false,
            }
        };
        drop(old);
        true
    }

    /// Delete the binding for `name`, returning what it held.
    pub fn remove(&self, name: Ident) -> Option<Slot> {
        let mut frame = self.0.borrow_mut();
        let idx = frame.position(name)?;
        Some(frame.pairs.remove(idx).1)
    }

    /// The bindings of this environment itself, in insertion order.
    pub fn bindings(&self) -> Vec<(Ident, Slot)> {
        self.0.borrow().pairs.clone()
    }

    /// Drop every binding. Values that refer back to this environment keep it alive, so this
    /// is how a root environment gets released.
    pub fn clear(&self) {
        let pairs = mem::take(&mut self.0.borrow_mut().pairs);
        drop(pairs);
    }
}

impl PartialEq for EnvRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for EnvRef {}

impl fmt::Debug for EnvRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "EnvRef({:#x})", self.id())
    }
}

/// Creates environments and keeps track of the ones still alive.
#[derive(Default)]
pub struct Envs {
    live: Vec<Weak<RefCell<Env>>>,
}

impl Envs {
    /// Create an empty environment without a parent.
    pub fn new_env(&mut self) -> EnvRef {
        if self.live.len() == self.live.capacity() {
            self.live.retain(|env| env.strong_count() > 0);
        }
        let env = Rc::new(RefCell::new(Env {
            parent: None,
            pairs: Vec::new(),
        }));
        self.live.push(Rc::downgrade(&env));
        EnvRef(env)
    }

    pub fn stats(&self) -> Stats {
        let mut stats = Stats::default();
        for env in self.live.iter().filter_map(Weak::upgrade) {
            let env = env.borrow();
            stats.total_envs += 1;
            if env.parent.is_some() {
                stats.linked_envs += 1;
            }
            stats.total_bindings += env.pairs.len();
            stats.unbound_slots += env.pairs
                .iter()
                .filter(|(_, slot)| *slot == Slot::Unbound)
                .count();
        }
        stats
    }
}

/// Counts over the environments that are still alive.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub total_envs: usize,
    pub linked_envs: usize,
    pub total_bindings: usize,
    pub unbound_slots: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walker::value::ident;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_refuses_duplicates() {
        let mut envs = Envs::default();
        let env = envs.new_env();
        assert!(env.insert(ident("x"), Value::Number(1)));
        assert!(!env.insert(ident("x"), Value::Number(2)));
        assert!(!env.insert_unbound(ident("x")));
        assert_eq!(env.find(ident("x")), Some(Value::Number(1)));
    }

    #[test]
    fn insertion_order_is_kept() {
        let mut envs = Envs::default();
        let env = envs.new_env();
        for name in &["c", "a", "b"] {
            env.insert(ident(name), Value::string(*name));
        }
        let names = env
            .bindings()
            .into_iter()
            .map(|(name, _)| name.as_str().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn find_walks_parents() {
        let mut envs = Envs::default();
        let global = envs.new_env();
        let inner = envs.new_env();
        global.insert(ident("x"), Value::Number(1));
        inner.insert(ident("y"), Value::Number(2));

        // Unlinked: lookups stop at the inner environment.
        assert_eq!(inner.find(ident("x")), None);

        inner.set_parent(&global);
        assert_eq!(inner.find(ident("x")), Some(Value::Number(1)));
        assert_eq!(inner.find(ident("y")), Some(Value::Number(2)));
        assert_eq!(global.find(ident("y")), None);
        assert!(global.is_ancestor_of(&inner));
        assert!(!inner.is_ancestor_of(&global));
    }

    #[test]
    fn inner_bindings_shadow_outer_ones() {
        let mut envs = Envs::default();
        let global = envs.new_env();
        let inner = envs.new_env();
        inner.set_parent(&global);
        global.insert(ident("x"), Value::Number(1));
        assert!(inner.insert(ident("x"), Value::Number(2)));
        assert_eq!(inner.find(ident("x")), Some(Value::Number(2)));
    }

    #[test]
    fn bind_only_fills_unbound_local_slots() {
        let mut envs = Envs::default();
        let global = envs.new_env();
        let inner = envs.new_env();
        inner.set_parent(&global);
        global.insert_unbound(ident("p"));
        inner.insert_unbound(ident("x"));

        // Absent locally, even though a parent has it.
        assert!(!inner.bind(ident("p"), Value::Number(0)));
        assert_eq!(inner.lookup(ident("p")), Some(Slot::Unbound));

        assert_eq!(inner.find(ident("x")), None);
        assert!(inner.bind(ident("x"), Value::Number(5)));
        assert!(!inner.bind(ident("x"), Value::Number(6)));
        assert_eq!(inner.find(ident("x")), Some(Value::Number(5)));

        assert!(inner.rebind_unbound(ident("x")));
        assert_eq!(inner.lookup(ident("x")), Some(Slot::Unbound));
        assert!(inner.bind(ident("x"), Value::Number(6)));
        assert_eq!(inner.find(ident("x")), Some(Value::Number(6)));
    }

    #[test]
    fn parameters_bound_to_errors_are_not_unbound() {
        let mut envs = Envs::default();
        let env = envs.new_env();
        env.insert_unbound(ident("x"));
        let err = Value::Error(crate::walker::EvalError::NotApplicable);
        assert!(env.bind(ident("x"), err.clone()));
        assert_eq!(env.lookup(ident("x")), Some(Slot::Bound(err)));
    }

    #[test]
    fn remove_deletes_and_returns() {
        let mut envs = Envs::default();
        let env = envs.new_env();
        env.insert(ident("a"), Value::Number(1));
        env.insert(ident("b"), Value::Number(2));
        assert_eq!(env.remove(ident("a")), Some(Slot::Bound(Value::Number(1))));
        assert_eq!(env.remove(ident("a")), None);
        assert_eq!(env.find(ident("a")), None);
        assert!(env.insert(ident("a"), Value::Number(3)));
        assert_eq!(envs.stats().total_bindings, 2);
    }

    #[test]
    fn dropped_environments_leave_the_stats() {
        let mut envs = Envs::default();
        let global = envs.new_env();
        for _ in 0..100 {
            let env = envs.new_env();
            env.set_parent(&global);
            env.insert_unbound(ident("x"));
        }
        assert_eq!(
            envs.stats(),
            Stats {
                total_envs: 1,
                linked_envs: 0,
                total_bindings: 0,
                unbound_slots: 0,
            },
        );
    }

    #[test]
    fn children_keep_their_parents_alive() {
        let mut envs = Envs::default();
        let child = {
            let parent = envs.new_env();
            parent.insert(ident("x"), Value::Number(1));
            let child = envs.new_env();
            child.set_parent(&parent);
            child
        };
        assert_eq!(child.find(ident("x")), Some(Value::Number(1)));
        assert_eq!(envs.stats().total_envs, 2);
        drop(child);
        assert_eq!(envs.stats().total_envs, 0);
    }

    #[test]
    fn long_parent_chains_drop_without_overflowing() {
        let mut envs = Envs::default();
        let mut env = envs.new_env();
        for _ in 0..100_000 {
            let child = envs.new_env();
            child.set_parent(&env);
            env = child;
        }
        drop(env);
        assert_eq!(envs.stats().total_envs, 0);
    }
}
