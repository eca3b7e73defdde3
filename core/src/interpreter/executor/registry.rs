//! Function registry: name to callable, plus a cache of resolved remote calls

use super::stdlib::{self, Builtin};
use super::types::{FunctionDef, Val};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Host-provided function (remote endpoints, test doubles)
pub type NativeFn = Rc<dyn Fn(&[Val]) -> Result<Val, String>>;

/// Anything a procedure call can land on
#[derive(Clone)]
pub enum Callable {
    Builtin(Builtin),
    User(Rc<FunctionDef>),
    Native(NativeFn),
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Builtin(b) => write!(f, "Builtin({})", b.name()),
            Callable::User(def) => write!(f, "User({}/{})", def.name, def.params.len()),
            Callable::Native(_) => write!(f, "Native"),
        }
    }
}

/// Key of a resolved remote callable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteKey {
    pub service: String,
    pub interface: String,
    pub method: String,
}

#[derive(Debug, Default)]
pub struct Registry {
    functions: HashMap<String, Callable>,
    remote: HashMap<RemoteKey, NativeFnEntry>,
}

/// Wrapper so the cache can derive `Debug`
#[derive(Clone)]
struct NativeFnEntry(NativeFn);

impl fmt::Debug for NativeFnEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFn")
    }
}

impl Registry {
    /// Registry holding every builtin
    pub fn with_builtins() -> Self {
        let mut registry = Registry::default();
        for builtin in stdlib::ALL {
            registry
                .functions
                .insert(builtin.name().to_string(), Callable::Builtin(*builtin));
        }
        registry
    }

    /// Install or replace the callable under `name`
    pub fn define(&mut self, name: &str, callable: Callable) -> Option<Callable> {
        self.functions.insert(name.to_string(), callable)
    }

    pub fn define_function(&mut self, def: Rc<FunctionDef>) {
        let name = def.name.clone();
        tracing::debug!(function = %name, params = def.params.len(), "installing function");
        self.define(&name, Callable::User(def));
    }

    pub fn get(&self, name: &str) -> Option<&Callable> {
        self.functions.get(name)
    }

    pub fn cached_remote(&self, key: &RemoteKey) -> Option<NativeFn> {
        self.remote.get(key).map(|entry| Rc::clone(&entry.0))
    }

    pub fn cache_remote(&mut self, key: RemoteKey, func: NativeFn) {
        self.remote.insert(key, NativeFnEntry(func));
    }
}
