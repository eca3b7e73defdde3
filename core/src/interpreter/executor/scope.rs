//! Runtime environment
//!
//! One root `Scope` per run holds the globals, a stack of call-scopes per
//! function name (one entry per active invocation), the function registry,
//! the resolver and the interpreter settings. Lookups inside a call fall
//! through from the call's locals to the globals; nothing is copied.

use super::registry::{Callable, Registry};
use super::resolver::{NullResolver, Resolver};
use super::types::{FunctionDef, Val};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

/// Slot holding the value returned by the current call
pub const RETURN_SLOT: &str = "__return_func";
/// Slot holding the message of the last recovered error
pub const ERROR_SLOT: &str = "__error";

/// Interpreter settings carried by the scope
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeSettings {
    /// Pause between retry attempts
    pub retry_delay: Duration,
    /// Factor applied to the seconds of every `delay` statement
    pub delay_scale: f64,
    /// Directory searched by `include` when the resolver has no source
    pub include_dir: PathBuf,
    /// File extension of included modules, without the dot
    pub include_extension: String,
    /// Deepest allowed nesting of user function calls
    pub max_call_depth: usize,
}

impl Default for ScopeSettings {
    fn default() -> Self {
        ScopeSettings {
            retry_delay: Duration::from_secs(1),
            delay_scale: 1.0,
            include_dir: PathBuf::from("."),
            include_extension: "wf".to_string(),
            max_call_depth: 200,
        }
    }
}

pub type Locals = HashMap<String, Val>;

/// One invocation's variables, plus the names it declared `const`
#[derive(Debug, Default)]
struct CallScope {
    locals: Locals,
    constants: HashSet<String>,
}

pub struct Scope {
    globals: Locals,
    global_constants: HashSet<String>,
    functions: HashMap<String, Vec<CallScope>>,
    /// Names of the active invocations, innermost last
    active: Vec<String>,
    registry: Registry,
    resolver: Rc<dyn Resolver>,
    settings: ScopeSettings,
}

impl Scope {
    pub fn new(resolver: Rc<dyn Resolver>, settings: ScopeSettings) -> Self {
        Scope {
            globals: HashMap::new(),
            global_constants: HashSet::new(),
            functions: HashMap::new(),
            active: Vec::new(),
            registry: Registry::with_builtins(),
            resolver,
            settings,
        }
    }

    /// Scope with the null resolver and default settings
    pub fn standalone() -> Self {
        Self::new(Rc::new(NullResolver), ScopeSettings::default())
    }

    /* ---------- variables ---------- */

    fn current_call(&self) -> Option<&CallScope> {
        let name = self.active.last()?;
        self.functions.get(name)?.last()
    }

    fn current_call_mut(&mut self) -> Option<&mut CallScope> {
        let name = self.active.last()?;
        self.functions.get_mut(name)?.last_mut()
    }

    fn current_locals(&self) -> Option<&Locals> {
        self.current_call().map(|call| &call.locals)
    }

    fn current_locals_mut(&mut self) -> Option<&mut Locals> {
        self.current_call_mut().map(|call| &mut call.locals)
    }

    /// Strict lookup: current call-scope, then globals
    pub fn lookup(&self, name: &str) -> Option<Val> {
        self.current_locals()
            .and_then(|locals| locals.get(name))
            .or_else(|| self.globals.get(name))
            .cloned()
    }

    /// Lenient lookup: an undefined name reads as `Null`
    pub fn get(&self, name: &str) -> Val {
        match self.lookup(name) {
            Some(val) => val,
            None => {
                tracing::trace!(name, "read of undefined variable");
                Val::Null
            }
        }
    }

    /// Write to the current call-scope, or the globals at top level
    pub fn set(&mut self, name: &str, value: Val) {
        match self.current_locals_mut() {
            Some(locals) => {
                locals.insert(name.to_string(), value);
            }
            None => {
                self.globals.insert(name.to_string(), value);
            }
        }
    }

    /// Whether `name` was declared `const` at the current level
    pub fn is_const(&self, name: &str) -> bool {
        match self.current_call() {
            Some(call) => call.constants.contains(name),
            None => self.global_constants.contains(name),
        }
    }

    /// Bind a constant at the current level; a name is constant at most once
    pub fn define_const(&mut self, name: &str, value: Val) -> Result<(), String> {
        if self.is_const(name) {
            return Err(format!("constant '{}' is already defined", name));
        }
        self.set(name, value);
        if let Some(call) = self.current_call_mut() {
            call.constants.insert(name.to_string());
        } else {
            self.global_constants.insert(name.to_string());
        }
        Ok(())
    }

    pub fn globals(&self) -> &Locals {
        &self.globals
    }

    pub fn set_global(&mut self, name: &str, value: Val) {
        self.globals.insert(name.to_string(), value);
    }

    /// Variables visible at this point: globals overlaid with the current locals
    pub fn visible(&self) -> Locals {
        let mut vars = self.globals.clone();
        if let Some(locals) = self.current_locals() {
            vars.extend(locals.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        vars
    }

    /* ---------- call-scopes ---------- */

    pub fn push_call_scope(&mut self, fn_name: &str) -> &mut Locals {
        self.active.push(fn_name.to_string());
        let stack = self.functions.entry(fn_name.to_string()).or_default();
        stack.push(CallScope::default());
        let idx = stack.len() - 1;
        &mut stack[idx].locals
    }

    pub fn pop_call_scope(&mut self, fn_name: &str) -> Option<Locals> {
        debug_assert_eq!(self.active.last().map(String::as_str), Some(fn_name));
        self.active.pop();
        let stack = self.functions.get_mut(fn_name)?;
        let call = stack.pop();
        if stack.is_empty() {
            self.functions.remove(fn_name);
        }
        call.map(|call| call.locals)
    }

    /// Number of active invocations of `fn_name`
    pub fn call_depth(&self, fn_name: &str) -> usize {
        self.functions.get(fn_name).map_or(0, Vec::len)
    }

    /// Total nesting of user function calls
    pub fn active_calls(&self) -> usize {
        self.active.len()
    }

    /* ---------- functions and environment ---------- */

    pub fn define_function(&mut self, def: Rc<FunctionDef>) {
        self.registry.define_function(def);
    }

    pub fn callable(&self, name: &str) -> Option<Callable> {
        self.registry.get(name).cloned()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn resolver(&self) -> Rc<dyn Resolver> {
        Rc::clone(&self.resolver)
    }

    pub fn settings(&self) -> &ScopeSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_reads_as_null() {
        let scope = Scope::standalone();
        assert_eq!(scope.get("missing"), Val::Null);
        assert_eq!(scope.lookup("missing"), None);
    }

    #[test]
    fn test_call_scope_falls_through_to_globals() {
        let mut scope = Scope::standalone();
        scope.set("g", Val::Int(1));

        scope.push_call_scope("f").insert("n".into(), Val::Int(5));
        assert_eq!(scope.get("g"), Val::Int(1));
        assert_eq!(scope.get("n"), Val::Int(5));

        scope.set("g", Val::Int(2));
        assert_eq!(scope.get("g"), Val::Int(2));

        scope.pop_call_scope("f");
        assert_eq!(scope.get("g"), Val::Int(1));
        assert_eq!(scope.get("n"), Val::Null);
    }

    #[test]
    fn test_call_depth_tracks_recursion() {
        let mut scope = Scope::standalone();
        scope.push_call_scope("fact");
        scope.push_call_scope("fact");
        assert_eq!(scope.call_depth("fact"), 2);
        assert_eq!(scope.active_calls(), 2);
        scope.pop_call_scope("fact");
        scope.pop_call_scope("fact");
        assert_eq!(scope.call_depth("fact"), 0);
        assert_eq!(scope.active_calls(), 0);
    }

    #[test]
    fn test_constants_are_per_level() {
        let mut scope = Scope::standalone();
        scope.define_const("limit", Val::Int(3)).unwrap();
        assert!(scope.is_const("limit"));
        assert_eq!(scope.get("limit"), Val::Int(3));
        assert_eq!(
            scope.define_const("limit", Val::Int(4)),
            Err("constant 'limit' is already defined".to_string())
        );

        scope.push_call_scope("f");
        assert!(!scope.is_const("limit"));
        scope.define_const("step", Val::Int(1)).unwrap();
        assert!(scope.is_const("step"));
        scope.pop_call_scope("f");

        assert!(!scope.is_const("step"));
        assert_eq!(scope.get("limit"), Val::Int(3));
    }

    #[test]
    fn test_visible_overlays_locals() {
        let mut scope = Scope::standalone();
        scope.set("a", Val::Int(1));
        scope.set("b", Val::Int(1));
        scope.push_call_scope("f").insert("b".into(), Val::Int(2));
        let vars = scope.visible();
        assert_eq!(vars["a"], Val::Int(1));
        assert_eq!(vars["b"], Val::Int(2));
    }
}
