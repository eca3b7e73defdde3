//! Top-level driver: load a script, run it, report the outcome

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::rc::Rc;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use super::executor::{
    MockResolver, NullResolver, Resolver, Scope, ScopeSettings, ScriptError, Val, Vm,
};
use super::parser::{self, Program};
use crate::config::Config;

/// Outcome of one complete run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub execution_id: Uuid,
    /// Value of a top-level `return`, else `Null`
    pub result: Val,
    pub globals: BTreeMap<String, Val>,
    /// Number of markers the program yielded
    pub steps: usize,
    /// The program ended on `exit`
    pub exited: bool,
}

/// A loaded, linked program plus the environment it runs in
pub struct Runner {
    program: Program,
    settings: ScopeSettings,
    resolver: Rc<dyn Resolver>,
}

impl Runner {
    /// Lex, parse and link `source`
    pub fn from_source(name: &str, source: &str, config: &Config) -> Result<Self> {
        let program = parser::load(name, source)
            .with_context(|| format!("Failed to load script '{}'", name))?;

        let resolver: Rc<dyn Resolver> = match &config.resolver.mock_file {
            Some(path) => Rc::new(MockResolver::from_file(path).with_context(|| {
                format!("Failed to load mock responses from {}", path.display())
            })?),
            None => Rc::new(NullResolver),
        };

        Ok(Runner {
            program,
            settings: config.scope_settings()?,
            resolver,
        })
    }

    pub fn from_file(path: &Path, config: &Config) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        Self::from_source(&path.display().to_string(), &source, config)
    }

    /// Swap the resolver used by every later run
    pub fn with_resolver(mut self, resolver: Rc<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Fresh environment with `inputs` seeded as globals
    pub fn new_scope(&self, inputs: HashMap<String, Val>) -> Scope {
        let mut scope = Scope::new(Rc::clone(&self.resolver), self.settings.clone());
        for (name, value) in inputs {
            scope.set_global(&name, value);
        }
        scope
    }

    /// The program's marker sequence over `scope`
    pub fn steps<'s>(&self, scope: &'s mut Scope) -> Vm<'s> {
        Vm::from_program(&self.program, scope)
    }

    /// Run the program to completion
    pub fn run(&self, inputs: HashMap<String, Val>) -> Result<RunReport, ScriptError> {
        let execution_id = Uuid::new_v4();
        let span = info_span!("run", %execution_id, program = %self.program.name);
        let _enter = span.enter();

        info!(inputs = inputs.len(), "run started");

        let mut scope = self.new_scope(inputs);
        let mut vm = self.steps(&mut scope);
        let mut steps = 0;
        for item in vm.by_ref() {
            match item {
                Ok(_) => steps += 1,
                Err(err) => {
                    warn!(steps, error = %err, "run failed");
                    return Err(err);
                }
            }
        }
        let result = vm.result().cloned().unwrap_or(Val::Null);
        let exited = vm.exited();
        drop(vm);

        info!(steps, exited, "run finished");

        Ok(RunReport {
            execution_id,
            result,
            globals: scope.globals().clone().into_iter().collect(),
            steps,
            exited,
        })
    }
}
