//! Module loading for `include`
//!
//! Source comes from the resolver when it serves the module, otherwise from
//! `<include_dir>/<module>.<include_extension>`. The module is parsed and
//! linked like any other unit; its errors surface at the include site.

use super::errors::{IncludeError, ScriptError};
use super::scope::Scope;
use crate::interpreter::parser::{self, Program};

pub fn load_module(module: &str, scope: &Scope) -> Result<Program, ScriptError> {
    let source = fetch_source(module, scope)?;
    parser::load(module, &source)
}

fn fetch_source(module: &str, scope: &Scope) -> Result<String, IncludeError> {
    if let Some(source) = scope.resolver().fetch_module_source(module) {
        tracing::debug!(module, "include served by resolver");
        return Ok(source);
    }

    let settings = scope.settings();
    let path = settings
        .include_dir
        .join(format!("{}.{}", module, settings.include_extension));
    tracing::debug!(module, path = %path.display(), "include read from disk");

    std::fs::read_to_string(&path).map_err(|e| IncludeError {
        module: module.to_string(),
        cause: format!("{}: {}", path.display(), e),
    })
}
