//! Resolver contract: where remote callables and module sources come from
//!
//! A call written `name(args) @ "service/interface"` is handed to the
//! resolver as `(service, interface, name)`. Includes ask the resolver for
//! module source before falling back to the include directory.

use super::registry::NativeFn;
use super::types::Val;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

pub trait Resolver {
    /// Look up the callable for `method` on `service`/`interface`
    fn resolve_callable(
        &self,
        service: &str,
        interface: &str,
        method: &str,
    ) -> Result<NativeFn, String>;

    /// Source text of an included module, if this resolver serves it
    fn fetch_module_source(&self, _name: &str) -> Option<String> {
        None
    }
}

/* ===================== NullResolver ===================== */

/// Resolves nothing; every remote call fails
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResolver;

impl Resolver for NullResolver {
    fn resolve_callable(
        &self,
        service: &str,
        interface: &str,
        method: &str,
    ) -> Result<NativeFn, String> {
        Err(format!(
            "no resolver configured for {}/{}/{}",
            service, interface, method
        ))
    }
}

/* ===================== StaticResolver ===================== */

/// In-memory services and modules
///
/// ```
/// use stepwise_core::interpreter::executor::resolver::StaticResolver;
/// use stepwise_core::interpreter::executor::Val;
///
/// let resolver = StaticResolver::new()
///     .service("billing", "api", "charge", |args| Ok(args[0].clone()))
///     .module("helpers", "function twice(n) { return n * 2; }");
/// ```
#[derive(Default)]
pub struct StaticResolver {
    services: HashMap<(String, String, String), NativeFn>,
    modules: HashMap<String, String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service<F>(mut self, service: &str, interface: &str, method: &str, func: F) -> Self
    where
        F: Fn(&[Val]) -> Result<Val, String> + 'static,
    {
        self.services.insert(
            (service.to_string(), interface.to_string(), method.to_string()),
            Rc::new(func),
        );
        self
    }

    pub fn module(mut self, name: &str, source: &str) -> Self {
        self.modules.insert(name.to_string(), source.to_string());
        self
    }
}

impl Resolver for StaticResolver {
    fn resolve_callable(
        &self,
        service: &str,
        interface: &str,
        method: &str,
    ) -> Result<NativeFn, String> {
        self.services
            .get(&(service.to_string(), interface.to_string(), method.to_string()))
            .cloned()
            .ok_or_else(|| format!("unknown method {}/{}/{}", service, interface, method))
    }

    fn fetch_module_source(&self, name: &str) -> Option<String> {
        self.modules.get(name).cloned()
    }
}

/* ===================== MockResolver ===================== */

#[derive(Debug, Error)]
pub enum MockError {
    #[error("failed to read mock file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid mock JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("mock file must contain a JSON object")]
    NotAnObject,

    #[error("mock module `{0}` must be a string of source text")]
    BadModule(String),
}

/// Canned responses loaded from JSON
///
/// Every top-level key except `"modules"` maps a call to the value it
/// returns: either `"service/interface/method"` or a bare `"method"` that
/// answers on any service. `"modules"` maps include names to source text.
#[derive(Debug, Default, Clone)]
pub struct MockResolver {
    responses: HashMap<String, Val>,
    modules: HashMap<String, String>,
}

impl MockResolver {
    pub fn from_file(path: &Path) -> Result<Self, MockError> {
        let text = std::fs::read_to_string(path).map_err(|source| MockError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, MockError> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        let serde_json::Value::Object(entries) = json else {
            return Err(MockError::NotAnObject);
        };

        let mut mock = MockResolver::default();
        for (key, value) in entries {
            if key == "modules" {
                let serde_json::Value::Object(modules) = value else {
                    return Err(MockError::BadModule(key));
                };
                for (name, source) in modules {
                    let serde_json::Value::String(source) = source else {
                        return Err(MockError::BadModule(name));
                    };
                    mock.modules.insert(name, source);
                }
            } else {
                mock.responses.insert(key, Val::from_json(&value));
            }
        }
        Ok(mock)
    }
}

impl Resolver for MockResolver {
    fn resolve_callable(
        &self,
        service: &str,
        interface: &str,
        method: &str,
    ) -> Result<NativeFn, String> {
        let full = format!("{}/{}/{}", service, interface, method);
        let value = self
            .responses
            .get(&full)
            .or_else(|| self.responses.get(method))
            .cloned()
            .ok_or_else(|| format!("no mock response for {}", full))?;
        Ok(Rc::new(move |_args: &[Val]| Ok(value.clone())))
    }

    fn fetch_module_source(&self, name: &str) -> Option<String> {
        self.modules.get(name).cloned()
    }
}
