//! Standard library function implementations
//!
//! This module contains all builtin implementations organized by category.
//! Every builtin takes its evaluated arguments as a slice and returns either
//! a value or an error message; the caller attaches the call line.

pub mod collections;
pub mod convert;
pub mod math;
pub mod string;

use super::types::Val;
use std::fmt;

/* ===================== Builtin Identifiers ===================== */

/// Builtin function identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Len,
    Str,
    Upper,
    Lower,
    Trim,
    Contains,
    Split,
    Join,
    Replace,
    Substr,
    Abs,
    Floor,
    Ceil,
    Round,
    Min,
    Max,
    Append,
    Keys,
    Type,
    ToJson,
    FromJson,
    Now,
    Print,
}

pub const ALL: &[Builtin] = &[
    Builtin::Len,
    Builtin::Str,
    Builtin::Upper,
    Builtin::Lower,
    Builtin::Trim,
    Builtin::Contains,
    Builtin::Split,
    Builtin::Join,
    Builtin::Replace,
    Builtin::Substr,
    Builtin::Abs,
    Builtin::Floor,
    Builtin::Ceil,
    Builtin::Round,
    Builtin::Min,
    Builtin::Max,
    Builtin::Append,
    Builtin::Keys,
    Builtin::Type,
    Builtin::ToJson,
    Builtin::FromJson,
    Builtin::Now,
    Builtin::Print,
];

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        ALL.iter().copied().find(|b| b.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::Str => "str",
            Builtin::Upper => "upper",
            Builtin::Lower => "lower",
            Builtin::Trim => "trim",
            Builtin::Contains => "contains",
            Builtin::Split => "split",
            Builtin::Join => "join",
            Builtin::Replace => "replace",
            Builtin::Substr => "substr",
            Builtin::Abs => "abs",
            Builtin::Floor => "floor",
            Builtin::Ceil => "ceil",
            Builtin::Round => "round",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Append => "append",
            Builtin::Keys => "keys",
            Builtin::Type => "type",
            Builtin::ToJson => "to_json",
            Builtin::FromJson => "from_json",
            Builtin::Now => "now",
            Builtin::Print => "print",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Builtin::Now => Arity::exactly(0),
            Builtin::Contains | Builtin::Split | Builtin::Join | Builtin::Append => {
                Arity::exactly(2)
            }
            Builtin::Replace => Arity::exactly(3),
            Builtin::Substr => Arity::range(2, 3),
            Builtin::Min | Builtin::Max => Arity::at_least(1),
            Builtin::Print => Arity::at_least(0),
            _ => Arity::exactly(1),
        }
    }
}

/// Accepted argument counts of a builtin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    pub fn exactly(n: usize) -> Self {
        Arity { min: n, max: Some(n) }
    }

    pub fn range(min: usize, max: usize) -> Self {
        Arity { min, max: Some(max) }
    }

    pub fn at_least(min: usize) -> Self {
        Arity { min, max: None }
    }

    pub fn accepts(&self, n: usize) -> bool {
        n >= self.min && self.max.map_or(true, |max| n <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", max),
            Some(max) => write!(f, "{} to {}", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

/// Arity of the builtin called `name`, if there is one
pub fn arity(name: &str) -> Option<Arity> {
    Builtin::from_name(name).map(Builtin::arity)
}

/* ===================== Stdlib Dispatcher ===================== */

/// Call a builtin with already-evaluated arguments
pub fn call_builtin(func: Builtin, args: &[Val]) -> Result<Val, String> {
    let arity = func.arity();
    if !arity.accepts(args.len()) {
        return Err(format!(
            "{}() takes {} argument(s), got {}",
            func.name(),
            arity,
            args.len()
        ));
    }

    match func {
        Builtin::Len => collections::len(args),
        Builtin::Append => collections::append(args),
        Builtin::Keys => collections::keys(args),
        Builtin::Contains => collections::contains(args),
        Builtin::Str => string::str(args),
        Builtin::Upper => string::upper(args),
        Builtin::Lower => string::lower(args),
        Builtin::Trim => string::trim(args),
        Builtin::Split => string::split(args),
        Builtin::Join => string::join(args),
        Builtin::Replace => string::replace(args),
        Builtin::Substr => string::substr(args),
        Builtin::Abs => math::abs(args),
        Builtin::Floor => math::floor(args),
        Builtin::Ceil => math::ceil(args),
        Builtin::Round => math::round(args),
        Builtin::Min => math::min(args),
        Builtin::Max => math::max(args),
        Builtin::Type => convert::type_of(args),
        Builtin::ToJson => convert::to_json(args),
        Builtin::FromJson => convert::from_json(args),
        Builtin::Now => convert::now(args),
        Builtin::Print => convert::print(args),
    }
}

/// Argument type error in the shape every builtin reports it
pub(crate) fn expected(func: &str, what: &str, got: &Val) -> String {
    format!("{}() expects {}, got {}", func, what, got.type_name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(Builtin::from_name("to_json"), Some(Builtin::ToJson));
        assert_eq!(Builtin::from_name("nope"), None);
        assert_eq!(arity("substr"), Some(Arity::range(2, 3)));
    }

    #[test]
    fn test_arity_display() {
        assert_eq!(Arity::exactly(1).to_string(), "1");
        assert_eq!(Arity::range(2, 3).to_string(), "2 to 3");
        assert_eq!(Arity::at_least(1).to_string(), "at least 1");
    }

    #[test]
    fn test_dispatcher_checks_arity() {
        let err = call_builtin(Builtin::Upper, &[]).unwrap_err();
        assert_eq!(err, "upper() takes 1 argument(s), got 0");
    }
}
