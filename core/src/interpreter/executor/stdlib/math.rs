//! Math stdlib functions

use super::expected;
use crate::interpreter::executor::types::Val;
use std::cmp::Ordering;

pub fn abs(args: &[Val]) -> Result<Val, String> {
    match &args[0] {
        Val::Int(i) => i
            .checked_abs()
            .map(Val::Int)
            .ok_or_else(|| "abs() overflow".to_string()),
        Val::Float(x) => Ok(Val::Float(x.abs())),
        other => Err(expected("abs", "a number", other)),
    }
}

pub fn floor(args: &[Val]) -> Result<Val, String> {
    to_int("floor", &args[0], f64::floor)
}

pub fn ceil(args: &[Val]) -> Result<Val, String> {
    to_int("ceil", &args[0], f64::ceil)
}

/// Rounds half away from zero
pub fn round(args: &[Val]) -> Result<Val, String> {
    to_int("round", &args[0], f64::round)
}

fn to_int(func: &str, val: &Val, op: fn(f64) -> f64) -> Result<Val, String> {
    match val {
        Val::Int(i) => Ok(Val::Int(*i)),
        Val::Float(x) if x.is_finite() => Ok(Val::Int(op(*x) as i64)),
        other => Err(expected(func, "a finite number", other)),
    }
}

pub fn min(args: &[Val]) -> Result<Val, String> {
    extreme("min", args, Ordering::Less)
}

pub fn max(args: &[Val]) -> Result<Val, String> {
    extreme("max", args, Ordering::Greater)
}

/// A single list argument is searched itself; otherwise the arguments are
fn extreme(func: &str, args: &[Val], wanted: Ordering) -> Result<Val, String> {
    let items = match args {
        [Val::List(items)] => items.as_slice(),
        _ => args,
    };
    let Some((first, rest)) = items.split_first() else {
        return Err(format!("{}() of an empty list", func));
    };

    let mut best = first;
    for item in rest {
        match item.compare(best) {
            Some(ord) if ord == wanted => best = item,
            Some(_) => {}
            None => {
                return Err(format!(
                    "{}() cannot compare {} with {}",
                    func,
                    item.type_name(),
                    best.type_name()
                ))
            }
        }
    }
    Ok(best.clone())
}
