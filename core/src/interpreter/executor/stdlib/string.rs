//! String stdlib functions

use super::expected;
use crate::interpreter::executor::types::Val;

fn as_str<'a>(func: &str, val: &'a Val) -> Result<&'a str, String> {
    match val {
        Val::Str(s) => Ok(s),
        other => Err(expected(func, "a string", other)),
    }
}

fn as_index(func: &str, val: &Val) -> Result<usize, String> {
    match val {
        Val::Int(i) if *i >= 0 => Ok(*i as usize),
        other => Err(expected(func, "a non-negative int", other)),
    }
}

/// str(value) - display form of any value
pub fn str(args: &[Val]) -> Result<Val, String> {
    Ok(Val::Str(args[0].to_string()))
}

pub fn upper(args: &[Val]) -> Result<Val, String> {
    Ok(Val::Str(as_str("upper", &args[0])?.to_uppercase()))
}

pub fn lower(args: &[Val]) -> Result<Val, String> {
    Ok(Val::Str(as_str("lower", &args[0])?.to_lowercase()))
}

pub fn trim(args: &[Val]) -> Result<Val, String> {
    Ok(Val::Str(as_str("trim", &args[0])?.trim().to_string()))
}

pub fn split(args: &[Val]) -> Result<Val, String> {
    let s = as_str("split", &args[0])?;
    let sep = as_str("split", &args[1])?;
    if sep.is_empty() {
        return Err("split() separator must not be empty".to_string());
    }
    Ok(Val::List(
        s.split(sep).map(|part| Val::Str(part.to_string())).collect(),
    ))
}

/// join(list, sep) - items are joined by their display form
pub fn join(args: &[Val]) -> Result<Val, String> {
    let Val::List(items) = &args[0] else {
        return Err(expected("join", "a list", &args[0]));
    };
    let sep = as_str("join", &args[1])?;
    let parts: Vec<String> = items.iter().map(Val::to_string).collect();
    Ok(Val::Str(parts.join(sep)))
}

pub fn replace(args: &[Val]) -> Result<Val, String> {
    let s = as_str("replace", &args[0])?;
    let from = as_str("replace", &args[1])?;
    let to = as_str("replace", &args[2])?;
    if from.is_empty() {
        return Ok(Val::Str(s.to_string()));
    }
    Ok(Val::Str(s.replace(from, to)))
}

/// substr(s, start, len?) - counted in characters, clamped to the string
pub fn substr(args: &[Val]) -> Result<Val, String> {
    let s = as_str("substr", &args[0])?;
    let start = as_index("substr", &args[1])?;
    let chars = s.chars().skip(start);
    let out: String = match args.get(2) {
        Some(len) => chars.take(as_index("substr", len)?).collect(),
        None => chars.collect(),
    };
    Ok(Val::Str(out))
}
