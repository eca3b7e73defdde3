//! Type inspection, JSON conversion, clock and output

use super::expected;
use crate::interpreter::executor::types::Val;

/// type(value) - name of the value's type
pub fn type_of(args: &[Val]) -> Result<Val, String> {
    Ok(Val::Str(args[0].type_name().to_string()))
}

pub fn to_json(args: &[Val]) -> Result<Val, String> {
    Ok(Val::Str(args[0].to_json().to_string()))
}

pub fn from_json(args: &[Val]) -> Result<Val, String> {
    let Val::Str(text) = &args[0] else {
        return Err(expected("from_json", "a string", &args[0]));
    };
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| format!("from_json() invalid JSON: {}", e))?;
    Ok(Val::from_json(&json))
}

/// now() - current UTC time as an RFC 3339 string
pub fn now(_args: &[Val]) -> Result<Val, String> {
    Ok(Val::Str(chrono::Utc::now().to_rfc3339()))
}

/// print(values...) - writes the display forms, space separated, to stdout
pub fn print(args: &[Val]) -> Result<Val, String> {
    let parts: Vec<String> = args.iter().map(Val::to_string).collect();
    println!("{}", parts.join(" "));
    Ok(Val::Null)
}
