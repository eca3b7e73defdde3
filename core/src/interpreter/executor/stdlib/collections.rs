//! List and object stdlib functions

use super::expected;
use crate::interpreter::executor::types::Val;

/// len(value) - characters of a string, items of a list or object; 0 for null
pub fn len(args: &[Val]) -> Result<Val, String> {
    let n = match &args[0] {
        Val::Null => 0,
        Val::Str(s) => s.chars().count(),
        Val::List(items) => items.len(),
        Val::Obj(map) => map.len(),
        other => return Err(expected("len", "a string, list or object", other)),
    };
    Ok(Val::Int(n as i64))
}

/// append(list, value) - returns a new list; null counts as an empty list
pub fn append(args: &[Val]) -> Result<Val, String> {
    let mut items = match &args[0] {
        Val::Null => Vec::new(),
        Val::List(items) => items.clone(),
        other => return Err(expected("append", "a list", other)),
    };
    items.push(args[1].clone());
    Ok(Val::List(items))
}

pub fn keys(args: &[Val]) -> Result<Val, String> {
    match &args[0] {
        Val::Obj(map) => Ok(Val::List(map.keys().cloned().map(Val::Str).collect())),
        other => Err(expected("keys", "an object", other)),
    }
}

/// contains(haystack, needle) - substring, list membership or object key
pub fn contains(args: &[Val]) -> Result<Val, String> {
    let found = match (&args[0], &args[1]) {
        (Val::Str(s), Val::Str(sub)) => s.contains(sub.as_str()),
        (Val::Str(_), other) => return Err(expected("contains", "a string needle", other)),
        (Val::List(items), needle) => items.iter().any(|item| item.loose_eq(needle)),
        (Val::Obj(map), Val::Str(key)) => map.contains_key(key),
        (Val::Obj(_), other) => return Err(expected("contains", "a string key", other)),
        (other, _) => return Err(expected("contains", "a string, list or object", other)),
    };
    Ok(Val::Bool(found))
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;

    #[test]
    fn test_len() {
        assert_eq!(len(&[Val::Str("héllo".into())]), Ok(Val::Int(5)));
        assert_eq!(len(&[Val::List(vec![Val::Null; 3])]), Ok(Val::Int(3)));
        assert_eq!(len(&[Val::Null]), Ok(Val::Int(0)));
        assert!(len(&[Val::Int(3)]).is_err());
    }

    #[test]
    fn test_append_does_not_touch_the_argument() {
        let list = Val::List(vec![Val::Int(1)]);
        let out = append(&[list.clone(), Val::Int(2)]).unwrap();
        assert_eq!(out, Val::List(vec![Val::Int(1), Val::Int(2)]));
        assert_eq!(list, Val::List(vec![Val::Int(1)]));
    }

    #[test]
    fn test_keys_and_contains() {
        let obj = Val::Obj(btreemap! {
            "b".to_string() => Val::Int(1),
            "a".to_string() => Val::Int(2),
        });
        assert_eq!(
            keys(&[obj.clone()]),
            Ok(Val::List(vec![Val::from("a"), Val::from("b")]))
        );
        assert_eq!(contains(&[obj, Val::from("a")]), Ok(Val::Bool(true)));
        assert_eq!(
            contains(&[Val::List(vec![Val::Int(2)]), Val::Float(2.0)]),
            Ok(Val::Bool(true))
        );
        assert_eq!(contains(&[Val::from("workflow"), Val::from("flow")]), Ok(Val::Bool(true)));
    }
}
