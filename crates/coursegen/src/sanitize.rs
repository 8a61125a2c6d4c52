//! Helpers for cleaning data before it reaches the job store or tracing spans.

use std::borrow::Cow;
use std::path::Path;

use serde_json::Value;

/// Returns only the filename component. Uploads sometimes carry client-side paths.
pub fn redact_filename(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Removes NUL characters, which the job store cannot persist.
pub fn strip_nul(text: &str) -> Cow<'_, str> {
    if text.contains('\0') {
        Cow::Owned(text.replace('\0', ""))
    } else {
        Cow::Borrowed(text)
    }
}

/// Recursively removes NUL characters from every string and key in a JSON value.
///
/// Done on the value rather than the serialized text: a serialized NUL is the
/// escape `\u0000`, and textual removal would break escaped backslashes.
pub fn strip_nul_value(value: &mut Value) {
    match value {
        Value::String(s) => {
            if s.contains('\0') {
                *s = s.replace('\0', "");
            }
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nul_value),
        Value::Object(map) => {
            if map.keys().any(|k| k.contains('\0')) {
                let entries = std::mem::take(map);
                for (key, v) in entries {
                    map.insert(key.replace('\0', ""), v);
                }
            }
            map.values_mut().for_each(strip_nul_value);
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
